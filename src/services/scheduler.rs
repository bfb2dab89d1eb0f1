//! Debounce/batch state machine for host change notifications.
//!
//! [`ChangeScheduler`] holds no timer of its own. It reports the single
//! deadline it is waiting on through [`ChangeScheduler::deadline`] and the
//! owner (see [`crate::host::bridge::HostBridge`]) calls
//! [`ChangeScheduler::on_deadline`] once that instant is reached. This keeps
//! every transition testable without a runtime.

use crate::models::ChangeBatch;
use crate::models::HostRef;
use std::time::Duration;
use tokio::time::Instant;

/// Default quiet period before a coalesced pass fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Default number of relevant batches that forces an immediate pass.
pub const DEFAULT_BATCH_CEILING: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub debounce: Duration,
    pub batch_ceiling: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            batch_ceiling: DEFAULT_BATCH_CEILING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Pending {
        pending_count: usize,
        deadline: Instant,
    },
    Suspended,
}

/// Why a pass was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Debounce window elapsed with no further relevant batches.
    Debounced { batches: usize },
    /// Batch ceiling reached before the window elapsed.
    CeilingReached { batches: usize },
    /// Context became active again.
    Resumed,
}

#[derive(Debug)]
pub struct ChangeScheduler {
    config: SchedulerConfig,
    state: SchedulerState,
}

impl ChangeScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config: SchedulerConfig {
                batch_ceiling: config.batch_ceiling.max(1),
                ..config
            },
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_suspended(&self) -> bool {
        self.state == SchedulerState::Suspended
    }

    /// Instant the pending debounce window closes, if one is open.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Pending { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    /// Feed one batch of structural changes.
    ///
    /// `is_relevant` is asked about added nodes only; the batch counts when at
    /// least one of them is or contains an item.
    pub fn on_batch<F>(&mut self, batch: &ChangeBatch, now: Instant, is_relevant: F) -> Option<Trigger>
    where
        F: FnMut(&HostRef) -> bool,
    {
        if self.is_suspended() {
            return None;
        }
        if !batch.added.iter().any(is_relevant) {
            return None;
        }

        let pending_count = match self.state {
            SchedulerState::Pending { pending_count, .. } => pending_count + 1,
            _ => 1,
        };

        if pending_count >= self.config.batch_ceiling {
            tracing::debug!("Batch ceiling reached ({}), triggering pass", pending_count);
            self.state = SchedulerState::Idle;
            return Some(Trigger::CeilingReached {
                batches: pending_count,
            });
        }

        self.state = SchedulerState::Pending {
            pending_count,
            deadline: now + self.config.debounce,
        };
        None
    }

    /// Fire the debounced pass if `now` is at or past the pending deadline.
    pub fn on_deadline(&mut self, now: Instant) -> Option<Trigger> {
        match self.state {
            SchedulerState::Pending {
                pending_count,
                deadline,
            } if now >= deadline => {
                self.state = SchedulerState::Idle;
                Some(Trigger::Debounced {
                    batches: pending_count,
                })
            }
            _ => None,
        }
    }

    /// Track visibility of the consuming context.
    ///
    /// Going inactive drops any pending window. Coming back from suspension
    /// yields exactly one immediate trigger.
    pub fn set_active(&mut self, active: bool) -> Option<Trigger> {
        match (active, self.state) {
            (false, SchedulerState::Suspended) => None,
            (false, _) => {
                tracing::debug!("Scheduler suspended, pending work discarded");
                self.state = SchedulerState::Suspended;
                None
            }
            (true, SchedulerState::Suspended) => {
                tracing::debug!("Scheduler resumed");
                self.state = SchedulerState::Idle;
                Some(Trigger::Resumed)
            }
            (true, _) => None,
        }
    }
}

impl Default for ChangeScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relevant_batch() -> ChangeBatch {
        ChangeBatch::added(vec![HostRef::new("item")])
    }

    fn always(_: &HostRef) -> bool {
        true
    }

    fn never(_: &HostRef) -> bool {
        false
    }

    #[test]
    fn test_single_batch_opens_window() {
        let mut scheduler = ChangeScheduler::default();
        let now = Instant::now();

        assert_eq!(scheduler.on_batch(&relevant_batch(), now, always), None);
        assert_eq!(scheduler.deadline(), Some(now + DEFAULT_DEBOUNCE));
        assert_eq!(scheduler.on_deadline(now), None);
        assert_eq!(
            scheduler.on_deadline(now + DEFAULT_DEBOUNCE),
            Some(Trigger::Debounced { batches: 1 })
        );
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_new_batch_restarts_window() {
        let mut scheduler = ChangeScheduler::default();
        let start = Instant::now();
        let later = start + Duration::from_millis(200);

        let _ = scheduler.on_batch(&relevant_batch(), start, always);
        let _ = scheduler.on_batch(&relevant_batch(), later, always);

        assert_eq!(scheduler.on_deadline(start + DEFAULT_DEBOUNCE), None);
        assert_eq!(
            scheduler.on_deadline(later + DEFAULT_DEBOUNCE),
            Some(Trigger::Debounced { batches: 2 })
        );
    }

    #[test]
    fn test_ceiling_fires_immediately() {
        let mut scheduler = ChangeScheduler::default();
        let now = Instant::now();

        for _ in 0..DEFAULT_BATCH_CEILING - 1 {
            assert_eq!(scheduler.on_batch(&relevant_batch(), now, always), None);
        }
        assert_eq!(
            scheduler.on_batch(&relevant_batch(), now, always),
            Some(Trigger::CeilingReached {
                batches: DEFAULT_BATCH_CEILING
            })
        );
        assert_eq!(scheduler.deadline(), None);
    }

    #[test]
    fn test_irrelevant_batches_ignored() {
        let mut scheduler = ChangeScheduler::default();
        let now = Instant::now();

        assert_eq!(scheduler.on_batch(&relevant_batch(), now, never), None);
        assert_eq!(scheduler.on_batch(&ChangeBatch::default(), now, always), None);
        assert_eq!(
            scheduler.on_batch(&ChangeBatch::removed(vec![HostRef::new(1)]), now, always),
            None
        );
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_suspend_discards_and_resume_fires_once() {
        let mut scheduler = ChangeScheduler::default();
        let now = Instant::now();

        let _ = scheduler.on_batch(&relevant_batch(), now, always);
        assert_eq!(scheduler.set_active(false), None);
        assert_eq!(scheduler.deadline(), None);

        for _ in 0..10 {
            assert_eq!(scheduler.on_batch(&relevant_batch(), now, always), None);
        }
        assert_eq!(scheduler.on_deadline(now + Duration::from_secs(5)), None);

        assert_eq!(scheduler.set_active(true), Some(Trigger::Resumed));
        assert_eq!(scheduler.set_active(true), None);
    }

    #[test]
    fn test_activation_while_active_is_noop() {
        let mut scheduler = ChangeScheduler::default();
        assert_eq!(scheduler.set_active(true), None);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_zero_ceiling_clamped() {
        let mut scheduler = ChangeScheduler::new(SchedulerConfig {
            debounce: DEFAULT_DEBOUNCE,
            batch_ceiling: 0,
        });
        assert_eq!(
            scheduler.on_batch(&relevant_batch(), Instant::now(), always),
            Some(Trigger::CeilingReached { batches: 1 })
        );
    }
}
