// State management module
//
// StateManager wraps FilterState in Arc<RwLock<T>> and broadcasts change
// events to anyone watching the filter (status reporting, the binary, tests).

use crate::models::{FilterSettings, FilterState};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Change events emitted when state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// Host context became visible or hidden
    ActivityChanged { is_active: bool },

    /// Dry-run mode was switched
    DryRunChanged { dry_run: bool },

    /// Settings were (re)loaded and rules recompiled
    FiltersReloaded {
        generation: u64,
        blacklist_rules: usize,
        whitelist_rules: usize,
    },

    /// A classification pass finished
    PassCompleted { processed: usize, blocked: usize },
}

/// Thread-safe state manager with event emission
///
/// This is the central state holder that:
/// - Provides thread-safe access to [`FilterState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Supports subscribing to state changes via tokio broadcast channels
///
/// # Usage
///
/// - [`read()`](Self::read) for reading single fields
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
pub struct StateManager {
    state: Arc<RwLock<FilterState>>,
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state and a 100-event buffer
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(FilterState::default())),
            state_tx,
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, FilterState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, FilterState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> FilterState {
        self.read_guard().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let dry_run = state_manager.read(|state| state.dry_run());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&FilterState) -> R,
    {
        let state = self.read_guard();
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// Applies `update_fn`, compares against the previous state, and
    /// broadcasts one event per detected change.
    ///
    /// # Returns
    /// The events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut FilterState),
    {
        let changes = {
            let mut state = self.write_guard();
            let old_state = state.clone();
            update_fn(&mut state);
            Self::detect_changes(&old_state, &state)
        };

        for change in &changes {
            // No subscribers is fine
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &FilterState, new: &FilterState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.is_active != new.is_active {
            changes.push(StateChange::ActivityChanged {
                is_active: new.is_active,
            });
        }

        if old.config_generation != new.config_generation {
            changes.push(StateChange::FiltersReloaded {
                generation: new.config_generation,
                blacklist_rules: new.settings.blacklist.len(),
                whitelist_rules: new.settings.whitelist.len(),
            });
        }

        if old.dry_run() != new.dry_run() {
            changes.push(StateChange::DryRunChanged {
                dry_run: new.dry_run(),
            });
        }

        if old.passes_completed != new.passes_completed {
            changes.push(StateChange::PassCompleted {
                processed: new.last_pass_processed,
                blocked: new.last_pass_blocked,
            });
        }

        changes
    }

    // Convenience methods for common state updates

    pub fn set_active(&self, is_active: bool) -> Vec<StateChange> {
        self.update(|state| state.is_active = is_active)
    }

    pub fn set_dry_run(&self, dry_run: bool) -> Vec<StateChange> {
        self.update(|state| state.settings.dry_run = dry_run)
    }

    /// Install freshly loaded settings and bump the config generation.
    pub fn apply_settings(&self, settings: FilterSettings) -> Vec<StateChange> {
        self.update(|state| {
            state.settings = settings;
            state.is_initialized = true;
            state.config_generation += 1;

            tracing::info!(
                "Filters applied: generation={}, dryrun={}, blacklist={} ({}), whitelist={} ({})",
                state.config_generation,
                state.settings.dry_run,
                state.settings.use_blacklist,
                state.settings.blacklist.len(),
                state.settings.use_whitelist,
                state.settings.whitelist.len()
            );
        })
    }

    /// Record a finished pass.
    pub fn record_pass(
        &self,
        processed: usize,
        blocked: usize,
        unclassified: usize,
    ) -> Vec<StateChange> {
        self.update(|state| state.record_pass(processed, blocked, unclassified))
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleSpec;

    #[test]
    fn test_new_state_manager() {
        let manager = StateManager::new();
        let state = manager.snapshot();

        assert!(state.is_active);
        assert!(!state.is_initialized);
        assert!(state.dry_run());
    }

    #[test]
    fn test_activity_change_detection() {
        let manager = StateManager::new();

        let changes = manager.set_active(false);
        assert_eq!(changes, vec![StateChange::ActivityChanged { is_active: false }]);

        let changes = manager.set_active(false);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_dry_run_change() {
        let manager = StateManager::new();
        let changes = manager.set_dry_run(false);
        assert_eq!(changes, vec![StateChange::DryRunChanged { dry_run: false }]);
        assert!(!manager.read(|s| s.dry_run()));
    }

    #[test]
    fn test_apply_settings_bumps_generation() {
        let manager = StateManager::new();
        let mut settings = FilterSettings::default();
        settings.blacklist.push(RuleSpec::named("a"));

        let changes = manager.apply_settings(settings);

        assert!(changes.contains(&StateChange::FiltersReloaded {
            generation: 1,
            blacklist_rules: 1,
            whitelist_rules: 0,
        }));
        assert!(manager.read(|s| s.is_initialized));
    }

    #[test]
    fn test_apply_settings_reports_dry_run_flip() {
        let manager = StateManager::new();
        let mut settings = FilterSettings::default();
        settings.dry_run = false;

        let changes = manager.apply_settings(settings);
        assert!(changes.contains(&StateChange::DryRunChanged { dry_run: false }));
    }

    #[test]
    fn test_record_pass_event() {
        let manager = StateManager::new();
        let changes = manager.record_pass(7, 2, 1);

        assert_eq!(
            changes,
            vec![StateChange::PassCompleted {
                processed: 7,
                blocked: 2
            }]
        );
        assert_eq!(manager.read(|s| s.total_unclassified), 1);
    }

    #[test]
    fn test_subscribe_to_changes() {
        let manager = StateManager::new();
        let mut rx = manager.subscribe();

        manager.set_active(false);

        let event = rx.try_recv();
        assert!(matches!(
            event.unwrap(),
            StateChange::ActivityChanged { is_active: false }
        ));
    }

    #[test]
    fn test_multiple_subscribers() {
        let manager = StateManager::new();
        let mut rx1 = manager.subscribe();
        let mut rx2 = manager.subscribe();

        manager.record_pass(1, 0, 0);

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_clone_shares_state() {
        let manager1 = StateManager::new();
        let manager2 = manager1.clone();

        manager1.set_dry_run(false);

        assert!(!manager2.snapshot().dry_run());
    }
}
