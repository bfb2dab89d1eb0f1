//! Contextual-menu protocol for blocked items.
//!
//! One call to [`InteractionController::interact`] walks the menu through
//! `Closed → Opening → Searching → Acting | Closing → Closed`:
//!
//! 1. Dry run with a cached outcome: replay it, highlight, done.
//! 2. Open the item's menu through its trigger element.
//! 3. Poll the document for menu entries until one matches the strict
//!    pattern (if enabled) or the primary pattern, or the timeout passes.
//! 4. Live and found: invoke the entry and let the menu close itself.
//!    Otherwise schedule the close procedure.
//!
//! Host failures never escape: they are logged, the menu is closed, and the
//! call resolves to "not found". A call dropped after the menu was opened
//! still schedules the close.

use crate::host::{Highlight, HostError, MenuCandidate, MenuHost, Presenter};
use crate::models::HostRef;
use crate::services::dry_run_cache::DryRunCache;
use crate::services::menu_patterns::ActionPatterns;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Menu protocol timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionConfig {
    /// Delay between menu polls.
    pub poll_interval: Duration,
    /// Give up searching after this long.
    pub search_timeout: Duration,
    /// Wait before re-toggling the trigger to close the menu.
    pub close_delay: Duration,
    /// Further wait before the cancel signal.
    pub cancel_delay: Duration,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            search_timeout: Duration::from_millis(300),
            close_delay: Duration::from_millis(100),
            cancel_delay: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Closed,
    Opening,
    Searching,
    Acting,
    Closing,
}

/// Outcome of the menu protocol for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MenuInteractionResult {
    pub target_found: bool,
    /// The target entry was actually invoked (live mode only).
    pub acted: bool,
    /// Replayed from the dry-run memo table without opening a menu.
    pub from_cache: bool,
}

impl MenuInteractionResult {
    fn not_found() -> Self {
        Self::default()
    }
}

pub struct InteractionController {
    menu: Arc<dyn MenuHost>,
    presenter: Arc<dyn Presenter>,
    config: InteractionConfig,
    cache: Mutex<DryRunCache>,
    state: Arc<Mutex<MenuState>>,
    pending_close: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InteractionController {
    pub fn new(menu: Arc<dyn MenuHost>, presenter: Arc<dyn Presenter>) -> Self {
        Self::with_config(menu, presenter, InteractionConfig::default())
    }

    pub fn with_config(
        menu: Arc<dyn MenuHost>,
        presenter: Arc<dyn Presenter>,
        config: InteractionConfig,
    ) -> Self {
        Self {
            menu,
            presenter,
            config,
            cache: Mutex::new(DryRunCache::new()),
            state: Arc::new(Mutex::new(MenuState::Closed)),
            pending_close: Mutex::new(None),
        }
    }

    pub fn state(&self) -> MenuState {
        *lock(&self.state)
    }

    fn set_state(&self, state: MenuState) {
        *lock(&self.state) = state;
    }

    /// Forget every memoized dry-run outcome.
    pub fn clear_cache(&self) {
        lock(&self.cache).clear();
        tracing::debug!("Dry-run menu cache cleared");
    }

    pub fn cached_result(&self, handle: &HostRef) -> Option<bool> {
        lock(&self.cache).get(handle)
    }

    pub fn document_language(&self) -> Option<String> {
        self.menu.document_language()
    }

    /// Wait for a scheduled close procedure to finish.
    ///
    /// Called before every open so two menus are never up at once.
    pub async fn wait_for_close(&self) {
        let pending = lock(&self.pending_close).take();
        if let Some(task) = pending {
            if let Err(e) = task.await {
                tracing::debug!("Menu close task ended abnormally: {}", e);
                self.set_state(MenuState::Closed);
            }
        }
    }

    /// Run the menu protocol for one item.
    pub async fn interact(
        &self,
        item: &HostRef,
        patterns: &ActionPatterns,
        dry_run: bool,
    ) -> MenuInteractionResult {
        if dry_run {
            if let Some(found) = self.cached_result(item) {
                tracing::debug!("Using cached menu result for {:?}: {}", item, found);
                self.highlight_outcome(item, found);
                return MenuInteractionResult {
                    target_found: found,
                    acted: false,
                    from_cache: true,
                };
            }
        }

        self.wait_for_close().await;
        self.set_state(MenuState::Opening);

        let Some(trigger) = self.menu.menu_trigger(item) else {
            tracing::debug!("No menu trigger for {:?}", item);
            self.set_state(MenuState::Closed);
            if dry_run {
                lock(&self.cache).insert(item, false);
            }
            return MenuInteractionResult::not_found();
        };

        // Closes the menu when dropped, including when this future is dropped
        // mid-search.
        let mut pending = PendingClose::new(self, trigger);
        let result = match self.run_protocol(item, &mut pending, patterns, dry_run).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Menu interaction failed for {:?}: {}", item, e);
                if dry_run {
                    lock(&self.cache).insert(item, false);
                }
                MenuInteractionResult::not_found()
            }
        };
        drop(pending);
        result
    }

    async fn run_protocol(
        &self,
        item: &HostRef,
        pending: &mut PendingClose<'_>,
        patterns: &ActionPatterns,
        dry_run: bool,
    ) -> Result<MenuInteractionResult, HostError> {
        self.menu.toggle_menu(&pending.trigger)?;
        pending.opened = true;

        self.set_state(MenuState::Searching);
        let target = self.find_target(patterns).await?;
        let found = target.is_some();

        if dry_run {
            tracing::debug!(
                "Dry run: menu target {} for {:?}",
                if found { "FOUND" } else { "NOT FOUND" },
                item
            );
            lock(&self.cache).insert(item, found);
            self.highlight_outcome(item, found);
            return Ok(MenuInteractionResult {
                target_found: found,
                acted: false,
                from_cache: false,
            });
        }

        match target {
            Some(candidate) => {
                self.set_state(MenuState::Acting);
                tracing::debug!("Invoking menu entry '{}'", candidate.text.trim());
                self.menu.invoke_candidate(&candidate)?;
                // The host menu closes itself after a selection.
                pending.disarm();
                self.set_state(MenuState::Closed);
                Ok(MenuInteractionResult {
                    target_found: true,
                    acted: true,
                    from_cache: false,
                })
            }
            None => {
                tracing::debug!("Menu target not found for {:?}", item);
                Ok(MenuInteractionResult::not_found())
            }
        }
    }

    /// Poll until a candidate matches or the search window closes.
    async fn find_target(
        &self,
        patterns: &ActionPatterns,
    ) -> Result<Option<MenuCandidate>, HostError> {
        let started = Instant::now();
        loop {
            let candidates = self.menu.poll_menu_candidates()?;
            if let Some(target) = select_target(&candidates, patterns) {
                return Ok(Some(target));
            }
            if started.elapsed() >= self.config.search_timeout {
                tracing::debug!("Timed out waiting for menu target");
                return Ok(None);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Close the menu in the background: re-toggle the trigger (only if the
    /// menu was actually opened), then send a cancel signal. Failures are
    /// logged and dropped.
    fn schedule_close(&self, trigger: Option<HostRef>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No runtime to close the menu on");
            self.set_state(MenuState::Closed);
            return;
        };
        self.set_state(MenuState::Closing);

        let menu = Arc::clone(&self.menu);
        let state = Arc::clone(&self.state);
        let config = self.config;
        let task = runtime.spawn(async move {
            tokio::time::sleep(config.close_delay).await;
            if let Some(trigger) = trigger {
                if let Err(e) = menu.toggle_menu(&trigger) {
                    tracing::debug!("Menu close toggle failed: {}", e);
                }
            }
            tokio::time::sleep(config.cancel_delay).await;
            if let Err(e) = menu.dispatch_cancel_signal() {
                tracing::debug!("Menu cancel signal failed: {}", e);
            }
            *lock(&state) = MenuState::Closed;
        });

        *lock(&self.pending_close) = Some(task);
    }

    fn highlight_outcome(&self, item: &HostRef, found: bool) {
        let variant = if found {
            Highlight::MenuTargetFound
        } else {
            Highlight::MenuTargetNotFound
        };
        if let Err(e) = self.presenter.highlight(item, variant) {
            tracing::debug!("Failed to highlight {:?} as {}: {}", item, variant, e);
        }
    }
}

/// Close procedure owed by an interaction that got past the trigger lookup.
///
/// Dropping it schedules the close unless the host already closed the menu
/// after a selection.
struct PendingClose<'a> {
    controller: &'a InteractionController,
    trigger: HostRef,
    /// The opening toggle went through.
    opened: bool,
    armed: bool,
}

impl<'a> PendingClose<'a> {
    fn new(controller: &'a InteractionController, trigger: HostRef) -> Self {
        Self {
            controller,
            trigger,
            opened: false,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingClose<'_> {
    fn drop(&mut self) {
        if self.armed {
            let trigger = self.opened.then(|| self.trigger.clone());
            self.controller.schedule_close(trigger);
        }
    }
}

/// Strict pattern (when enabled) across all candidates first, then primary.
pub fn select_target(candidates: &[MenuCandidate], patterns: &ActionPatterns) -> Option<MenuCandidate> {
    if candidates.is_empty() {
        return None;
    }
    patterns
        .active_strict()
        .and_then(|strict| candidates.iter().find(|c| strict.is_match(&c.text)))
        .or_else(|| {
            patterns
                .primary
                .as_ref()
                .and_then(|primary| candidates.iter().find(|c| primary.is_match(&c.text)))
        })
        .cloned()
}
