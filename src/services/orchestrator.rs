//! Pass driver that ties classification, menu interaction, and presentation
//! together.
//!
//! One [`Orchestrator`] exists per host page. It owns the compiled rules and
//! menu patterns, and a [`StateManager`] with the runtime flags. Passes never
//! overlap: a pass requested while another is running is folded into a single
//! follow-up pass.

use crate::config::{ConfigStore, StorageError};
use crate::host::{Extractor, Highlight, MenuHost, Presenter};
use crate::metrics::Metrics;
use crate::models::settings::keys;
use crate::models::{
    ContentItem, FilterSettings, ListMode, RuleSet, SynchronizedVideoAction, Verdict,
};
use crate::services::classifier::classify;
use crate::services::interaction::{InteractionConfig, InteractionController, MenuInteractionResult};
use crate::services::menu_patterns::ActionPatterns;
use crate::state::{StateChange, StateManager};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

/// Wait after a live menu action before hiding the item, so the menu can
/// finish closing.
pub const DEFAULT_ACTION_SETTLE: Duration = Duration::from_millis(150);

/// Host implementations the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub extractor: Arc<dyn Extractor>,
    pub presenter: Arc<dyn Presenter>,
    pub menu: Arc<dyn MenuHost>,
}

/// Runtime control requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    UpdateDryRun(bool),
    RefreshFilters,
    GetStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlResponse {
    Ack,
    Refreshed(Result<(), String>),
    Status(StatusReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub is_active: bool,
    #[serde(rename = "dryrun")]
    pub dry_run: bool,
    pub use_blacklist: bool,
    pub use_whitelist: bool,
}

/// Counts for one pass (or a pass plus its follow-ups).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassSummary {
    pub processed: usize,
    pub blocked: usize,
    pub unclassified: usize,
}

impl std::ops::AddAssign for PassSummary {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.blocked += other.blocked;
        self.unclassified += other.unclassified;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Context inactive; nothing was looked at.
    Inactive,
    /// Another pass is running; it will run once more when done.
    Deferred,
    Completed(PassSummary),
}

/// Rules and menu patterns compiled from one settings snapshot.
#[derive(Debug)]
struct CompiledFilters {
    rules: RuleSet,
    patterns: ActionPatterns,
}

impl CompiledFilters {
    fn compile(settings: &FilterSettings, detected_language: Option<&str>) -> Self {
        Self {
            rules: RuleSet::compile(&settings.blacklist, &settings.whitelist),
            patterns: ActionPatterns::resolve(settings, detected_language),
        }
    }
}

/// Per-pass copy of the flags that steer item handling.
#[derive(Debug, Clone, Copy)]
struct PassFlags {
    dry_run: bool,
    list_mode: ListMode,
    filter_synchronized: bool,
    synchronized_action: SynchronizedVideoAction,
}

#[derive(Debug, Default)]
struct PassGate {
    running: bool,
    rerun_requested: bool,
}

/// Holds the pass gate open for one `run_pass` call.
///
/// If the pass future is dropped mid-flight the gate is reset on drop, so
/// later passes are not deferred forever.
struct PassGuard<'a> {
    gate: &'a Mutex<PassGate>,
    armed: bool,
}

impl PassGuard<'_> {
    /// Close the gate unless a follow-up pass was requested meanwhile.
    /// Returns true if the caller should run again.
    fn finish_or_rerun(&mut self, still_active: impl FnOnce() -> bool) -> bool {
        let mut gate = lock(self.gate);
        let rerun = gate.rerun_requested && still_active();
        gate.rerun_requested = false;
        if !rerun {
            gate.running = false;
            self.armed = false;
        }
        rerun
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("Pass dropped before completion, releasing gate");
            let mut gate = lock(self.gate);
            gate.running = false;
            gate.rerun_requested = false;
        }
    }
}

type DebugModeHook = Box<dyn Fn(bool) + Send + Sync>;

pub struct Orchestrator {
    extractor: Arc<dyn Extractor>,
    presenter: Arc<dyn Presenter>,
    interaction: InteractionController,
    store: Arc<dyn ConfigStore>,
    state: StateManager,
    metrics: Arc<Metrics>,
    filters: RwLock<Arc<CompiledFilters>>,
    gate: Mutex<PassGate>,
    action_settle: Duration,
    debug_mode_hook: Option<DebugModeHook>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, store: Arc<dyn ConfigStore>) -> Self {
        Self::with_config(
            collaborators,
            store,
            InteractionConfig::default(),
            DEFAULT_ACTION_SETTLE,
        )
    }

    pub fn with_config(
        collaborators: Collaborators,
        store: Arc<dyn ConfigStore>,
        interaction_config: InteractionConfig,
        action_settle: Duration,
    ) -> Self {
        let Collaborators {
            extractor,
            presenter,
            menu,
        } = collaborators;

        let filters = CompiledFilters::compile(&FilterSettings::default(), None);

        Self {
            extractor,
            interaction: InteractionController::with_config(
                menu,
                Arc::clone(&presenter),
                interaction_config,
            ),
            presenter,
            store,
            state: StateManager::new(),
            metrics: Arc::new(Metrics::new()),
            filters: RwLock::new(Arc::new(filters)),
            gate: Mutex::new(PassGate::default()),
            action_settle,
            debug_mode_hook: None,
        }
    }

    /// Call `hook` with `debugMode` every time settings are applied.
    pub fn with_debug_mode_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.debug_mode_hook = Some(Box::new(hook));
        self
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn extractor(&self) -> &Arc<dyn Extractor> {
        &self.extractor
    }

    pub fn is_active(&self) -> bool {
        self.state.read(|s| s.is_active)
    }

    pub fn dry_run(&self) -> bool {
        self.state.read(|s| s.dry_run())
    }

    pub fn status(&self) -> StatusReport {
        self.state.read(|s| StatusReport {
            is_active: s.is_active,
            dry_run: s.dry_run(),
            use_blacklist: s.settings.use_blacklist,
            use_whitelist: s.settings.use_whitelist,
        })
    }

    fn filters(&self) -> Arc<CompiledFilters> {
        Arc::clone(
            &self
                .filters
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    /// Load settings and compile rules. Falls back to defaults when the store
    /// fails on first load; never returns an error.
    pub async fn initialize(&self) {
        tracing::info!("Initializing filter");
        if let Err(e) = self.refresh_filters().await {
            tracing::warn!("Continuing with fallback settings: {}", e);
        }
    }

    /// Reload settings from the store and recompile rules and patterns.
    ///
    /// On a storage error the previous settings stay in effect (documented
    /// defaults if nothing was ever loaded) and the error is returned.
    pub async fn refresh_filters(&self) -> Result<(), StorageError> {
        match self.store.load(&keys::ALL).await {
            Ok(values) => {
                self.apply_settings(FilterSettings::from_values(&values));
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to load settings: {}", e);
                if !self.state.read(|s| s.is_initialized) {
                    self.apply_settings(FilterSettings::default());
                }
                Err(e)
            }
        }
    }

    fn apply_settings(&self, settings: FilterSettings) {
        let detected = self.interaction.document_language();
        let compiled = CompiledFilters::compile(&settings, detected.as_deref());
        let debug_mode = settings.debug_mode;

        *self
            .filters
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(compiled);

        self.interaction.clear_cache();
        self.state.apply_settings(settings);

        if let Some(hook) = &self.debug_mode_hook {
            hook(debug_mode);
        }
    }

    /// Mirror host visibility. Does not run a pass by itself; the scheduler
    /// owns the resume trigger.
    pub fn set_active(&self, active: bool) -> Vec<StateChange> {
        let changes = self.state.set_active(active);
        if !changes.is_empty() {
            tracing::info!("Filter {}", if active { "activated" } else { "suspended" });
        }
        changes
    }

    /// Switch dry run at runtime and re-run a pass.
    pub async fn set_dry_run(&self, dry_run: bool) -> PassOutcome {
        let changes = self.state.set_dry_run(dry_run);
        if !changes.is_empty() {
            tracing::info!("Dry run mode {}", if dry_run { "enabled" } else { "disabled" });
            if !dry_run {
                self.interaction.clear_cache();
            }
        }
        self.run_pass().await
    }

    pub async fn handle_message(&self, message: ControlMessage) -> ControlResponse {
        tracing::debug!("Control message received: {:?}", message);
        match message {
            ControlMessage::UpdateDryRun(value) => {
                let _ = self.set_dry_run(value).await;
                ControlResponse::Ack
            }
            ControlMessage::RefreshFilters => {
                let result = self.refresh_filters().await;
                if result.is_ok() {
                    let _ = self.run_pass().await;
                }
                ControlResponse::Refreshed(result.map_err(|e| e.to_string()))
            }
            ControlMessage::GetStatus => ControlResponse::Status(self.status()),
        }
    }

    /// Classify every unprocessed item and apply the resulting actions.
    pub async fn run_pass(&self) -> PassOutcome {
        if !self.is_active() {
            tracing::debug!("Pass skipped, context inactive");
            return PassOutcome::Inactive;
        }

        {
            let mut gate = lock(&self.gate);
            if gate.running {
                gate.rerun_requested = true;
                self.metrics.record_pass_deferred();
                tracing::debug!("Pass already running, deferring");
                return PassOutcome::Deferred;
            }
            gate.running = true;
        }
        let mut guard = PassGuard {
            gate: &self.gate,
            armed: true,
        };

        let mut total = PassSummary::default();
        loop {
            total += self.process_items().await;

            if !guard.finish_or_rerun(|| self.is_active()) {
                break;
            }
            tracing::debug!("Running deferred pass");
        }

        PassOutcome::Completed(total)
    }

    async fn process_items(&self) -> PassSummary {
        let started = std::time::Instant::now();
        let filters = self.filters();
        let flags = self.state.read(|s| PassFlags {
            dry_run: s.dry_run(),
            list_mode: s.list_mode(),
            filter_synchronized: s.settings.filter_synchronized_videos,
            synchronized_action: s.settings.synchronized_video_action,
        });

        let handles = self.extractor.find_unprocessed_items();
        let mut summary = PassSummary::default();
        tracing::debug!("Pass started with {} unprocessed items", handles.len());

        for handle in handles {
            if !self.is_active() {
                tracing::debug!("Context went inactive, stopping pass early");
                break;
            }

            self.extractor.mark_processed(&handle);
            let badged =
                flags.filter_synchronized && self.extractor.has_suppressed_badge(&handle);
            let item = match self.extractor.extract_item(&handle) {
                Ok(item) => item,
                Err(e) if badged => {
                    tracing::debug!("Badged item without readable text: {}", e);
                    ContentItem::new(handle.clone(), "", "", "").with_badge(true)
                }
                Err(e) => {
                    tracing::debug!("Skipping item: {}", e);
                    summary.unclassified += 1;
                    self.metrics.record_item_unclassified();
                    continue;
                }
            };

            summary.processed += 1;
            self.metrics.record_item_processed();

            let blocked = if badged {
                self.apply_synchronized_action(&item, &flags, &filters).await
            } else {
                let verdict = classify(&item, &filters.rules, flags.list_mode);
                tracing::debug!("'{}' by '{}': {}", item.title, item.channel_name, verdict);
                if verdict.blocked {
                    self.apply_blocking_action(&item, &verdict, &flags, &filters)
                        .await;
                }
                verdict.blocked
            };

            if blocked {
                summary.blocked += 1;
                self.metrics.record_item_blocked();
            }
        }

        self.metrics.record_pass(started.elapsed());
        self.state
            .record_pass(summary.processed, summary.blocked, summary.unclassified);
        tracing::debug!(
            "Pass finished: {} processed, {} blocked, {} unclassified",
            summary.processed,
            summary.blocked,
            summary.unclassified
        );
        summary
    }

    /// Badge lane. Returns whether the item counts as blocked.
    async fn apply_synchronized_action(
        &self,
        item: &ContentItem,
        flags: &PassFlags,
        filters: &CompiledFilters,
    ) -> bool {
        match flags.synchronized_action {
            SynchronizedVideoAction::Hide => {
                if flags.dry_run {
                    self.highlight(item, Highlight::SynchronizedDryRunHide);
                } else {
                    self.hide(item);
                }
                true
            }
            SynchronizedVideoAction::NotInterested => {
                if flags.dry_run {
                    self.highlight(item, Highlight::SynchronizedDryRunNotInterested);
                    self.interact(item, filters, true).await;
                } else {
                    self.interact(item, filters, false).await;
                    tokio::time::sleep(self.action_settle).await;
                    self.hide(item);
                }
                true
            }
            SynchronizedVideoAction::Nothing => {
                tracing::debug!("Synchronized item left alone: '{}'", item.title);
                false
            }
        }
    }

    async fn apply_blocking_action(
        &self,
        item: &ContentItem,
        verdict: &Verdict,
        flags: &PassFlags,
        filters: &CompiledFilters,
    ) {
        let use_menu = verdict.allows_menu_action() && filters.patterns.demands_interaction();

        if flags.dry_run {
            self.highlight(item, Highlight::BlockedDryRun);
            if use_menu {
                self.interact(item, filters, true).await;
            }
        } else if use_menu {
            self.interact(item, filters, false).await;
            tokio::time::sleep(self.action_settle).await;
            self.hide(item);
        } else {
            self.hide(item);
        }
    }

    async fn interact(
        &self,
        item: &ContentItem,
        filters: &CompiledFilters,
        dry_run: bool,
    ) -> MenuInteractionResult {
        let result = self
            .interaction
            .interact(&item.handle, &filters.patterns, dry_run)
            .await;
        self.metrics
            .record_menu_result(result.target_found, result.from_cache);
        result
    }

    fn hide(&self, item: &ContentItem) {
        if let Err(e) = self.presenter.hide(&item.handle) {
            tracing::warn!("Failed to hide '{}': {}", item.title, e);
        }
    }

    fn highlight(&self, item: &ContentItem, variant: Highlight) {
        if let Err(e) = self.presenter.highlight(&item.handle, variant) {
            tracing::warn!("Failed to highlight '{}' as {}: {}", item.title, variant, e);
        }
    }
}
