use crate::models::rule::ListMode;
use crate::models::settings::FilterSettings;

/// Single source of truth for the filter's runtime state.
///
/// Wrapped by [`crate::state::StateManager`], which detects changes and emits
/// [`crate::state::StateChange`] events. Never mutate it directly; go through
/// [`StateManager::update`](crate::state::StateManager::update).
#[derive(Clone, Debug)]
pub struct FilterState {
    /// Host context is visible/active.
    pub is_active: bool,

    /// Configuration has been loaded at least once.
    pub is_initialized: bool,

    /// Settings currently in effect (last successfully loaded, or defaults).
    pub settings: FilterSettings,

    /// Bumped every time rules and patterns are recompiled.
    pub config_generation: u64,

    // Last pass
    pub last_pass_processed: usize,
    pub last_pass_blocked: usize,

    // Running totals, diagnostics only
    pub passes_completed: u64,
    pub total_processed: usize,
    pub total_blocked: usize,
    pub total_unclassified: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            is_active: true,
            is_initialized: false,
            settings: FilterSettings::default(),
            config_generation: 0,
            last_pass_processed: 0,
            last_pass_blocked: 0,
            passes_completed: 0,
            total_processed: 0,
            total_blocked: 0,
            total_unclassified: 0,
        }
    }
}

impl FilterState {
    pub fn dry_run(&self) -> bool {
        self.settings.dry_run
    }

    pub fn list_mode(&self) -> ListMode {
        self.settings.list_mode()
    }

    /// Fold a finished pass into the counters.
    pub fn record_pass(&mut self, processed: usize, blocked: usize, unclassified: usize) {
        self.passes_completed += 1;
        self.last_pass_processed = processed;
        self.last_pass_blocked = blocked;
        self.total_processed += processed;
        self.total_blocked += blocked;
        self.total_unclassified += unclassified;
    }

    pub fn reset_counters(&mut self) {
        self.passes_completed = 0;
        self.last_pass_processed = 0;
        self.last_pass_blocked = 0;
        self.total_processed = 0;
        self.total_blocked = 0;
        self.total_unclassified = 0;
    }
}
