//! Services module - Filtering logic, independent of any particular host page.
//!
//! # Components
//!
//! - [`classifier`]: pure blacklist/whitelist decision ([`classify`])
//! - [`scheduler`]: [`ChangeScheduler`], the debounce/batch state machine
//!   that turns change notifications into pass triggers
//! - [`menu_patterns`]: localized labels for the menu actions, resolved into
//!   [`ActionPatterns`]
//! - [`dry_run_cache`]: weak memo table of dry-run menu outcomes
//! - [`interaction`]: [`InteractionController`], the open/search/act/close
//!   protocol for an item's contextual menu
//! - [`orchestrator`]: [`Orchestrator`], which runs passes over unprocessed
//!   items and applies the badge lane, verdicts, and presentation effects
//!
//! Only the orchestrator talks to configuration storage. Host access goes
//! through the traits in [`crate::host`].
//!
//! # Usage Example
//!
//! ```ignore
//! use ytlens::services::{Collaborators, Orchestrator};
//!
//! let orchestrator = Orchestrator::new(
//!     Collaborators { extractor, presenter, menu },
//!     Arc::new(YamlConfigStore::new("YtLens Data")?),
//! );
//! orchestrator.initialize().await;
//! orchestrator.run_pass().await;
//! ```

pub mod classifier;
pub mod dry_run_cache;
pub mod interaction;
pub mod menu_patterns;
pub mod orchestrator;
pub mod scheduler;

pub use classifier::{classify, match_field, match_rule};
pub use dry_run_cache::DryRunCache;
pub use interaction::{
    InteractionConfig, InteractionController, MenuInteractionResult, MenuState,
};
pub use menu_patterns::ActionPatterns;
pub use orchestrator::{
    Collaborators, ControlMessage, ControlResponse, Orchestrator, PassOutcome, PassSummary,
    StatusReport,
};
pub use scheduler::{ChangeScheduler, SchedulerConfig, SchedulerState, Trigger};
