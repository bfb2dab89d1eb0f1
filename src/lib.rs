// YtLens - Rule-based filtering for streams of video cards
//
// This is the library crate containing the filtering core and its host
// contracts. The binary crate (main.rs) is an offline rule tester.

pub mod config;
pub mod host;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{ConfigStore, MemoryConfigStore, StorageError, YamlConfigStore};
pub use host::{Extractor, Highlight, HostBridge, MenuHost, Presenter};
pub use models::{ContentItem, FilterSettings, HostRef, RuleSet, RuleSpec, Verdict};
pub use services::{Orchestrator, classify};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
