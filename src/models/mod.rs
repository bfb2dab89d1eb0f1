//! Data models for YtLens.
//!
//! - [`ContentItem`] / [`HostRef`]: what the host hands us for each card on the page
//! - [`RuleSpec`] / [`CompiledRule`] / [`RuleSet`]: stored and compiled rule lists
//! - [`Verdict`]: outcome of classifying one item
//! - [`FilterSettings`]: every user option with its documented default
//! - [`FilterState`]: runtime state held by [`StateManager`](crate::state::StateManager)
//!
//! Stored types derive `Serialize`/`Deserialize` and use the camelCase
//! storage keys. Compiled types are immutable and rebuilt on configuration reload.

pub mod filter_state;
pub mod item;
pub mod rule;
pub mod settings;
pub mod verdict;

pub use filter_state::FilterState;
pub use item::{ChangeBatch, ContentItem, HostRef, WeakHostRef};
pub use rule::{CompiledRule, ListKind, ListMode, PatternError, RuleSet, RuleSpec};
pub use settings::{FilterSettings, SynchronizedVideoAction};
pub use verdict::{MatchDetail, MatchField, MatchMethod, Verdict, VerdictReason};
