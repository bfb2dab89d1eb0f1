//! Contracts the host page must implement.
//!
//! The core never touches page structure directly. Everything it needs from
//! the page goes through three collaborator traits:
//!
//! - [`Extractor`]: finds new item elements and reads their text
//! - [`Presenter`]: hides or highlights an element
//! - [`MenuHost`]: drives the per-item contextual menu
//!
//! All methods are synchronous and must not block; waiting happens in the
//! core between calls. [`bridge::HostBridge`] feeds host notifications into
//! the scheduler and orchestrator.

pub mod bridge;

use crate::models::{ContentItem, HostRef};
use std::fmt;
use thiserror::Error;

pub use bridge::{HostBridge, HostBridgeHandle, HostEvent};

/// Failure reported by a presentation or menu primitive.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Element is no longer attached: {0:?}")]
    Detached(HostRef),

    #[error("Host operation '{operation}' failed: {message}")]
    Failed { operation: String, message: String },
}

impl HostError {
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// An item's fields could not be read.
#[derive(Debug, Error)]
#[error("Failed to extract item {handle:?}: {message}")]
pub struct ExtractionError {
    pub handle: HostRef,
    pub message: String,
}

impl ExtractionError {
    pub fn new(handle: &HostRef, message: impl Into<String>) -> Self {
        Self {
            handle: handle.clone(),
            message: message.into(),
        }
    }
}

/// Visual marker applied instead of (or alongside) a real action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Highlight {
    BlockedDryRun,
    SynchronizedDryRunHide,
    SynchronizedDryRunNotInterested,
    MenuTargetFound,
    MenuTargetNotFound,
}

impl fmt::Display for Highlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Highlight::BlockedDryRun => "blocked-dry-run",
            Highlight::SynchronizedDryRunHide => "synchronized-dry-run-hide",
            Highlight::SynchronizedDryRunNotInterested => "synchronized-dry-run-notInterested",
            Highlight::MenuTargetFound => "menu-target-found",
            Highlight::MenuTargetNotFound => "menu-target-not-found",
        };
        f.write_str(name)
    }
}

/// One entry currently shown in an open menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuCandidate {
    /// Visible label text.
    pub text: String,
    pub target: HostRef,
}

impl MenuCandidate {
    pub fn new(text: impl Into<String>, target: HostRef) -> Self {
        Self {
            text: text.into(),
            target,
        }
    }
}

/// Finds and reads item elements.
///
/// Implementations own the "processed" markers: a handle passed to
/// [`mark_processed`](Self::mark_processed) must never be returned again by
/// [`find_unprocessed_items`](Self::find_unprocessed_items).
#[cfg_attr(test, mockall::automock)]
pub trait Extractor: Send + Sync {
    /// Item elements not yet marked, in document order.
    fn find_unprocessed_items(&self) -> Vec<HostRef>;

    fn extract_item(&self, handle: &HostRef) -> Result<ContentItem, ExtractionError>;

    fn mark_processed(&self, handle: &HostRef);

    /// Whether the element carries a "dubbed"/"synchronized" badge.
    ///
    /// Checked before the text fields are read, so a badged element is
    /// handled even when [`extract_item`](Self::extract_item) fails. The
    /// default goes through `extract_item`; hosts that can see the badge on
    /// its own should override it.
    fn has_suppressed_badge(&self, handle: &HostRef) -> bool {
        self.extract_item(handle)
            .map(|item| item.has_suppressed_badge)
            .unwrap_or(false)
    }

    /// True if `node` is an item element or contains one.
    fn contains_item(&self, node: &HostRef) -> bool;
}

#[cfg_attr(test, mockall::automock)]
pub trait Presenter: Send + Sync {
    fn hide(&self, handle: &HostRef) -> Result<(), HostError>;

    fn highlight(&self, handle: &HostRef, variant: Highlight) -> Result<(), HostError>;
}

/// Primitives for the per-item contextual menu.
pub trait MenuHost: Send + Sync {
    /// The element that opens `item`'s menu, if it has one.
    fn menu_trigger(&self, item: &HostRef) -> Option<HostRef>;

    /// Click the trigger; opens the menu if closed, closes it if open.
    fn toggle_menu(&self, trigger: &HostRef) -> Result<(), HostError>;

    /// Menu entries currently present anywhere in the document, in document order.
    fn poll_menu_candidates(&self) -> Result<Vec<MenuCandidate>, HostError>;

    fn invoke_candidate(&self, candidate: &MenuCandidate) -> Result<(), HostError>;

    /// Send an escape-equivalent signal to the document.
    fn dispatch_cancel_signal(&self) -> Result<(), HostError>;

    /// Document language tag such as `de-DE`, used to pick menu labels.
    fn document_language(&self) -> Option<String> {
        None
    }
}
