use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_HOST_ID: AtomicU64 = AtomicU64::new(1);

struct HostNode {
    id: u64,
    payload: Box<dyn Any + Send + Sync>,
}

/// Opaque reference to an element owned by the host page.
///
/// The core never looks inside a `HostRef`; it only compares, clones, and
/// hands it back to the host collaborators ([`crate::host::Extractor`],
/// [`crate::host::Presenter`], [`crate::host::MenuHost`]), which can
/// recover their own element type with [`HostRef::payload`].
///
/// Cloning is cheap (`Arc`). Identity is by allocation, not by payload value:
/// two `HostRef::new` calls with equal payloads are different handles.
#[derive(Clone)]
pub struct HostRef(Arc<HostNode>);

impl HostRef {
    /// Wrap a host element.
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        Self(Arc::new(HostNode {
            id: NEXT_HOST_ID.fetch_add(1, Ordering::Relaxed),
            payload: Box::new(payload),
        }))
    }

    /// Process-unique id, for logs.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Borrow the host payload if it has type `T`.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.0.payload.downcast_ref::<T>()
    }

    /// Non-owning reference to the same element.
    pub fn downgrade(&self) -> WeakHostRef {
        WeakHostRef(Arc::downgrade(&self.0))
    }

    /// Address of the shared allocation. Stable for as long as any strong or
    /// weak reference to it exists.
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for HostRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for HostRef {}

impl std::hash::Hash for HostRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostRef(#{})", self.0.id)
    }
}

/// Weak counterpart of [`HostRef`]; does not keep the host element alive.
#[derive(Clone)]
pub struct WeakHostRef(Weak<HostNode>);

impl WeakHostRef {
    /// Recover the strong handle if the element is still alive.
    pub fn upgrade(&self) -> Option<HostRef> {
        self.0.upgrade().map(HostRef)
    }

    /// True once every strong [`HostRef`] has been dropped.
    pub fn is_dead(&self) -> bool {
        self.0.strong_count() == 0
    }
}

impl fmt::Debug for WeakHostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(strong) => write!(f, "WeakHostRef(#{})", strong.id()),
            None => write!(f, "WeakHostRef(<dropped>)"),
        }
    }
}

/// One classifiable unit extracted from the host page for a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub handle: HostRef,
    pub title: String,
    pub channel_name: String,
    pub description: String,

    /// Item carries a "dubbed"/"synchronized" badge (badge override lane).
    pub has_suppressed_badge: bool,
}

impl ContentItem {
    pub fn new(
        handle: HostRef,
        title: impl Into<String>,
        channel_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            title: title.into(),
            channel_name: channel_name.into(),
            description: description.into(),
            has_suppressed_badge: false,
        }
    }

    pub fn with_badge(mut self, has_badge: bool) -> Self {
        self.has_suppressed_badge = has_badge;
        self
    }
}

/// A batch of structural changes reported by the host.
///
/// Only `added` is inspected by the scheduler; `removed` is carried so hosts
/// can forward raw notifications unchanged.
#[derive(Debug, Clone, Default)]
pub struct ChangeBatch {
    pub added: Vec<HostRef>,
    pub removed: Vec<HostRef>,
}

impl ChangeBatch {
    pub fn added(nodes: Vec<HostRef>) -> Self {
        Self {
            added: nodes,
            removed: Vec::new(),
        }
    }

    pub fn removed(nodes: Vec<HostRef>) -> Self {
        Self {
            added: Vec::new(),
            removed: nodes,
        }
    }
}
