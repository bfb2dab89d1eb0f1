use crate::models::{HostRef, WeakHostRef};
use std::collections::HashMap;

/// Weak memo table of dry-run menu outcomes, `handle → target found`.
///
/// Entries hold a [`WeakHostRef`], so the table never keeps a host element
/// alive. Dead entries are pruned on insert and can be pruned explicitly.
#[derive(Debug, Default)]
pub struct DryRunCache {
    entries: HashMap<usize, (WeakHostRef, bool)>,
}

impl DryRunCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: &HostRef) -> Option<bool> {
        self.entries
            .get(&handle.addr())
            .filter(|(weak, _)| !weak.is_dead())
            .map(|(_, found)| *found)
    }

    pub fn insert(&mut self, handle: &HostRef, target_found: bool) {
        self.prune();
        self.entries
            .insert(handle.addr(), (handle.downgrade(), target_found));
    }

    /// Drop entries whose element has been released.
    pub fn prune(&mut self) {
        self.entries.retain(|_, (weak, _)| !weak.is_dead());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Live entries.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|(weak, _)| !weak.is_dead())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut cache = DryRunCache::new();
        let a = HostRef::new("a");
        let b = HostRef::new("b");

        cache.insert(&a, true);
        cache.insert(&b, false);

        assert_eq!(cache.get(&a), Some(true));
        assert_eq!(cache.get(&b), Some(false));
        assert_eq!(cache.get(&HostRef::new("a")), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_does_not_keep_handles_alive() {
        let mut cache = DryRunCache::new();
        let handle = HostRef::new("gone soon");
        let weak = handle.downgrade();

        cache.insert(&handle, true);
        drop(handle);

        assert!(weak.is_dead());
        assert!(cache.is_empty());

        cache.prune();
        assert!(cache.entries.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut cache = DryRunCache::new();
        let handle = HostRef::new(());
        cache.insert(&handle, true);
        cache.clear();
        assert_eq!(cache.get(&handle), None);
    }
}
