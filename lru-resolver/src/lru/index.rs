//! Provides the concurrent index which owns all cached entries.
//!
//! The index is a sharded hash map. Each shard is guarded by its own lock, so that readers and
//! writers of different keys only contend if their keys happen to land in the same shard.
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use fnv::FnvBuildHasher;

use crate::lru::recency::Slot;

/// Represents the state of a single cached key.
///
/// The key itself is kept by the node in the recency list (which needs it to erase an evicted
/// entry), the entry only knows the slot of that node.
pub struct Entry<V> {
    value: V,
    slot: Slot,
}

impl<V> Entry<V> {
    /// Returns the cached value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Returns the slot of the node which represents this entry in the recency list.
    pub fn slot(&self) -> Slot {
        self.slot
    }
}

/// Reports the outcome of [Index::insert_or_update].
#[derive(Debug, PartialEq, Eq)]
pub enum Insertion {
    /// The key was already present and only its value was replaced.
    Updated,
    /// A new entry was created. Its node (with the given slot) is not yet linked.
    Inserted(Slot),
}

/// Maps keys to their entries.
pub struct Index<V> {
    map: DashMap<String, Entry<V>, FnvBuildHasher>,
}

impl<V> Index<V> {
    /// Creates an index which is pre-sized to hold **capacity** entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Index {
            map: DashMap::with_capacity_and_hasher(capacity, FnvBuildHasher::default()),
        }
    }

    /// Probes for the given key and applies the given function on its entry.
    ///
    /// The shard of the key is read-locked while the function runs. Once this returns, the entry
    /// might be evicted at any time.
    pub fn lookup<R>(&self, key: &str, inspector: impl FnOnce(&Entry<V>) -> R) -> Option<R> {
        self.map.get(key).map(|entry| inspector(entry.value()))
    }

    /// Replaces the value of an existing entry or creates a new one.
    ///
    /// If the key is absent, **allocate** is invoked (while the shard is still locked) to obtain
    /// the slot of the new entry. Note that the shard lock is released once this returns, as the
    /// caller might have to evict another key which can reside in the very same shard.
    pub fn insert_or_update(
        &self,
        key: String,
        value: V,
        allocate: impl FnOnce(&str) -> Slot,
    ) -> Insertion {
        match self.map.entry(key) {
            MapEntry::Occupied(mut entry) => {
                entry.get_mut().value = value;
                Insertion::Updated
            }
            MapEntry::Vacant(entry) => {
                let slot = allocate(entry.key().as_str());
                let _ = entry.insert(Entry { value, slot });
                Insertion::Inserted(slot)
            }
        }
    }

    /// Removes the entry for the given key, but only if it is still represented by the given
    /// slot.
    ///
    /// Returns **true** if an entry has been removed.
    pub fn remove(&self, key: &str, slot: Slot) -> bool {
        self.map
            .remove_if(key, |_, entry| entry.slot == slot)
            .is_some()
    }

    /// Returns the number of entries.
    ///
    /// Note that this has to visit (read-lock) each shard.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Determines if there are no entries at all.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
