use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::lru::index::{Index, Insertion};
use crate::lru::recency::{RecencyList, Slot};

/// Provides a size constrained LRU cache which can be shared by many threads.
///
/// A cache behaves just like a **Map** as long as there is no shortage in storage. However, once
/// the max number of entries is reached, old (least recently used) entries will be evicted -
/// hence the name LRU cache.
///
/// Internally the cache is made up of two parts. A sharded **index** which stores the actual
/// entries and a **recency list** which keeps all entries ordered by their last access. The
/// index permits many readers and writers to operate in parallel, whereas the recency list
/// is guarded by a single lock which is only held for a handful of pointer updates.
///
/// Note that reads never wait for this lock. If it is contended, the read simply skips moving
/// its entry to the front. Under heavy load, the eviction order is therefore only an
/// approximation of a strict LRU order. Also note that an **update** of an existing key only
/// replaces its value and does not count as "usage".
///
/// The number of entries is tracked by an atomic counter which is corrected after the fact.
/// Therefore, while inserts race against each other, the cache can briefly hold some more
/// entries than permitted (at most one per concurrently inserting thread).
///
/// # Examples
/// ```
/// # use lru_resolver::lru::LRUCache;
/// let lru = LRUCache::new(2).unwrap();
///
/// lru.update("a".to_owned(), "1".to_owned());
/// lru.update("b".to_owned(), "2".to_owned());
///
/// // Using "a" keeps it alive...
/// assert_eq!(lru.resolve("a").unwrap(), "1");
///
/// // ..so that "b" is dropped once the cache overflows.
/// lru.update("c".to_owned(), "3".to_owned());
/// assert_eq!(lru.resolve("b"), None);
/// assert_eq!(lru.resolve("a").unwrap(), "1");
/// assert_eq!(lru.resolve("c").unwrap(), "3");
/// ```
pub struct LRUCache<V> {
    capacity: usize,
    size: AtomicUsize,
    index: Index<V>,
    recency: Mutex<RecencyList>,
    reads: AtomicUsize,
    hits: AtomicUsize,
    writes: AtomicUsize,
    evictions: AtomicUsize,
    skipped_promotions: AtomicUsize,
}

impl<V: Clone> LRUCache<V> {
    /// Creates a new cache which can store up to **capacity** entries.
    ///
    /// # Errors
    /// Fails if a capacity of 0 is given.
    ///
    /// # Examples
    /// ```
    /// # use lru_resolver::lru::LRUCache;
    /// let lru: LRUCache<String> = LRUCache::new(128).unwrap();
    /// assert_eq!(lru.capacity(), 128);
    ///
    /// assert_eq!(LRUCache::<String>::new(0).is_err(), true);
    /// ```
    pub fn new(capacity: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(capacity > 0, "The capacity of a LRU cache must be positive!");

        Ok(LRUCache {
            capacity,
            size: AtomicUsize::new(0),
            index: Index::with_capacity(capacity),
            recency: Mutex::new(RecencyList::with_capacity(capacity)),
            reads: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            evictions: AtomicUsize::new(0),
            skipped_promotions: AtomicUsize::new(0),
        })
    }

    /// Returns the value which has previously been stored for the given key or **None** if
    /// no value is present.
    ///
    /// A hit marks the entry as most recently used, unless another thread currently holds the
    /// lock of the recency list. In this case the entry remains where it is.
    ///
    /// # Examples
    /// ```
    /// # use lru_resolver::lru::LRUCache;
    /// let lru = LRUCache::new(128).unwrap();
    ///
    /// // A miss doesn't alter the cache in any way...
    /// assert_eq!(lru.resolve("msk"), None);
    /// assert_eq!(lru.len(), 0);
    ///
    /// // After inserting a value...
    /// lru.update("msk".to_owned(), "127.0.0.1".to_owned());
    /// // ..it can be retrieved.
    /// assert_eq!(lru.resolve("msk").unwrap(), "127.0.0.1");
    /// ```
    pub fn resolve(&self, key: &str) -> Option<V> {
        let _ = self.reads.fetch_add(1, Ordering::Relaxed);

        // We promote while still holding the shard lock of the entry. This guarantees, that the
        // entry (and therefore its slot) cannot be evicted and re-used in the meantime...
        let value = self.index.lookup(key, |entry| {
            self.promote(entry.slot());
            entry.value().clone()
        })?;

        let _ = self.hits.fetch_add(1, Ordering::Relaxed);
        Some(value)
    }

    fn promote(&self, slot: Slot) {
        match self.recency.try_lock() {
            Some(mut recency) => {
                let _ = recency.promote(slot);
            }
            None => {
                let _ = self.skipped_promotions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Stores the given value for the given key.
    ///
    /// If the key is already present, only its value is replaced. Note that this doesn't
    /// change the position of the entry in the recency order. Otherwise a new entry is created,
    /// which might require to evict the least recently used one.
    ///
    /// # Examples
    /// ```
    /// # use lru_resolver::lru::LRUCache;
    /// let lru = LRUCache::new(128).unwrap();
    ///
    /// lru.update("msk".to_owned(), "127.0.0.1".to_owned());
    /// lru.update("msk".to_owned(), "10.0.0.1".to_owned());
    /// assert_eq!(lru.resolve("msk").unwrap(), "10.0.0.1");
    /// assert_eq!(lru.len(), 1);
    /// ```
    pub fn update(&self, key: String, value: V) {
        let _ = self.writes.fetch_add(1, Ordering::Relaxed);

        let slot = match self
            .index
            .insert_or_update(key, value, |key| self.recency.lock().allocate(key))
        {
            Insertion::Updated => return,
            Insertion::Inserted(slot) => slot,
        };

        // The cache is (or at least seems to be) full. We make room before linking the new
        // node, so that it can never be picked as victim by ourselves. As we swap one entry for
        // another, the size remains unchanged...
        let exchanged = self.size.load(Ordering::Acquire) >= self.capacity && self.evict_one();

        self.recency.lock().push_front(slot);

        if !exchanged {
            self.count_insertion();
        }
    }

    /// Increments the size and performs a corrective eviction if the capacity was exceeded.
    ///
    /// Several threads might see a non-full cache at once and all insert a new entry. Each of
    /// them keeps trying to decrement the counter as long as it exceeds the capacity. Whoever
    /// succeeds is in charge of evicting one entry, so that each unit of overshoot is
    /// corrected exactly once.
    fn count_insertion(&self) {
        let mut size = self.size.fetch_add(1, Ordering::AcqRel) + 1;
        while size > self.capacity {
            match self
                .size
                .compare_exchange(size, size - 1, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) if self.evict_one() => return,
                Ok(_) => {
                    // All entries are currently in transition (being linked or evicted by other
                    // threads). We take the overshoot back and retry once they made progress...
                    log::debug!("No victim available for a corrective eviction. Retrying...");
                    std::thread::yield_now();
                    size = self.size.fetch_add(1, Ordering::AcqRel) + 1;
                }
                Err(current) => size = current,
            }
        }
    }

    /// Evicts the least recently used entry.
    ///
    /// Returns **false** if there is no entry which could be evicted.
    fn evict_one(&self) -> bool {
        // Once unlinked, the node can no longer be picked by another eviction, even if the
        // entry remains visible in the index for a moment...
        let (slot, key) = {
            let mut recency = self.recency.lock();
            let slot = match recency.victim() {
                Some(slot) => slot,
                None => return false,
            };
            recency.unlink(slot);
            (slot, recency.take_key(slot))
        };

        log::trace!("Evicting '{}'...", key);

        if self.index.remove(&key, slot) {
            self.recency.lock().release(slot);
        } else {
            log::error!(
                "The evicted entry '{}' (slot {}) was not present in the index.",
                key,
                slot
            );
        }

        let _ = self.evictions.fetch_add(1, Ordering::Relaxed);
        true
    }
}

impl<V> LRUCache<V> {
    /// Returns the number of entries in the cache.
    ///
    /// In contrast to [approximate_size](LRUCache::approximate_size) this counts the actual
    /// entries in the index and is therefore a bit more expensive.
    ///
    /// # Examples
    /// ```
    /// # use lru_resolver::lru::LRUCache;
    /// let lru = LRUCache::new(128).unwrap();
    ///
    /// assert_eq!(lru.len(), 0);
    /// lru.update("Foo".to_owned(), "Bar".to_owned());
    /// assert_eq!(lru.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Determines if the cache is completely empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the number of entries as tracked by the internal size counter.
    ///
    /// While inserts are in flight, this might briefly exceed the capacity.
    pub fn approximate_size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Returns the overall capacity (max number of entries) of this cache.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the cache utilization in percent.
    pub fn utilization(&self) -> f32 {
        self.approximate_size() as f32 / self.capacity as f32 * 100.
    }

    /// Returns the cache hit rate in percent.
    pub fn hit_rate(&self) -> f32 {
        match self.reads() {
            0 => 0.,
            n => self.hits() as f32 / n as f32 * 100.,
        }
    }

    /// Returns the total number of reads performed on this cache.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of reads which found a value.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the total number of writes performed on this cache.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the number of entries which have been evicted to make room for new ones.
    pub fn evictions(&self) -> usize {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Returns the number of reads which didn't update the recency order due to lock
    /// contention.
    pub fn skipped_promotions(&self) -> usize {
        self.skipped_promotions.load(Ordering::Relaxed)
    }

    /// Lists all keys, starting with the most recently used one.
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.recency.lock().keys()
    }

    /// Verifies the links of the recency list and returns the number of linked entries.
    ///
    /// Note that this locks the recency list for a full traversal and is therefore intended
    /// for diagnostics and tests only.
    pub fn check_integrity(&self) -> anyhow::Result<usize> {
        self.recency.lock().check_links()
    }

    /// Returns the number of nodes allocated by the recency list (including free ones).
    ///
    /// As nodes of evicted entries are re-used, this settles at **capacity + 1** for serialized
    /// use, as a new node is allocated before the victim's node is released.
    pub fn allocated_nodes(&self) -> usize {
        self.recency.lock().allocated()
    }
}
