//! Provides a size constrained LRU Cache which is safe to be used by many threads at once.
//!
//! An LRU cache drops the least recently used entry if it is about to grow beyond its capacity.
//! The intended use case is a lookup table like a name to address resolver, which is queried
//! way more often than it is updated, by a lot of threads in parallel.
//!
//! Therefore the cache is split into two parts. The entries themselves are kept in a sharded,
//! concurrent index so that readers and writers of different keys hardly ever contend. The
//! usage order is maintained by a doubly linked list, which is guarded by a single lock. As this
//! lock is only held for a couple of link updates and as readers never wait for it, the list
//! doesn't turn into a bottleneck.
//!
//! The [cache](cache) module provides access to a process wide instance as well as a way to
//! install a cache into a [Platform](crate::platform::Platform), based on the system config.
pub mod cache;
mod index;
mod lru_cache;
mod recency;

pub use lru_cache::LRUCache;
