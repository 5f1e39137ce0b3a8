//! lru-resolver provides a fixed capacity, thread safe LRU cache for lookup tables like a name
//! to address resolver.
//!
//! # Introduction
//! Many services have to keep a lookup table in memory which is consulted for nearly every
//! request - think of host names which are resolved to IP addresses. Such a table must not grow
//! without bounds and it must not turn into a point of contention once dozens of threads query
//! it at the same time.
//!
//! The [LRUCache](lru::LRUCache) provided here therefore combines a sharded, concurrent index
//! with a doubly linked recency list. Reads and writes of different keys mostly proceed in
//! parallel and reads never wait for the lock of the recency list. Once the cache is full, the
//! least recently used entry is evicted.
//!
//! # Features
//! * **Bounded**: the cache never holds more entries than its capacity once all concurrent
//!   inserts have completed.
//! * **Low latency reads**: a lookup only read-locks one shard of the index. Moving the entry
//!   to the front of the recency list is skipped if the list is currently busy.
//! * **Lock free size accounting**: the number of entries is tracked by an atomic counter which
//!   is corrected after the fact instead of locking on every insert.
//! * **Platform & config**: a cache can be installed into a [Platform](platform::Platform) which
//!   owns it, using the capacity given in the system config (see [config]).
//!
//! # Examples
//! ```
//! # use lru_resolver::lru::LRUCache;
//! let cache = LRUCache::new(100).unwrap();
//!
//! assert_eq!(cache.resolve("msk"), None);
//! cache.update("msk".to_owned(), "127.0.0.1".to_owned());
//! assert_eq!(cache.resolve("msk").unwrap(), "127.0.0.1");
//! ```
//!
//! A process wide instance can be obtained via [get_cache](lru::cache::get_cache) and a fully
//! configured setup is created by the [Builder](builder::Builder).
#![deny(
    warnings,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_results
)]
use simplelog::{format_description, ConfigBuilder, LevelFilter, SimpleLogger};
use std::sync::Once;

pub mod builder;
pub mod config;
pub mod lru;
pub mod platform;

/// Contains the version of the lru-resolver library.
pub const LRU_RESOLVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initializes the logging system.
///
/// Note that most probably the simplest way is to use a [Builder](builder::Builder) to set up the
/// library, which will also set up logging if enabled.
pub fn init_logging() {
    static INIT_LOGGING: Once = Once::new();

    // Tests might invoke this several times, but a logger can only be installed once...
    INIT_LOGGING.call_once(|| {
        if let Err(error) = SimpleLogger::init(
            LevelFilter::Debug,
            ConfigBuilder::new()
                .set_time_format_custom(format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]"
                ))
                .set_thread_level(LevelFilter::Trace)
                .set_target_level(LevelFilter::Error)
                .set_location_level(LevelFilter::Trace)
                .build(),
        ) {
            panic!("Failed to initialize logging system: {}", error);
        }
    });
}
