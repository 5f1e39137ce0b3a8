//! Provides shared access to a string cache.
//!
//! There are two ways of obtaining a cache. [get_cache](get_cache) returns a process wide
//! instance which lives until the process exits. [install](install) creates a cache within a
//! [Platform](crate::platform::Platform) which then owns the instance and drops it once the
//! platform is terminated. Both are initialized exactly once - the first caller determines the
//! capacity.
//!
//! # Configuration
//! When installing a cache into a platform, its capacity is read from the system config:
//!
//! ```yaml
//! cache:
//!     # Specifies the maximal number of entries to store
//!     capacity: 1024
//! ```
use std::sync::{Arc, OnceLock};

use crate::config::Config;
use crate::lru::LRUCache;
use crate::platform::Platform;

/// We operate on caches which store plain Strings (e.g. the address for a host name).
pub type StringCache = LRUCache<String>;

/// Contains the capacity to use if none is configured.
pub const DEFAULT_CAPACITY: usize = 1024;

static GLOBAL_CACHE: OnceLock<StringCache> = OnceLock::new();

/// Obtains the process wide cache.
///
/// The cache is created by the first call using the given capacity. All subsequent calls
/// return this very instance and ignore the given capacity.
///
/// # Errors
/// Fails if the cache has not been created yet and the given capacity is 0.
///
/// # Examples
/// ```
/// # use lru_resolver::lru::cache::get_cache;
/// let cache = get_cache(100).unwrap();
///
/// assert_eq!(cache.resolve("msk"), None);
/// cache.update("msk".to_owned(), "127.0.0.1".to_owned());
/// assert_eq!(cache.resolve("msk").unwrap(), "127.0.0.1");
///
/// // The first caller wins...
/// assert_eq!(get_cache(5).unwrap().capacity(), 100);
/// ```
pub fn get_cache(capacity: usize) -> anyhow::Result<&'static StringCache> {
    let cache = match GLOBAL_CACHE.get() {
        Some(cache) => cache,
        None => {
            // If several first callers race, each builds a cache but only one is kept. The
            // others are simply dropped...
            let cache = LRUCache::new(capacity)?;
            GLOBAL_CACHE.get_or_init(|| {
                log::info!("Creating the global cache with a capacity of {}...", capacity);
                cache
            })
        }
    };

    if cache.capacity() != capacity {
        log::warn!(
            "Ignoring the requested capacity {} as the global cache has already been created with {}.",
            capacity,
            cache.capacity()
        );
    }

    Ok(cache)
}

/// Installs a cache into the given platform.
///
/// The capacity is read from `cache.capacity` of the [Config](Config) (if one is installed).
/// If the platform already has a cache, this instance is returned as is.
///
/// # Examples
/// ```
/// # use lru_resolver::platform::Platform;
/// # use lru_resolver::lru::cache::{install, StringCache, DEFAULT_CAPACITY};
/// let platform = Platform::new();
///
/// let cache = install(&platform).unwrap();
/// assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
///
/// // The cache is now available as a service..
/// cache.update("msk".to_owned(), "127.0.0.1".to_owned());
/// let service = platform.require::<StringCache>();
/// assert_eq!(service.resolve("msk").unwrap(), "127.0.0.1");
/// ```
pub fn install(platform: &Arc<Platform>) -> anyhow::Result<Arc<StringCache>> {
    let capacity = configured_capacity(platform);

    let cache = platform.find_or_register(|| {
        log::info!("Installing a cache with a capacity of {}...", capacity);
        LRUCache::new(capacity).map(Arc::new)
    })?;

    if cache.capacity() != capacity {
        log::warn!(
            "A cache with a capacity of {} is already installed. Ignoring the capacity {}.",
            cache.capacity(),
            capacity
        );
    }

    Ok(cache)
}

/// Determines the capacity to use based on the config of the given platform.
fn configured_capacity(platform: &Arc<Platform>) -> usize {
    let config = match platform.find::<Config>() {
        Some(config) => config,
        None => return DEFAULT_CAPACITY,
    };

    let handle = config.current();
    let value = handle.query("cache.capacity");
    if value.is_badvalue() {
        log::info!(
            "Config does not contain 'cache.capacity'. Using the default of {}.",
            DEFAULT_CAPACITY
        );
        return DEFAULT_CAPACITY;
    }

    match value.as_i64().filter(|capacity| *capacity > 0) {
        Some(capacity) => capacity as usize,
        None => {
            log::error!(
                "Invalid 'cache.capacity' ({:?}). Using the default of {}.",
                value,
                DEFAULT_CAPACITY
            );
            DEFAULT_CAPACITY
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::lru::cache::{get_cache, install, StringCache, DEFAULT_CAPACITY};
    use crate::platform::Platform;
    use std::sync::Arc;

    fn platform_with_config(config: &str) -> Arc<Platform> {
        let platform = Platform::new();
        let settings = Arc::new(Config::new("test_settings.yml"));
        settings.load_from_string(config, None).unwrap();
        platform.register::<Config>(settings);

        platform
    }

    #[test]
    fn the_configured_capacity_is_used() {
        let platform = platform_with_config("cache:\n    capacity: 2\n");
        let cache = install(&platform).unwrap();
        assert_eq!(cache.capacity(), 2);

        cache.update("a".to_owned(), "1".to_owned());
        cache.update("b".to_owned(), "2".to_owned());
        cache.update("c".to_owned(), "3".to_owned());
        assert_eq!(platform.require::<StringCache>().len(), 2);
    }

    #[test]
    fn an_invalid_capacity_falls_back_to_the_default() {
        let platform = platform_with_config("cache:\n    capacity: -5\n");
        assert_eq!(install(&platform).unwrap().capacity(), DEFAULT_CAPACITY);

        let platform = platform_with_config("cache:\n    capacity: lots\n");
        assert_eq!(install(&platform).unwrap().capacity(), DEFAULT_CAPACITY);

        let platform = platform_with_config("server:\n    port: 2410\n");
        assert_eq!(install(&platform).unwrap().capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn a_cache_is_only_installed_once() {
        let platform = platform_with_config("cache:\n    capacity: 16\n");
        let cache = install(&platform).unwrap();
        cache.update("a".to_owned(), "1".to_owned());

        // Changing the config doesn't replace the installed cache...
        platform
            .require::<Config>()
            .load_from_string("cache:\n    capacity: 32\n", None)
            .unwrap();
        let again = install(&platform).unwrap();
        assert_eq!(Arc::ptr_eq(&cache, &again), true);
        assert_eq!(again.capacity(), 16);
        assert_eq!(again.resolve("a").unwrap(), "1");
    }

    // Note that this is the only test which touches the process wide cache...
    #[test]
    fn the_global_cache_is_created_once() {
        let cache = get_cache(3).unwrap();
        cache.update("a".to_owned(), "1".to_owned());

        let again = get_cache(300).unwrap();
        assert_eq!(std::ptr::eq(cache, again), true);
        assert_eq!(again.capacity(), 3);
        assert_eq!(again.resolve("a").unwrap(), "1");

        // Once created, even an invalid capacity is simply ignored...
        assert_eq!(get_cache(0).is_ok(), true);
    }

    #[test]
    fn terminating_the_platform_releases_the_cache() {
        let platform = platform_with_config("cache:\n    capacity: 16\n");
        let cache = install(&platform).unwrap();
        assert_eq!(Arc::strong_count(&cache), 2);

        platform.terminate();
        assert_eq!(Arc::strong_count(&cache), 1);
        assert_eq!(platform.find::<StringCache>().is_none(), true);
    }
}
