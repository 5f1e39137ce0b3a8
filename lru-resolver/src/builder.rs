//! Provides a builder which can be used to setup and initialize the library.
//!
//! This creates a [Platform](crate::platform::Platform) and installs the selected components
//! into it. Failures during the setup are logged and the respective component is skipped, so
//! that a broken config file doesn't prevent an application from starting up.
//!
//! # Example
//! Setting up the library with all features enabled:
//! ```no_run
//! # use lru_resolver::builder::Builder;
//! # use lru_resolver::lru::cache::StringCache;
//! let platform = Builder::new().enable_all().build();
//!
//! let cache = platform.require::<StringCache>();
//! cache.update("msk".to_owned(), "127.0.0.1".to_owned());
//! ```
use std::sync::Arc;

use crate::platform::Platform;
use crate::{init_logging, LRU_RESOLVER_VERSION};

/// Initializes the library by creating and installing the selected components.
#[derive(Default)]
pub struct Builder {
    setup_logging: bool,
    setup_config: bool,
    setup_cache: bool,
}

impl Builder {
    /// Creates a new builder which has all components disabled.
    pub fn new() -> Self {
        Builder {
            setup_logging: false,
            setup_config: false,
            setup_cache: false,
        }
    }

    /// Enables all features.
    pub fn enable_all(mut self) -> Self {
        self.setup_logging = true;
        self.setup_config = true;
        self.setup_cache = true;

        self
    }

    /// Installs a logger which writes to stdout.
    pub fn enable_logging(mut self) -> Self {
        self.setup_logging = true;
        self
    }

    /// Disables logging.
    pub fn disable_logging(mut self) -> Self {
        self.setup_logging = false;
        self
    }

    /// Loads the system config from **config/settings.yml**.
    pub fn enable_config(mut self) -> Self {
        self.setup_config = true;
        self
    }

    /// Disables the config. The cache will then use its default capacity.
    pub fn disable_config(mut self) -> Self {
        self.setup_config = false;
        self
    }

    /// Installs a [StringCache](crate::lru::cache::StringCache) into the platform.
    pub fn enable_cache(mut self) -> Self {
        self.setup_cache = true;
        self
    }

    /// Disables the cache.
    pub fn disable_cache(mut self) -> Self {
        self.setup_cache = false;
        self
    }

    /// Builds the platform and installs all enabled components.
    pub fn build(self) -> Arc<Platform> {
        let platform = Platform::new();

        if self.setup_logging {
            init_logging();
        }

        log::info!("lru-resolver (v {}) is starting up...", LRU_RESOLVER_VERSION);

        if self.setup_config {
            let _ = crate::config::install(&platform);
        }

        if self.setup_cache {
            if let Err(error) = crate::lru::cache::install(&platform) {
                log::error!("Failed to install the cache: {:#}", error);
            }
        }

        platform
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::Builder;
    use crate::config::Config;
    use crate::lru::cache::{StringCache, DEFAULT_CAPACITY};

    #[test]
    fn only_enabled_components_are_installed() {
        let platform = Builder::new().build();
        assert_eq!(platform.find::<StringCache>().is_none(), true);
        assert_eq!(platform.find::<Config>().is_none(), true);

        let platform = Builder::new().enable_all().disable_config().build();
        assert_eq!(platform.find::<Config>().is_none(), true);
        assert_eq!(
            platform.require::<StringCache>().capacity(),
            DEFAULT_CAPACITY
        );
    }
}
