//! Contains the system configuration.
//!
//! Provides access to the system configuration which is loaded from the **config/settings.yml**
//! file. The config can be re-loaded at any time (e.g. by calling [Config::load](Config::load)
//! again). Readers are never blocked by this, as each call to [Config::current](Config::current)
//! simply returns a handle to the currently active snapshot.
//!
//! Note that a handle should not be stored or kept around for long, as it will not be updated
//! once a new config has been loaded.
//!
//! # Examples
//!
//! ```
//! # use lru_resolver::config::Config;
//! let config = Config::new("somefile.yml");
//! config.load_from_string("
//! cache:
//!     capacity: 4096
//! ", None).unwrap();
//!
//! assert_eq!(config.current().query("cache.capacity").as_i64().unwrap(), 4096);
//! assert_eq!(config.current().query("cache.unknown").is_badvalue(), true);
//! ```
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Context;
use arc_swap::ArcSwap;
use yaml_rust::{Yaml, YamlLoader};

use crate::platform::Platform;

/// Contains the path of the config file which is loaded by [install](install).
pub const SETTINGS_FILE: &str = "config/settings.yml";

/// Provides access to the system configuration.
pub struct Config {
    filename: String,
    config: ArcSwap<(Yaml, Option<SystemTime>)>,
}

/// Represents a handle to the currently loaded configuration.
pub struct Handle {
    config: Arc<(Yaml, Option<SystemTime>)>,
}

impl Config {
    /// Creates a new (empty) config which will read the given file once
    /// [load](Config::load) is invoked.
    pub fn new(file: &str) -> Self {
        Config {
            filename: file.to_owned(),
            config: ArcSwap::new(Arc::new((Yaml::Hash(Default::default()), None))),
        }
    }

    /// Obtains a handle to the currently loaded configuration.
    pub fn current(&self) -> Handle {
        Handle {
            config: self.config.load_full(),
        }
    }

    /// Returns the timestamp of the file which was loaded last (if known).
    pub fn last_loaded(&self) -> Option<SystemTime> {
        self.config.load().1
    }

    /// Reads the underlying file.
    ///
    /// If the file doesn't exist, the current config is kept as is. If the file cannot be
    /// read or parsed, an error is returned and the current config also remains active.
    pub fn load(&self) -> anyhow::Result<()> {
        let metadata = match std::fs::metadata(&self.filename) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                log::info!(
                    "Config file {} doesn't exist - skipping config load.",
                    &self.filename
                );
                return Ok(());
            }
        };

        log::info!("Loading config file {}...", &self.filename);
        let data = std::fs::read_to_string(&self.filename)
            .with_context(|| format!("Cannot load config file {}", &self.filename))?;

        self.load_from_string(data.as_str(), metadata.modified().ok())
    }

    /// Loads a configuration from the given string instead of a file.
    ///
    /// This is intended to be used in test environments where we cannot / do not want to load
    /// a config file from disk.
    ///
    /// # Example
    ///
    /// ```
    /// # use lru_resolver::config::Config;
    /// let config = Config::new("somefile.yml");
    /// config.load_from_string("cache: { capacity: 128 }", None).unwrap();
    /// assert_eq!(config.current().query("cache.capacity").as_i64().unwrap(), 128);
    ///
    /// // An invalid config is rejected and the previous one remains active...
    /// assert_eq!(config.load_from_string("cache: 'invalid", None).is_err(), true);
    /// assert_eq!(config.current().query("cache.capacity").as_i64().unwrap(), 128);
    /// ```
    pub fn load_from_string(
        &self,
        data: &str,
        last_modified: Option<SystemTime>,
    ) -> anyhow::Result<()> {
        let mut docs = YamlLoader::load_from_str(data)
            .with_context(|| format!("Cannot parse config file {}", &self.filename))?;

        let doc = match docs.drain(..).next() {
            Some(doc @ Yaml::Hash(_)) => doc,
            _ => Yaml::Hash(Default::default()),
        };

        self.config.store(Arc::new((doc, last_modified)));

        Ok(())
    }
}

impl Handle {
    /// Provides access to the root of the currently loaded configuration.
    pub fn root(&self) -> &Yaml {
        &self.config.0
    }

    /// Resolves a dotted path like **cache.capacity** within the currently loaded
    /// configuration.
    ///
    /// Returns **Yaml::BadValue** if any part of the path is missing.
    pub fn query(&self, path: impl AsRef<str>) -> &Yaml {
        path.as_ref()
            .split('.')
            .fold(self.root(), |node, key| &node[key])
    }
}

/// Creates and installs a **Config** for the given platform.
///
/// This reads its contents from **config/settings.yml** (if present). Note that this is also
/// called by the [Builder](crate::builder::Builder) unless the config is disabled.
pub fn install(platform: &Arc<Platform>) -> Arc<Config> {
    if let Some(parent) = Path::new(SETTINGS_FILE).parent() {
        if let Err(error) = std::fs::create_dir_all(parent) {
            log::warn!(
                "Failed to create config base directory {}: {}",
                parent.to_string_lossy(),
                error
            )
        }
    }

    let config = Arc::new(Config::new(SETTINGS_FILE));
    platform.register::<Config>(config.clone());

    if let Err(error) = config.load() {
        log::error!("{:#}", error);
    }

    config
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use std::time::SystemTime;

    #[test]
    fn nested_values_can_be_queried() {
        let config = Config::new("test.yml");
        config
            .load_from_string(
                "cache:\n    capacity: 42\n    name: resolver\nlist:\n    - a\n",
                None,
            )
            .unwrap();

        let handle = config.current();
        assert_eq!(handle.query("cache.capacity").as_i64().unwrap(), 42);
        assert_eq!(handle.query("cache.name").as_str().unwrap(), "resolver");
        assert_eq!(handle.query("cache.capacity.deeper").is_badvalue(), true);
        assert_eq!(handle.query("unknown.path").is_badvalue(), true);
    }

    #[test]
    fn ensure_config_update_works() {
        let config = Config::new("test.yml");
        let now = SystemTime::now();
        config.load_from_string("test: 42", Some(now)).unwrap();
        assert_eq!(config.last_loaded(), Some(now));

        // Keep a handle to the initial config...
        let initial = config.current();

        // Ensure that a malformed config is simply ignored...
        assert_eq!(config.load_from_string("test: 'invalid", None).is_err(), true);
        assert_eq!(config.current().query("test").as_i64().unwrap(), 42);

        // Change the config...
        config.load_from_string("test: 4242", None).unwrap();
        assert_eq!(config.current().query("test").as_i64().unwrap(), 4242);

        // A previously obtained handle still points to the old snapshot...
        assert_eq!(initial.query("test").as_i64().unwrap(), 42);
    }

    #[test]
    fn a_non_mapping_document_yields_an_empty_config() {
        let config = Config::new("test.yml");
        config.load_from_string("- just\n- a list\n", None).unwrap();
        assert_eq!(config.current().query("test").is_badvalue(), true);

        config.load_from_string("", None).unwrap();
        assert_eq!(config.current().query("test").is_badvalue(), true);
    }

    #[test]
    fn a_missing_file_is_not_an_error() {
        let config = Config::new("this/file/does/not/exist.yml");
        assert_eq!(config.load().is_ok(), true);
        assert_eq!(config.last_loaded(), None);
    }
}
