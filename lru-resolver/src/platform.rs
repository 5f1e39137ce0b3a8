//! Provides a tiny DI like container which owns all long living components of the system.
//!
//! The platform is more or less a simple map which keeps all central components (like the
//! config or the cache) as **Arc<T>** around. Instead of relying on global state, a component
//! can be obtained from the platform it has been installed into. Once the platform is
//! [terminated](Platform::terminate), all components are released.
//!
//! Note that [Platform::find_or_register](Platform::find_or_register) can be used to install a
//! component exactly once, even if several threads race to do so.
//!
//! # Examples
//!
//! ```
//! # use std::sync::Arc;
//! # use lru_resolver::platform::Platform;
//! struct Service {
//!     value : i32
//! }
//!
//! struct UnknownService;
//!
//! let platform = Platform::new();
//!
//! // Registers a new service...
//! platform.register::<Service>(Arc::new(Service { value: 42 }));
//!
//! // Obtains a reference to a previously registered service...
//! let service = platform.require::<Service>();
//! assert_eq!(service.value, 42);
//!
//! // Trying to obtain a service which hasn't been registered yet, returns an empty
//! // optional...
//! assert_eq!(platform.find::<UnknownService>().is_none(), true);
//!
//! // Once terminated...
//! platform.terminate();
//! // All services are immediately released...
//! assert_eq!(platform.find::<Service>().is_none(), true);
//! // and the platform is no longer considered active...
//! assert_eq!(platform.is_running(), false);
//! ```
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Services = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Provides a container to keep all central services in a single place.
pub struct Platform {
    services: Mutex<Services>,
    is_running: AtomicBool,
}

impl Platform {
    /// Creates a new platform instance.
    pub fn new() -> Arc<Self> {
        Arc::new(Platform {
            services: Mutex::new(HashMap::new()),
            is_running: AtomicBool::new(true),
        })
    }

    /// Registers a new component (and replaces the previous one of the same type if present).
    pub fn register<T>(&self, service: Arc<T>)
    where
        T: Any + Send + Sync,
    {
        let _ = self.services.lock().insert(TypeId::of::<T>(), service);
    }

    /// Returns the component of the given type or creates and registers it using the given
    /// factory.
    ///
    /// The registry remains locked while the factory runs. Therefore, even if several threads
    /// call this at once, the factory is invoked at most once per type (unless it fails).
    ///
    /// # Errors
    /// Fails if the component is absent and the factory fails.
    ///
    /// # Examples
    /// ```
    /// # use lru_resolver::platform::Platform;
    /// # use std::sync::Arc;
    /// struct Service {
    ///     value: i32
    /// }
    ///
    /// let platform = Platform::new();
    /// let first = platform.find_or_register(|| Ok(Arc::new(Service { value: 1 }))).unwrap();
    /// let second = platform.find_or_register(|| Ok(Arc::new(Service { value: 2 }))).unwrap();
    ///
    /// assert_eq!(first.value, 1);
    /// assert_eq!(second.value, 1);
    /// ```
    pub fn find_or_register<T, F>(&self, factory: F) -> anyhow::Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> anyhow::Result<Arc<T>>,
    {
        let mut services = self.services.lock();
        if let Some(service) = Self::lookup::<T>(&services) {
            return Ok(service);
        }

        anyhow::ensure!(
            self.is_running(),
            "Cannot register {} as the platform has already been terminated.",
            std::any::type_name::<T>()
        );

        let service = factory()?;
        let _ = services.insert(TypeId::of::<T>(), service.clone());

        Ok(service)
    }

    /// Tries to resolve a previously registered service.
    pub fn find<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        Self::lookup::<T>(&self.services.lock())
    }

    fn lookup<T>(services: &Services) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        services
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.clone().downcast::<T>().ok())
    }

    /// Resolves a previously registered service.
    ///
    /// # Panics
    /// Panics if the requested service isn't available or if the platform has already been
    /// terminated.
    ///
    /// Requiring a service which is unknown will panic:
    /// ```should_panic
    /// # use lru_resolver::platform::Platform;
    /// struct UnknownService;
    ///
    /// let platform = Platform::new();
    ///
    /// // This will panic...
    /// platform.require::<UnknownService>();
    /// ```
    pub fn require<T>(&self) -> Arc<T>
    where
        T: Any + Send + Sync,
    {
        if !self.is_running() {
            panic!(
                "A required component ({}) has been requested but the platform is already terminated!",
                std::any::type_name::<T>()
            );
        }

        match self.find::<T>() {
            Some(service) => service,
            None => panic!(
                "A required component ({}) was not available in the platform registry!",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Determines if the platform is still running or if [Platform::terminate](Platform::terminate)
    /// has already been called.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// Terminates the platform.
    ///
    /// This releases all services so that they are dropped as soon as the last external
    /// reference is gone.
    pub fn terminate(&self) {
        self.is_running.store(false, Ordering::Release);
        self.services.lock().clear();
    }
}
