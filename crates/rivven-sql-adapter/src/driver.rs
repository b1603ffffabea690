//! Driver registry: backend kind → connection factory
//!
//! Bundled drivers are registered according to enabled cargo features.
//! Callers can register factories for any other backend in the
//! supported set.

use std::collections::HashMap;
use std::sync::Arc;

use crate::connection::ConnectionFactory;
use crate::error::{Error, Result};
use crate::scheme::Backend;

/// Registry of connection factories keyed by backend
#[derive(Clone)]
pub struct DriverRegistry {
    factories: HashMap<Backend, Arc<dyn ConnectionFactory>>,
}

impl DriverRegistry {
    /// Registry with no drivers at all
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory under its own backend, replacing any previous one
    pub fn register(&mut self, factory: Arc<dyn ConnectionFactory>) -> &mut Self {
        self.factories.insert(factory.backend(), factory);
        self
    }

    /// Register a factory under an explicit backend
    ///
    /// Lets one driver serve several scheme aliases (`mysql` / `mysql2`).
    pub fn register_as(
        &mut self,
        backend: Backend,
        factory: Arc<dyn ConnectionFactory>,
    ) -> &mut Self {
        self.factories.insert(backend, factory);
        self
    }

    /// Factory for a backend
    pub fn factory(&self, backend: Backend) -> Result<Arc<dyn ConnectionFactory>> {
        self.factories
            .get(&backend)
            .cloned()
            .ok_or(Error::DriverNotAvailable { backend })
    }

    /// Whether a driver is available for a backend
    pub fn supports(&self, backend: Backend) -> bool {
        self.factories.contains_key(&backend)
    }

    /// Backends with a registered driver, sorted
    pub fn backends(&self) -> Vec<Backend> {
        let mut backends: Vec<_> = self.factories.keys().copied().collect();
        backends.sort();
        backends
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();

        #[cfg(feature = "sqlite")]
        {
            let sqlite: Arc<dyn ConnectionFactory> =
                Arc::new(crate::sqlite::SqliteConnectionFactory);
            registry.register_as(Backend::Sqlite, Arc::clone(&sqlite));
            registry.register_as(Backend::Amalgalite, sqlite);
        }

        #[cfg(feature = "postgres")]
        registry.register(Arc::new(crate::postgres::PgConnectionFactory));

        #[cfg(feature = "mysql")]
        {
            let mysql: Arc<dyn ConnectionFactory> =
                Arc::new(crate::mysql::MySqlConnectionFactory);
            registry.register_as(Backend::MySql, Arc::clone(&mysql));
            registry.register_as(Backend::MySql2, mysql);
        }

        registry
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("backends", &self.backends())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let registry = DriverRegistry::empty();
        assert!(registry.backends().is_empty());
        let err = registry.factory(Backend::Oracle).err().unwrap();
        assert!(matches!(
            err,
            Error::DriverNotAvailable {
                backend: Backend::Oracle
            }
        ));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_default_registers_sqlite() {
        let registry = DriverRegistry::default();
        assert!(registry.supports(Backend::Sqlite));
        assert!(registry.supports(Backend::Amalgalite));
        assert!(!registry.supports(Backend::Firebird));
        assert_eq!(
            registry.factory(Backend::Sqlite).unwrap().backend(),
            Backend::Sqlite
        );
    }
}
