//! Querier factory and adapter tables
//!
//! Adapter tables are built from configuration: each result kind gets an
//! ordered list of interface names, and the factory turns each name into a
//! querier. Order in configuration is selection priority.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::file::FileQuerier;
use super::rest::RestQuerier;
use super::{INTERFACE_ARCREST, INTERFACE_EMIES_RESOURCEINFO, INTERFACE_EMIR, INTERFACE_FILE};
use crate::config::AdapterSettings;
use crate::core::retrieval::{Discovered, EndpointQuerier, QuerierRegistry};
use crate::domain::entities::{Endpoint, Job, ResourceRecord};
use crate::error::{GridError, Result};

/// Factory trait for creating queriers
pub trait QuerierFactory<T>: Send + Sync {
    fn create_querier(&self, interface: &str) -> Result<Arc<dyn EndpointQuerier<T>>>;

    fn supports_interface(&self, interface: &str) -> bool;

    fn name(&self) -> &str;
}

/// Factory for the adapters shipped with this crate
pub struct BuiltInQuerierFactory;

impl BuiltInQuerierFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BuiltInQuerierFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> QuerierFactory<T> for BuiltInQuerierFactory
where
    T: DeserializeOwned + Discovered + Send + Sync + 'static,
{
    fn create_querier(&self, interface: &str) -> Result<Arc<dyn EndpointQuerier<T>>> {
        debug!("🏭 Creating querier for interface: {}", interface);

        match interface {
            INTERFACE_FILE => {
                info!("📁 Creating file catalog querier");
                Ok(Arc::new(FileQuerier::<T>::new("file")))
            }
            INTERFACE_ARCREST | INTERFACE_EMIR | INTERFACE_EMIES_RESOURCEINFO => {
                info!("🌐 Creating REST querier for {}", interface);
                Ok(Arc::new(RestQuerier::<T>::new(interface, interface)))
            }
            other => {
                warn!("🔧 No built-in querier for interface: {}", other);
                Err(GridError::Unimplemented(format!(
                    "No querier for interface '{}'",
                    other
                )))
            }
        }
    }

    fn supports_interface(&self, interface: &str) -> bool {
        matches!(
            interface,
            INTERFACE_FILE | INTERFACE_ARCREST | INTERFACE_EMIR | INTERFACE_EMIES_RESOURCEINFO
        )
    }

    fn name(&self) -> &str {
        "built-in"
    }
}

/// Builds an ordered querier registry from interface names
pub fn build_registry<T>(
    factory: &dyn QuerierFactory<T>,
    interfaces: &[String],
) -> Result<QuerierRegistry<T>> {
    let mut registry = QuerierRegistry::new();
    for interface in interfaces {
        if !factory.supports_interface(interface) {
            return Err(GridError::ConfigError(format!(
                "Factory '{}' cannot create a querier for '{}'",
                factory.name(),
                interface
            )));
        }
        registry.register(factory.create_querier(interface)?);
    }
    Ok(registry)
}

/// Querier registries for every result kind
#[derive(Clone)]
pub struct AdapterTable {
    pub registry: Arc<QuerierRegistry<Endpoint>>,
    pub info: Arc<QuerierRegistry<ResourceRecord>>,
    pub job_list: Arc<QuerierRegistry<Job>>,
}

impl AdapterTable {
    pub fn from_settings(settings: &AdapterSettings) -> Result<Self> {
        let factory = BuiltInQuerierFactory::new();
        let table = Self {
            registry: Arc::new(build_registry::<Endpoint>(&factory, &settings.registry)?),
            info: Arc::new(build_registry::<ResourceRecord>(&factory, &settings.info)?),
            job_list: Arc::new(build_registry::<Job>(&factory, &settings.job_list)?),
        };

        info!(
            registry = ?table.registry.names(),
            info = ?table.info.names(),
            job_list = ?table.job_list.names(),
            "🔌 Adapter table ready"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_build() {
        let table = AdapterTable::from_settings(&AdapterSettings::default()).unwrap();
        assert_eq!(table.registry.names(), vec!["file", INTERFACE_EMIR]);
        assert_eq!(table.info.names(), vec!["file", INTERFACE_ARCREST]);
        assert_eq!(table.job_list.len(), 2);
    }

    #[test]
    fn test_unknown_interface_is_config_error() {
        let settings = AdapterSettings {
            registry: vec!["org.nordugrid.ldapegiis".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            AdapterTable::from_settings(&settings),
            Err(GridError::ConfigError(_))
        ));
    }
}
