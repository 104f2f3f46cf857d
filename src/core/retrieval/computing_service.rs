//! Unified discovery entry point
//!
//! Routes each seed endpoint by capability: registries to the registry
//! retriever, computing-information endpoints to the information retriever,
//! and endpoints of unknown role to both. Endpoints discovered in registries
//! flow one way, from the registry retriever into the information retriever,
//! so neither retriever references the composite.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::registry::QuerierRegistry;
use super::service_endpoint::{
    RegistryQueryOptions, ServiceEndpointRetriever, TargetInformationRetriever,
};
use super::status::QueryStatus;
use super::traits::{EntityConsumer, QueryOptions};
use super::uniq::ComputingServiceUniq;
use crate::config::{DiscoverySettings, UserConfig};
use crate::domain::entities::{Endpoint, ExecutionTarget, ResourceRecord};

#[derive(Debug, Clone)]
pub struct ComputingServiceOptions {
    /// Follow registries found in registries
    pub recursive: bool,
    pub rejected_discovery_urls: Vec<String>,
    pub capability_filter: Vec<String>,
    pub preferred_interfaces: Vec<String>,
    pub report_no_info_returned: bool,
    pub max_concurrent_queries: Option<usize>,
}

impl Default for ComputingServiceOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            rejected_discovery_urls: Vec::new(),
            capability_filter: Vec::new(),
            preferred_interfaces: Vec::new(),
            report_no_info_returned: false,
            max_concurrent_queries: None,
        }
    }
}

impl From<&DiscoverySettings> for ComputingServiceOptions {
    fn from(settings: &DiscoverySettings) -> Self {
        Self {
            recursive: settings.recursive,
            rejected_discovery_urls: settings.rejected_discovery_urls.clone(),
            capability_filter: settings.capability_filter.clone(),
            preferred_interfaces: settings.preferred_interfaces.clone(),
            report_no_info_returned: settings.report_no_info_returned,
            max_concurrent_queries: settings.max_concurrent_queries,
        }
    }
}

/// Forwards endpoints found in registries to the information retriever
struct ComputingInfoRouter {
    info: TargetInformationRetriever,
}

#[async_trait]
impl EntityConsumer<Endpoint> for ComputingInfoRouter {
    async fn add_entity(&self, endpoint: Endpoint) {
        if endpoint.is_computing_info() || endpoint.capability_unspecified() {
            self.info.add_endpoint(endpoint).await;
        } else {
            debug!(endpoint = %endpoint, "Discovered endpoint has no computing information role");
        }
    }
}

pub struct ComputingServiceRetriever {
    registry: ServiceEndpointRetriever,
    info: TargetInformationRetriever,
    catalog: Arc<ComputingServiceUniq>,
    rejected_discovery_urls: Vec<String>,
}

impl ComputingServiceRetriever {
    pub async fn new(
        registry_queriers: Arc<QuerierRegistry<Endpoint>>,
        info_queriers: Arc<QuerierRegistry<ResourceRecord>>,
        user_config: UserConfig,
        options: ComputingServiceOptions,
    ) -> Self {
        let query_options = QueryOptions {
            preferred_interfaces: options.preferred_interfaces.clone(),
            report_no_info_returned: options.report_no_info_returned,
            max_concurrent_queries: options.max_concurrent_queries,
        };

        let registry = ServiceEndpointRetriever::new(
            registry_queriers,
            user_config.clone(),
            query_options.clone(),
            RegistryQueryOptions {
                recursive: options.recursive,
                capability_filter: options.capability_filter.clone(),
                rejected_services: options.rejected_discovery_urls.clone(),
            },
        );
        let info =
            TargetInformationRetriever::target_information(info_queriers, user_config, query_options);

        registry
            .add_consumer(Arc::new(ComputingInfoRouter { info: info.clone() }))
            .await;

        let catalog = Arc::new(ComputingServiceUniq::new());
        info.add_consumer(catalog.clone()).await;

        Self {
            registry,
            info,
            catalog,
            rejected_discovery_urls: options.rejected_discovery_urls,
        }
    }

    pub async fn add_endpoint(&self, endpoint: Endpoint) {
        if self
            .rejected_discovery_urls
            .iter()
            .any(|rejected| endpoint.url.contains(rejected.as_str()))
        {
            warn!(endpoint = %endpoint, "🚫 Endpoint is rejected, not querying");
            return;
        }

        let unspecified = endpoint.capability_unspecified();
        let to_registry = unspecified || endpoint.is_registry();
        let to_info = unspecified || endpoint.is_computing_info();

        if !to_registry && !to_info {
            debug!(endpoint = %endpoint, "Endpoint is neither registry nor computing information, ignoring");
            return;
        }
        if to_registry {
            self.registry.add_endpoint(endpoint.clone()).await;
        }
        if to_info {
            self.info.add_endpoint(endpoint).await;
        }
    }

    pub async fn add_endpoints(&self, endpoints: impl IntoIterator<Item = Endpoint>) {
        for endpoint in endpoints {
            self.add_endpoint(endpoint).await;
        }
    }

    pub async fn add_consumer(&self, consumer: Arc<dyn EntityConsumer<ResourceRecord>>) {
        self.info.add_consumer(consumer).await;
    }

    pub async fn remove_consumer(&self, consumer: &Arc<dyn EntityConsumer<ResourceRecord>>) -> bool {
        self.info.remove_consumer(consumer).await
    }

    /// Waits for registry traversal, then for every information query it spawned
    pub async fn wait(&self) {
        self.registry.wait().await;
        self.info.wait().await;
        info!(
            services = self.catalog.len().await,
            "🏁 Computing service discovery finished"
        );
    }

    pub fn is_done(&self) -> bool {
        self.registry.is_done() && self.info.is_done()
    }

    /// Statuses of both retrievers, registry endpoints first
    pub async fn all_statuses(&self) -> Vec<(Endpoint, QueryStatus)> {
        let mut statuses = self.registry.all_statuses().await;
        statuses.extend(self.info.all_statuses().await);
        statuses
    }

    /// Deduplicated catalog collected so far
    pub async fn services(&self) -> Vec<ResourceRecord> {
        self.catalog.services().await
    }

    pub async fn execution_targets(&self, requested_interfaces: &[String]) -> Vec<ExecutionTarget> {
        ExecutionTarget::from_catalog(&self.services().await, requested_interfaces)
    }

    pub fn registry_retriever(&self) -> &ServiceEndpointRetriever {
        &self.registry
    }

    pub fn info_retriever(&self) -> &TargetInformationRetriever {
        &self.info
    }
}
