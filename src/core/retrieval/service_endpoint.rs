//! Registry traversal and the two leaf retrievers
//!
//! Registries answer with more endpoints. Discovered registries are fed back
//! into the same retriever when traversal is recursive; the status map doubles
//! as the seen-set, so a registry listed by several parents is queried once and
//! cycles in the hierarchy terminate.

use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

use super::registry::QuerierRegistry;
use super::retriever::EntityRetriever;
use super::traits::{QueryOptions, Routing, RoutingPolicy};
use crate::config::UserConfig;
use crate::domain::entities::{Endpoint, Job, ResourceRecord};

#[derive(Debug, Clone, Default)]
pub struct RegistryQueryOptions {
    pub recursive: bool,
    /// Capabilities an endpoint must publish one of to be delivered; empty passes all
    pub capability_filter: Vec<String>,
    /// URL fragments of services that must never be reported
    pub rejected_services: Vec<String>,
}

impl RegistryQueryOptions {
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            ..Default::default()
        }
    }

    pub fn is_rejected(&self, endpoint: &Endpoint) -> bool {
        self.rejected_services
            .iter()
            .any(|rejected| endpoint.url.contains(rejected.as_str()))
    }
}

struct RegistryTraversal {
    options: RegistryQueryOptions,
}

impl RoutingPolicy<Endpoint> for RegistryTraversal {
    fn route(&self, endpoint: &Endpoint) -> Routing {
        if self.options.is_rejected(endpoint) {
            debug!(endpoint = %endpoint, "🚫 Discovered endpoint is rejected");
            return Routing::discard();
        }

        let routing = if self.options.capability_filter.is_empty()
            || endpoint.has_any_capability(&self.options.capability_filter)
        {
            Routing::deliver()
        } else {
            debug!(endpoint = %endpoint, "Discovered endpoint filtered by capability");
            Routing::discard()
        };

        // a registry may carry other roles too, so it is requeued and still delivered
        if self.options.recursive && endpoint.is_registry() {
            routing.with_requeue(endpoint.clone())
        } else {
            routing
        }
    }
}

/// Retriever querying registries for endpoints
#[derive(Clone)]
pub struct ServiceEndpointRetriever {
    retriever: EntityRetriever<Endpoint>,
    registry_options: RegistryQueryOptions,
}

impl ServiceEndpointRetriever {
    pub fn new(
        queriers: Arc<QuerierRegistry<Endpoint>>,
        user_config: UserConfig,
        options: QueryOptions,
        registry_options: RegistryQueryOptions,
    ) -> Self {
        let policy = Arc::new(RegistryTraversal {
            options: registry_options.clone(),
        });
        Self {
            retriever: EntityRetriever::with_policy(
                "ServiceEndpointRetriever",
                queriers,
                user_config,
                options,
                policy,
            ),
            registry_options,
        }
    }

    pub fn registry_options(&self) -> &RegistryQueryOptions {
        &self.registry_options
    }
}

impl Deref for ServiceEndpointRetriever {
    type Target = EntityRetriever<Endpoint>;

    fn deref(&self) -> &Self::Target {
        &self.retriever
    }
}

/// Retriever querying computing-information endpoints for resource records
pub type TargetInformationRetriever = EntityRetriever<ResourceRecord>;

/// Retriever querying computing-information endpoints for job lists
pub type JobListRetriever = EntityRetriever<Job>;

impl TargetInformationRetriever {
    pub fn target_information(
        queriers: Arc<QuerierRegistry<ResourceRecord>>,
        user_config: UserConfig,
        options: QueryOptions,
    ) -> Self {
        Self::new("TargetInformationRetriever", queriers, user_config, options)
    }
}

impl JobListRetriever {
    pub fn job_list(
        queriers: Arc<QuerierRegistry<Job>>,
        user_config: UserConfig,
        options: QueryOptions,
    ) -> Self {
        Self::new("JobListRetriever", queriers, user_config, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::synthetic::SyntheticQuerier;
    use crate::core::retrieval::container::EntityContainer;
    use crate::core::retrieval::QueryState;
    use crate::domain::entities::{capability, CapabilityKind, JobState};

    fn registry(url: &str) -> Endpoint {
        Endpoint::new(url).with_kind(CapabilityKind::Registry)
    }

    fn computing(url: &str) -> Endpoint {
        Endpoint::new(url).with_kind(CapabilityKind::ComputingInfo)
    }

    #[tokio::test]
    async fn test_recursive_traversal_and_rejection() {
        let querier = SyntheticQuerier::new("registry")
            .with_response(
                "https://a.example.org",
                vec![
                    registry("https://b.example.org"),
                    computing("https://c.example.org"),
                    computing("https://bad.example.org"),
                ],
            )
            .with_response(
                "https://b.example.org",
                vec![registry("https://a.example.org"), computing("https://d.example.org")],
            );
        let counter = querier.invocation_counter();
        let retriever = ServiceEndpointRetriever::new(
            Arc::new(QuerierRegistry::new().with_querier(Arc::new(querier))),
            UserConfig::default(),
            QueryOptions::default(),
            RegistryQueryOptions {
                recursive: true,
                capability_filter: Vec::new(),
                rejected_services: vec!["bad.example.org".to_string()],
            },
        );
        let container = Arc::new(EntityContainer::new());
        retriever.add_consumer(container.clone()).await;

        retriever.add_endpoint(registry("https://a.example.org")).await;
        retriever.wait().await;

        let mut urls: Vec<String> = container.items().await.into_iter().map(|e| e.url).collect();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "https://a.example.org",
                "https://b.example.org",
                "https://c.example.org",
                "https://d.example.org"
            ]
        );
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(
            retriever.get_status_of_endpoint(&registry("https://b.example.org")).await,
            QueryState::Successful
        );
    }

    #[tokio::test]
    async fn test_registry_with_computing_role_is_requeued_and_delivered() {
        let dual = registry("https://dual.example.org").with_capability(capability::COMPUTINGINFO);
        let querier = SyntheticQuerier::new("registry")
            .with_response("https://a.example.org", vec![dual.clone()])
            .with_response("https://dual.example.org", Vec::new());
        let counter = querier.invocation_counter();
        let retriever = ServiceEndpointRetriever::new(
            Arc::new(QuerierRegistry::new().with_querier(Arc::new(querier))),
            UserConfig::default(),
            QueryOptions::default(),
            RegistryQueryOptions {
                recursive: true,
                capability_filter: vec![capability::COMPUTINGINFO.to_string()],
                rejected_services: Vec::new(),
            },
        );
        let container = Arc::new(EntityContainer::new());
        retriever.add_consumer(container.clone()).await;

        retriever.add_endpoint(registry("https://a.example.org")).await;
        retriever.wait().await;

        assert_eq!(container.items().await, vec![dual.clone()]);
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(
            retriever.get_status_of_endpoint(&dual).await,
            QueryState::Successful
        );
    }

    #[tokio::test]
    async fn test_non_recursive_delivers_registries_through_filter() {
        let querier = SyntheticQuerier::new("registry").with_response(
            "https://a.example.org",
            vec![registry("https://b.example.org"), computing("https://c.example.org")],
        );
        let retriever = ServiceEndpointRetriever::new(
            Arc::new(QuerierRegistry::new().with_querier(Arc::new(querier))),
            UserConfig::default(),
            QueryOptions::default(),
            RegistryQueryOptions {
                recursive: false,
                capability_filter: vec![capability::REGISTRY.to_string()],
                rejected_services: Vec::new(),
            },
        );
        let container = Arc::new(EntityContainer::new());
        retriever.add_consumer(container.clone()).await;

        retriever.add_endpoint(registry("https://a.example.org")).await;
        retriever.wait().await;

        let items = container.items().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://b.example.org");
        assert_eq!(
            retriever.get_status_of_endpoint(&registry("https://b.example.org")).await,
            QueryState::Unknown
        );
    }

    #[tokio::test]
    async fn test_job_list_retriever() {
        let querier = SyntheticQuerier::new("jobs").with_response(
            "https://ce.example.org/arex",
            vec![
                Job::new("job-1").with_state(JobState::Running),
                Job::new("job-2").with_state(JobState::Finished),
            ],
        );
        let retriever = JobListRetriever::job_list(
            Arc::new(QuerierRegistry::new().with_querier(Arc::new(querier))),
            UserConfig::default(),
            QueryOptions::default(),
        );
        let container = Arc::new(EntityContainer::new());
        retriever.add_consumer(container.clone()).await;

        retriever.add_endpoint(computing("https://ce.example.org/arex")).await;
        retriever.wait().await;

        let jobs = container.items().await;
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, "job-1");
        assert!(jobs[1].state.is_finished());
    }
}
