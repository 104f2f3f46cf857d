//! Generic concurrent retrieval engine
//!
//! An `EntityRetriever` accepts endpoints, queries each through exactly one
//! adapter, exactly once, and pushes the produced items to its consumers.
//!
//! ## Deduplication
//!
//! Endpoints are registered under their URL plus interface; re-adding a
//! registered endpoint is a no-op. Endpoints of the same logical service (same
//! service key) are grouped: while one member of the group is running or has
//! succeeded, new members are parked as `SuspendedNotRequired`. When the
//! running member fails, one parked member is promoted and queried for real.
//!
//! ## Completion
//!
//! A counter of running queries backs `wait()`. It is incremented under the
//! status lock before a query is spawned and decremented after the query's
//! items are delivered and its status recorded, so endpoints discovered while
//! delivering are always accounted for before their parent completes.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock, Semaphore};
use tracing::{debug, info, warn};

use super::registry::QuerierRegistry;
use super::status::{QueryState, QueryStatus};
use super::traits::{DeliverAll, EndpointQuerier, EntityConsumer, QueryOptions, RoutingPolicy};
use crate::config::UserConfig;
use crate::domain::entities::{Endpoint, EndpointKey};

struct EndpointEntry {
    endpoint: Endpoint,
    status: QueryStatus,
    sequence: u64,
}

struct RetrieverInner<T> {
    kind: String,
    queriers: Arc<QuerierRegistry<T>>,
    user_config: UserConfig,
    options: QueryOptions,
    policy: Arc<dyn RoutingPolicy<T>>,
    statuses: RwLock<HashMap<EndpointKey, EndpointEntry>>,
    consumers: RwLock<Vec<Arc<dyn EntityConsumer<T>>>>,
    outstanding: watch::Sender<usize>,
    limiter: Option<Arc<Semaphore>>,
    sequence: AtomicU64,
}

/// Concurrent querying engine over one result kind.
///
/// Cloning yields another handle to the same engine.
pub struct EntityRetriever<T> {
    inner: Arc<RetrieverInner<T>>,
}

impl<T> Clone for EntityRetriever<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> EntityRetriever<T> {
    pub fn new(
        kind: &str,
        queriers: Arc<QuerierRegistry<T>>,
        user_config: UserConfig,
        options: QueryOptions,
    ) -> Self {
        Self::with_policy(kind, queriers, user_config, options, Arc::new(DeliverAll))
    }

    pub fn with_policy(
        kind: &str,
        queriers: Arc<QuerierRegistry<T>>,
        user_config: UserConfig,
        options: QueryOptions,
        policy: Arc<dyn RoutingPolicy<T>>,
    ) -> Self {
        let (outstanding, _) = watch::channel(0usize);
        let limiter = options
            .max_concurrent_queries
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));

        debug!(
            retriever = kind,
            queriers = ?queriers.names(),
            max_concurrent_queries = ?options.max_concurrent_queries,
            "🔧 Created entity retriever"
        );

        Self {
            inner: Arc::new(RetrieverInner {
                kind: kind.to_string(),
                queriers,
                user_config,
                options,
                policy,
                statuses: RwLock::new(HashMap::new()),
                consumers: RwLock::new(Vec::new()),
                outstanding,
                limiter,
                sequence: AtomicU64::new(0),
            }),
        }
    }

    pub fn kind(&self) -> &str {
        &self.inner.kind
    }

    /// Registers an endpoint and starts querying it unless its service is already covered
    pub async fn add_endpoint(&self, endpoint: Endpoint) {
        self.inner.add_endpoint(endpoint).await;
    }

    pub async fn add_consumer(&self, consumer: Arc<dyn EntityConsumer<T>>) {
        self.inner.consumers.write().await.push(consumer);
    }

    pub async fn remove_consumer(&self, consumer: &Arc<dyn EntityConsumer<T>>) -> bool {
        let target = Arc::as_ptr(consumer) as *const ();
        let mut consumers = self.inner.consumers.write().await;
        let before = consumers.len();
        consumers.retain(|c| Arc::as_ptr(c) as *const () != target);
        consumers.len() != before
    }

    /// Blocks until every registered endpoint has reached a terminal status
    pub async fn wait(&self) {
        let mut receiver = self.inner.outstanding.subscribe();
        let _ = receiver.wait_for(|outstanding| *outstanding == 0).await;
    }

    pub fn is_done(&self) -> bool {
        *self.inner.outstanding.borrow() == 0
    }

    /// Current status; `Unknown` for endpoints never added
    pub async fn get_status_of_endpoint(&self, endpoint: &Endpoint) -> QueryStatus {
        self.inner
            .statuses
            .read()
            .await
            .get(&endpoint.status_key())
            .map(|entry| entry.status.clone())
            .unwrap_or_default()
    }

    /// Snapshot of every endpoint and its status, in registration order
    pub async fn all_statuses(&self) -> Vec<(Endpoint, QueryStatus)> {
        let statuses = self.inner.statuses.read().await;
        let mut entries: Vec<&EndpointEntry> = statuses.values().collect();
        entries.sort_by_key(|entry| entry.sequence);
        entries
            .into_iter()
            .map(|entry| (entry.endpoint.clone(), entry.status.clone()))
            .collect()
    }

    pub async fn services_with_status(&self, state: QueryState) -> BTreeSet<String> {
        self.inner
            .statuses
            .read()
            .await
            .values()
            .filter(|entry| entry.status == state)
            .map(|entry| entry.endpoint.service_name())
            .collect()
    }

    /// Forgets every endpoint that is not currently being queried
    pub async fn clear_statuses(&self) {
        self.inner
            .statuses
            .write()
            .await
            .retain(|_, entry| entry.status == QueryState::Started);
    }

    pub async fn remove_endpoint(&self, endpoint: &Endpoint) -> bool {
        self.inner
            .statuses
            .write()
            .await
            .remove(&endpoint.status_key())
            .is_some()
    }
}

impl<T: Clone + Send + Sync + 'static> RetrieverInner<T> {
    async fn add_endpoint(self: &Arc<Self>, endpoint: Endpoint) {
        let key = endpoint.status_key();
        let mut statuses = self.statuses.write().await;

        if statuses.contains_key(&key) {
            debug!(retriever = %self.kind, endpoint = %key, "Endpoint already registered, ignoring");
            return;
        }
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        let querier = match self
            .queriers
            .select(&endpoint, &self.options.preferred_interfaces)
        {
            Some(querier) => querier,
            None => {
                warn!(retriever = %self.kind, endpoint = %endpoint, "🚫 No querier supports endpoint");
                statuses.insert(
                    key,
                    EndpointEntry {
                        endpoint,
                        status: QueryStatus::with_description(
                            QueryState::NoPlugin,
                            "No querier supports this endpoint",
                        ),
                        sequence,
                    },
                );
                return;
            }
        };

        let service = endpoint.service_key();
        let covered = statuses.values().any(|entry| {
            entry.endpoint.service_key() == service
                && matches!(
                    entry.status.state(),
                    QueryState::Started | QueryState::Successful
                )
        });
        if covered {
            debug!(
                retriever = %self.kind,
                endpoint = %endpoint,
                service = %service,
                "⏸️ Service already covered, suspending endpoint"
            );
            statuses.insert(
                key,
                EndpointEntry {
                    endpoint,
                    status: QueryStatus::new(QueryState::SuspendedNotRequired),
                    sequence,
                },
            );
            return;
        }

        statuses.insert(
            key,
            EndpointEntry {
                endpoint: endpoint.clone(),
                status: QueryStatus::new(QueryState::Started),
                sequence,
            },
        );
        self.outstanding.send_modify(|outstanding| *outstanding += 1);
        drop(statuses);

        info!(
            retriever = %self.kind,
            endpoint = %endpoint,
            querier = querier.name(),
            "🚀 Querying endpoint"
        );
        tokio::spawn(Self::run_query(self.clone(), endpoint, querier));
    }

    fn run_query(
        self: Arc<Self>,
        endpoint: Endpoint,
        querier: Arc<dyn EndpointQuerier<T>>,
    ) -> BoxFuture<'static, ()> {
        async move {
            let permit = match &self.limiter {
                Some(limiter) => limiter.clone().acquire_owned().await.ok(),
                None => None,
            };

            let config = self.user_config.clone();
            let options = self.options.clone();
            let queried = endpoint.clone();
            let task =
                tokio::spawn(async move { querier.query(&config, &queried, &options).await });
            let (items, status) = match task.await {
                Ok(outcome) => outcome,
                Err(e) => (
                    Vec::new(),
                    QueryStatus::failed(format!("Query task aborted: {}", e)),
                ),
            };
            drop(permit);

            let status = if status.is_successful()
                && items.is_empty()
                && self.options.report_no_info_returned
            {
                QueryStatus::with_description(QueryState::NoInfoReturned, "Query returned no items")
            } else {
                status
            };

            if status.is_successful() {
                debug!(retriever = %self.kind, endpoint = %endpoint, items = items.len(), "📦 Delivering query results");
                for item in items {
                    self.deliver(item).await;
                }
            }

            self.finish(endpoint, status).await;
        }
        .boxed()
    }

    async fn deliver(self: &Arc<Self>, item: T) {
        let routing = self.policy.route(&item);

        if let Some(endpoint) = routing.requeue {
            debug!(retriever = %self.kind, endpoint = %endpoint, "🔁 Feeding discovered endpoint back");
            self.add_endpoint(endpoint).await;
        }

        if routing.deliver {
            let consumers = self.consumers.read().await.clone();
            for consumer in consumers {
                consumer.add_entity(item.clone()).await;
            }
        }
    }

    async fn finish(self: &Arc<Self>, endpoint: Endpoint, status: QueryStatus) {
        let key = endpoint.status_key();
        let promoted = {
            let mut statuses = self.statuses.write().await;
            match statuses.get_mut(&key) {
                Some(entry) => entry.status = status.clone(),
                None => debug!(retriever = %self.kind, endpoint = %key, "Endpoint removed while in flight"),
            }

            let promoted = if status == QueryState::Failed {
                self.promote_suspended(&mut statuses, &endpoint.service_key())
            } else {
                None
            };
            if promoted.is_some() {
                self.outstanding.send_modify(|outstanding| *outstanding += 1);
            }
            promoted
        };

        if status.is_successful() {
            info!(retriever = %self.kind, endpoint = %endpoint, status = %status, "✅ Endpoint query finished");
        } else {
            warn!(
                retriever = %self.kind,
                endpoint = %endpoint,
                status = %status,
                reason = status.description(),
                "⚠️ Endpoint query finished without results"
            );
        }

        self.outstanding
            .send_modify(|outstanding| *outstanding = outstanding.saturating_sub(1));

        if let Some((endpoint, querier)) = promoted {
            info!(
                retriever = %self.kind,
                endpoint = %endpoint,
                querier = querier.name(),
                "▶️ Promoting suspended endpoint"
            );
            tokio::spawn(Self::run_query(self.clone(), endpoint, querier));
        }
    }

    /// Picks the suspended member of a service group to run next, preferring
    /// preferred interfaces and then registration order.
    fn promote_suspended(
        &self,
        statuses: &mut HashMap<EndpointKey, EndpointEntry>,
        service: &str,
    ) -> Option<(Endpoint, Arc<dyn EndpointQuerier<T>>)> {
        loop {
            let covered = statuses.values().any(|entry| {
                entry.endpoint.service_key() == service
                    && matches!(
                        entry.status.state(),
                        QueryState::Started | QueryState::Successful
                    )
            });
            if covered {
                return None;
            }

            let preferred = &self.options.preferred_interfaces;
            let candidate = statuses
                .values()
                .filter(|entry| {
                    entry.endpoint.service_key() == service
                        && entry.status == QueryState::SuspendedNotRequired
                })
                .min_by_key(|entry| {
                    (
                        !preferred.contains(&entry.endpoint.interface_name),
                        entry.sequence,
                    )
                })
                .map(|entry| entry.endpoint.status_key())?;

            let entry = statuses.get_mut(&candidate)?;
            match self.queriers.select(&entry.endpoint, preferred) {
                Some(querier) => {
                    entry.status = QueryStatus::new(QueryState::Started);
                    return Some((entry.endpoint.clone(), querier));
                }
                None => {
                    entry.status = QueryStatus::with_description(
                        QueryState::NoPlugin,
                        "No querier supports this endpoint",
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::synthetic::SyntheticQuerier;
    use crate::core::retrieval::container::EntityContainer;
    use crate::core::retrieval::traits::QueryOutcome;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Records the highest number of queries running at once
    #[derive(Default)]
    struct PeakTrackingQuerier {
        in_flight: AtomicUsize,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EndpointQuerier<u32> for PeakTrackingQuerier {
        fn name(&self) -> &str {
            "peak"
        }

        fn supported_interfaces(&self) -> Vec<String> {
            vec!["org.nordugrid.synthetic.peak".to_string()]
        }

        fn supports(&self, _endpoint: &Endpoint) -> bool {
            true
        }

        async fn query(
            &self,
            _config: &UserConfig,
            _endpoint: &Endpoint,
            _options: &QueryOptions,
        ) -> QueryOutcome<u32> {
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            (vec![1], QueryStatus::successful())
        }
    }

    fn create_test_retriever(querier: SyntheticQuerier<u32>, options: QueryOptions) -> EntityRetriever<u32> {
        let registry = QuerierRegistry::new().with_querier(Arc::new(querier));
        EntityRetriever::new("TestRetriever", Arc::new(registry), UserConfig::default(), options)
    }

    #[tokio::test]
    async fn test_items_reach_consumer_in_order() {
        let querier = SyntheticQuerier::new("numbers").with_response("https://a.example.org", vec![3, 1, 2]);
        let retriever = create_test_retriever(querier, QueryOptions::default());
        let container = Arc::new(EntityContainer::new());
        retriever.add_consumer(container.clone()).await;

        let endpoint = Endpoint::new("https://a.example.org");
        retriever.add_endpoint(endpoint.clone()).await;
        retriever.wait().await;

        assert_eq!(container.items().await, vec![3, 1, 2]);
        assert!(retriever.get_status_of_endpoint(&endpoint).await.is_successful());
        assert!(retriever.is_done());
    }

    #[tokio::test]
    async fn test_wait_with_no_endpoints_returns_immediately() {
        let retriever = create_test_retriever(SyntheticQuerier::new("idle"), QueryOptions::default());
        retriever.wait().await;
        retriever.wait().await;
        assert!(retriever.is_done());
    }

    #[tokio::test]
    async fn test_no_plugin_recorded_without_query() {
        let querier = SyntheticQuerier::new("files").with_schemes(&["file"]);
        let counter = querier.invocation_counter();
        let retriever = create_test_retriever(querier, QueryOptions::default());

        let endpoint = Endpoint::new("https://a.example.org");
        retriever.add_endpoint(endpoint.clone()).await;
        retriever.wait().await;

        assert_eq!(retriever.get_status_of_endpoint(&endpoint).await, QueryState::NoPlugin);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_result_reported_as_no_info_when_enabled() {
        let querier = SyntheticQuerier::new("empty").with_response("https://a.example.org", vec![]);
        let retriever = create_test_retriever(querier, QueryOptions::default().reporting_no_info());

        let endpoint = Endpoint::new("https://a.example.org");
        retriever.add_endpoint(endpoint.clone()).await;
        retriever.wait().await;

        assert_eq!(
            retriever.get_status_of_endpoint(&endpoint).await,
            QueryState::NoInfoReturned
        );
    }

    #[tokio::test]
    async fn test_readding_endpoint_is_ignored() {
        let querier = SyntheticQuerier::new("numbers").with_response("https://a.example.org", vec![1]);
        let counter = querier.invocation_counter();
        let retriever = create_test_retriever(querier, QueryOptions::default());

        retriever.add_endpoint(Endpoint::new("https://a.example.org")).await;
        retriever.wait().await;
        retriever.add_endpoint(Endpoint::new("https://a.example.org")).await;
        retriever.wait().await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(retriever.all_statuses().await.len(), 1);
    }

    #[tokio::test]
    async fn test_bounded_pool_still_completes() {
        let mut querier = SyntheticQuerier::new("numbers").with_delay(Duration::from_millis(20));
        for i in 0..6u32 {
            querier = querier.with_response(&format!("https://ce{}.example.org", i), vec![i]);
        }
        let retriever = create_test_retriever(querier, QueryOptions::default().with_max_concurrent_queries(2));
        let container = Arc::new(EntityContainer::new());
        retriever.add_consumer(container.clone()).await;

        for i in 0..6 {
            retriever
                .add_endpoint(Endpoint::new(format!("https://ce{}.example.org", i)))
                .await;
        }
        retriever.wait().await;

        let mut items = container.items().await;
        items.sort();
        assert_eq!(items, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_bounded_pool_limits_queries_in_flight() {
        let querier = PeakTrackingQuerier::default();
        let peak = querier.peak.clone();
        let retriever = EntityRetriever::new(
            "TestRetriever",
            Arc::new(QuerierRegistry::new().with_querier(Arc::new(querier))),
            UserConfig::default(),
            QueryOptions::default().with_max_concurrent_queries(2),
        );

        for i in 0..8 {
            retriever
                .add_endpoint(Endpoint::new(format!("https://ce{}.example.org", i)))
                .await;
        }
        retriever.wait().await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
        assert_eq!(
            retriever.services_with_status(QueryState::Successful).await.len(),
            8
        );
    }

    #[tokio::test]
    async fn test_removed_consumer_receives_nothing() {
        let querier = SyntheticQuerier::new("numbers").with_response("https://a.example.org", vec![1]);
        let retriever = create_test_retriever(querier, QueryOptions::default());
        let container = Arc::new(EntityContainer::new());
        let consumer: Arc<dyn EntityConsumer<u32>> = container.clone();
        retriever.add_consumer(consumer.clone()).await;
        assert!(retriever.remove_consumer(&consumer).await);

        retriever.add_endpoint(Endpoint::new("https://a.example.org")).await;
        retriever.wait().await;
        assert!(container.items().await.is_empty());
    }

    #[tokio::test]
    async fn test_status_bookkeeping() {
        let querier = SyntheticQuerier::new("numbers")
            .with_response("https://a.example.org", vec![1])
            .with_failure("https://b.example.org", "down");
        let retriever = create_test_retriever(querier, QueryOptions::default());

        retriever.add_endpoint(Endpoint::new("https://a.example.org")).await;
        retriever.add_endpoint(Endpoint::new("https://b.example.org")).await;
        retriever.wait().await;

        let failed = retriever.services_with_status(QueryState::Failed).await;
        assert_eq!(failed.into_iter().collect::<Vec<_>>(), vec!["b.example.org"]);

        assert!(retriever.remove_endpoint(&Endpoint::new("https://a.example.org")).await);
        assert!(!retriever.remove_endpoint(&Endpoint::new("https://a.example.org")).await);

        retriever.clear_statuses().await;
        assert!(retriever.all_statuses().await.is_empty());
    }
}
