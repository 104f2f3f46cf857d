//! In-memory adapter answering from canned responses.
//!
//! Used by tests and demos in place of a network adapter. Every behaviour is
//! injected through the builder; nothing is global.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::UserConfig;
use crate::core::retrieval::{EndpointQuerier, QueryOptions, QueryOutcome, QueryState, QueryStatus};
use crate::domain::entities::Endpoint;

#[derive(Debug, Clone)]
struct CannedResponse<T> {
    items: Vec<T>,
    status: QueryStatus,
    delay: Option<Duration>,
}

pub struct SyntheticQuerier<T> {
    name: String,
    interfaces: Vec<String>,
    schemes: Vec<String>,
    responses: HashMap<String, CannedResponse<T>>,
    delay: Duration,
    invocations: Arc<AtomicUsize>,
    invocations_by_url: Mutex<HashMap<String, usize>>,
}

impl<T: Clone + Send + Sync + 'static> SyntheticQuerier<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            interfaces: vec![format!("org.nordugrid.synthetic.{}", name)],
            schemes: Vec::new(),
            responses: HashMap::new(),
            delay: Duration::ZERO,
            invocations: Arc::new(AtomicUsize::new(0)),
            invocations_by_url: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_interfaces(mut self, interfaces: &[&str]) -> Self {
        self.interfaces = interfaces.iter().map(|i| i.to_string()).collect();
        self
    }

    /// Restricts `supports` to these URL schemes; any URL is accepted when empty
    pub fn with_schemes(mut self, schemes: &[&str]) -> Self {
        self.schemes = schemes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_response(mut self, url: &str, items: Vec<T>) -> Self {
        self.responses.insert(
            url.to_string(),
            CannedResponse {
                items,
                status: QueryStatus::successful(),
                delay: None,
            },
        );
        self
    }

    pub fn with_status(mut self, url: &str, status: QueryStatus) -> Self {
        self.responses.insert(
            url.to_string(),
            CannedResponse {
                items: Vec::new(),
                status,
                delay: None,
            },
        );
        self
    }

    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.with_status(url, QueryStatus::failed(message))
    }

    /// Delay applied to every query
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay applied to queries of one URL, overriding the global delay
    pub fn with_url_delay(mut self, url: &str, delay: Duration) -> Self {
        if let Some(response) = self.responses.get_mut(url) {
            response.delay = Some(delay);
        }
        self
    }

    /// Shared counter of all queries made, readable after the querier is registered
    pub fn invocation_counter(&self) -> Arc<AtomicUsize> {
        self.invocations.clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub async fn invocations_for(&self, url: &str) -> usize {
        self.invocations_by_url
            .lock()
            .await
            .get(url)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> EndpointQuerier<T> for SyntheticQuerier<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_interfaces(&self) -> Vec<String> {
        self.interfaces.clone()
    }

    fn supports(&self, endpoint: &Endpoint) -> bool {
        if self.schemes.is_empty() {
            return true;
        }
        match endpoint.url.split_once("://") {
            Some((scheme, _)) => self.schemes.iter().any(|s| s == scheme),
            None => false,
        }
    }

    async fn query(
        &self,
        _config: &UserConfig,
        endpoint: &Endpoint,
        _options: &QueryOptions,
    ) -> QueryOutcome<T> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        *self
            .invocations_by_url
            .lock()
            .await
            .entry(endpoint.url.clone())
            .or_insert(0) += 1;

        let response = self.responses.get(&endpoint.url);
        let delay = response.and_then(|r| r.delay).unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        debug!(querier = %self.name, endpoint = %endpoint.url, "Answering synthetic query");

        match response {
            Some(response) => (response.items.clone(), response.status.clone()),
            None => (
                Vec::new(),
                QueryStatus::with_description(
                    QueryState::Failed,
                    format!("No canned response for {}", endpoint.url),
                ),
            ),
        }
    }
}
