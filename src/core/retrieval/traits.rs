use async_trait::async_trait;

use super::status::QueryStatus;
use crate::config::UserConfig;
use crate::domain::entities::{Endpoint, Job, ResourceRecord};

/// Items produced by one query together with its status
pub type QueryOutcome<T> = (Vec<T>, QueryStatus);

/// Options shared by every query a retriever performs
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Interfaces tried first for endpoints that do not declare one
    pub preferred_interfaces: Vec<String>,
    /// Report an empty successful query as `NoInfoReturned`
    pub report_no_info_returned: bool,
    /// Bound on simultaneously running queries
    pub max_concurrent_queries: Option<usize>,
}

impl QueryOptions {
    pub fn with_preferred_interfaces(mut self, interfaces: Vec<String>) -> Self {
        self.preferred_interfaces = interfaces;
        self
    }

    pub fn with_max_concurrent_queries(mut self, limit: usize) -> Self {
        self.max_concurrent_queries = Some(limit);
        self
    }

    pub fn reporting_no_info(mut self) -> Self {
        self.report_no_info_returned = true;
        self
    }
}

/// Protocol adapter querying one endpoint for one interface dialect.
///
/// Implementations make exactly one attempt per call, never retry, and report
/// every failure (including their own time-outs) as a `Failed` status.
#[async_trait]
pub trait EndpointQuerier<T>: Send + Sync {
    fn name(&self) -> &str;

    fn supported_interfaces(&self) -> Vec<String>;

    /// True if this adapter can speak to the endpoint's URL
    fn supports(&self, endpoint: &Endpoint) -> bool;

    async fn query(
        &self,
        config: &UserConfig,
        endpoint: &Endpoint,
        options: &QueryOptions,
    ) -> QueryOutcome<T>;
}

/// Receives every item produced by a retriever
#[async_trait]
pub trait EntityConsumer<T>: Send + Sync {
    async fn add_entity(&self, entity: T);
}

/// What a retriever does with one produced item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Routing {
    pub deliver: bool,
    /// Endpoint to feed back into the same retriever
    pub requeue: Option<Endpoint>,
}

impl Routing {
    pub fn deliver() -> Self {
        Self {
            deliver: true,
            requeue: None,
        }
    }

    pub fn discard() -> Self {
        Self::default()
    }

    /// Also feeds `endpoint` back into the retriever
    pub fn with_requeue(mut self, endpoint: Endpoint) -> Self {
        self.requeue = Some(endpoint);
        self
    }
}

/// Decides per produced item whether it reaches consumers or re-enters the retriever
pub trait RoutingPolicy<T>: Send + Sync {
    fn route(&self, entity: &T) -> Routing;
}

/// Delivers everything
pub struct DeliverAll;

impl<T> RoutingPolicy<T> for DeliverAll {
    fn route(&self, _entity: &T) -> Routing {
        Routing::deliver()
    }
}

/// Items that record which endpoint produced them
pub trait Discovered {
    fn discovered_at(&mut self, _endpoint: &Endpoint) {}
}

impl Discovered for Endpoint {}

impl Discovered for ResourceRecord {
    fn discovered_at(&mut self, endpoint: &Endpoint) {
        if self.original_endpoint.url.is_empty() {
            self.original_endpoint = endpoint.clone();
        }
    }
}

impl Discovered for Job {
    fn discovered_at(&mut self, endpoint: &Endpoint) {
        if self.service_information_url.is_empty() {
            self.service_information_url = endpoint.url.clone();
            self.service_information_interface = endpoint.interface_name.clone();
        }
    }
}
