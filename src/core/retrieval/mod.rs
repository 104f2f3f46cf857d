//! Concurrent resource discovery
//!
//! Endpoints are queried through pluggable protocol adapters, results are
//! streamed to consumers, and every endpoint ends in exactly one terminal
//! `QueryStatus`.
//!
//! ## Architecture
//!
//! - **Adapters** implement `EndpointQuerier<T>` for one result kind and are
//!   registered, in priority order, in a `QuerierRegistry<T>`
//! - **`EntityRetriever<T>`** runs one task per distinct endpoint and tracks
//!   statuses, duplicates and completion
//! - **Specializations** fix the result kind: endpoints from registries,
//!   resource records, job lists
//! - **`ComputingServiceRetriever`** composes registry traversal with
//!   information retrieval, feeding a `ComputingServiceUniq` catalog

pub mod computing_service;
pub mod container;
pub mod registry;
pub mod retriever;
pub mod service_endpoint;
pub mod status;
pub mod traits;
pub mod uniq;

pub use computing_service::{ComputingServiceOptions, ComputingServiceRetriever};
pub use container::EntityContainer;
pub use registry::QuerierRegistry;
pub use retriever::EntityRetriever;
pub use service_endpoint::{
    JobListRetriever, RegistryQueryOptions, ServiceEndpointRetriever, TargetInformationRetriever,
};
pub use status::{QueryState, QueryStatus};
pub use traits::{
    DeliverAll, Discovered, EndpointQuerier, EntityConsumer, QueryOptions, QueryOutcome, Routing,
    RoutingPolicy,
};
pub use uniq::{interface_priority, ComputingServiceUniq};
