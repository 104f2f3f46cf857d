//! Protocol adapters
//!
//! Each adapter implements `EndpointQuerier<T>` for one interface dialect.
//! Network adapters report every failure, time-outs included, as a `Failed`
//! query status; none of them retry.

pub mod factory;
pub mod file;
pub mod rest;
pub mod synthetic;

pub use factory::{build_registry, AdapterTable, BuiltInQuerierFactory, QuerierFactory};
pub use file::FileQuerier;
pub use rest::RestQuerier;
pub use synthetic::SyntheticQuerier;

/// Local YAML/JSON catalogs
pub const INTERFACE_FILE: &str = "org.nordugrid.file";
/// REST information and job interface
pub const INTERFACE_ARCREST: &str = "org.nordugrid.arcrest";
/// REST service registry
pub const INTERFACE_EMIR: &str = "org.nordugrid.emir";
pub const INTERFACE_EMIES_RESOURCEINFO: &str = "org.ogf.glue.emies.resourceinfo";
