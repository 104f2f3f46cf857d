//! Grid resource discovery and brokering
//!
//! Concurrently queries registries and computing-information endpoints
//! through pluggable adapters, deduplicates what they report into a service
//! catalog, and ranks the resulting execution targets for job placement.

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;

pub use error::{GridError, Result};
