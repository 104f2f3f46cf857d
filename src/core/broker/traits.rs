use async_trait::async_trait;
use std::cmp::Ordering;

use super::matching::generic_match;
use crate::domain::entities::{ExecutionTarget, JobRequirement};
use crate::error::Result;

/// Pluggable filter and ranking for one brokering session.
///
/// `compare` must be a strict weak ordering where `Less` means the first
/// target is the better choice. A comparison error aborts the session.
#[async_trait]
pub trait BrokerPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, target: &ExecutionTarget, job: &JobRequirement) -> bool {
        generic_match(target, job)
    }

    fn compare(&self, a: &ExecutionTarget, b: &ExecutionTarget) -> Result<Ordering>;

    /// Gathers whatever the comparator needs before the first sort
    async fn prepare(&mut self, _targets: &[ExecutionTarget], _job: &JobRequirement) -> Result<()> {
        Ok(())
    }
}

/// Side query telling how much of a job's input is already cached at a target
#[async_trait]
pub trait CacheChecker: Send + Sync {
    /// Bytes of `files` present in the target's cache
    async fn cached_bytes(&self, target: &ExecutionTarget, files: &[String]) -> Result<u64>;
}
