//! Built-in broker strategies

use async_trait::async_trait;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::matching::generic_match;
use super::traits::{BrokerPlugin, CacheChecker};
use crate::domain::entities::{ExecutionTarget, JobRequirement};
use crate::error::{GridError, Result};

/// Keeps discovery order
pub struct NullBroker;

impl NullBroker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerPlugin for NullBroker {
    fn name(&self) -> &str {
        "null"
    }

    fn compare(&self, _a: &ExecutionTarget, _b: &ExecutionTarget) -> Result<Ordering> {
        Ok(Ordering::Equal)
    }
}

/// Shortest queue first: fewest waiting jobs per slot, then most free slots
pub struct FastestQueueBroker;

impl FastestQueueBroker {
    pub fn new() -> Self {
        Self
    }

    fn counts(target: &ExecutionTarget) -> Result<(u32, u32, u32)> {
        match (
            target.share.waiting_jobs,
            target.share.free_slots,
            target.manager.total_slots,
        ) {
            (Some(waiting), Some(free), Some(total)) => Ok((waiting, free, total)),
            _ => Err(GridError::BrokerError(format!(
                "Target {} has unknown queue counters",
                target.identity()
            ))),
        }
    }
}

impl Default for FastestQueueBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerPlugin for FastestQueueBroker {
    fn name(&self) -> &str {
        "fastestqueue"
    }

    fn matches(&self, target: &ExecutionTarget, job: &JobRequirement) -> bool {
        if Self::counts(target).is_err() {
            debug!(execution_target = %target.identity(), "Queue counters unknown, excluded");
            return false;
        }
        generic_match(target, job)
    }

    fn compare(&self, a: &ExecutionTarget, b: &ExecutionTarget) -> Result<Ordering> {
        let (waiting_a, free_a, total_a) = Self::counts(a)?;
        let (waiting_b, free_b, total_b) = Self::counts(b)?;

        if waiting_a == 0 && waiting_b == 0 {
            return Ok(free_b.cmp(&free_a));
        }

        let load_a = waiting_a as f64 / total_a.max(1) as f64;
        let load_b = waiting_b as f64 / total_b.max(1) as f64;
        load_a
            .partial_cmp(&load_b)
            .ok_or_else(|| GridError::BrokerError("Queue load is not comparable".to_string()))
    }
}

/// Highest score of one benchmark first
pub struct BenchmarkBroker {
    benchmark: String,
}

impl BenchmarkBroker {
    pub const DEFAULT_BENCHMARK: &'static str = "specint2000";

    pub fn new(benchmark: Option<&str>) -> Self {
        Self {
            benchmark: benchmark
                .filter(|b| !b.is_empty())
                .unwrap_or(Self::DEFAULT_BENCHMARK)
                .to_lowercase(),
        }
    }

    fn score(&self, target: &ExecutionTarget) -> Option<f64> {
        target
            .benchmarks
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&self.benchmark))
            .map(|(_, score)| *score)
    }
}

#[async_trait]
impl BrokerPlugin for BenchmarkBroker {
    fn name(&self) -> &str {
        "benchmark"
    }

    fn matches(&self, target: &ExecutionTarget, job: &JobRequirement) -> bool {
        if self.score(target).is_none() {
            debug!(execution_target = %target.identity(), benchmark = %self.benchmark, "Benchmark not published, excluded");
            return false;
        }
        generic_match(target, job)
    }

    fn compare(&self, a: &ExecutionTarget, b: &ExecutionTarget) -> Result<Ordering> {
        let missing = |t: &ExecutionTarget| {
            GridError::BrokerError(format!(
                "Target {} has no {} score",
                t.identity(),
                self.benchmark
            ))
        };
        let score_a = self.score(a).ok_or_else(|| missing(a))?;
        let score_b = self.score(b).ok_or_else(|| missing(b))?;
        score_b
            .partial_cmp(&score_a)
            .ok_or_else(|| GridError::BrokerError("Benchmark score is not comparable".to_string()))
    }
}

/// Random permutation, fixed for the whole session
pub struct RandomBroker {
    seed: Option<u64>,
    ranks: HashMap<String, usize>,
}

impl RandomBroker {
    pub fn new() -> Self {
        Self {
            seed: None,
            ranks: HashMap::new(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ranks: HashMap::new(),
        }
    }

    fn rank(&self, target: &ExecutionTarget) -> usize {
        self.ranks.get(&target.identity()).copied().unwrap_or(usize::MAX)
    }
}

impl Default for RandomBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerPlugin for RandomBroker {
    fn name(&self) -> &str {
        "random"
    }

    fn compare(&self, a: &ExecutionTarget, b: &ExecutionTarget) -> Result<Ordering> {
        Ok(self.rank(a).cmp(&self.rank(b)))
    }

    async fn prepare(&mut self, targets: &[ExecutionTarget], _job: &JobRequirement) -> Result<()> {
        let mut order: Vec<usize> = (0..targets.len()).collect();
        match self.seed {
            Some(seed) => order.shuffle(&mut StdRng::seed_from_u64(seed)),
            None => order.shuffle(&mut rand::thread_rng()),
        }

        self.ranks = order
            .into_iter()
            .enumerate()
            .map(|(rank, index)| (targets[index].identity(), rank))
            .collect();
        Ok(())
    }
}

/// Checker for deployments without cache information
pub struct NoCacheChecker;

#[async_trait]
impl CacheChecker for NoCacheChecker {
    async fn cached_bytes(&self, _target: &ExecutionTarget, _files: &[String]) -> Result<u64> {
        Ok(0)
    }
}

/// Most input bytes already cached at the target first
pub struct DataBroker {
    checker: Arc<dyn CacheChecker>,
    cached: HashMap<String, u64>,
}

impl DataBroker {
    pub fn new(checker: Arc<dyn CacheChecker>) -> Self {
        Self {
            checker,
            cached: HashMap::new(),
        }
    }

    fn cached(&self, target: &ExecutionTarget) -> u64 {
        self.cached.get(&target.identity()).copied().unwrap_or(0)
    }
}

#[async_trait]
impl BrokerPlugin for DataBroker {
    fn name(&self) -> &str {
        "data"
    }

    fn compare(&self, a: &ExecutionTarget, b: &ExecutionTarget) -> Result<Ordering> {
        Ok(self.cached(b).cmp(&self.cached(a)))
    }

    async fn prepare(&mut self, targets: &[ExecutionTarget], job: &JobRequirement) -> Result<()> {
        if job.cache_files.is_empty() {
            self.cached.clear();
            return Ok(());
        }

        let checker = self.checker.clone();
        let checks = targets.iter().map(move |target| {
            let checker = checker.clone();
            async move {
                let bytes = match checker.cached_bytes(target, &job.cache_files).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(execution_target = %target.identity(), error = %e, "⚠️ Cache check failed");
                        0
                    }
                };
                (target.identity(), bytes)
            }
        });

        self.cached = join_all(checks).await.into_iter().collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        ComputingEndpointInfo, ComputingManager, ComputingShare, Endpoint, ResourceRecord,
    };

    fn create_test_target(url: &str, waiting: Option<u32>, free: Option<u32>) -> ExecutionTarget {
        let mut share = ComputingShare::named("batch");
        share.waiting_jobs = waiting;
        share.free_slots = free;
        let record = ResourceRecord::new(url, Endpoint::new(url))
            .with_endpoint(ComputingEndpointInfo::new(url, "org.nordugrid.arcrest"))
            .with_manager(ComputingManager {
                total_slots: Some(100),
                ..Default::default()
            })
            .with_share(share);
        ExecutionTarget::from_record(&record, &[]).remove(0)
    }

    #[test]
    fn test_fastest_queue_ordering() {
        let broker = FastestQueueBroker::new();
        let idle_small = create_test_target("https://a.example.org", Some(0), Some(2));
        let idle_large = create_test_target("https://b.example.org", Some(0), Some(50));
        let busy = create_test_target("https://c.example.org", Some(10), Some(0));

        assert_eq!(broker.compare(&idle_large, &idle_small).unwrap(), Ordering::Less);
        assert_eq!(broker.compare(&idle_small, &busy).unwrap(), Ordering::Less);
        assert_eq!(broker.compare(&busy, &idle_large).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_fastest_queue_excludes_unknown_counters() {
        let broker = FastestQueueBroker::new();
        let unknown = create_test_target("https://a.example.org", None, Some(2));
        assert!(!broker.matches(&unknown, &JobRequirement::default()));
        assert!(broker
            .compare(&unknown, &create_test_target("https://b.example.org", Some(0), Some(1)))
            .is_err());
    }

    #[test]
    fn test_benchmark_ordering_and_filter() {
        let broker = BenchmarkBroker::new(None);
        let mut fast = create_test_target("https://a.example.org", Some(0), Some(1));
        fast.benchmarks.insert("SPECINT2000".to_string(), 3000.0);
        let mut slow = create_test_target("https://b.example.org", Some(0), Some(1));
        slow.benchmarks.insert("specint2000".to_string(), 1200.0);
        let none = create_test_target("https://c.example.org", Some(0), Some(1));

        assert_eq!(broker.compare(&fast, &slow).unwrap(), Ordering::Less);
        assert!(!broker.matches(&none, &JobRequirement::default()));
    }

    #[tokio::test]
    async fn test_random_ranks_cover_every_target() {
        let targets: Vec<ExecutionTarget> = (0..5)
            .map(|i| create_test_target(&format!("https://ce{}.example.org", i), Some(0), Some(1)))
            .collect();
        let mut broker = RandomBroker::with_seed(7);
        broker.prepare(&targets, &JobRequirement::default()).await.unwrap();

        let mut ranks: Vec<usize> = targets.iter().map(|t| broker.rank(t)).collect();
        ranks.sort();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    struct FixedCache;

    #[async_trait]
    impl CacheChecker for FixedCache {
        async fn cached_bytes(&self, target: &ExecutionTarget, files: &[String]) -> Result<u64> {
            if target.url().contains("warm") {
                Ok(files.len() as u64 * 1024)
            } else if target.url().contains("broken") {
                Err(GridError::QueryFailed("cache service down".to_string()))
            } else {
                Ok(0)
            }
        }
    }

    #[tokio::test]
    async fn test_data_broker_prefers_cached_input() {
        let cold = create_test_target("https://cold.example.org", Some(0), Some(1));
        let warm = create_test_target("https://warm.example.org", Some(0), Some(1));
        let broken = create_test_target("https://broken.example.org", Some(0), Some(1));
        let targets = vec![cold.clone(), warm.clone(), broken.clone()];
        let job = JobRequirement::default().with_cache_files(vec!["https://data.example.org/input.root".to_string()]);

        let mut broker = DataBroker::new(Arc::new(FixedCache));
        broker.prepare(&targets, &job).await.unwrap();

        assert_eq!(broker.compare(&warm, &cold).unwrap(), Ordering::Less);
        assert_eq!(broker.compare(&broken, &cold).unwrap(), Ordering::Equal);
    }
}
