use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Benchmark a job asks for, optionally with a minimum score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRequirement {
    pub name: String,
    #[serde(default)]
    pub value: Option<f64>,
}

/// Resource requirement summary of one job, as read by brokers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRequirement {
    pub slots: u32,
    pub benchmark: Option<BenchmarkRequirement>,
    /// Input file URLs a data-aware broker looks for in target caches
    pub cache_files: Vec<String>,
    pub queue_name: Option<String>,
    pub reject_queues: Vec<String>,
    /// Seconds
    pub wall_time: Option<u64>,
    /// Seconds
    pub cpu_time: Option<u64>,
    /// MB
    pub memory: Option<u64>,
    /// MB
    pub disk_space: Option<u64>,
    pub platform: Option<String>,
    pub runtime_environments: Vec<String>,
    pub processing_start_time: Option<DateTime<Utc>>,
    /// Submission interface the job must go through
    pub interface_name: Option<String>,
}

impl Default for JobRequirement {
    fn default() -> Self {
        Self {
            slots: 1,
            benchmark: None,
            cache_files: Vec::new(),
            queue_name: None,
            reject_queues: Vec::new(),
            wall_time: None,
            cpu_time: None,
            memory: None,
            disk_space: None,
            platform: None,
            runtime_environments: Vec::new(),
            processing_start_time: None,
            interface_name: None,
        }
    }
}

impl JobRequirement {
    pub fn with_slots(mut self, slots: u32) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue_name = Some(queue.into());
        self
    }

    pub fn with_benchmark(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.benchmark = Some(BenchmarkRequirement {
            name: name.into(),
            value,
        });
        self
    }

    pub fn with_cache_files(mut self, files: Vec<String>) -> Self {
        self.cache_files = files;
        self
    }

    pub fn with_disk_space(mut self, megabytes: u64) -> Self {
        self.disk_space = Some(megabytes);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.slots == 0 {
            return Err(GridError::ValidationError(
                "Job must request at least one slot".to_string(),
            ));
        }
        if let Some(queue) = &self.queue_name {
            if self.reject_queues.iter().any(|q| q == queue) {
                return Err(GridError::ValidationError(format!(
                    "Queue '{}' is both requested and rejected",
                    queue
                )));
            }
        }
        if let Some(benchmark) = &self.benchmark {
            if benchmark.name.is_empty() {
                return Err(GridError::ValidationError(
                    "Benchmark requirement has no name".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_single_slot() {
        let job: JobRequirement = serde_yaml::from_str("memory: 2048").unwrap();
        assert_eq!(job.slots, 1);
        assert_eq!(job.memory, Some(2048));
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_zero_slots_rejected() {
        let job = JobRequirement::default().with_slots(0);
        assert!(matches!(job.validate(), Err(GridError::ValidationError(_))));
    }

    #[test]
    fn test_conflicting_queue_rejected() {
        let mut job = JobRequirement::default().with_queue("short");
        job.reject_queues.push("short".to_string());
        assert!(job.validate().is_err());
    }
}
