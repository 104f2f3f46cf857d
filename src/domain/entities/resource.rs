//! Resource records discovered from computing-information endpoints
//!
//! A `ResourceRecord` describes one computing service: where it was found,
//! which endpoints it exposes, the cluster-wide manager and the queue-like
//! shares jobs are placed into. Counters published by providers use negative
//! values for "unknown"; those deserialize to `None` so slot-based brokers can
//! exclude them instead of treating them as zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::endpoint::{capability, Endpoint};

/// Maps negative provider values to "unknown".
pub(crate) fn unknown_if_negative<'de, D, N>(deserializer: D) -> Result<Option<N>, D::Error>
where
    D: Deserializer<'de>,
    N: TryFrom<i64>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        if value < 0 {
            None
        } else {
            N::try_from(value).ok()
        }
    }))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputingEndpointInfo {
    pub url: String,
    #[serde(default)]
    pub interface_name: String,
    #[serde(default)]
    pub capability: BTreeSet<String>,
    /// Software name and version, e.g. "nordugrid-arc-6.18"
    #[serde(default)]
    pub implementation: String,
    #[serde(default)]
    pub health_state: String,
    #[serde(default)]
    pub downtime_starts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub downtime_ends: Option<DateTime<Utc>>,
    /// Shares this endpoint submits into. Empty means all shares.
    #[serde(default)]
    pub share_ids: Vec<String>,
}

impl ComputingEndpointInfo {
    pub fn new(url: impl Into<String>, interface_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            interface_name: interface_name.into(),
            health_state: "ok".to_string(),
            ..Default::default()
        }
    }

    /// True if jobs can be submitted through this endpoint.
    pub fn accepts_jobs(&self) -> bool {
        self.capability.is_empty()
            || self.capability.contains(capability::JOBSUBMIT)
            || self.capability.contains(capability::JOBCREATION)
    }
}

/// Cluster-wide view of a computing service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputingManager {
    #[serde(default)]
    pub product_name: String,
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub total_slots: Option<u32>,
    /// Free session directory space in MB
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub working_area_free: Option<u64>,
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub cache_total: Option<u64>,
}

/// Queue-like allocation unit within a computing service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputingShare {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mapping_queue: String,
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub free_slots: Option<u32>,
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub used_slots: Option<u32>,
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub waiting_jobs: Option<u32>,
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub max_slots_per_job: Option<u32>,
    /// Seconds
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub max_wall_time: Option<u64>,
    /// Seconds
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub max_cpu_time: Option<u64>,
    /// MB
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub max_main_memory: Option<u64>,
    /// MB
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub max_disk_space: Option<u64>,
}

impl ComputingShare {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEnvironment {
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub operating_system: String,
    /// MB
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub main_memory_size: Option<u64>,
    /// MHz
    #[serde(default, deserialize_with = "unknown_if_negative")]
    pub cpu_clock_speed: Option<u32>,
    #[serde(default)]
    pub connectivity_in: Option<bool>,
    #[serde(default)]
    pub connectivity_out: Option<bool>,
}

/// Aggregate describing one computing service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub service_type: String,
    /// Endpoint the record was discovered from. Set by the querier.
    #[serde(default)]
    pub original_endpoint: Endpoint,
    #[serde(default)]
    pub endpoints: Vec<ComputingEndpointInfo>,
    #[serde(default)]
    pub manager: ComputingManager,
    #[serde(default)]
    pub shares: Vec<ComputingShare>,
    #[serde(default)]
    pub environment: ExecutionEnvironment,
    #[serde(default)]
    pub benchmarks: HashMap<String, f64>,
    #[serde(default)]
    pub application_environments: Vec<String>,
}

impl ResourceRecord {
    pub fn new(id: impl Into<String>, original_endpoint: Endpoint) -> Self {
        Self {
            id: id.into(),
            original_endpoint,
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: ComputingEndpointInfo) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn with_share(mut self, share: ComputingShare) -> Self {
        self.shares.push(share);
        self
    }

    pub fn with_manager(mut self, manager: ComputingManager) -> Self {
        self.manager = manager;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_counters_are_unknown() {
        let json = r#"{
            "id": "share-1",
            "name": "batch",
            "free_slots": -1,
            "used_slots": 12,
            "waiting_jobs": -1,
            "max_slots_per_job": 64
        }"#;
        let share: ComputingShare = serde_json::from_str(json).unwrap();
        assert_eq!(share.free_slots, None);
        assert_eq!(share.used_slots, Some(12));
        assert_eq!(share.waiting_jobs, None);
        assert_eq!(share.max_slots_per_job, Some(64));
    }

    #[test]
    fn test_record_from_yaml() {
        let yaml = r#"
id: urn:ogf:ComputingService:ce1
name: ce1
original_endpoint:
  url: https://ce1.example.org/arex
  interface_name: org.nordugrid.arcrest
endpoints:
  - url: https://ce1.example.org/arex
    interface_name: org.ogf.glue.emies.activitycreation
    capability: [executionmanagement.jobcreation]
    health_state: ok
manager:
  total_slots: 100
shares:
  - id: batch
    name: batch
    free_slots: 7
"#;
        let record: ResourceRecord = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(record.id, "urn:ogf:ComputingService:ce1");
        assert_eq!(record.manager.total_slots, Some(100));
        assert_eq!(record.shares[0].free_slots, Some(7));
        assert!(record.endpoints[0].accepts_jobs());
    }

    #[test]
    fn test_info_only_endpoint_does_not_accept_jobs() {
        let mut info = ComputingEndpointInfo::new("ldap://ce1:2135", "org.nordugrid.ldapglue2");
        info.capability.insert(capability::COMPUTINGINFO.to_string());
        assert!(!info.accepts_jobs());
    }
}
