//! Execution targets
//!
//! A flattened view joining one submission endpoint with its service's manager
//! and one share. Brokers rank these. Each target owns its own copy of the
//! share counters, so speculative bookings never leak back into the catalog.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::endpoint::Endpoint;
use super::requirements::JobRequirement;
use super::resource::{
    ComputingEndpointInfo, ComputingManager, ComputingShare, ExecutionEnvironment, ResourceRecord,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTarget {
    pub service_id: String,
    pub service_name: String,
    pub original_endpoint: Endpoint,
    pub endpoint: ComputingEndpointInfo,
    pub manager: ComputingManager,
    pub share: ComputingShare,
    pub environment: ExecutionEnvironment,
    pub benchmarks: HashMap<String, f64>,
    pub application_environments: Vec<String>,
}

impl ExecutionTarget {
    /// Expands one record into a target per submission endpoint and share.
    ///
    /// Endpoints that cannot take jobs are skipped. When `requested_interfaces`
    /// is non-empty only endpoints speaking one of them are used. An endpoint
    /// bound to share IDs pairs only with those shares; without any matching
    /// share a single target with an all-unknown share is produced.
    pub fn from_record(record: &ResourceRecord, requested_interfaces: &[String]) -> Vec<Self> {
        let mut targets = Vec::new();
        let generic = ComputingShare::default();

        for endpoint in record.endpoints.iter().filter(|e| e.accepts_jobs()) {
            if !requested_interfaces.is_empty()
                && !requested_interfaces.contains(&endpoint.interface_name)
            {
                debug!(
                    endpoint = %endpoint.url,
                    interface = %endpoint.interface_name,
                    "Skipping endpoint with unrequested submission interface"
                );
                continue;
            }

            let mut shares: Vec<&ComputingShare> = record
                .shares
                .iter()
                .filter(|s| endpoint.share_ids.is_empty() || endpoint.share_ids.contains(&s.id))
                .collect();
            if shares.is_empty() {
                shares.push(&generic);
            }

            for share in shares {
                targets.push(Self {
                    service_id: record.id.clone(),
                    service_name: record.name.clone(),
                    original_endpoint: record.original_endpoint.clone(),
                    endpoint: endpoint.clone(),
                    manager: record.manager.clone(),
                    share: share.clone(),
                    environment: record.environment.clone(),
                    benchmarks: record.benchmarks.clone(),
                    application_environments: record.application_environments.clone(),
                });
            }
        }

        targets
    }

    pub fn from_catalog(records: &[ResourceRecord], requested_interfaces: &[String]) -> Vec<Self> {
        records
            .iter()
            .flat_map(|r| Self::from_record(r, requested_interfaces))
            .collect()
    }

    pub fn url(&self) -> &str {
        &self.endpoint.url
    }

    /// Stable identity of this target within one brokering session
    pub fn identity(&self) -> String {
        let share = if self.share.id.is_empty() {
            &self.share.name
        } else {
            &self.share.id
        };
        format!("{}#{}", self.endpoint.url, share)
    }

    /// Books a job against this target's share.
    ///
    /// Free slots are consumed when enough are available; otherwise the job is
    /// counted as waiting. The working area shrinks by the job's disk needs.
    pub fn register_job_submission(&mut self, job: &JobRequirement) {
        let slots = job.slots.max(1);

        match self.share.free_slots {
            Some(free) if free >= slots => {
                self.share.free_slots = Some(free - slots);
                if let Some(used) = self.share.used_slots {
                    self.share.used_slots = Some(used + slots);
                }
            }
            _ => {
                if let Some(waiting) = self.share.waiting_jobs {
                    self.share.waiting_jobs = Some(waiting + slots);
                }
            }
        }

        if let (Some(free), Some(disk)) = (self.manager.working_area_free, job.disk_space) {
            self.manager.working_area_free = Some(free.saturating_sub(disk));
        }

        debug!(
            execution_target = %self.identity(),
            free_slots = ?self.share.free_slots,
            used_slots = ?self.share.used_slots,
            waiting_jobs = ?self.share.waiting_jobs,
            "Registered job submission"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::endpoint::capability;

    fn create_test_record() -> ResourceRecord {
        let mut submit = ComputingEndpointInfo::new("https://ce1.example.org/arex", "org.nordugrid.arcrest");
        submit.capability.insert(capability::JOBCREATION.to_string());
        let mut info = ComputingEndpointInfo::new("ldap://ce1.example.org:2135", "org.nordugrid.ldapglue2");
        info.capability.insert(capability::COMPUTINGINFO.to_string());

        ResourceRecord::new("ce1", Endpoint::new("https://ce1.example.org/arex"))
            .with_endpoint(submit)
            .with_endpoint(info)
            .with_share(ComputingShare::named("batch"))
            .with_share(ComputingShare::named("short"))
    }

    #[test]
    fn test_one_target_per_submission_endpoint_and_share() {
        let targets = ExecutionTarget::from_record(&create_test_record(), &[]);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].share.name, "batch");
        assert_eq!(targets[1].share.name, "short");
        assert!(targets.iter().all(|t| t.url() == "https://ce1.example.org/arex"));
    }

    #[test]
    fn test_share_binding_and_interface_filter() {
        let mut record = create_test_record();
        record.endpoints[0].share_ids = vec!["short".to_string()];
        let targets = ExecutionTarget::from_record(&record, &[]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].share.name, "short");

        let none = ExecutionTarget::from_record(&record, &["org.ogf.glue.emies.activitycreation".to_string()]);
        assert!(none.is_empty());
    }

    #[test]
    fn test_record_without_shares_yields_generic_target() {
        let mut record = create_test_record();
        record.shares.clear();
        let targets = ExecutionTarget::from_record(&record, &[]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].share.free_slots, None);
    }

    #[test]
    fn test_register_job_submission_books_then_queues() {
        let mut target = ExecutionTarget::from_record(&create_test_record(), &[]).remove(0);
        target.share.free_slots = Some(7);
        target.share.used_slots = Some(10);
        target.share.waiting_jobs = Some(0);
        let job = JobRequirement::default().with_slots(4);

        target.register_job_submission(&job);
        assert_eq!(target.share.free_slots, Some(3));
        assert_eq!(target.share.used_slots, Some(14));
        assert_eq!(target.share.waiting_jobs, Some(0));

        target.register_job_submission(&job);
        assert_eq!(target.share.free_slots, Some(3));
        assert_eq!(target.share.used_slots, Some(14));
        assert_eq!(target.share.waiting_jobs, Some(4));
    }

    #[test]
    fn test_register_job_submission_consumes_working_area() {
        let mut target = ExecutionTarget::from_record(&create_test_record(), &[]).remove(0);
        target.manager.working_area_free = Some(500);
        target.register_job_submission(&JobRequirement::default().with_disk_space(800));
        assert_eq!(target.manager.working_area_free, Some(0));
    }
}
