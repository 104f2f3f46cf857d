#![allow(dead_code)]

use grid_discovery::domain::entities::{
    ComputingEndpointInfo, ComputingManager, ComputingShare, Endpoint, ExecutionTarget,
    ResourceRecord,
};

pub const ARCREST: &str = "org.nordugrid.arcrest";
pub const LDAPGLUE2: &str = "org.nordugrid.ldapglue2";

/// Service record with one submission endpoint and one share
pub fn create_test_record(id: &str, url: &str, interface: &str) -> ResourceRecord {
    ResourceRecord::new(id, Endpoint::new(url).with_interface(interface))
        .with_endpoint(ComputingEndpointInfo::new(url, ARCREST))
        .with_manager(ComputingManager {
            total_slots: Some(100),
            ..Default::default()
        })
        .with_share(create_test_share(0, 10, 0))
}

pub fn create_test_share(waiting: u32, free: u32, used: u32) -> ComputingShare {
    let mut share = ComputingShare::named("batch");
    share.waiting_jobs = Some(waiting);
    share.free_slots = Some(free);
    share.used_slots = Some(used);
    share
}

pub fn create_test_target(url: &str, waiting: u32, free: u32, used: u32) -> ExecutionTarget {
    let record = ResourceRecord::new(url, Endpoint::new(url))
        .with_endpoint(ComputingEndpointInfo::new(url, ARCREST))
        .with_manager(ComputingManager {
            total_slots: Some(100),
            ..Default::default()
        })
        .with_share(create_test_share(waiting, free, used));
    ExecutionTarget::from_record(&record, &[]).remove(0)
}
