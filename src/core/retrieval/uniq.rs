use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::traits::EntityConsumer;
use crate::domain::entities::ResourceRecord;

/// Rank of the information dialect a record was obtained through; richer schemas rank higher
pub fn interface_priority(interface_name: &str) -> u8 {
    match interface_name {
        "org.nordugrid.arcrest" => 5,
        "org.ogf.glue.emies.resourceinfo" => 4,
        "org.nordugrid.ldapglue2" => 3,
        "org.nordugrid.ldapng" => 2,
        "org.nordugrid.ldapglue1" => 1,
        _ => 0,
    }
}

#[derive(Default)]
struct Catalog {
    services: Vec<ResourceRecord>,
    index: HashMap<String, usize>,
}

/// Consumer collapsing records of the same service into one catalog entry.
///
/// A record replaces an existing one with the same ID only when it was
/// obtained through a strictly higher-priority interface; the entry keeps the
/// position of the first record seen for that ID. Records without an ID are
/// always appended.
#[derive(Default)]
pub struct ComputingServiceUniq {
    catalog: Mutex<Catalog>,
}

impl ComputingServiceUniq {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn services(&self) -> Vec<ResourceRecord> {
        self.catalog.lock().await.services.clone()
    }

    pub async fn len(&self) -> usize {
        self.catalog.lock().await.services.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.catalog.lock().await.services.is_empty()
    }
}

#[async_trait]
impl EntityConsumer<ResourceRecord> for ComputingServiceUniq {
    async fn add_entity(&self, record: ResourceRecord) {
        let mut catalog = self.catalog.lock().await;

        if record.id.is_empty() {
            debug!(endpoint = %record.original_endpoint.url, "Adding service record without ID");
            catalog.services.push(record);
            return;
        }

        let position = match catalog.index.get(&record.id).copied() {
            Some(position) => position,
            None => {
                let position = catalog.services.len();
                catalog.index.insert(record.id.clone(), position);
                catalog.services.push(record);
                return;
            }
        };

        let existing = &catalog.services[position];
        let existing_priority = interface_priority(&existing.original_endpoint.interface_name);
        let new_priority = interface_priority(&record.original_endpoint.interface_name);

        if new_priority > existing_priority {
            info!(
                service = %record.id,
                replaced = %existing.original_endpoint.interface_name,
                by = %record.original_endpoint.interface_name,
                "🔄 Replacing service record with higher-priority one"
            );
            catalog.services[position] = record;
        } else {
            debug!(
                service = %record.id,
                kept = %existing.original_endpoint.interface_name,
                ignored = %record.original_endpoint.interface_name,
                "Ignoring duplicate service record"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Endpoint;

    fn create_test_record(id: &str, interface: &str, name: &str) -> ResourceRecord {
        let mut record = ResourceRecord::new(
            id,
            Endpoint::new(format!("https://{}.example.org", name)).with_interface(interface),
        );
        record.name = name.to_string();
        record
    }

    #[tokio::test]
    async fn test_distinct_ids_kept_in_order() {
        let uniq = ComputingServiceUniq::new();
        uniq.add_entity(create_test_record("b", "org.nordugrid.ldapng", "second")).await;
        uniq.add_entity(create_test_record("a", "org.nordugrid.ldapng", "first")).await;

        let services = uniq.services().await;
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].id, "b");
        assert_eq!(services[1].id, "a");
    }

    #[tokio::test]
    async fn test_higher_priority_replaces() {
        let uniq = ComputingServiceUniq::new();
        uniq.add_entity(create_test_record("ce", "org.nordugrid.ldapglue2", "legacy")).await;
        uniq.add_entity(create_test_record("other", "org.nordugrid.ldapng", "other")).await;
        uniq.add_entity(create_test_record("ce", "org.nordugrid.arcrest", "rich")).await;

        let services = uniq.services().await;
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "rich");
        assert_eq!(services[1].name, "other");
    }

    #[tokio::test]
    async fn test_lower_or_equal_priority_ignored() {
        let uniq = ComputingServiceUniq::new();
        uniq.add_entity(create_test_record("ce", "org.nordugrid.ldapglue2", "first")).await;
        uniq.add_entity(create_test_record("ce", "org.nordugrid.ldapglue2", "tie")).await;
        uniq.add_entity(create_test_record("ce", "org.nordugrid.ldapng", "lower")).await;

        let services = uniq.services().await;
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name, "first");
    }

    #[tokio::test]
    async fn test_records_without_id_never_merge() {
        let uniq = ComputingServiceUniq::new();
        uniq.add_entity(create_test_record("", "org.nordugrid.arcrest", "x")).await;
        uniq.add_entity(create_test_record("", "org.nordugrid.arcrest", "y")).await;
        assert_eq!(uniq.len().await, 2);
    }

    #[test]
    fn test_priority_table() {
        assert!(interface_priority("org.nordugrid.arcrest") > interface_priority("org.ogf.glue.emies.resourceinfo"));
        assert!(interface_priority("org.nordugrid.ldapglue2") > interface_priority("org.nordugrid.ldapng"));
        assert_eq!(interface_priority("org.example.unknown"), 0);
    }
}
