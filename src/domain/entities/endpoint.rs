//! Endpoint entities
//!
//! An endpoint is a reachable address plus the interface dialect it speaks and
//! the capability tags it publishes. Endpoints are the unit of work handed to the
//! retrieval engine and the unit of output produced by registry traversal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Well-known capability strings published by grid services
pub mod capability {
    pub const REGISTRY: &str = "information.discovery.registry";
    pub const COMPUTINGINFO: &str = "information.discovery.resource";
    pub const JOBLIST: &str = "information.lookup.job";
    pub const JOBSUBMIT: &str = "executionmanagement.jobexecution";
    pub const JOBCREATION: &str = "executionmanagement.jobcreation";
    pub const JOBMANAGEMENT: &str = "executionmanagement.jobmanager";
}

/// Coarse role of an endpoint, used when endpoints are declared in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    Registry,
    ComputingInfo,
    JobList,
    JobSubmit,
    Unspecified,
}

impl CapabilityKind {
    pub fn capability_strings(&self) -> &'static [&'static str] {
        match self {
            CapabilityKind::Registry => &[capability::REGISTRY],
            CapabilityKind::ComputingInfo => &[capability::COMPUTINGINFO],
            CapabilityKind::JobList => &[capability::JOBLIST],
            CapabilityKind::JobSubmit => &[capability::JOBSUBMIT, capability::JOBCREATION],
            CapabilityKind::Unspecified => &[],
        }
    }
}

impl Default for CapabilityKind {
    fn default() -> Self {
        CapabilityKind::Unspecified
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CapabilityKind::Registry => "registry",
            CapabilityKind::ComputingInfo => "computinginfo",
            CapabilityKind::JobList => "joblist",
            CapabilityKind::JobSubmit => "jobsubmit",
            CapabilityKind::Unspecified => "unspecified",
        };
        write!(f, "{}", name)
    }
}

/// Identity of one registered endpoint inside a retriever
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub url: String,
    pub interface_name: String,
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.interface_name.is_empty() {
            write!(f, "{}", self.url)
        } else {
            write!(f, "{} ({})", self.url, self.interface_name)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    /// Interface dialect, e.g. "org.nordugrid.ldapng". Empty means undeclared.
    #[serde(default)]
    pub interface_name: String,
    #[serde(default)]
    pub capability: BTreeSet<String>,
    #[serde(default)]
    pub health_state: String,
    /// Stable identity hint shared by all endpoints of one logical service
    #[serde(default)]
    pub service_id: String,
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: CapabilityKind) -> Self {
        self.capability
            .extend(kind.capability_strings().iter().map(|c| c.to_string()));
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capability.insert(capability.into());
        self
    }

    pub fn with_interface(mut self, interface_name: impl Into<String>) -> Self {
        self.interface_name = interface_name.into();
        self
    }

    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = service_id.into();
        self
    }

    pub fn with_health_state(mut self, health_state: impl Into<String>) -> Self {
        self.health_state = health_state.into();
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capability.contains(capability)
    }

    pub fn has_any_capability(&self, capabilities: &[String]) -> bool {
        capabilities.iter().any(|c| self.capability.contains(c))
    }

    pub fn is_registry(&self) -> bool {
        self.has_capability(capability::REGISTRY)
    }

    pub fn is_computing_info(&self) -> bool {
        self.has_capability(capability::COMPUTINGINFO)
    }

    pub fn capability_unspecified(&self) -> bool {
        self.capability.is_empty()
    }

    pub fn status_key(&self) -> EndpointKey {
        EndpointKey {
            url: self.url.clone(),
            interface_name: self.interface_name.clone(),
        }
    }

    /// Dedup key: the service ID when published, otherwise URL plus interface.
    pub fn service_key(&self) -> String {
        if self.service_id.is_empty() {
            format!("{}|{}", self.url, self.interface_name)
        } else {
            self.service_id.clone()
        }
    }

    /// Host part of the URL, falling back to the raw URL string.
    pub fn service_name(&self) -> String {
        let candidate = if self.url.contains("://") {
            self.url.clone()
        } else {
            format!("https://{}", self.url)
        };
        url::Url::parse(&candidate)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| self.url.clone())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let caps: Vec<&str> = self.capability.iter().map(|c| c.as_str()).collect();
        let interface = if self.interface_name.is_empty() {
            "<any interface>"
        } else {
            self.interface_name.as_str()
        };
        write!(f, "{} ({}, [{}])", self.url, interface, caps.join(", "))
    }
}
