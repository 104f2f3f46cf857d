//! Domain entities shared by the retrieval engine and the broker

pub mod endpoint;
pub mod execution_target;
pub mod job;
pub mod requirements;
pub mod resource;

pub use endpoint::{capability, CapabilityKind, Endpoint, EndpointKey};
pub use execution_target::ExecutionTarget;
pub use job::{Job, JobState};
pub use requirements::{BenchmarkRequirement, JobRequirement};
pub use resource::{
    ComputingEndpointInfo, ComputingManager, ComputingShare, ExecutionEnvironment, ResourceRecord,
};
