//! Generic matchmaking of a job against an execution target
//!
//! Values a target does not publish are not held against it, with two
//! exceptions: the endpoint health state must be known and "ok", and a
//! multi-slot job needs at least one published slot limit.

use tracing::debug;

use crate::domain::entities::{ExecutionTarget, JobRequirement};

fn reject(target: &ExecutionTarget, reason: &str) -> bool {
    debug!(execution_target = %target.identity(), reason, "Target rejected");
    false
}

pub fn generic_match(target: &ExecutionTarget, job: &JobRequirement) -> bool {
    if !target.endpoint.health_state.eq_ignore_ascii_case("ok") {
        return reject(target, "endpoint health state is not ok");
    }

    if let Some(interface) = &job.interface_name {
        if &target.endpoint.interface_name != interface {
            return reject(target, "submission interface differs");
        }
    }

    let share = &target.share;
    if let Some(queue) = &job.queue_name {
        if &share.name != queue && &share.mapping_queue != queue {
            return reject(target, "requested queue not offered");
        }
    }
    if job
        .reject_queues
        .iter()
        .any(|q| q == &share.name || (!share.mapping_queue.is_empty() && q == &share.mapping_queue))
    {
        return reject(target, "queue is rejected by the job");
    }

    if let Some(start) = job.processing_start_time {
        if let (Some(from), Some(until)) = (target.endpoint.downtime_starts, target.endpoint.downtime_ends) {
            if start >= from && start <= until {
                return reject(target, "processing start falls into downtime");
            }
        }
    }

    if let (Some(required), Some(limit)) = (job.wall_time, share.max_wall_time) {
        if required > limit {
            return reject(target, "wall time exceeds share limit");
        }
    }
    if let (Some(required), Some(limit)) = (job.cpu_time, share.max_cpu_time) {
        if required > limit {
            return reject(target, "CPU time exceeds share limit");
        }
    }

    if let Some(required) = job.memory {
        let available = target
            .environment
            .main_memory_size
            .or(share.max_main_memory);
        if matches!(available, Some(limit) if required > limit) {
            return reject(target, "not enough memory");
        }
    }

    if let Some(platform) = &job.platform {
        if !target.environment.platform.is_empty() && &target.environment.platform != platform {
            return reject(target, "platform differs");
        }
    }

    if let Some(missing) = job
        .runtime_environments
        .iter()
        .find(|rte| !target.application_environments.contains(rte))
    {
        debug!(execution_target = %target.identity(), runtime_environment = %missing, "Runtime environment missing");
        return false;
    }

    if let Some(required) = job.disk_space {
        let available = share.max_disk_space.or(target.manager.working_area_free);
        if matches!(available, Some(limit) if required > limit) {
            return reject(target, "not enough disk space");
        }
    }

    if let Some(benchmark) = &job.benchmark {
        if let Some(minimum) = benchmark.value {
            let score = target
                .benchmarks
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&benchmark.name))
                .map(|(_, score)| *score);
            match score {
                Some(score) if score >= minimum => {}
                _ => return reject(target, "benchmark score below requirement"),
            }
        }
    }

    let slot_limit = share.max_slots_per_job.or(target.manager.total_slots);
    match slot_limit {
        Some(limit) if job.slots > limit => return reject(target, "not enough slots"),
        None if job.slots > 1 => return reject(target, "slot limits unknown for multi-slot job"),
        _ => {}
    }

    true
}
