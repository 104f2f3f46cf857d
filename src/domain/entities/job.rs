//! Job records returned by job-list endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Accepted,
    Preparing,
    Submitting,
    Queuing,
    Running,
    Finishing,
    Finished,
    Killed,
    Failed,
    Deleted,
    Hold,
    #[serde(other)]
    Undefined,
}

impl JobState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobState::Finished | JobState::Killed | JobState::Failed | JobState::Deleted
        )
    }
}

impl Default for JobState {
    fn default() -> Self {
        JobState::Undefined
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub state: JobState,
    pub exit_code: Option<i32>,
    pub queue: String,
    pub requested_slots: Option<u32>,
    pub owner: String,
    pub service_information_url: String,
    pub service_information_interface: String,
    pub job_status_url: String,
    pub job_status_interface: String,
    pub job_management_url: String,
    pub job_management_interface: String,
    pub submission_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_state(mut self, state: JobState) -> Self {
        self.state = state;
        self
    }
}
