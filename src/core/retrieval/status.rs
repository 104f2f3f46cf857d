use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryState {
    Unknown,
    SuspendedNotRequired,
    Started,
    Failed,
    NoPlugin,
    NoInfoReturned,
    Successful,
}

impl QueryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryState::Unknown => "UNKNOWN",
            QueryState::SuspendedNotRequired => "SUSPENDED_NOTREQUIRED",
            QueryState::Started => "STARTED",
            QueryState::Failed => "FAILED",
            QueryState::NoPlugin => "NOPLUGIN",
            QueryState::NoInfoReturned => "NOINFORETURNED",
            QueryState::Successful => "SUCCESSFUL",
        }
    }
}

impl Default for QueryState {
    fn default() -> Self {
        QueryState::Unknown
    }
}

/// Outcome of querying one endpoint.
///
/// Two statuses are equal when their states are equal; the description is
/// diagnostic text only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryStatus {
    state: QueryState,
    description: String,
}

impl QueryStatus {
    pub fn new(state: QueryState) -> Self {
        Self {
            state,
            description: String::new(),
        }
    }

    pub fn with_description(state: QueryState, description: impl Into<String>) -> Self {
        Self {
            state,
            description: description.into(),
        }
    }

    pub fn successful() -> Self {
        Self::new(QueryState::Successful)
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self::with_description(QueryState::Failed, description)
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The only truthy status
    pub fn is_successful(&self) -> bool {
        self.state == QueryState::Successful
    }

    /// Statuses that end an endpoint's query lifecycle.
    ///
    /// `SuspendedNotRequired` is terminal once its primary has resolved; the
    /// retriever tracks that separately.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            QueryState::Failed
                | QueryState::NoPlugin
                | QueryState::NoInfoReturned
                | QueryState::Successful
                | QueryState::SuspendedNotRequired
        )
    }
}

impl From<QueryState> for QueryStatus {
    fn from(state: QueryState) -> Self {
        Self::new(state)
    }
}

impl PartialEq for QueryStatus {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
    }
}

impl Eq for QueryStatus {}

impl PartialEq<QueryState> for QueryStatus {
    fn eq(&self, other: &QueryState) -> bool {
        self.state == *other
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state.as_str())
    }
}
