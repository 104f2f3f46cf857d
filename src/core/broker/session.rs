//! One job-placement session
//!
//! A [`Broker`] owns its candidate list. Targets are filtered once, ranked
//! lazily on the first request, then served one at a time. Bookings made
//! through [`Broker::register_job_submission`] only touch the session's own
//! copies, so callers running several sessions over the same catalog clone
//! the target list per session.

use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::traits::BrokerPlugin;
use crate::domain::entities::{ExecutionTarget, JobRequirement};
use crate::error::{GridError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    Initial,
    Filtered,
    Sorted,
    Serving,
    Exhausted,
}

impl fmt::Display for BrokerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub struct Broker {
    session_id: Uuid,
    plugin: Box<dyn BrokerPlugin>,
    reject_targets: Vec<String>,
    state: BrokerState,
    targets: Vec<ExecutionTarget>,
    job: Option<JobRequirement>,
    prepared: bool,
    cursor: usize,
    last_served: Option<usize>,
}

impl Broker {
    pub fn new(plugin: Box<dyn BrokerPlugin>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            plugin,
            reject_targets: Vec::new(),
            state: BrokerState::Initial,
            targets: Vec::new(),
            job: None,
            prepared: false,
            cursor: 0,
            last_served: None,
        }
    }

    /// Targets whose URL contains any of these patterns never pass filtering
    pub fn with_reject_targets(mut self, patterns: Vec<String>) -> Self {
        self.reject_targets = patterns;
        self
    }

    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    /// Correlates the log lines of one session
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> BrokerState {
        self.state
    }

    /// Remaining candidates, in ranking order once sorted
    pub fn targets(&self) -> &[ExecutionTarget] {
        &self.targets
    }

    fn is_rejected(&self, target: &ExecutionTarget) -> bool {
        self.reject_targets
            .iter()
            .any(|pattern| !pattern.is_empty() && target.url().contains(pattern.as_str()))
    }

    /// Starts a new session over `candidates`, keeping the ones that match `job`.
    ///
    /// Returns the number of surviving targets. An invalid job requirement is
    /// an error; a target that does not match is only an exclusion.
    pub fn pre_filter_targets(
        &mut self,
        candidates: Vec<ExecutionTarget>,
        job: &JobRequirement,
    ) -> Result<usize> {
        job.validate()?;

        let offered = candidates.len();
        let mut kept = Vec::with_capacity(offered);
        for target in candidates {
            if self.is_rejected(&target) {
                debug!(execution_target = %target.identity(), "Target is on the reject list");
                continue;
            }
            if self.plugin.matches(&target, job) {
                kept.push(target);
            }
        }

        info!(
            session = %self.session_id,
            broker = %self.plugin.name(),
            offered,
            kept = kept.len(),
            "🎯 Targets filtered"
        );

        self.targets = kept;
        self.job = Some(job.clone());
        self.prepared = false;
        self.cursor = 0;
        self.last_served = None;
        self.state = BrokerState::Filtered;
        Ok(self.targets.len())
    }

    fn compare(&self, a: &ExecutionTarget, b: &ExecutionTarget) -> Result<Ordering> {
        self.plugin.compare(a, b)
    }

    async fn sort_targets(&mut self) -> Result<()> {
        if !self.prepared {
            let job = self.job.clone().unwrap_or_default();
            self.plugin.prepare(&self.targets, &job).await?;
            self.prepared = true;
        }

        let plugin = &self.plugin;
        let mut failure = None;
        self.targets.sort_by(|a, b| match plugin.compare(a, b) {
            Ok(ordering) => ordering,
            Err(e) => {
                if failure.is_none() {
                    failure = Some(e);
                }
                Ordering::Equal
            }
        });

        if let Some(e) = failure {
            warn!(session = %self.session_id, broker = %self.plugin.name(), error = %e, "❌ Ranking failed");
            return Err(e);
        }

        debug!(broker = %self.plugin.name(), targets = self.targets.len(), "Targets ranked");
        self.state = BrokerState::Sorted;
        Ok(())
    }

    /// Next best target, or `None` once every target has been served.
    pub async fn get_best_target(&mut self) -> Result<Option<ExecutionTarget>> {
        match self.state {
            BrokerState::Initial => {
                return Err(GridError::InvalidBrokerState {
                    expected: BrokerState::Filtered.to_string(),
                    actual: self.state.to_string(),
                })
            }
            BrokerState::Filtered => self.sort_targets().await?,
            BrokerState::Exhausted => return Ok(None),
            BrokerState::Sorted | BrokerState::Serving => {}
        }

        self.state = BrokerState::Serving;
        match self.targets.get(self.cursor) {
            Some(target) => {
                let target = target.clone();
                self.last_served = Some(self.cursor);
                self.cursor += 1;
                debug!(execution_target = %target.identity(), "Serving target");
                Ok(Some(target))
            }
            None => {
                self.state = BrokerState::Exhausted;
                debug!(broker = %self.plugin.name(), "No more targets");
                Ok(None)
            }
        }
    }

    /// Books `job` on the target served last and re-ranks it.
    ///
    /// The booked target moves to its new position if it still matches, and
    /// serving restarts from the top of the ranking.
    pub fn register_job_submission(&mut self, job: &JobRequirement) -> Result<()> {
        let index = match (self.state, self.last_served) {
            (BrokerState::Serving | BrokerState::Exhausted | BrokerState::Sorted, Some(index)) => index,
            _ => {
                return Err(GridError::InvalidBrokerState {
                    expected: BrokerState::Serving.to_string(),
                    actual: self.state.to_string(),
                })
            }
        };

        let mut target = self.targets.get(index).cloned().ok_or_else(|| {
            GridError::InvalidBrokerState {
                expected: BrokerState::Serving.to_string(),
                actual: format!("{} without a served target", self.state),
            }
        })?;
        target.register_job_submission(job);

        // the session is left untouched until the new rank is known
        let position = if self.plugin.matches(&target, job) {
            let mut position = self.targets.len() - 1;
            let others = self
                .targets
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, other)| other);
            for (i, other) in others.enumerate() {
                if self.compare(&target, other)? == Ordering::Less {
                    position = i;
                    break;
                }
            }
            Some(position)
        } else {
            None
        };

        self.targets.remove(index);
        self.cursor = 0;
        self.state = BrokerState::Sorted;

        let Some(position) = position else {
            info!(execution_target = %target.identity(), "📉 Target no longer matches after booking");
            self.last_served = None;
            return Ok(());
        };

        info!(
            session = %self.session_id,
            execution_target = %target.identity(),
            position,
            "📌 Job submission registered"
        );
        self.targets.insert(position, target);
        self.last_served = Some(position);
        Ok(())
    }
}
