use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stages::{ComplianceOutcome, StageNotice, StageResults};
use crate::workflows::origination::domain::{ComplianceResult, RiskPrediction, RulesEvaluation};

/// Monotonic token identifying one orchestration run.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub const INITIAL: Generation = Generation(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationStatus {
    Idle,
    Validating,
    Settled,
}

/// A state transition arrived from a run that has since been superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("run {stale} superseded by run {current}")]
pub struct StaleRun {
    pub stale: Generation,
    pub current: Generation,
}

/// The UI-visible validation state. Every transition replaces the whole value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestrationState {
    pub generation: Generation,
    pub status: OrchestrationStatus,
    pub compliance: Option<ComplianceOutcome>,
    pub rules_evaluation: Option<RulesEvaluation>,
    pub risk: Option<RiskPrediction>,
    pub notices: Vec<StageNotice>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Default for OrchestrationState {
    fn default() -> Self {
        Self::idle(Generation::INITIAL)
    }
}

impl OrchestrationState {
    pub fn idle(generation: Generation) -> Self {
        Self::empty(generation, OrchestrationStatus::Idle)
    }

    pub fn validating(generation: Generation) -> Self {
        Self::empty(generation, OrchestrationStatus::Validating)
    }

    pub fn settled(generation: Generation, results: StageResults) -> Self {
        Self {
            generation,
            status: OrchestrationStatus::Settled,
            compliance: Some(results.compliance),
            rules_evaluation: results.rules_evaluation,
            risk: results.risk,
            notices: results.notices,
            settled_at: Some(Utc::now()),
        }
    }

    fn empty(generation: Generation, status: OrchestrationStatus) -> Self {
        Self {
            generation,
            status,
            compliance: None,
            rules_evaluation: None,
            risk: None,
            notices: Vec::new(),
            settled_at: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status == OrchestrationStatus::Settled
    }

    pub fn compliance_result(&self) -> Option<&ComplianceResult> {
        self.compliance.as_ref().map(|outcome| &outcome.result)
    }

    /// Replace this state with `next` if it belongs to the newest run.
    ///
    /// Runs open with a strictly newer generation; a run may only settle the generation it
    /// opened, and only while that generation is still validating.
    pub fn advance(&mut self, next: OrchestrationState) -> Result<(), StaleRun> {
        let accepted = match next.status {
            OrchestrationStatus::Settled => {
                next.generation == self.generation
                    && self.status == OrchestrationStatus::Validating
            }
            OrchestrationStatus::Idle | OrchestrationStatus::Validating => {
                next.generation > self.generation
            }
        };

        if !accepted {
            return Err(StaleRun {
                stale: next.generation,
                current: self.generation,
            });
        }

        *self = next;
        Ok(())
    }
}
