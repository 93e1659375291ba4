//! Validation orchestration for the loan application form.
//!
//! Each trigger opens a new [`Generation`] and builds a fresh [`OrchestrationState`]. Results
//! are written back only if no newer run has opened in the meantime, so a slow response from a
//! superseded run resolves into a no-op instead of overwriting newer results.

mod session;
mod stages;
mod state;

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info};

pub use session::ValidationSession;
pub use stages::{evaluate_stages, ComplianceOutcome, StageNotice, StageResults, ValidationStage};
pub use state::{Generation, OrchestrationState, OrchestrationStatus, StaleRun};

use super::domain::{ApplicationDraft, InputError};
use super::remote::RemoteServices;

/// How a single call to [`ValidationOrchestrator::run`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The run settled and its results are the visible state.
    Applied(Generation),
    /// A newer run opened first; these results were dropped.
    Discarded {
        stale: Generation,
        current: Generation,
    },
    /// Minimum fields were missing, so the state was reset without calling out.
    Cleared(Generation),
    /// Inputs could not be coerced to numbers; the state was reset without calling out.
    Rejected(InputError),
}

pub struct ValidationOrchestrator {
    services: RemoteServices,
    generations: AtomicU64,
    state: watch::Sender<OrchestrationState>,
}

impl ValidationOrchestrator {
    pub fn new(services: RemoteServices) -> Self {
        let (state, _) = watch::channel(OrchestrationState::default());
        Self {
            services,
            generations: AtomicU64::new(Generation::INITIAL.value()),
            state,
        }
    }

    pub fn services(&self) -> &RemoteServices {
        &self.services
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestrationState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> OrchestrationState {
        self.state.borrow().clone()
    }

    pub async fn run(&self, draft: &ApplicationDraft) -> RunOutcome {
        let generation = self.next_generation();

        if !draft.has_minimum_fields() {
            self.reset(generation);
            return RunOutcome::Cleared(generation);
        }

        let inputs = match draft.loan_inputs() {
            Ok(inputs) => inputs,
            Err(err) => {
                debug!(%generation, error = %err, "draft inputs rejected before validation");
                self.reset(generation);
                return RunOutcome::Rejected(err);
            }
        };

        if let Err(stale) = self.advance(OrchestrationState::validating(generation)) {
            return self.discard(stale);
        }

        let results = evaluate_stages(&self.services, draft, &inputs).await;
        let compliant = results.compliance.result.compliant;
        let provenance = results.compliance.provenance;

        match self.advance(OrchestrationState::settled(generation, results)) {
            Ok(()) => {
                info!(%generation, compliant, ?provenance, "validation run settled");
                RunOutcome::Applied(generation)
            }
            Err(stale) => self.discard(stale),
        }
    }

    fn next_generation(&self) -> Generation {
        Generation::new(self.generations.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn reset(&self, generation: Generation) {
        if let Err(stale) = self.advance(OrchestrationState::idle(generation)) {
            debug!(stale = %stale.stale, current = %stale.current, "reset superseded");
        }
    }

    fn advance(&self, next: OrchestrationState) -> Result<(), StaleRun> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| match state.advance(next) {
            Ok(()) => true,
            Err(stale) => {
                outcome = Err(stale);
                false
            }
        });
        outcome
    }

    fn discard(&self, stale: StaleRun) -> RunOutcome {
        debug!(
            stale = %stale.stale,
            current = %stale.current,
            "discarding results from superseded validation run"
        );
        RunOutcome::Discarded {
            stale: stale.stale,
            current: stale.current,
        }
    }
}
