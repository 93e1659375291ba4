use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{OrchestrationState, ValidationOrchestrator};
use crate::workflows::origination::debounce::{DebounceWindow, InputDebouncer};
use crate::workflows::origination::domain::ApplicationDraft;

/// A form editing session: edits are debounced and each settled draft starts a validation run.
///
/// Dropping the session cancels any pending trigger. Runs already in flight finish on their
/// own and are still subject to the orchestrator's stale-run check.
pub struct ValidationSession {
    debouncer: InputDebouncer<ApplicationDraft>,
    state: watch::Receiver<OrchestrationState>,
    driver: JoinHandle<()>,
}

impl ValidationSession {
    pub fn spawn(orchestrator: Arc<ValidationOrchestrator>, quiet: Duration) -> Self {
        let (debouncer, mut settled) = InputDebouncer::spawn(quiet);
        let state = orchestrator.subscribe();

        let driver = tokio::spawn(async move {
            while let Some(draft) = settled.recv().await {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    orchestrator.run(&draft).await;
                });
            }
        });

        Self {
            debouncer,
            state,
            driver,
        }
    }

    pub fn with_default_window(orchestrator: Arc<ValidationOrchestrator>) -> Self {
        Self::spawn(orchestrator, DebounceWindow::Validation.duration())
    }

    /// Record the latest form snapshot. Returns `false` once the session has stopped.
    pub fn edit(&self, draft: ApplicationDraft) -> bool {
        self.debouncer.push(draft)
    }

    pub fn state(&self) -> watch::Receiver<OrchestrationState> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> OrchestrationState {
        self.state.borrow().clone()
    }
}

impl Drop for ValidationSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
