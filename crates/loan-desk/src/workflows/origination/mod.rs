//! Loan origination decision support: affordability math, debounced remote validation,
//! submission gating, and duplicate-draft detection.

pub mod affordability;
pub mod compliance;
pub mod debounce;
pub mod domain;
pub mod duplicates;
pub mod gateway;
pub mod orchestrator;
pub mod remote;
pub mod router;
pub mod service;
pub mod submission;

#[cfg(test)]
mod tests;

pub use affordability::{
    assess, compute_affordability, cross_field_issues, monthly_payment, AffordabilityReport,
    AffordabilityResult,
};
pub use compliance::{
    fallback_compliance, ComplianceReport, CustomerType, NbeComplianceValidator, NbeRules,
};
pub use debounce::{DebounceWindow, InputDebouncer};
pub use domain::{
    ApplicantContext, ApplicationDraft, ComplianceProvenance, ComplianceResult, FieldIssue,
    InputError, IssueSeverity, LoanField, LoanInputs, MatchedRule, RiskLevel, RiskPrediction,
    RulesDecision, RulesEvaluation, RulesResult, Violation, WorkflowResult,
};
pub use duplicates::{check_duplicates, DuplicateWarning};
pub use gateway::HttpGateway;
pub use orchestrator::{
    ComplianceOutcome, Generation, OrchestrationState, OrchestrationStatus, RunOutcome,
    StageNotice, StageResults, ValidationOrchestrator, ValidationSession, ValidationStage,
};
pub use remote::{
    ApplicationDirectory, ApplicationSummary, ComplianceEngine, EligibilityRulesEngine,
    RemoteError, RemoteServices, RiskModel, WorkflowRulesEngine,
};
pub use router::desk_router;
pub use service::{DecisionDeskService, DeskServiceError};
pub use submission::{can_submit, confirm_submission, SubmissionBlock, SubmissionDecision};
