use super::affordability::{self, AffordabilityReport};
use super::compliance::{ComplianceReport, CustomerType, NbeComplianceValidator};
use super::domain::{ApplicationDraft, ComplianceResult, InputError, LoanInputs, RulesEvaluation};
use super::duplicates::check_duplicates;
use super::orchestrator::{evaluate_stages, StageResults};
use super::remote::RemoteServices;
use super::submission::{can_submit, SubmissionDecision};
use crate::workflows::ensemble::{EnsembleAnalysis, EnsembleError, ModelEnsemble};

/// Stateless facade over the decision layer used by the HTTP surface and the CLI.
pub struct DecisionDeskService {
    services: RemoteServices,
    validator: NbeComplianceValidator,
}

impl DecisionDeskService {
    pub fn new(services: RemoteServices) -> Self {
        Self::with_validator(services, NbeComplianceValidator::default())
    }

    pub fn with_validator(services: RemoteServices, validator: NbeComplianceValidator) -> Self {
        Self {
            services,
            validator,
        }
    }

    pub fn services(&self) -> &RemoteServices {
        &self.services
    }

    pub fn affordability(
        &self,
        inputs: &LoanInputs,
    ) -> Result<AffordabilityReport, DeskServiceError> {
        inputs.validate()?;
        Ok(affordability::assess(inputs))
    }

    /// Full local NBE check, pricing the proposed payment with the annuity formula.
    pub fn compliance_report(
        &self,
        inputs: &LoanInputs,
        customer_type: CustomerType,
    ) -> Result<ComplianceReport, DeskServiceError> {
        inputs.validate()?;
        let payment = affordability::monthly_payment(
            inputs.requested_amount,
            inputs.term_months,
            inputs.interest_rate_percent,
        );
        Ok(self.validator.report(inputs, Some(payment), customer_type))
    }

    /// One-shot orchestration of every remote stage, without debounce or shared state.
    pub async fn validate(
        &self,
        draft: &ApplicationDraft,
    ) -> Result<StageResults, DeskServiceError> {
        let inputs = draft.loan_inputs()?;
        Ok(evaluate_stages(&self.services, draft, &inputs).await)
    }

    pub fn submission_check(
        &self,
        draft: &ApplicationDraft,
        compliance: Option<&ComplianceResult>,
        rules_evaluation: Option<&RulesEvaluation>,
    ) -> SubmissionDecision {
        can_submit(draft, compliance, rules_evaluation)
    }

    pub async fn duplicate_warning(&self, draft: &ApplicationDraft) -> Option<String> {
        check_duplicates(self.services.directory.as_ref(), draft).await
    }

    pub fn analyze_ensemble(
        &self,
        ensemble: &ModelEnsemble,
    ) -> Result<EnsembleAnalysis, DeskServiceError> {
        Ok(ensemble.analyze()?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeskServiceError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Ensemble(#[from] EnsembleError),
}
