use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::workflows::origination::compliance::fallback_compliance;
use crate::workflows::origination::domain::{
    ApplicationDraft, ComplianceProvenance, ComplianceResult, LoanInputs, RiskPrediction,
    RulesEvaluation,
};
use crate::workflows::origination::remote::{
    ComplianceRequest, EligibilityRequest, RemoteServices, RiskRequest, RuleApplicationData,
    WorkflowRequest,
};

const EVALUATION_SCOPE: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    Compliance,
    EligibilityRules,
    WorkflowRules,
    RiskPrediction,
}

impl ValidationStage {
    pub const fn label(self) -> &'static str {
        match self {
            ValidationStage::Compliance => "compliance",
            ValidationStage::EligibilityRules => "eligibility_rules",
            ValidationStage::WorkflowRules => "workflow_rules",
            ValidationStage::RiskPrediction => "risk_prediction",
        }
    }
}

/// Warning surfaced to the user about a stage that failed unexpectedly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageNotice {
    pub stage: ValidationStage,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceOutcome {
    pub result: ComplianceResult,
    pub provenance: ComplianceProvenance,
}

/// Outcome of all four stages of one run. Compliance always resolves, remotely or locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResults {
    pub compliance: ComplianceOutcome,
    pub rules_evaluation: Option<RulesEvaluation>,
    pub risk: Option<RiskPrediction>,
    pub notices: Vec<StageNotice>,
}

/// Run every stage to completion. Compliance, the rules chain and risk run concurrently;
/// workflow rules wait on eligibility. No stage failure escapes this function.
pub async fn evaluate_stages(
    services: &RemoteServices,
    draft: &ApplicationDraft,
    inputs: &LoanInputs,
) -> StageResults {
    let (compliance, rules_evaluation, risk) = tokio::join!(
        check_compliance(services, inputs),
        evaluate_rules(services, draft, inputs),
        predict_risk(services, draft, inputs),
    );

    let (risk, notices) = match risk {
        Ok(prediction) => (prediction, Vec::new()),
        Err(notice) => (None, vec![notice]),
    };

    StageResults {
        compliance,
        rules_evaluation,
        risk,
        notices,
    }
}

async fn check_compliance(services: &RemoteServices, inputs: &LoanInputs) -> ComplianceOutcome {
    let request = ComplianceRequest::from(inputs);
    match services.compliance.validate_compliance(&request).await {
        Ok(result) => ComplianceOutcome {
            result,
            provenance: ComplianceProvenance::Remote,
        },
        Err(err) => {
            warn!(
                stage = ValidationStage::Compliance.label(),
                error = %err,
                "compliance engine unavailable, applying local 1/3 salary rule"
            );
            ComplianceOutcome {
                result: fallback_compliance(inputs),
                provenance: ComplianceProvenance::LocalFallback,
            }
        }
    }
}

async fn evaluate_rules(
    services: &RemoteServices,
    draft: &ApplicationDraft,
    inputs: &LoanInputs,
) -> Option<RulesEvaluation> {
    let (Some(customer_id), Some(product_type)) = (draft.customer_id(), draft.loan_type()) else {
        debug!(
            stage = ValidationStage::EligibilityRules.label(),
            "customer or product missing, skipping rules"
        );
        return None;
    };

    let application_data = RuleApplicationData::new(customer_id, draft, inputs);
    let eligibility_request = EligibilityRequest {
        product_type: product_type.to_string(),
        application_data: application_data.clone(),
        evaluation_scope: EVALUATION_SCOPE.to_string(),
    };

    let eligibility = match services
        .eligibility
        .evaluate_eligibility_rules(&eligibility_request)
        .await
    {
        Ok(result) => result,
        Err(err) => {
            warn!(
                stage = ValidationStage::EligibilityRules.label(),
                error = %err,
                "eligibility rules evaluation failed"
            );
            return None;
        }
    };

    let workflow_request = WorkflowRequest {
        application_data,
        product_type: product_type.to_string(),
    };
    let workflow = match services
        .workflow
        .evaluate_workflow_rules(&workflow_request)
        .await
    {
        Ok(result) => Some(result),
        Err(err) => {
            warn!(
                stage = ValidationStage::WorkflowRules.label(),
                error = %err,
                "workflow rules evaluation failed, keeping eligibility result"
            );
            None
        }
    };

    Some(RulesEvaluation {
        eligibility,
        workflow,
    })
}

async fn predict_risk(
    services: &RemoteServices,
    draft: &ApplicationDraft,
    inputs: &LoanInputs,
) -> Result<Option<RiskPrediction>, StageNotice> {
    let Some(customer_id) = draft.customer_id() else {
        debug!(
            stage = ValidationStage::RiskPrediction.label(),
            "customer missing, skipping risk prediction"
        );
        return Ok(None);
    };

    let request = RiskRequest {
        customer_id: customer_id.to_string(),
        loan_amount: inputs.requested_amount,
        loan_term_months: inputs.term_months,
        monthly_income: inputs.monthly_income,
        credit_score: draft.applicant.credit_score,
        employment_years: draft.applicant.employment_years,
        age: draft.applicant.age,
    };

    match services.risk.predict_default_risk(&request).await {
        Ok(prediction) => Ok(Some(prediction)),
        Err(err) if err.is_expected() => {
            debug!(
                stage = ValidationStage::RiskPrediction.label(),
                error = %err,
                "risk prediction unavailable for this application"
            );
            Ok(None)
        }
        Err(err) => {
            warn!(
                stage = ValidationStage::RiskPrediction.label(),
                error = %err,
                "risk prediction failed"
            );
            Err(StageNotice {
                stage: ValidationStage::RiskPrediction,
                message: format!("Risk prediction unavailable: {err}"),
            })
        }
    }
}
