use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationDraft, ComplianceResult, LoanInputs, RiskLevel, RiskPrediction, RulesResult,
    WorkflowResult,
};

/// Failure reported by a remote collaborator, including timeouts enforced by the transport.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote service responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("remote service timed out")]
    Timeout,
    #[error("remote service unreachable: {0}")]
    Transport(String),
    #[error("remote service returned an unreadable payload: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Unprocessable or not-found responses are routine for partially filled applications.
    pub fn is_expected(&self) -> bool {
        matches!(self.status(), Some(404) | Some(422))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            RemoteError::Timeout
        } else if value.is_decode() {
            RemoteError::Decode(value.to_string())
        } else {
            RemoteError::Transport(value.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRequest {
    pub loan_amount: f64,
    pub monthly_income: f64,
    pub loan_term_months: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_debt_service: Option<f64>,
}

impl From<&LoanInputs> for ComplianceRequest {
    fn from(inputs: &LoanInputs) -> Self {
        Self {
            loan_amount: inputs.requested_amount,
            monthly_income: inputs.monthly_income,
            loan_term_months: inputs.term_months,
            interest_rate: inputs.interest_rate_percent,
            monthly_debt_service: inputs.existing_monthly_debt,
        }
    }
}

/// Application facts shared by the eligibility and workflow rule engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleApplicationData {
    pub customer_id: String,
    pub loan_amount: f64,
    pub monthly_income: f64,
    pub loan_term_months: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
}

impl RuleApplicationData {
    pub fn new(customer_id: &str, draft: &ApplicationDraft, inputs: &LoanInputs) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            loan_amount: inputs.requested_amount,
            monthly_income: inputs.monthly_income,
            loan_term_months: inputs.term_months,
            credit_score: draft.applicant.credit_score,
            risk_level: draft.applicant.risk_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRequest {
    pub product_type: String,
    pub application_data: RuleApplicationData,
    pub evaluation_scope: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub application_data: RuleApplicationData,
    pub product_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRequest {
    pub customer_id: String,
    pub loan_amount: f64,
    pub loan_term_months: u32,
    pub monthly_income: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_years: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u16>,
}

#[async_trait]
pub trait ComplianceEngine: Send + Sync {
    async fn validate_compliance(
        &self,
        request: &ComplianceRequest,
    ) -> Result<ComplianceResult, RemoteError>;
}

#[async_trait]
pub trait EligibilityRulesEngine: Send + Sync {
    async fn evaluate_eligibility_rules(
        &self,
        request: &EligibilityRequest,
    ) -> Result<RulesResult, RemoteError>;
}

#[async_trait]
pub trait WorkflowRulesEngine: Send + Sync {
    async fn evaluate_workflow_rules(
        &self,
        request: &WorkflowRequest,
    ) -> Result<WorkflowResult, RemoteError>;
}

#[async_trait]
pub trait RiskModel: Send + Sync {
    async fn predict_default_risk(
        &self,
        request: &RiskRequest,
    ) -> Result<RiskPrediction, RemoteError>;
}

/// Existing application as listed by the origination back office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub customer_id: String,
    #[serde(alias = "application_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationQuery {
    pub customer_id: String,
    pub loan_type: String,
    pub limit: u32,
}

#[async_trait]
pub trait ApplicationDirectory: Send + Sync {
    async fn list_applications(
        &self,
        query: &ApplicationQuery,
    ) -> Result<Vec<ApplicationSummary>, RemoteError>;
}

/// The collaborators the decision layer consults, shared across runs.
#[derive(Clone)]
pub struct RemoteServices {
    pub compliance: Arc<dyn ComplianceEngine>,
    pub eligibility: Arc<dyn EligibilityRulesEngine>,
    pub workflow: Arc<dyn WorkflowRulesEngine>,
    pub risk: Arc<dyn RiskModel>,
    pub directory: Arc<dyn ApplicationDirectory>,
}

impl RemoteServices {
    /// Route every collaborator through one backend, typically the API gateway client.
    pub fn shared<G>(backend: Arc<G>) -> Self
    where
        G: ComplianceEngine
            + EligibilityRulesEngine
            + WorkflowRulesEngine
            + RiskModel
            + ApplicationDirectory
            + 'static,
    {
        Self {
            compliance: backend.clone(),
            eligibility: backend.clone(),
            workflow: backend.clone(),
            risk: backend.clone(),
            directory: backend,
        }
    }
}
