use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::workflows::origination::domain::{
    ApplicationDraft, ComplianceResult, RiskLevel, RiskPrediction, RulesDecision, RulesResult,
    WorkflowResult,
};
use crate::workflows::origination::remote::{
    ApplicationDirectory, ApplicationQuery, ApplicationSummary, ComplianceEngine,
    ComplianceRequest, EligibilityRequest, EligibilityRulesEngine, RemoteError, RemoteServices,
    RiskModel, RiskRequest, WorkflowRequest, WorkflowRulesEngine,
};
use crate::workflows::origination::{DecisionDeskService, ValidationOrchestrator};

type Reply<T> = Result<T, RemoteError>;

/// Canned replies for one remote call. Deferred replies are handed out in call order and
/// resolve when the test sends on the matching sender; otherwise the default reply is used.
pub(super) struct Script<T> {
    default: Reply<T>,
    deferred: Mutex<VecDeque<oneshot::Receiver<Reply<T>>>>,
    calls: AtomicUsize,
}

impl<T: Clone + Send> Script<T> {
    pub(super) fn replying(default: Reply<T>) -> Self {
        Self {
            default,
            deferred: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn defer(&self) -> oneshot::Sender<Reply<T>> {
        let (tx, rx) = oneshot::channel();
        self.deferred.lock().expect("script lock").push_back(rx);
        tx
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next(&self) -> Reply<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let deferred = self.deferred.lock().expect("script lock").pop_front();
        match deferred {
            Some(reply) => reply
                .await
                .unwrap_or_else(|_| Err(RemoteError::Transport("reply dropped".to_string()))),
            None => self.default.clone(),
        }
    }
}

/// In-memory stand-in for every remote collaborator.
pub(super) struct ScriptedGateway {
    pub(super) compliance: Script<ComplianceResult>,
    pub(super) eligibility: Script<RulesResult>,
    pub(super) workflow: Script<WorkflowResult>,
    pub(super) risk: Script<RiskPrediction>,
    pub(super) applications: Script<Vec<ApplicationSummary>>,
    pub(super) risk_requests: Mutex<Vec<RiskRequest>>,
    pub(super) workflow_requests: Mutex<Vec<WorkflowRequest>>,
}

impl ScriptedGateway {
    pub(super) fn healthy() -> Self {
        Self {
            compliance: Script::replying(Ok(remote_compliance(true, 0))),
            eligibility: Script::replying(Ok(rules_result(RulesDecision::Approve))),
            workflow: Script::replying(Ok(workflow_result())),
            risk: Script::replying(Ok(risk_prediction())),
            applications: Script::replying(Ok(Vec::new())),
            risk_requests: Mutex::new(Vec::new()),
            workflow_requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ComplianceEngine for ScriptedGateway {
    async fn validate_compliance(
        &self,
        _request: &ComplianceRequest,
    ) -> Result<ComplianceResult, RemoteError> {
        self.compliance.next().await
    }
}

#[async_trait]
impl EligibilityRulesEngine for ScriptedGateway {
    async fn evaluate_eligibility_rules(
        &self,
        _request: &EligibilityRequest,
    ) -> Result<RulesResult, RemoteError> {
        self.eligibility.next().await
    }
}

#[async_trait]
impl WorkflowRulesEngine for ScriptedGateway {
    async fn evaluate_workflow_rules(
        &self,
        request: &WorkflowRequest,
    ) -> Result<WorkflowResult, RemoteError> {
        self.workflow_requests
            .lock()
            .expect("request log")
            .push(request.clone());
        self.workflow.next().await
    }
}

#[async_trait]
impl RiskModel for ScriptedGateway {
    async fn predict_default_risk(
        &self,
        request: &RiskRequest,
    ) -> Result<RiskPrediction, RemoteError> {
        self.risk_requests
            .lock()
            .expect("request log")
            .push(request.clone());
        self.risk.next().await
    }
}

#[async_trait]
impl ApplicationDirectory for ScriptedGateway {
    async fn list_applications(
        &self,
        _query: &ApplicationQuery,
    ) -> Result<Vec<ApplicationSummary>, RemoteError> {
        self.applications.next().await
    }
}

pub(super) fn orchestrator(gateway: &Arc<ScriptedGateway>) -> Arc<ValidationOrchestrator> {
    Arc::new(ValidationOrchestrator::new(RemoteServices::shared(
        Arc::clone(gateway),
    )))
}

pub(super) fn desk_service(gateway: ScriptedGateway) -> DecisionDeskService {
    DecisionDeskService::new(RemoteServices::shared(Arc::new(gateway)))
}

pub(super) fn draft() -> ApplicationDraft {
    let mut draft = ApplicationDraft {
        customer_id: "CUST-001".to_string(),
        loan_type: "personal".to_string(),
        requested_amount: "100000".to_string(),
        term_months: "24".to_string(),
        monthly_income: "15000".to_string(),
        interest_rate: "15".to_string(),
        ..ApplicationDraft::default()
    };
    draft.applicant.credit_score = Some(712);
    draft.applicant.risk_level = Some(RiskLevel::Medium);
    draft
}

/// 120_000 over 36 months against 9_000 income breaches the 3_000 salary ceiling.
pub(super) fn over_ceiling_draft() -> ApplicationDraft {
    ApplicationDraft {
        requested_amount: "120000".to_string(),
        term_months: "36".to_string(),
        monthly_income: "9000".to_string(),
        interest_rate: String::new(),
        ..draft()
    }
}

pub(super) fn remote_compliance(compliant: bool, violations: usize) -> ComplianceResult {
    ComplianceResult {
        compliant,
        violations: (0..violations)
            .map(|idx| {
                crate::workflows::origination::domain::Violation::new(
                    format!("remote-rule-{idx}"),
                    "flagged by compliance engine",
                )
            })
            .collect(),
        warnings: Vec::new(),
        max_affordable_payment: Some(5_000.0),
        max_affordable_loan: None,
        recommended_interest_rate: None,
        recommended_max_term_months: None,
    }
}

/// Remote verdict tagged so tests can tell which run produced it.
pub(super) fn tagged_compliance(tag: f64) -> ComplianceResult {
    ComplianceResult {
        max_affordable_loan: Some(tag),
        ..remote_compliance(true, 0)
    }
}

pub(super) fn rules_result(decision: RulesDecision) -> RulesResult {
    RulesResult {
        decision,
        limits: BTreeMap::from([("max_amount".to_string(), 250_000.0)]),
        pricing: BTreeMap::new(),
        flags: Vec::new(),
        matched_rules: Vec::new(),
    }
}

pub(super) fn workflow_result() -> WorkflowResult {
    WorkflowResult {
        decision: "auto_approve".to_string(),
        decision_reason: Some("within delegated authority".to_string()),
        approval_level: Some("branch".to_string()),
    }
}

pub(super) fn risk_prediction() -> RiskPrediction {
    RiskPrediction {
        risk_score: 0.21,
        risk_level: RiskLevel::Low,
        default_probability: Some(0.04),
        time_to_default_months: None,
    }
}

pub(super) fn status_error(status: u16) -> RemoteError {
    RemoteError::Status {
        status,
        message: "scripted failure".to_string(),
    }
}

pub(super) fn summary(customer_id: &str, status: &str) -> ApplicationSummary {
    ApplicationSummary {
        customer_id: customer_id.to_string(),
        status: status.to_string(),
        application_number: None,
    }
}

pub(super) async fn wait_for_calls<T: Clone + Send>(script: &Script<T>, expected: usize) {
    while script.calls() < expected {
        tokio::task::yield_now().await;
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
