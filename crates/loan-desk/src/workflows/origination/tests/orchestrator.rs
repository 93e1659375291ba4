use super::common::*;
use std::sync::Arc;

use crate::workflows::origination::compliance::SALARY_RULE_ID;
use crate::workflows::origination::domain::{
    ComplianceProvenance, InputError, LoanField, RiskLevel, RulesDecision,
};
use crate::workflows::origination::orchestrator::{
    Generation, OrchestrationStatus, RunOutcome, ValidationStage,
};
use crate::workflows::origination::remote::RemoteError;

#[tokio::test]
async fn healthy_run_settles_every_stage() {
    let gateway = Arc::new(ScriptedGateway::healthy());
    let orchestrator = orchestrator(&gateway);

    let outcome = orchestrator.run(&draft()).await;
    assert_eq!(outcome, RunOutcome::Applied(Generation::new(1)));

    let state = orchestrator.current();
    assert_eq!(state.status, OrchestrationStatus::Settled);
    assert!(state.settled_at.is_some());
    let compliance = state.compliance.as_ref().expect("compliance settled");
    assert_eq!(compliance.provenance, ComplianceProvenance::Remote);

    let rules = state.rules_evaluation.as_ref().expect("rules settled");
    assert_eq!(rules.decision(), RulesDecision::Approve);
    assert_eq!(
        rules.workflow.as_ref().map(|w| w.decision.as_str()),
        Some("auto_approve")
    );
    assert_eq!(state.risk.as_ref().map(|r| r.risk_level), Some(RiskLevel::Low));
    assert!(state.notices.is_empty());
}

#[tokio::test]
async fn stale_run_is_discarded_when_it_resolves_last() {
    let gateway = Arc::new(ScriptedGateway::healthy());
    let reply_a = gateway.compliance.defer();
    let reply_b = gateway.compliance.defer();
    let orchestrator = orchestrator(&gateway);

    let run_a = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.run(&over_ceiling_draft()).await }
    });
    wait_for_calls(&gateway.compliance, 1).await;

    let run_b = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.run(&draft()).await }
    });
    wait_for_calls(&gateway.compliance, 2).await;

    reply_b
        .send(Ok(tagged_compliance(2.0)))
        .expect("run b awaiting compliance");
    let outcome_b = run_b.await.expect("run b task");
    assert_eq!(outcome_b, RunOutcome::Applied(Generation::new(2)));

    reply_a
        .send(Ok(tagged_compliance(1.0)))
        .expect("run a awaiting compliance");
    let outcome_a = run_a.await.expect("run a task");
    assert_eq!(
        outcome_a,
        RunOutcome::Discarded {
            stale: Generation::new(1),
            current: Generation::new(2),
        }
    );

    let state = orchestrator.current();
    assert_eq!(state.generation, Generation::new(2));
    assert_eq!(state.status, OrchestrationStatus::Settled);
    assert_eq!(
        state.compliance_result().and_then(|c| c.max_affordable_loan),
        Some(2.0)
    );
}

#[tokio::test]
async fn newer_trigger_hides_results_of_in_flight_run() {
    let gateway = Arc::new(ScriptedGateway::healthy());
    let reply_a = gateway.compliance.defer();
    let reply_b = gateway.compliance.defer();
    let orchestrator = orchestrator(&gateway);
    let mut observed = orchestrator.subscribe();

    let run_a = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.run(&draft()).await }
    });
    wait_for_calls(&gateway.compliance, 1).await;
    let run_b = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.run(&draft()).await }
    });
    wait_for_calls(&gateway.compliance, 2).await;

    reply_a
        .send(Ok(tagged_compliance(1.0)))
        .expect("run a awaiting compliance");
    assert!(matches!(
        run_a.await.expect("run a task"),
        RunOutcome::Discarded { .. }
    ));
    {
        let state = observed.borrow_and_update();
        assert_eq!(state.generation, Generation::new(2));
        assert_eq!(state.status, OrchestrationStatus::Validating);
        assert!(state.compliance.is_none());
    }

    reply_b
        .send(Ok(tagged_compliance(2.0)))
        .expect("run b awaiting compliance");
    run_b.await.expect("run b task");
    let settled = observed
        .wait_for(|state| state.is_settled())
        .await
        .expect("orchestrator alive");
    assert_eq!(
        settled.compliance_result().and_then(|c| c.max_affordable_loan),
        Some(2.0)
    );
}

#[tokio::test]
async fn compliance_failure_falls_back_to_salary_rule() {
    let gateway = Arc::new(ScriptedGateway {
        compliance: Script::replying(Err(RemoteError::Timeout)),
        ..ScriptedGateway::healthy()
    });
    let orchestrator = orchestrator(&gateway);

    orchestrator.run(&over_ceiling_draft()).await;

    let state = orchestrator.current();
    let compliance = state.compliance.as_ref().expect("fallback compliance");
    assert_eq!(compliance.provenance, ComplianceProvenance::LocalFallback);
    assert!(!compliance.result.compliant);
    assert_eq!(compliance.result.violations.len(), 1);
    assert_eq!(compliance.result.violations[0].rule, SALARY_RULE_ID);
    assert_eq!(compliance.result.max_affordable_payment, Some(3_000.0));

    assert!(state.rules_evaluation.is_some());
    assert!(state.risk.is_some());
}

#[tokio::test]
async fn eligibility_failure_skips_workflow_without_touching_other_stages() {
    let gateway = Arc::new(ScriptedGateway {
        eligibility: Script::replying(Err(status_error(500))),
        ..ScriptedGateway::healthy()
    });
    let orchestrator = orchestrator(&gateway);

    orchestrator.run(&draft()).await;

    let state = orchestrator.current();
    assert!(state.rules_evaluation.is_none());
    assert_eq!(gateway.workflow.calls(), 0);
    assert_eq!(
        state.compliance.as_ref().map(|c| c.provenance),
        Some(ComplianceProvenance::Remote)
    );
    assert!(state.risk.is_some());
    assert!(state.notices.is_empty());
}

#[tokio::test]
async fn workflow_failure_keeps_eligibility_result() {
    let gateway = Arc::new(ScriptedGateway {
        eligibility: Script::replying(Ok(rules_result(RulesDecision::Reject))),
        workflow: Script::replying(Err(RemoteError::Transport("connection reset".to_string()))),
        ..ScriptedGateway::healthy()
    });
    let orchestrator = orchestrator(&gateway);

    orchestrator.run(&draft()).await;

    let rules = orchestrator
        .current()
        .rules_evaluation
        .expect("eligibility stands alone");
    assert_eq!(rules.decision(), RulesDecision::Reject);
    assert_eq!(rules.eligibility.limits.get("max_amount"), Some(&250_000.0));
    assert!(rules.workflow.is_none());
}

#[tokio::test]
async fn workflow_receives_applicant_risk_level() {
    let gateway = Arc::new(ScriptedGateway::healthy());
    let orchestrator = orchestrator(&gateway);

    orchestrator.run(&draft()).await;

    let requests = gateway.workflow_requests.lock().expect("request log");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].product_type, "personal");
    assert_eq!(
        requests[0].application_data.risk_level,
        Some(RiskLevel::Medium)
    );
    assert_eq!(requests[0].application_data.credit_score, Some(712));
}

#[tokio::test]
async fn rules_are_skipped_without_loan_type() {
    let gateway = Arc::new(ScriptedGateway::healthy());
    let orchestrator = orchestrator(&gateway);
    let mut form = draft();
    form.loan_type = String::new();

    orchestrator.run(&form).await;

    assert_eq!(gateway.eligibility.calls(), 0);
    assert!(orchestrator.current().rules_evaluation.is_none());
    assert_eq!(gateway.risk.calls(), 1);
}

#[tokio::test]
async fn expected_risk_failures_stay_silent() {
    for status in [404, 422] {
        let gateway = Arc::new(ScriptedGateway {
            risk: Script::replying(Err(status_error(status))),
            ..ScriptedGateway::healthy()
        });
        let orchestrator = orchestrator(&gateway);

        orchestrator.run(&draft()).await;

        let state = orchestrator.current();
        assert!(state.risk.is_none(), "status {status}");
        assert!(state.notices.is_empty(), "status {status}");
        assert!(state.rules_evaluation.is_some());
    }
}

#[tokio::test]
async fn unexpected_risk_failures_surface_a_notice() {
    let gateway = Arc::new(ScriptedGateway {
        risk: Script::replying(Err(status_error(503))),
        ..ScriptedGateway::healthy()
    });
    let orchestrator = orchestrator(&gateway);

    orchestrator.run(&draft()).await;

    let state = orchestrator.current();
    assert!(state.risk.is_none());
    assert_eq!(state.notices.len(), 1);
    assert_eq!(state.notices[0].stage, ValidationStage::RiskPrediction);
    assert!(state.notices[0].message.contains("503"));
}

#[tokio::test]
async fn risk_request_carries_applicant_context() {
    let gateway = Arc::new(ScriptedGateway::healthy());
    let orchestrator = orchestrator(&gateway);
    let mut form = draft();
    form.applicant.employment_years = Some(6.5);
    form.applicant.age = Some(41);

    orchestrator.run(&form).await;

    let requests = gateway.risk_requests.lock().expect("request log");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].customer_id, "CUST-001");
    assert_eq!(requests[0].loan_term_months, 24);
    assert_eq!(requests[0].employment_years, Some(6.5));
    assert_eq!(requests[0].age, Some(41));
}

#[tokio::test]
async fn missing_minimum_fields_reset_to_idle_without_calls() {
    let gateway = Arc::new(ScriptedGateway::healthy());
    let orchestrator = orchestrator(&gateway);

    orchestrator.run(&draft()).await;
    assert!(orchestrator.current().is_settled());

    let mut partial = draft();
    partial.monthly_income = String::new();
    let outcome = orchestrator.run(&partial).await;

    assert_eq!(outcome, RunOutcome::Cleared(Generation::new(2)));
    let state = orchestrator.current();
    assert_eq!(state.status, OrchestrationStatus::Idle);
    assert_eq!(state.generation, Generation::new(2));
    assert!(state.compliance.is_none());
    assert!(state.rules_evaluation.is_none());
    assert!(state.risk.is_none());
    assert_eq!(gateway.compliance.calls(), 1);
}

#[tokio::test]
async fn malformed_numbers_short_circuit_before_network() {
    let gateway = Arc::new(ScriptedGateway::healthy());
    let orchestrator = orchestrator(&gateway);
    let mut form = draft();
    form.term_months = "twelve".to_string();

    let outcome = orchestrator.run(&form).await;

    match outcome {
        RunOutcome::Rejected(InputError::NotNumeric { field, .. }) => {
            assert_eq!(field, LoanField::TermMonths)
        }
        other => panic!("expected rejected input, got {other:?}"),
    }
    assert_eq!(gateway.compliance.calls(), 0);
    assert_eq!(gateway.risk.calls(), 0);
    assert_eq!(orchestrator.current().status, OrchestrationStatus::Idle);
}
