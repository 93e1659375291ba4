use serde::{Deserialize, Serialize};

use super::domain::{
    parse_term, ApplicationDraft, ComplianceResult, RulesDecision, RulesEvaluation,
};

const MAX_TERM_MONTHS: u32 = 60;

/// Why a submission cannot go ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionBlock {
    #[error("customer id missing")]
    MissingCustomer,
    #[error("requested amount invalid")]
    InvalidAmount,
    #[error("loan term out of range")]
    TermOutOfRange,
    #[error("monthly income missing")]
    MissingIncome,
    #[error("compliance violations outstanding")]
    ComplianceViolations,
    #[error("rules engine rejection not confirmed")]
    ConfirmationDeclined,
    #[error("submission not allowed")]
    NotAllowed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDecision {
    pub allowed: bool,
    pub requires_confirmation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<SubmissionBlock>,
}

impl SubmissionDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            requires_confirmation: false,
            reason: None,
            block: None,
        }
    }

    fn blocked(block: SubmissionBlock, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            requires_confirmation: false,
            reason: Some(reason.into()),
            block: Some(block),
        }
    }

    fn confirm(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            requires_confirmation: true,
            reason: Some(reason.into()),
            block: None,
        }
    }
}

/// Decide whether the draft may be submitted given the latest settled validation results.
///
/// Field requirements are checked first and independently of any remote result. Outstanding
/// compliance violations block outright; a rules-engine rejection only asks for confirmation.
pub fn can_submit(
    draft: &ApplicationDraft,
    compliance: Option<&ComplianceResult>,
    rules_evaluation: Option<&RulesEvaluation>,
) -> SubmissionDecision {
    if let Some(decision) = field_requirements(draft) {
        return decision;
    }

    if let Some(compliance) = compliance.filter(|result| result.has_violations()) {
        return SubmissionDecision::blocked(
            SubmissionBlock::ComplianceViolations,
            format!(
                "Cannot submit non-compliant loan. {} violation(s) found. Please review and fix the issues.",
                compliance.violations.len()
            ),
        );
    }

    if rules_evaluation.map(RulesEvaluation::decision) == Some(RulesDecision::Reject) {
        return SubmissionDecision::confirm(
            "Rules Engine indicates customer is not eligible for this product. Do you want to proceed anyway?",
        );
    }

    SubmissionDecision::allow()
}

/// Final gate applied after the user has answered any confirmation prompt.
pub fn confirm_submission(
    decision: &SubmissionDecision,
    user_confirmed: bool,
) -> Result<(), SubmissionBlock> {
    if !decision.allowed {
        return Err(decision.block.unwrap_or(SubmissionBlock::NotAllowed));
    }
    if decision.requires_confirmation && !user_confirmed {
        return Err(SubmissionBlock::ConfirmationDeclined);
    }
    Ok(())
}

fn field_requirements(draft: &ApplicationDraft) -> Option<SubmissionDecision> {
    if draft.customer_id().is_none() {
        return Some(SubmissionDecision::blocked(
            SubmissionBlock::MissingCustomer,
            "Customer ID is required",
        ));
    }

    if !positive(&draft.requested_amount) {
        return Some(SubmissionDecision::blocked(
            SubmissionBlock::InvalidAmount,
            "Valid requested amount is required",
        ));
    }

    match parse_term(&draft.term_months) {
        Ok(term) if term <= MAX_TERM_MONTHS => {}
        _ => {
            return Some(SubmissionDecision::blocked(
                SubmissionBlock::TermOutOfRange,
                format!("Loan term must be between 1 and {MAX_TERM_MONTHS} months"),
            ))
        }
    }

    if !positive(&draft.monthly_income) {
        return Some(SubmissionDecision::blocked(
            SubmissionBlock::MissingIncome,
            "Monthly income is required for NBE compliance",
        ));
    }

    None
}

fn positive(raw: &str) -> bool {
    raw.trim()
        .parse::<f64>()
        .map(|value| value.is_finite() && value > 0.0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::origination::domain::{RulesResult, Violation};
    use std::collections::BTreeMap;

    fn draft() -> ApplicationDraft {
        ApplicationDraft {
            customer_id: "CUST-001".to_string(),
            loan_type: "personal".to_string(),
            requested_amount: "100000".to_string(),
            term_months: "24".to_string(),
            monthly_income: "15000".to_string(),
            ..ApplicationDraft::default()
        }
    }

    fn compliance(compliant: bool, violations: usize) -> ComplianceResult {
        ComplianceResult {
            compliant,
            violations: (0..violations)
                .map(|idx| Violation::new(format!("rule-{idx}"), "breached"))
                .collect(),
            warnings: Vec::new(),
            max_affordable_payment: None,
            max_affordable_loan: None,
            recommended_interest_rate: None,
            recommended_max_term_months: None,
        }
    }

    fn rules(decision: RulesDecision) -> RulesEvaluation {
        RulesEvaluation {
            eligibility: RulesResult {
                decision,
                limits: BTreeMap::new(),
                pricing: BTreeMap::new(),
                flags: Vec::new(),
                matched_rules: Vec::new(),
            },
            workflow: None,
        }
    }

    #[test]
    fn clean_application_is_allowed() {
        let decision = can_submit(
            &draft(),
            Some(&compliance(true, 0)),
            Some(&rules(RulesDecision::Approve)),
        );
        assert_eq!(decision, SubmissionDecision::allow());
        assert_eq!(confirm_submission(&decision, false), Ok(()));
    }

    #[test]
    fn violations_block_regardless_of_compliant_flag() {
        for flag in [false, true] {
            let decision = can_submit(&draft(), Some(&compliance(flag, 2)), None);
            assert!(!decision.allowed);
            assert_eq!(decision.block, Some(SubmissionBlock::ComplianceViolations));
            assert!(decision
                .reason
                .as_deref()
                .is_some_and(|reason| reason.contains("2 violation(s)")));
        }
    }

    #[test]
    fn non_compliant_without_violations_does_not_block() {
        let decision = can_submit(&draft(), Some(&compliance(false, 0)), None);
        assert!(decision.allowed);
    }

    #[test]
    fn rules_rejection_requires_confirmation() {
        let decision = can_submit(
            &draft(),
            Some(&compliance(true, 0)),
            Some(&rules(RulesDecision::Reject)),
        );
        assert!(decision.allowed);
        assert!(decision.requires_confirmation);
        assert_eq!(
            confirm_submission(&decision, false),
            Err(SubmissionBlock::ConfirmationDeclined)
        );
        assert_eq!(confirm_submission(&decision, true), Ok(()));
    }

    #[test]
    fn compliance_block_wins_over_rules_confirmation() {
        let decision = can_submit(
            &draft(),
            Some(&compliance(false, 1)),
            Some(&rules(RulesDecision::Reject)),
        );
        assert!(!decision.allowed);
        assert!(!decision.requires_confirmation);
        assert_eq!(
            confirm_submission(&decision, true),
            Err(SubmissionBlock::ComplianceViolations)
        );
    }

    #[test]
    fn field_checks_run_before_remote_results() {
        let mut missing_customer = draft();
        missing_customer.customer_id = "   ".to_string();
        let decision = can_submit(&missing_customer, Some(&compliance(false, 3)), None);
        assert_eq!(decision.block, Some(SubmissionBlock::MissingCustomer));
        assert_eq!(decision.reason.as_deref(), Some("Customer ID is required"));

        let mut zero_amount = draft();
        zero_amount.requested_amount = "0".to_string();
        assert_eq!(
            can_submit(&zero_amount, None, None).block,
            Some(SubmissionBlock::InvalidAmount)
        );

        let mut no_income = draft();
        no_income.monthly_income = String::new();
        assert_eq!(
            can_submit(&no_income, None, None).reason.as_deref(),
            Some("Monthly income is required for NBE compliance")
        );
    }

    #[test]
    fn refusals_without_a_recorded_block_stay_generic() {
        let decision = SubmissionDecision {
            allowed: false,
            requires_confirmation: false,
            reason: None,
            block: None,
        };
        assert_eq!(
            confirm_submission(&decision, true),
            Err(SubmissionBlock::NotAllowed)
        );

        let blocked = can_submit(&ApplicationDraft::default(), None, None);
        assert_eq!(
            confirm_submission(&blocked, true),
            Err(SubmissionBlock::MissingCustomer)
        );
    }

    #[test]
    fn term_must_fall_within_sixty_months() {
        for (term, allowed) in [("0", false), ("1", true), ("60", true), ("61", false), ("x", false)] {
            let mut form = draft();
            form.term_months = term.to_string();
            let decision = can_submit(&form, None, None);
            assert_eq!(decision.allowed, allowed, "term {term}");
            if !allowed {
                assert_eq!(decision.block, Some(SubmissionBlock::TermOutOfRange));
            }
        }
    }
}
