//! Deterministic affordability math. Nothing here touches the network, so the same inputs
//! always produce bit-identical outputs.

use serde::{Deserialize, Serialize};

use super::domain::{FieldIssue, IssueSeverity, LoanField, LoanInputs};

/// Share of monthly income that may go to loan repayment under the NBE salary rule.
pub const SALARY_RULE_DIVISOR: f64 = 3.0;
/// Years of income used for the local maximum-loan ceiling.
pub const INCOME_CEILING_YEARS: f64 = 5.0;
/// Debt-to-income ratio above which a non-blocking warning is raised.
pub const DTI_WARNING_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffordabilityResult {
    pub monthly_payment: f64,
    pub max_affordable_payment: f64,
    pub max_affordable_loan: f64,
    pub debt_to_income_ratio: f64,
    pub max_affordable_loan_by_income: f64,
}

impl AffordabilityResult {
    pub fn exceeds_income_ceiling(&self, requested_amount: f64) -> bool {
        requested_amount > self.max_affordable_loan_by_income
    }

    pub fn dti_warning(&self) -> bool {
        self.debt_to_income_ratio > DTI_WARNING_THRESHOLD
    }
}

/// Affordability figures plus the inline issues they raise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffordabilityReport {
    pub result: AffordabilityResult,
    pub issues: Vec<FieldIssue>,
}

/// Level monthly payment. Falls back to straight-line principal when there is no positive rate.
pub fn monthly_payment(principal: f64, term_months: u32, rate_percent: Option<f64>) -> f64 {
    let periods = f64::from(term_months.max(1));
    let monthly_rate = rate_percent.map(|rate| rate / 100.0 / 12.0).unwrap_or(0.0);

    if monthly_rate > 0.0 {
        // (1 + r)^n - 1 without cancelling to zero for rates near machine epsilon.
        let accrued = (periods * monthly_rate.ln_1p()).exp_m1();
        principal * monthly_rate * (accrued + 1.0) / accrued
    } else {
        principal / periods
    }
}

pub fn compute_affordability(inputs: &LoanInputs) -> AffordabilityResult {
    let term = f64::from(inputs.term_months.max(1));
    let monthly_payment = monthly_payment(
        inputs.requested_amount,
        inputs.term_months,
        inputs.interest_rate_percent,
    );

    let max_affordable_payment = inputs.monthly_income / SALARY_RULE_DIVISOR;
    let max_affordable_loan = max_affordable_payment * term;

    let existing_debt = inputs.existing_monthly_debt.unwrap_or(0.0);
    let total_debt_service = existing_debt + inputs.requested_amount / term;
    let debt_to_income_ratio = total_debt_service / inputs.monthly_income;

    AffordabilityResult {
        monthly_payment,
        max_affordable_payment,
        max_affordable_loan,
        debt_to_income_ratio,
        max_affordable_loan_by_income: inputs.monthly_income * 12.0 * INCOME_CEILING_YEARS,
    }
}

/// Cross-field checks surfaced inline next to the form fields.
pub fn cross_field_issues(inputs: &LoanInputs, result: &AffordabilityResult) -> Vec<FieldIssue> {
    let mut issues = Vec::new();

    if result.exceeds_income_ceiling(inputs.requested_amount) {
        issues.push(FieldIssue {
            field: LoanField::RequestedAmount,
            severity: IssueSeverity::Error,
            message: format!(
                "Loan amount exceeds maximum affordable amount ({:.2} ETB based on income)",
                result.max_affordable_loan_by_income
            ),
        });
    }

    if result.dti_warning() {
        issues.push(FieldIssue {
            field: LoanField::ExistingMonthlyDebt,
            severity: IssueSeverity::Warning,
            message: format!(
                "High debt-to-income ratio: {:.1}%. Consider reducing loan amount or term.",
                result.debt_to_income_ratio * 100.0
            ),
        });
    }

    issues
}

pub fn assess(inputs: &LoanInputs) -> AffordabilityReport {
    let result = compute_affordability(inputs);
    let issues = cross_field_issues(inputs, &result);
    AffordabilityReport { result, issues }
}
