use serde::{Deserialize, Serialize};
use tracing::warn;

use super::affordability::SALARY_RULE_DIVISOR;
use super::domain::{ComplianceResult, LoanInputs, Violation};

pub const SALARY_RULE_ID: &str = "1/3_salary_rule";

/// National Bank of Ethiopia lending limits. Interest rates are annual percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NbeRules {
    pub min_loan_amount: f64,
    pub max_loan_amount: f64,
    pub max_term_months: u32,
    pub min_interest_rate_percent: f64,
    pub max_interest_rate_percent: f64,
    pub grace_period_days: u32,
    pub late_fee_percent: f64,
}

impl Default for NbeRules {
    fn default() -> Self {
        Self {
            min_loan_amount: 1_000.0,
            max_loan_amount: 5_000_000.0,
            max_term_months: 60,
            min_interest_rate_percent: 12.0,
            max_interest_rate_percent: 25.0,
            grace_period_days: 30,
            late_fee_percent: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    #[default]
    Individual,
    Business,
}

/// Everything the local validator can say about a loan in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub compliance: ComplianceResult,
    pub grace_period_days: u32,
    pub late_fee_example: f64,
    pub max_affordable_loan: f64,
    pub recommended_interest_rate: f64,
}

/// Local implementation of the NBE rule set, used when no remote verdict is needed.
#[derive(Debug, Clone, Default)]
pub struct NbeComplianceValidator {
    rules: NbeRules,
}

impl NbeComplianceValidator {
    pub fn with_rules(rules: NbeRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &NbeRules {
        &self.rules
    }

    pub fn validate(&self, inputs: &LoanInputs, monthly_payment: Option<f64>) -> ComplianceResult {
        let rules = &self.rules;
        let mut result = ComplianceResult {
            compliant: true,
            violations: Vec::new(),
            warnings: Vec::new(),
            max_affordable_payment: None,
            max_affordable_loan: None,
            recommended_interest_rate: None,
            recommended_max_term_months: None,
        };

        let amount = inputs.requested_amount;
        if amount < rules.min_loan_amount {
            result.violations.push(Violation::new(
                "Minimum loan amount",
                format!(
                    "Loan amount ({amount:.2} ETB) is below the minimum threshold ({:.2} ETB)",
                    rules.min_loan_amount
                ),
            ));
        }
        if amount > rules.max_loan_amount {
            result.violations.push(Violation::new(
                "Maximum loan amount",
                format!(
                    "Loan amount ({amount:.2} ETB) exceeds the maximum threshold ({:.2} ETB)",
                    rules.max_loan_amount
                ),
            ));
        }

        let term = inputs.term_months;
        if term > rules.max_term_months {
            result.violations.push(Violation::new(
                "Maximum loan term",
                format!(
                    "Loan term ({term} months) exceeds the maximum allowed ({} months)",
                    rules.max_term_months
                ),
            ));
            result.recommended_max_term_months = Some(rules.max_term_months);
        }

        let ceiling = inputs.monthly_income / SALARY_RULE_DIVISOR;
        let proposed = monthly_payment
            .filter(|payment| *payment != 0.0)
            .unwrap_or_else(|| amount / f64::from(term.max(1)));
        if proposed > ceiling {
            result.violations.push(Violation::new(
                "1/3 salary rule",
                format!(
                    "Proposed monthly payment ({proposed:.2} ETB) exceeds 1/3 of monthly income ({ceiling:.2} ETB)"
                ),
            ));
            result.max_affordable_payment = Some(ceiling);
            result.max_affordable_loan = Some(ceiling * f64::from(term));
        }

        if let Some(rate) = inputs.interest_rate_percent {
            if rate < rules.min_interest_rate_percent {
                result.violations.push(Violation::new(
                    "Minimum interest rate",
                    format!(
                        "Interest rate ({rate:.2}%) is below the minimum threshold ({:.2}%)",
                        rules.min_interest_rate_percent
                    ),
                ));
                result.recommended_interest_rate = Some(rules.min_interest_rate_percent);
            }
            if rate > rules.max_interest_rate_percent {
                result.violations.push(Violation::new(
                    "Maximum interest rate",
                    format!(
                        "Interest rate ({rate:.2}%) exceeds the maximum threshold ({:.2}%)",
                        rules.max_interest_rate_percent
                    ),
                ));
                result.recommended_interest_rate = Some(rules.max_interest_rate_percent);
            }
        }

        if proposed > ceiling * 0.9 && proposed <= ceiling {
            result.warnings.push(
                Violation::new(
                    "1/3 salary rule",
                    "Monthly payment is close to the 1/3 salary limit",
                )
                .with_recommendation(
                    "Consider reducing the loan amount or extending the term to provide more buffer",
                ),
            );
        }

        if term > 48 {
            result.warnings.push(
                Violation::new("Long loan term", "Loan term exceeds 4 years").with_recommendation(
                    "Longer terms may increase default risk. Consider shorter terms if possible",
                ),
            );
        }

        result.compliant = result.violations.is_empty();
        result
    }

    /// Risk-priced annual rate (percent, two decimals) clamped to the NBE band.
    pub fn compliant_interest_rate(
        &self,
        credit_score: u16,
        amount: f64,
        term_months: u32,
        customer_type: CustomerType,
    ) -> f64 {
        let min = self.rules.min_interest_rate_percent / 100.0;
        let max = self.rules.max_interest_rate_percent / 100.0;

        let score_normalized = (850.0 - f64::from(credit_score)) / 550.0;
        let mut rate = min + score_normalized * (max - min) * 0.6;

        if amount > 1_000_000.0 {
            rate += 0.02;
        } else if amount < 50_000.0 {
            rate -= 0.01;
        }
        if term_months > 36 {
            rate += 0.01;
        }
        if customer_type == CustomerType::Business {
            rate += 0.01;
        }

        let rate = rate.max(min).min(max);
        (rate * 10_000.0).round() / 100.0
    }

    /// Largest principal whose payment fits under the salary ceiling.
    pub fn max_affordable_loan(
        &self,
        monthly_income: f64,
        term_months: u32,
        rate_percent: Option<f64>,
    ) -> f64 {
        let max_payment = monthly_income / SALARY_RULE_DIVISOR;
        let monthly_rate = rate_percent.map(|rate| rate / 100.0 / 12.0).unwrap_or(0.0);

        if monthly_rate <= 0.0 {
            return max_payment * f64::from(term_months);
        }

        let discount = -(-f64::from(term_months) * monthly_rate.ln_1p()).exp_m1();
        let pv_factor = discount / monthly_rate;
        (max_payment * pv_factor).min(self.rules.max_loan_amount)
    }

    pub fn grace_period_days(
        &self,
        amount: f64,
        term_months: u32,
        customer_type: CustomerType,
    ) -> u32 {
        let mut days = self.rules.grace_period_days;
        if amount > 1_000_000.0 {
            days += 7;
        }
        if term_months > 36 {
            days += 7;
        }
        if customer_type == CustomerType::Business {
            days += 7;
        }
        days
    }

    pub fn late_fee(&self, overdue_amount: f64, days_overdue: i64) -> f64 {
        if days_overdue <= 0 || overdue_amount <= 0.0 {
            return 0.0;
        }

        let base = overdue_amount * self.rules.late_fee_percent / 100.0;
        if days_overdue > 30 {
            let extra_months = ((days_overdue - 30) / 30) as f64;
            return base + overdue_amount * 0.01 * extra_months;
        }
        base
    }

    pub fn report(
        &self,
        inputs: &LoanInputs,
        monthly_payment: Option<f64>,
        customer_type: CustomerType,
    ) -> ComplianceReport {
        let compliance = self.validate(inputs, monthly_payment);
        let term = inputs.term_months;
        let amount = inputs.requested_amount;

        ComplianceReport {
            compliance,
            grace_period_days: self.grace_period_days(amount, term, customer_type),
            late_fee_example: self.late_fee(amount / f64::from(term.max(1)), 35),
            max_affordable_loan: self.max_affordable_loan(
                inputs.monthly_income,
                term,
                inputs.interest_rate_percent,
            ),
            recommended_interest_rate: inputs.interest_rate_percent.unwrap_or_else(|| {
                self.compliant_interest_rate(700, amount, term, customer_type)
            }),
        }
    }
}

/// Simplified 1/3-salary verdict synthesized when the compliance engine cannot be reached.
pub fn fallback_compliance(inputs: &LoanInputs) -> ComplianceResult {
    let term = f64::from(inputs.term_months.max(1));
    let max_affordable_payment = inputs.monthly_income / SALARY_RULE_DIVISOR;
    let proposed_payment = inputs.requested_amount / term;

    let mut violations = Vec::new();
    if proposed_payment > max_affordable_payment {
        warn!(
            proposed_payment,
            max_affordable_payment, "fallback compliance flagged the 1/3 salary rule"
        );
        violations.push(Violation::new(
            SALARY_RULE_ID,
            format!(
                "Proposed payment ({proposed_payment:.2} ETB) exceeds 1/3 of monthly income ({max_affordable_payment:.2} ETB)"
            ),
        ));
    }

    ComplianceResult {
        compliant: violations.is_empty(),
        violations,
        warnings: Vec::new(),
        max_affordable_payment: Some(max_affordable_payment),
        max_affordable_loan: Some(max_affordable_payment * term),
        recommended_interest_rate: None,
        recommended_max_term_months: None,
    }
}
