use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Form fields the decision layer reads, used to attribute validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanField {
    CustomerId,
    RequestedAmount,
    TermMonths,
    MonthlyIncome,
    InterestRate,
    ExistingMonthlyDebt,
}

impl LoanField {
    pub const fn label(self) -> &'static str {
        match self {
            LoanField::CustomerId => "customer_id",
            LoanField::RequestedAmount => "requested_amount",
            LoanField::TermMonths => "loan_term_months",
            LoanField::MonthlyIncome => "monthly_income",
            LoanField::InterestRate => "interest_rate",
            LoanField::ExistingMonthlyDebt => "existing_monthly_debt",
        }
    }
}

/// Malformed or out-of-range input detected before any remote call is made.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("{} is required", .0.label())]
    Missing(LoanField),
    #[error("{} must be numeric (found '{value}')", .field.label())]
    NotNumeric { field: LoanField, value: String },
    #[error("{} must be greater than zero", .0.label())]
    NonPositive(LoanField),
    #[error("{} must not be negative", .0.label())]
    Negative(LoanField),
}

/// Applicant facts sourced from customer/credit data services rather than typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicantContext {
    #[serde(default)]
    pub credit_score: Option<u16>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub employment_years: Option<f64>,
    #[serde(default)]
    pub age: Option<u16>,
}

/// Snapshot of the loan application form as the user is editing it.
///
/// Numeric fields are kept as entered so the orchestrator can tell "not yet typed" apart
/// from "typed but malformed". JSON callers may send either strings or numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    #[serde(default, deserialize_with = "deserialize_field")]
    pub customer_id: String,
    #[serde(default, deserialize_with = "deserialize_field")]
    pub loan_type: String,
    #[serde(default, deserialize_with = "deserialize_field")]
    pub requested_amount: String,
    #[serde(default, deserialize_with = "deserialize_field")]
    pub term_months: String,
    #[serde(default, deserialize_with = "deserialize_field")]
    pub monthly_income: String,
    #[serde(default, deserialize_with = "deserialize_field")]
    pub interest_rate: String,
    #[serde(default, deserialize_with = "deserialize_field")]
    pub existing_monthly_debt: String,
    #[serde(default)]
    pub applicant: ApplicantContext,
}

impl ApplicationDraft {
    pub fn customer_id(&self) -> Option<&str> {
        non_blank(&self.customer_id)
    }

    pub fn loan_type(&self) -> Option<&str> {
        non_blank(&self.loan_type)
    }

    /// True once amount, term and income have all been typed in.
    pub fn has_minimum_fields(&self) -> bool {
        non_blank(&self.requested_amount).is_some()
            && non_blank(&self.term_months).is_some()
            && non_blank(&self.monthly_income).is_some()
    }

    /// Coerce the raw form fields into validated numeric loan inputs.
    pub fn loan_inputs(&self) -> Result<LoanInputs, InputError> {
        let inputs = LoanInputs {
            requested_amount: parse_required(LoanField::RequestedAmount, &self.requested_amount)?,
            term_months: parse_term(&self.term_months)?,
            monthly_income: parse_required(LoanField::MonthlyIncome, &self.monthly_income)?,
            interest_rate_percent: parse_optional(LoanField::InterestRate, &self.interest_rate)?,
            existing_monthly_debt: parse_optional(
                LoanField::ExistingMonthlyDebt,
                &self.existing_monthly_debt,
            )?,
        };
        inputs.validate()?;
        Ok(inputs)
    }
}

/// Numeric loan parameters driving affordability and compliance math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanInputs {
    pub requested_amount: f64,
    pub term_months: u32,
    pub monthly_income: f64,
    #[serde(default)]
    pub interest_rate_percent: Option<f64>,
    #[serde(default)]
    pub existing_monthly_debt: Option<f64>,
}

impl LoanInputs {
    pub fn new(requested_amount: f64, term_months: u32, monthly_income: f64) -> Self {
        Self {
            requested_amount,
            term_months,
            monthly_income,
            interest_rate_percent: None,
            existing_monthly_debt: None,
        }
    }

    pub fn with_interest_rate(mut self, percent: f64) -> Self {
        self.interest_rate_percent = Some(percent);
        self
    }

    pub fn with_existing_debt(mut self, monthly_debt: f64) -> Self {
        self.existing_monthly_debt = Some(monthly_debt);
        self
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if !(self.requested_amount.is_finite() && self.requested_amount > 0.0) {
            return Err(InputError::NonPositive(LoanField::RequestedAmount));
        }
        if self.term_months == 0 {
            return Err(InputError::NonPositive(LoanField::TermMonths));
        }
        if !(self.monthly_income.is_finite() && self.monthly_income > 0.0) {
            return Err(InputError::NonPositive(LoanField::MonthlyIncome));
        }
        if let Some(rate) = self.interest_rate_percent {
            if !rate.is_finite() || rate < 0.0 {
                return Err(InputError::Negative(LoanField::InterestRate));
            }
        }
        if let Some(debt) = self.existing_monthly_debt {
            if !debt.is_finite() || debt < 0.0 {
                return Err(InputError::Negative(LoanField::ExistingMonthlyDebt));
            }
        }
        Ok(())
    }
}

/// Severity of an inline field issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Inline, locally computed validation message attached to a form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: LoanField,
    pub severity: IssueSeverity,
    pub message: String,
}

/// A single regulatory finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl Violation {
    pub fn new(rule: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            description: description.into(),
            recommendation: None,
        }
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }
}

/// Regulatory compliance verdict, either returned by the compliance engine or computed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceResult {
    pub compliant: bool,
    #[serde(default)]
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub warnings: Vec<Violation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_affordable_payment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_affordable_loan: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_interest_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_max_term_months: Option<u32>,
}

impl ComplianceResult {
    /// Whether the result carries violations that must stop a submission.
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// Where a compliance verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceProvenance {
    Remote,
    LocalFallback,
}

/// Eligibility verdict from the product rules engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulesDecision {
    Approve,
    Reject,
    Review,
}

/// Rule that fired during an eligibility evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub rule_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesResult {
    pub decision: RulesDecision,
    #[serde(default)]
    pub limits: BTreeMap<String, f64>,
    #[serde(default)]
    pub pricing: BTreeMap<String, f64>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub matched_rules: Vec<MatchedRule>,
}

/// Routing verdict from the workflow engine. The decision label is engine specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub decision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_level: Option<String>,
}

/// Eligibility result plus the workflow verdict evaluated on top of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesEvaluation {
    pub eligibility: RulesResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowResult>,
}

impl RulesEvaluation {
    pub fn decision(&self) -> RulesDecision {
        self.eligibility.decision
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
    #[serde(alias = "very_high", alias = "Very High", alias = "VERY_HIGH")]
    VeryHigh,
}

/// Default-risk model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_default_months: Option<f64>,
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_number(field: LoanField, raw: &str) -> Result<f64, InputError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| InputError::NotNumeric {
            field,
            value: raw.to_string(),
        })?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InputError::NotNumeric {
            field,
            value: raw.to_string(),
        })
    }
}

fn parse_required(field: LoanField, raw: &str) -> Result<f64, InputError> {
    match non_blank(raw) {
        Some(value) => parse_number(field, value),
        None => Err(InputError::Missing(field)),
    }
}

fn parse_optional(field: LoanField, raw: &str) -> Result<Option<f64>, InputError> {
    non_blank(raw)
        .map(|value| parse_number(field, value))
        .transpose()
}

/// Terms are whole months; a fractional entry is truncated the way form inputs are.
pub(crate) fn parse_term(raw: &str) -> Result<u32, InputError> {
    let value = parse_required(LoanField::TermMonths, raw)?;
    if value < 1.0 {
        return Err(InputError::NonPositive(LoanField::TermMonths));
    }
    let months = value.trunc();
    if months > f64::from(u32::MAX) {
        return Err(InputError::NotNumeric {
            field: LoanField::TermMonths,
            value: raw.to_string(),
        });
    }
    Ok(months as u32)
}

fn deserialize_field<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(text)) => Ok(text),
        Some(serde_json::Value::Number(number)) => Ok(number.to_string()),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {other}"
        ))),
    }
}
