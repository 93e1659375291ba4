use clap::Args;
use loan_desk::error::AppError;
use loan_desk::workflows::origination::{
    assess, AffordabilityReport, ComplianceReport, CustomerType, LoanInputs,
    NbeComplianceValidator,
};
use serde::Serialize;

#[derive(Args, Debug, Clone)]
pub(crate) struct QuoteArgs {
    /// Requested principal in ETB
    #[arg(long)]
    pub(crate) amount: f64,
    /// Repayment term in months
    #[arg(long)]
    pub(crate) term: u32,
    /// Gross monthly income in ETB
    #[arg(long)]
    pub(crate) income: f64,
    /// Annual interest rate in percent
    #[arg(long)]
    pub(crate) rate: Option<f64>,
    /// Existing monthly debt service in ETB
    #[arg(long)]
    pub(crate) debt: Option<f64>,
    /// Price the loan for a business customer
    #[arg(long)]
    pub(crate) business: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoanQuote {
    pub(crate) affordability: AffordabilityReport,
    pub(crate) compliance: ComplianceReport,
}

impl QuoteArgs {
    fn inputs(&self) -> LoanInputs {
        let mut inputs = LoanInputs::new(self.amount, self.term, self.income);
        if let Some(rate) = self.rate {
            inputs = inputs.with_interest_rate(rate);
        }
        if let Some(debt) = self.debt {
            inputs = inputs.with_existing_debt(debt);
        }
        inputs
    }

    fn customer_type(&self) -> CustomerType {
        if self.business {
            CustomerType::Business
        } else {
            CustomerType::Individual
        }
    }
}

pub(crate) fn build_quote(args: &QuoteArgs) -> Result<LoanQuote, AppError> {
    let inputs = args.inputs();
    inputs.validate()?;

    let affordability = assess(&inputs);
    let compliance = NbeComplianceValidator::default().report(
        &inputs,
        Some(affordability.result.monthly_payment),
        args.customer_type(),
    );

    Ok(LoanQuote {
        affordability,
        compliance,
    })
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let quote = build_quote(&args)?;
    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}
