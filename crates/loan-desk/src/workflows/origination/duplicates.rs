use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::ApplicationDraft;
use super::remote::{ApplicationDirectory, ApplicationQuery};

pub const DUPLICATE_LOOKUP_LIMIT: u32 = 10;
const DRAFT_STATUS: &str = "draft";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateWarning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Look for drafts the same customer already has open for this product.
///
/// Returns `None` when the draft lacks a customer or product, when nothing matches, or when
/// the directory cannot be queried.
pub async fn check_duplicates(
    directory: &dyn ApplicationDirectory,
    draft: &ApplicationDraft,
) -> Option<String> {
    let (customer_id, loan_type) = (draft.customer_id()?, draft.loan_type()?);
    let query = ApplicationQuery {
        customer_id: customer_id.to_string(),
        loan_type: loan_type.to_string(),
        limit: DUPLICATE_LOOKUP_LIMIT,
    };

    let existing = match directory.list_applications(&query).await {
        Ok(existing) => existing,
        Err(err) => {
            debug!(customer_id, error = %err, "duplicate application lookup failed");
            return None;
        }
    };

    let drafts = existing
        .iter()
        .filter(|application| {
            application.customer_id == customer_id
                && application.status.eq_ignore_ascii_case(DRAFT_STATUS)
        })
        .count();

    (drafts > 0).then(|| {
        format!("Found {drafts} existing draft application(s) for this customer")
    })
}
