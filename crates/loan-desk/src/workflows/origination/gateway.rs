//! HTTP client for the API gateway fronting the compliance, rules, workflow, risk and
//! application services.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::domain::{ComplianceResult, RiskPrediction, RulesResult, WorkflowResult};
use super::remote::{
    ApplicationDirectory, ApplicationQuery, ApplicationSummary, ComplianceEngine,
    ComplianceRequest, EligibilityRequest, EligibilityRulesEngine, RemoteError, RiskModel,
    RiskRequest, WorkflowRequest, WorkflowRulesEngine,
};
use crate::config::GatewayConfig;

const COMPLIANCE_PATH: &str = "/api/v1/compliance/validate";
const ELIGIBILITY_PATH: &str = "/api/v1/product-rules/rules/evaluate";
const WORKFLOW_PATH: &str = "/api/v1/workflow/evaluate";
const RISK_PATH: &str = "/api/v1/default-prediction/predict";
const APPLICATIONS_PATH: &str = "/api/v1/loans/applications";

/// Gateway payloads arrive either bare or wrapped as `{ "success": true, "data": ... }`.
/// Rejections may omit `data` entirely.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped {
        #[serde(default)]
        success: Option<bool>,
        data: T,
        #[serde(default)]
        message: Option<String>,
    },
    Rejected {
        #[allow(dead_code)]
        success: Unsuccessful,
        #[serde(default)]
        message: Option<String>,
    },
    Bare(T),
}

/// Deserializes only from a literal `false`.
#[derive(Debug)]
struct Unsuccessful;

impl<'de> Deserialize<'de> for Unsuccessful {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if bool::deserialize(deserializer)? {
            Err(de::Error::custom("expected `success: false`"))
        } else {
            Ok(Unsuccessful)
        }
    }
}

impl<T> Envelope<T> {
    fn into_inner(self) -> Result<T, RemoteError> {
        match self {
            Envelope::Wrapped {
                success: Some(false),
                message,
                ..
            }
            | Envelope::Rejected { message, .. } => Err(RemoteError::Status {
                status: 422,
                message: message.unwrap_or_else(|| "request rejected".to_string()),
            }),
            Envelope::Wrapped { data, .. } => Ok(data),
            Envelope::Bare(data) => Ok(data),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApplicationListing {
    Data { data: Vec<ApplicationSummary> },
    Items { items: Vec<ApplicationSummary> },
    Bare(Vec<ApplicationSummary>),
}

impl ApplicationListing {
    fn into_items(self) -> Vec<ApplicationSummary> {
        match self {
            ApplicationListing::Data { data } => data,
            ApplicationListing::Items { items } => items,
            ApplicationListing::Bare(items) => items,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let envelope: Envelope<T> = self
            .execute(path, self.client.post(self.url(path)).json(body))
            .await?;
        envelope.into_inner()
    }

    async fn execute<T>(&self, path: &str, request: RequestBuilder) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
    {
        let response = request.send().await?;
        let status = response.status();
        debug!(path, status = status.as_u16(), "gateway responded");

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))
    }
}

#[async_trait]
impl ComplianceEngine for HttpGateway {
    async fn validate_compliance(
        &self,
        request: &ComplianceRequest,
    ) -> Result<ComplianceResult, RemoteError> {
        self.post(COMPLIANCE_PATH, request).await
    }
}

#[async_trait]
impl EligibilityRulesEngine for HttpGateway {
    async fn evaluate_eligibility_rules(
        &self,
        request: &EligibilityRequest,
    ) -> Result<RulesResult, RemoteError> {
        self.post(ELIGIBILITY_PATH, request).await
    }
}

#[async_trait]
impl WorkflowRulesEngine for HttpGateway {
    async fn evaluate_workflow_rules(
        &self,
        request: &WorkflowRequest,
    ) -> Result<WorkflowResult, RemoteError> {
        self.post(WORKFLOW_PATH, request).await
    }
}

#[async_trait]
impl RiskModel for HttpGateway {
    async fn predict_default_risk(
        &self,
        request: &RiskRequest,
    ) -> Result<RiskPrediction, RemoteError> {
        self.post(RISK_PATH, request).await
    }
}

#[async_trait]
impl ApplicationDirectory for HttpGateway {
    async fn list_applications(
        &self,
        query: &ApplicationQuery,
    ) -> Result<Vec<ApplicationSummary>, RemoteError> {
        let request = self.client.get(self.url(APPLICATIONS_PATH)).query(query);
        let listing: ApplicationListing = self.execute(APPLICATIONS_PATH, request).await?;
        Ok(listing.into_items())
    }
}
