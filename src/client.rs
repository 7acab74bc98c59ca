//! HTTP client for the handoff API, used by doctor and pharmacist front
//! ends. Every call is one independent request; nothing is cached.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Deserialize;

use crate::models::{
    DemoToken, DemoTokenList, IssueTokenRequest, IssuedToken, PrescriptionDetails,
    PrescriptionProjection, RevokeTokenRequest, TokenList, TokenSummary,
};

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Failure of a doctor-side call (issue, revoke, list) or the demo listing.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Doctor credential missing or rejected")]
    Unauthorized,
    #[error("Server rejected request ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },
}

/// Why a pharmacist could not open a prescription.
#[derive(Debug, thiserror::Error)]
pub enum RedeemError {
    #[error("Prescription token not found")]
    NotFound,
    #[error("Prescription token has been revoked")]
    Revoked,
    #[error("Prescription token has expired")]
    Expired,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected server response: HTTP {status}")]
    Unexpected { status: u16 },
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

pub struct HandoffClient {
    base: Url,
    http: reqwest::Client,
    credential: Option<String>,
}

impl HandoffClient {
    /// Client for a server at `base_url` (e.g. `http://127.0.0.1:4000`).
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme: {}",
                base.scheme()
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            base,
            http,
            credential: None,
        })
    }

    /// Attach the doctor bearer credential used by issue/revoke/list.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Issue a token. Failures are returned as-is; no placeholder token is
    /// ever produced.
    pub async fn issue_token(
        &self,
        patient_id: &str,
        details: &PrescriptionDetails,
    ) -> Result<IssuedToken, ClientError> {
        let body = IssueTokenRequest {
            patient_id: patient_id.to_string(),
            prescription_details: details.clone(),
        };
        let response = self
            .authorized(self.http.post(self.endpoint(&["pharmacy", "generate-token"])))
            .json(&body)
            .send()
            .await?;
        Ok(expect_success(response).await?.json().await?)
    }

    pub async fn revoke_token(&self, token: &str) -> Result<(), ClientError> {
        let body = RevokeTokenRequest {
            token: token.to_string(),
        };
        let response = self
            .authorized(self.http.post(self.endpoint(&["pharmacy", "revoke-token"])))
            .json(&body)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    pub async fn list_tokens(&self, patient_id: &str) -> Result<Vec<TokenSummary>, ClientError> {
        let response = self
            .authorized(
                self.http
                    .get(self.endpoint(&["pharmacy", "tokens", patient_id])),
            )
            .send()
            .await?;
        let list: TokenList = expect_success(response).await?.json().await?;
        Ok(list.tokens)
    }

    pub async fn demo_tokens(&self) -> Result<Vec<DemoToken>, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&["pharmacy", "demo-tokens"]))
            .send()
            .await?;
        let list: DemoTokenList = expect_success(response).await?.json().await?;
        Ok(list.demo_tokens)
    }

    /// Fetch the read-only prescription for `token`.
    pub async fn redeem(&self, token: &str) -> Result<PrescriptionProjection, RedeemError> {
        let response = self
            .http
            .get(self.endpoint(&["pharmacy", "prescription", token.trim()]))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let code = response
            .json::<ErrorEnvelope>()
            .await
            .map(|e| e.error.code)
            .unwrap_or_default();
        Err(redeem_error(status, &code))
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credential {
            Some(credential) => request.bearer_auth(credential),
            None => request,
        }
    }
}

fn redeem_error(status: StatusCode, code: &str) -> RedeemError {
    match (status, code) {
        (StatusCode::NOT_FOUND, _) => RedeemError::NotFound,
        (StatusCode::GONE, "TOKEN_REVOKED") => RedeemError::Revoked,
        (StatusCode::GONE, "TOKEN_EXPIRED") => RedeemError::Expired,
        _ => RedeemError::Unexpected {
            status: status.as_u16(),
        },
    }
}

async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthorized);
    }
    let (code, message) = match response.json::<ErrorEnvelope>().await {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (String::new(), String::new()),
    };
    Err(ClientError::Rejected {
        status: status.as_u16(),
        code,
        message,
    })
}
