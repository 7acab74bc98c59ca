//! Request and response bodies of the pharmacy handoff API, shared by the
//! axum handlers and the HTTP client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::TokenStatus;
use super::prescription::PrescriptionDetails;
use super::projection::TokenExpiry;

/// `POST /api/pharmacy/generate-token` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTokenRequest {
    #[serde(deserialize_with = "patient_id")]
    pub patient_id: String,
    #[serde(default)]
    pub prescription_details: PrescriptionDetails,
}

/// Issued token as displayed to the doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Pharmacist share link; the value encoded in the QR code.
    pub qr_code_url: String,
}

/// `POST /api/pharmacy/revoke-token` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeTokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeTokenResponse {
    pub revoked: bool,
}

/// Presentation token from the demo catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoToken {
    pub token: String,
    pub url: String,
    /// Initials-only descriptor, e.g. `"C.A. (45, Male)"`.
    pub patient: String,
    pub diagnosis: String,
    pub expires_at: TokenExpiry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoTokenList {
    pub demo_tokens: Vec<DemoToken>,
}

/// One row of the per-patient token listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: TokenStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenList {
    pub tokens: Vec<TokenSummary>,
}

/// EMR patient ids are numeric in the doctor UI but opaque strings here.
fn patient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
