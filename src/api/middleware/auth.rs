//! Bearer credential middleware for doctor-only routes.
//!
//! Extracts `Authorization: Bearer <credential>`, compares it in constant
//! time with the configured doctor credential and injects `DoctorContext`
//! into request extensions for downstream handlers.
//!
//! The credential is a single shared value; per-doctor sessions are still
//! to be built.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::api::error::ApiError;
use crate::api::types::{hash_credential, ApiContext, DoctorContext};

/// Require the doctor bearer credential.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_doctor(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_doctor_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_doctor_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let presented = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    // Hashing first keeps the comparison length-independent
    let presented_hash = hash_credential(presented);
    let expected_hash = hash_credential(&ctx.core.config.doctor_token);
    if !bool::from(presented_hash[..].ct_eq(&expected_hash[..])) {
        tracing::warn!(method = %req.method(), "Rejected doctor credential");
        return Err(ApiError::Unauthorized);
    }

    let credential_fp: String = presented_hash
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect();
    req.extensions_mut().insert(DoctorContext { credential_fp });

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));

    Ok(response)
}
