//! Pharmacy handoff endpoints.
//!
//! Doctor (bearer):
//! - `POST /api/pharmacy/generate-token`
//! - `POST /api/pharmacy/revoke-token`
//! - `GET /api/pharmacy/tokens/:patient_id`
//! - `GET /api/pharmacy/qr/:token`
//!
//! Pharmacist (no auth):
//! - `GET /api/pharmacy/prescription/:token`
//! - `GET /api/pharmacy/demo-tokens`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DoctorContext};
use crate::models::{
    DemoTokenList, IssueTokenRequest, IssuedToken, PrescriptionProjection, RevokeTokenRequest,
    RevokeTokenResponse, TokenList,
};
use crate::pharmacy::qr;

/// `POST /api/pharmacy/generate-token`
pub async fn generate_token(
    State(ctx): State<ApiContext>,
    Extension(_doctor): Extension<DoctorContext>,
    payload: Result<Json<IssueTokenRequest>, JsonRejection>,
) -> Result<Json<IssuedToken>, ApiError> {
    let Json(req) = payload?;
    let issued = ctx.core.issue(&req.patient_id, &req.prescription_details)?;
    Ok(Json(issued))
}

/// `POST /api/pharmacy/revoke-token`: same body whether or not the
/// token existed.
pub async fn revoke_token(
    State(ctx): State<ApiContext>,
    Extension(_doctor): Extension<DoctorContext>,
    payload: Result<Json<RevokeTokenRequest>, JsonRejection>,
) -> Result<Json<RevokeTokenResponse>, ApiError> {
    let Json(req) = payload?;
    ctx.core.revoke(&req.token)?;
    Ok(Json(RevokeTokenResponse { revoked: true }))
}

/// `GET /api/pharmacy/prescription/:token`
pub async fn prescription(
    State(ctx): State<ApiContext>,
    Path(token): Path<String>,
) -> Result<Json<PrescriptionProjection>, ApiError> {
    Ok(Json(ctx.core.redeem(&token)?))
}

/// `GET /api/pharmacy/demo-tokens`
pub async fn demo_tokens(State(ctx): State<ApiContext>) -> Json<DemoTokenList> {
    Json(DemoTokenList {
        demo_tokens: ctx.core.demo_tokens(),
    })
}

/// `GET /api/pharmacy/tokens/:patient_id`
pub async fn patient_tokens(
    State(ctx): State<ApiContext>,
    Extension(_doctor): Extension<DoctorContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<TokenList>, ApiError> {
    Ok(Json(TokenList {
        tokens: ctx.core.list_tokens(&patient_id)?,
    }))
}

/// `GET /api/pharmacy/qr/:token`: SVG QR code of the share link.
pub async fn qr_code(
    State(ctx): State<ApiContext>,
    Extension(_doctor): Extension<DoctorContext>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let link = ctx.core.share_link(&token)?;
    let svg = qr::render_svg(&link).map_err(|e| ApiError::Internal(format!("QR render: {e}")))?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}
