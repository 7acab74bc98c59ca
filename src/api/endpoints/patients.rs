//! `POST /api/patients/parse`: free-text intake note to patient fields.

use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::DoctorContext;
use crate::intake::{self, PartialPatient};
use crate::pharmacy::snapshot::MAX_TEXT_CHARS;

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub text: String,
}

pub async fn parse(
    Extension(_doctor): Extension<DoctorContext>,
    payload: Result<Json<ParseRequest>, JsonRejection>,
) -> Result<Json<PartialPatient>, ApiError> {
    let Json(req) = payload?;
    if req.text.chars().count() > MAX_TEXT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "text exceeds {MAX_TEXT_CHARS} characters"
        )));
    }
    Ok(Json(intake::parse_free_text(&req.text)))
}
