//! Audit logging middleware.
//!
//! Logs every API request with a request id, the route template, the
//! actor and the response status. Runs innermost (after auth has injected
//! `DoctorContext`). The concrete URI is never logged: pharmacist routes
//! carry the token code in the path.

use std::time::Instant;

use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::api::types::DoctorContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let actor = req
        .extensions()
        .get::<DoctorContext>()
        .map(|d| format!("doctor:{}", d.credential_fp))
        .unwrap_or_else(|| "public".to_string());

    let started = Instant::now();
    let response = next.run(req).await;

    tracing::info!(
        %request_id,
        method = %method,
        route = %route,
        actor = %actor,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "API request"
    );

    response
}
