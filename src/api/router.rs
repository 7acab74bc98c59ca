//! Handoff API router.
//!
//! Returns a composable `Router` with every route under `/api/`.
//!
//! Middleware stacks (outermost → innermost):
//! - doctor routes: Rate limiter → Auth validator → Audit logger
//! - pharmacist routes: Rate limiter → no-store → Audit logger

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the handoff API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn handoff_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Build router from a pre-constructed `ApiContext` (custom rate limits).
pub fn handoff_router_with_ctx(ctx: ApiContext) -> Router {
    build_router(ctx)
}

fn build_router(ctx: ApiContext) -> Router {
    let cors = cors_layer(ctx.core.config.allowed_origin.as_deref());

    // Doctor routes: bearer credential required.
    //
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Rate limit → Auth → Audit (innermost) → Handler
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let doctor = Router::new()
        .route(
            "/pharmacy/generate-token",
            post(endpoints::pharmacy::generate_token),
        )
        .route("/pharmacy/revoke-token", post(endpoints::pharmacy::revoke_token))
        .route(
            "/pharmacy/tokens/:patient_id",
            get(endpoints::pharmacy::patient_tokens),
        )
        .route("/pharmacy/qr/:token", get(endpoints::pharmacy::qr_code))
        .route("/patients/parse", post(endpoints::patients::parse))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_doctor))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx.clone()));

    // Pharmacist routes: the token is the authorization.
    let public = Router::new()
        .route(
            "/pharmacy/prescription/:token",
            get(endpoints::pharmacy::prescription),
        )
        .route("/pharmacy/demo-tokens", get(endpoints::pharmacy::demo_tokens))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::cache::no_store))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::Extension(ctx));

    Router::new().nest("/api", doctor.merge(public)).layer(cors)
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    match allowed_origin {
        None => CorsLayer::permissive(),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(origin) => CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
            Err(e) => {
                tracing::warn!(error = %e, "Unusable allowed origin, cross-origin requests disabled");
                CorsLayer::new()
            }
        },
    }
}
