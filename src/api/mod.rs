//! Pharmacy handoff HTTP API.
//!
//! Routes are nested under `/api/`. Doctor routes sit behind
//! Rate Limit → Auth → Audit; pharmacist routes behind
//! Rate Limit → no-store → Audit.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::{handoff_router, handoff_router_with_ctx};
pub use server::{start_server_on, HandoffServer};
pub use types::ApiContext;
