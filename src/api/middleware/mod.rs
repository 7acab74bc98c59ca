//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Rate limiter: reject early, save resources
//! 2. Auth validator (doctor routes) or no-store marker (pharmacist routes)
//! 3. Audit logger: logs after auth, knows the actor

pub mod audit;
pub mod auth;
pub mod cache;
pub mod rate;
