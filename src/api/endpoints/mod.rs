//! API endpoint handlers.
//!
//! Handlers are thin: they unpack the request, call `CoreState` and map
//! `TokenError` into `ApiError`.

pub mod health;
pub mod patients;
pub mod pharmacy;
