//! HTTP API layer for agora.
//!
//! This crate provides the REST API:
//!
//! - **Endpoints**: accounts, social posts, notifications, blog and library
//! - **Extractors**: Authentication and pagination
//! - **Middleware**: Token authentication and the shared [`AppState`]
//! - **Responses**: Paginated envelopes and `{"detail": ...}` messages
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::{health_router, router};
pub use middleware::{AppState, auth_middleware};
