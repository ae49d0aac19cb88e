//! Core business logic for agora.
//!
//! Services sit between the HTTP layer and the repositories. They own
//! validation, permission checks and side effects such as counters and
//! notifications.

pub mod services;

pub use services::*;
