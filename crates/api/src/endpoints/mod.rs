//! API endpoints.

mod accounts;
mod blog;
mod health;
mod library;
mod notifications;
mod posts;

use axum::Router;

use crate::middleware::AppState;

pub use health::router as health_router;

/// Create the API router, mounted under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/accounts", accounts::router())
        .nest("/posts", posts::router())
        .nest("/notifications", notifications::router())
        .nest("/blog", blog::router())
        .nest("/library", library::router())
}
