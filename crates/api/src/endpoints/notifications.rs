//! Notification endpoints.

use agora_common::AppResult;
use agora_core::NotificationView;
use agora_db::entities::notification::TargetType;
use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, PageParams},
    middleware::AppState,
    response::{Detail, Paginated},
};

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub actor: String,
    pub actor_id: String,
    pub verb: String,
    pub target_type: Option<TargetType>,
    pub target_id: Option<String>,
    pub timestamp: String,
    pub unread: bool,
}

impl From<NotificationView> for NotificationResponse {
    fn from(view: NotificationView) -> Self {
        let n = view.notification;
        Self {
            id: n.id,
            actor: view.actor,
            actor_id: n.actor_id,
            verb: n.verb,
            target_type: n.target_type,
            target_id: n.target_id,
            timestamp: n.created_at.to_rfc3339(),
            unread: n.unread,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub detail: String,
    pub updated: u64,
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub unread_count: u64,
}

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    Query(query): Query<ListNotificationsQuery>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Paginated<NotificationResponse>> {
    let page = params.resolve(&state.pagination)?;
    let notifications = state
        .notification_service
        .list(&user.id, query.unread_only, page)
        .await?;
    Ok(Paginated::from_page(notifications, &uri))
}

async fn mark_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Detail> {
    state.notification_service.mark_read(&user.id, &id).await?;
    Ok(Detail::new("Marked as read."))
}

async fn mark_all_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<MarkAllReadResponse>> {
    let updated = state.notification_service.mark_all_read(&user.id).await?;
    Ok(Json(MarkAllReadResponse {
        detail: "All notifications marked as read.".to_string(),
        updated,
    }))
}

async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UnreadCountResponse>> {
    let unread_count = state.notification_service.unread_count(&user.id).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

/// Create the notifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}/mark-read", post(mark_read))
        .route("/mark-all-read", post(mark_all_read))
        .route("/unread-count", get(unread_count))
}
