//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use agora_common::config::PaginationConfig;
use agora_core::{
    BlogService, CommentService, FollowingService, LibraryService, LikeService,
    NotificationService, PermissionService, PostService, UserService,
};
use agora_db::repositories::{
    AuthorRepository, BlogCommentRepository, BlogPostRepository, BookRepository,
    CommentRepository, FollowingRepository, LibraryRepository, NotificationRepository,
    PermissionGroupRepository, PostLikeRepository, PostRepository, TagRepository, UserRepository,
};
use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub following_service: FollowingService,
    pub notification_service: NotificationService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub like_service: LikeService,
    pub blog_service: BlogService,
    pub library_service: LibraryService,
    pub permission_service: PermissionService,
    pub pagination: PaginationConfig,
}

impl AppState {
    /// Wire every repository and service to one connection.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, pagination: PaginationConfig) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let following_repo = FollowingRepository::new(Arc::clone(&db));
        let post_repo = PostRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let like_repo = PostLikeRepository::new(Arc::clone(&db));
        let notification_repo = NotificationRepository::new(Arc::clone(&db));

        let notification_service = NotificationService::new(notification_repo, user_repo.clone());
        let permission_service = PermissionService::new(
            PermissionGroupRepository::new(Arc::clone(&db)),
            user_repo.clone(),
        );

        Self {
            user_service: UserService::new(user_repo.clone()),
            following_service: FollowingService::new(
                following_repo.clone(),
                user_repo.clone(),
                notification_service.clone(),
            ),
            post_service: PostService::new(
                post_repo.clone(),
                comment_repo.clone(),
                like_repo.clone(),
                following_repo,
                user_repo.clone(),
            ),
            comment_service: CommentService::new(
                comment_repo,
                post_repo.clone(),
                user_repo.clone(),
                notification_service.clone(),
            ),
            like_service: LikeService::new(like_repo, post_repo, notification_service.clone()),
            blog_service: BlogService::new(
                BlogPostRepository::new(Arc::clone(&db)),
                TagRepository::new(Arc::clone(&db)),
                BlogCommentRepository::new(Arc::clone(&db)),
                user_repo,
            ),
            library_service: LibraryService::new(
                BookRepository::new(Arc::clone(&db)),
                AuthorRepository::new(Arc::clone(&db)),
                LibraryRepository::new(Arc::clone(&db)),
                permission_service.clone(),
            ),
            notification_service,
            permission_service,
            pagination,
        }
    }
}

/// Pull the key out of `Token <key>` or `Bearer <key>`.
fn token_from_header(value: &str) -> Option<&str> {
    value
        .strip_prefix("Token ")
        .or_else(|| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware.
///
/// Unknown tokens leave the request anonymous; handlers that need a user
/// reject it through the `AuthUser` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = token_from_header(auth_str)
    {
        match state.user_service.authenticate_by_token(token).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(error = %e, "Token authentication failed"),
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_header() {
        assert_eq!(token_from_header("Token abc123"), Some("abc123"));
        assert_eq!(token_from_header("Bearer abc123"), Some("abc123"));
        assert_eq!(token_from_header("Basic abc123"), None);
        assert_eq!(token_from_header("Token "), None);
    }
}
