//! Like service.

use crate::services::{conflict_as, notification::NotificationService};
use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::post_like,
    repositories::{PostLikeRepository, PostRepository},
};
use sea_orm::Set;

/// Like service for business logic.
#[derive(Clone)]
pub struct LikeService {
    like_repo: PostLikeRepository,
    post_repo: PostRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

impl LikeService {
    /// Create a new like service.
    #[must_use]
    pub const fn new(
        like_repo: PostLikeRepository,
        post_repo: PostRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            like_repo,
            post_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Like a post and notify its author.
    pub async fn like(&self, user_id: &str, post_id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if post.author_id == user_id {
            return Err(AppError::BadRequest(
                "Cannot like your own post.".to_string(),
            ));
        }

        if self.like_repo.find_by_pair(user_id, post_id).await?.is_some() {
            return Err(AppError::BadRequest("Already liked.".to_string()));
        }

        let model = post_like::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            post_id: Set(post_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.like_repo
            .create(model)
            .await
            .map_err(conflict_as("Already liked."))?;
        self.post_repo.increment_likes_count(post_id).await?;

        if let Err(e) = self
            .notification_service
            .create_like_notification(&post.author_id, user_id, post_id)
            .await
        {
            tracing::warn!(error = %e, post_id = %post_id, "Failed to create like notification");
        }

        Ok(())
    }

    /// Remove a like. Notifications already sent are kept.
    pub async fn unlike(&self, user_id: &str, post_id: &str) -> AppResult<()> {
        self.post_repo.get_by_id(post_id).await?;

        if !self.like_repo.delete_by_pair(user_id, post_id).await? {
            return Err(AppError::BadRequest("Not liked yet.".to_string()));
        }

        self.post_repo.decrement_likes_count(post_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::post::tests::create_test_post;
    use agora_db::{
        entities::{notification, post},
        repositories::{NotificationRepository, UserRepository},
    };
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_like(user_id: &str, post_id: &str) -> post_like::Model {
        post_like::Model {
            id: "l1".to_string(),
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    fn create_test_service(
        like_db: MockDatabase,
        post_db: MockDatabase,
        notification_db: MockDatabase,
    ) -> LikeService {
        LikeService::new(
            PostLikeRepository::new(Arc::new(like_db.into_connection())),
            PostRepository::new(Arc::new(post_db.into_connection())),
            NotificationService::new(
                NotificationRepository::new(Arc::new(notification_db.into_connection())),
                UserRepository::new(Arc::new(
                    MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
                )),
            ),
        )
    }

    #[tokio::test]
    async fn test_like_unknown_post() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        assert!(matches!(
            service.like("u2", "missing").await,
            Err(AppError::PostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_like_own_post_rejected() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u1")]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        match service.like("u1", "p1").await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Cannot like your own post."),
            other => panic!("Expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_like_twice_rejected() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_like("u2", "p1")]]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u1")]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        match service.like("u2", "p1").await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Already liked."),
            other => panic!("Expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_like_success() {
        let notification = notification::Model {
            id: "n1".to_string(),
            recipient_id: "u1".to_string(),
            actor_id: "u2".to_string(),
            verb: "liked your post".to_string(),
            target_type: Some(notification::TargetType::Post),
            target_id: Some("p1".to_string()),
            unread: true,
            created_at: Utc::now().into(),
        };
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post_like::Model>::new()])
                .append_query_results([[create_test_like("u2", "p1")]]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u1")]])
                .append_exec_results([exec_ok()]),
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[notification]]),
        );

        assert!(service.like("u2", "p1").await.is_ok());
    }

    #[tokio::test]
    async fn test_unlike_when_not_liked() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u1")]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        match service.unlike("u2", "p1").await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Not liked yet."),
            other => panic!("Expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unlike_success() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec_ok()]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u1")]])
                .append_exec_results([exec_ok()]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        assert!(service.unlike("u2", "p1").await.is_ok());
    }

    #[tokio::test]
    async fn test_double_unlike_decrements_once() {
        // Only one decrement is queued on the post mock, so a second one would error.
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
                exec_ok(),
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u1")]])
                .append_exec_results([exec_ok()])
                .append_query_results([[create_test_post("p1", "u1")]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        assert!(service.unlike("u2", "p1").await.is_ok());
        match service.unlike("u2", "p1").await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Not liked yet."),
            other => panic!("Expected BadRequest, got {other:?}"),
        }
    }
}
