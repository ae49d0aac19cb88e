//! Following service.

use std::collections::HashMap;

use crate::services::{conflict_as, notification::NotificationService};
use agora_common::{AppError, AppResult, IdGenerator, Page, PageRequest};
use agora_db::{
    entities::{following, user},
    repositories::{FollowingRepository, UserRepository},
};
use sea_orm::Set;

/// Following service for business logic.
#[derive(Clone)]
pub struct FollowingService {
    following_repo: FollowingRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

impl FollowingService {
    /// Create a new following service.
    #[must_use]
    pub const fn new(
        following_repo: FollowingRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            following_repo,
            user_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow a user. Returns the followed user.
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> AppResult<user::Model> {
        if follower_id == followee_id {
            return Err(AppError::BadRequest(
                "You cannot follow yourself.".to_string(),
            ));
        }

        let followee = self.user_repo.get_by_id(followee_id).await?;

        if self
            .following_repo
            .is_following(follower_id, followee_id)
            .await?
        {
            return Err(AppError::BadRequest("Already following.".to_string()));
        }

        let model = following::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower_id.to_string()),
            followee_id: Set(followee_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.following_repo
            .create(model)
            .await
            .map_err(conflict_as("Already following."))?;

        self.user_repo.increment_followers_count(followee_id).await?;
        self.user_repo.increment_following_count(follower_id).await?;

        if let Err(e) = self
            .notification_service
            .create_follow_notification(followee_id, follower_id)
            .await
        {
            tracing::warn!(error = %e, followee_id = %followee_id, "Failed to create follow notification");
        }

        tracing::info!(follower_id = %follower_id, followee_id = %followee_id, "User followed");
        Ok(followee)
    }

    /// Unfollow a user. Returns the unfollowed user.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<user::Model> {
        let followee = self.user_repo.get_by_id(followee_id).await?;

        if !self
            .following_repo
            .delete_by_pair(follower_id, followee_id)
            .await?
        {
            return Err(AppError::BadRequest("Not following.".to_string()));
        }

        self.user_repo.decrement_followers_count(followee_id).await?;
        self.user_repo.decrement_following_count(follower_id).await?;

        Ok(followee)
    }

    /// Users following `user_id`, most recent first.
    pub async fn followers(&self, user_id: &str, page: PageRequest) -> AppResult<Page<user::Model>> {
        self.user_repo.get_by_id(user_id).await?;

        let total = self.following_repo.count_followers(user_id).await?;
        let ids: Vec<String> = self
            .following_repo
            .find_followers(user_id, page.limit(), page.offset())
            .await?
            .into_iter()
            .map(|f| f.follower_id)
            .collect();

        Ok(Page::new(self.users_in_order(&ids).await?, total, page))
    }

    /// Users `user_id` follows, most recent first.
    pub async fn following(&self, user_id: &str, page: PageRequest) -> AppResult<Page<user::Model>> {
        self.user_repo.get_by_id(user_id).await?;

        let total = self.following_repo.count_following(user_id).await?;
        let ids: Vec<String> = self
            .following_repo
            .find_following(user_id, page.limit(), page.offset())
            .await?
            .into_iter()
            .map(|f| f.followee_id)
            .collect();

        Ok(Page::new(self.users_in_order(&ids).await?, total, page))
    }

    async fn users_in_order(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        let mut by_id: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agora_db::{entities::notification, repositories::NotificationRepository};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            profile_picture: None,
            password_hash: "hash".to_string(),
            token: None,
            is_staff: false,
            followers_count: 0,
            following_count: 0,
            date_joined: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_following(follower_id: &str, followee_id: &str) -> following::Model {
        following::Model {
            id: format!("{follower_id}-{followee_id}"),
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
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
        following_db: MockDatabase,
        user_db: MockDatabase,
        notification_db: MockDatabase,
    ) -> FollowingService {
        let user_conn = Arc::new(user_db.into_connection());
        FollowingService::new(
            FollowingRepository::new(Arc::new(following_db.into_connection())),
            UserRepository::new(user_conn.clone()),
            NotificationService::new(
                NotificationRepository::new(Arc::new(notification_db.into_connection())),
                UserRepository::new(user_conn),
            ),
        )
    }

    #[tokio::test]
    async fn test_follow_self_rejected() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        match service.follow("u1", "u1").await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "You cannot follow yourself."),
            other => panic!("Expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_follow_unknown_user() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        assert!(matches!(
            service.follow("u1", "ghost").await,
            Err(AppError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_follow_already_following() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_following("u1", "u2")]]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u2", "bob")]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        match service.follow("u1", "u2").await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Already following."),
            other => panic!("Expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_follow_success_notifies() {
        let notification = notification::Model {
            id: "n1".to_string(),
            recipient_id: "u2".to_string(),
            actor_id: "u1".to_string(),
            verb: "started following you".to_string(),
            target_type: None,
            target_id: None,
            unread: true,
            created_at: Utc::now().into(),
        };

        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .append_query_results([[create_test_following("u1", "u2")]]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u2", "bob")]])
                .append_exec_results([exec_ok(), exec_ok()]),
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[notification]]),
        );

        let followee = service.follow("u1", "u2").await.unwrap();
        assert_eq!(followee.username, "bob");
    }

    #[tokio::test]
    async fn test_follow_survives_notification_failure() {
        // The notification mock has no results queued, so its insert errors.
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .append_query_results([[create_test_following("u1", "u2")]]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u2", "bob")]])
                .append_exec_results([exec_ok(), exec_ok()]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        assert!(service.follow("u1", "u2").await.is_ok());
    }

    #[tokio::test]
    async fn test_unfollow_not_following() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u2", "bob")]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        match service.unfollow("u1", "u2").await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Not following."),
            other => panic!("Expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unfollow_success() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec_ok()]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u2", "bob")]])
                .append_exec_results([exec_ok(), exec_ok()]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        assert_eq!(service.unfollow("u1", "u2").await.unwrap().username, "bob");
    }

    #[tokio::test]
    async fn test_double_unfollow_decrements_counters_once() {
        // The user mock holds exactly two counter updates.
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
                exec_ok(),
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u2", "bob")]])
                .append_query_results([[create_test_user("u2", "bob")]])
                .append_exec_results([exec_ok(), exec_ok()]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        assert!(service.unfollow("u1", "u2").await.is_ok());
        match service.unfollow("u1", "u2").await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Not following."),
            other => panic!("Expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_followers_keep_relationship_order() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(2))
                }]])
                .append_query_results([[
                    create_test_following("u3", "u1"),
                    create_test_following("u2", "u1"),
                ]]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", "alice")]])
                .append_query_results([[
                    create_test_user("u2", "bob"),
                    create_test_user("u3", "carol"),
                ]]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let page = service.followers("u1", PageRequest::default()).await.unwrap();

        assert_eq!(page.total, 2);
        let names: Vec<_> = page.items.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["carol", "bob"]);
    }
}
