//! Comment service for social posts.

use crate::services::{
    notification::NotificationService,
    post::{NOT_OWNER, ensure_not_blank},
    query::parse_ordering,
    user::usernames,
};
use agora_common::{AppError, AppResult, IdGenerator, Page, PageRequest};
use agora_db::{
    entities::{comment, user},
    repositories::{CommentQuery, CommentRepository, PostRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

const ORDERING_FIELDS: &[(&str, comment::Column)] = &[
    ("created_at", comment::Column::CreatedAt),
    ("updated_at", comment::Column::UpdatedAt),
];

/// A comment with its author's username.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: comment::Model,
    pub author: String,
}

/// Query parameters for listing comments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListCommentsQuery {
    pub search: Option<String>,
    /// Post ID filter.
    pub post: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentInput {
    /// ID of the post being commented on.
    pub post: String,

    #[validate(length(max = 2000))]
    pub content: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCommentInput {
    #[validate(length(max = 2000))]
    pub content: Option<String>,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// List comments, newest first unless `ordering` says otherwise.
    pub async fn list(
        &self,
        query: ListCommentsQuery,
        page: PageRequest,
    ) -> AppResult<Page<CommentView>> {
        let query = CommentQuery {
            search: query.search,
            post_id: query.post,
            ordering: parse_ordering(query.ordering.as_deref(), ORDERING_FIELDS),
        };

        let total = self.comment_repo.count(&query).await?;
        let comments = self
            .comment_repo
            .search(&query, page.limit(), page.offset())
            .await?;
        let names = usernames(&self.user_repo, comments.iter().map(|c| &c.author_id)).await?;

        let items = comments
            .into_iter()
            .map(|comment| CommentView {
                author: names.get(&comment.author_id).cloned().unwrap_or_default(),
                comment,
            })
            .collect();

        Ok(Page::new(items, total, page))
    }

    /// Get a single comment.
    pub async fn get(&self, id: &str) -> AppResult<CommentView> {
        let comment = self.comment_repo.get_by_id(id).await?;
        let author = self.user_repo.get_by_id(&comment.author_id).await?;

        Ok(CommentView {
            comment,
            author: author.username,
        })
    }

    /// Comment on a post and notify its author.
    pub async fn create(
        &self,
        author: &user::Model,
        input: CreateCommentInput,
    ) -> AppResult<CommentView> {
        input.validate()?;
        ensure_not_blank("content", &input.content)?;

        let post = self.post_repo.get_by_id(&input.post).await?;

        let now = chrono::Utc::now();
        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id.clone()),
            author_id: Set(author.id.clone()),
            content: Set(input.content),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let comment = self.comment_repo.create(model).await?;
        self.post_repo.increment_comments_count(&post.id).await?;

        if post.author_id != author.id
            && let Err(e) = self
                .notification_service
                .create_comment_notification(&post.author_id, &author.id, &comment.id)
                .await
        {
            tracing::warn!(error = %e, post_id = %post.id, "Failed to create comment notification");
        }

        Ok(CommentView {
            comment,
            author: author.username.clone(),
        })
    }

    /// Edit a comment. Only its author may do so.
    pub async fn update(
        &self,
        actor: &user::Model,
        id: &str,
        input: UpdateCommentInput,
    ) -> AppResult<CommentView> {
        input.validate()?;
        if let Some(content) = &input.content {
            ensure_not_blank("content", content)?;
        }

        let comment = self.comment_repo.get_by_id(id).await?;
        if comment.author_id != actor.id {
            return Err(AppError::Forbidden(NOT_OWNER.to_string()));
        }

        let mut active: comment::ActiveModel = comment.into();
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(CommentView {
            comment: self.comment_repo.update(active).await?,
            author: actor.username.clone(),
        })
    }

    /// Delete a comment. Only its author may do so.
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(id).await?;
        if comment.author_id != actor.id {
            return Err(AppError::Forbidden(NOT_OWNER.to_string()));
        }

        if !self.comment_repo.delete(id).await? {
            return Err(AppError::NotFound(format!("Comment {id}")));
        }
        self.post_repo
            .decrement_comments_count(&comment.post_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::post::tests::{create_test_post, create_test_user};
    use agora_db::{entities::notification, repositories::NotificationRepository};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_comment(id: &str, post_id: &str, author_id: &str) -> comment::Model {
        let now = Utc::now().into();
        comment::Model {
            id: id.to_string(),
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
            content: "Nice post".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn exec_ok() -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }
    }

    fn create_test_service(
        comment_db: MockDatabase,
        post_db: MockDatabase,
        notification_db: MockDatabase,
    ) -> CommentService {
        let user_conn = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        CommentService::new(
            CommentRepository::new(Arc::new(comment_db.into_connection())),
            PostRepository::new(Arc::new(post_db.into_connection())),
            UserRepository::new(user_conn.clone()),
            NotificationService::new(
                NotificationRepository::new(Arc::new(notification_db.into_connection())),
                UserRepository::new(user_conn),
            ),
        )
    }

    #[tokio::test]
    async fn test_create_on_unknown_post() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<agora_db::entities::post::Model>::new()]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let result = service
            .create(
                &create_test_user("u2", "bob"),
                CreateCommentInput {
                    post: "missing".to_string(),
                    content: "hello".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_blank() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let result = service
            .create(
                &create_test_user("u2", "bob"),
                CreateCommentInput {
                    post: "p1".to_string(),
                    content: " \n ".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_bumps_count_and_notifies_author() {
        let notification = notification::Model {
            id: "n1".to_string(),
            recipient_id: "u1".to_string(),
            actor_id: "u2".to_string(),
            verb: "commented on your post".to_string(),
            target_type: Some(notification::TargetType::Comment),
            target_id: Some("c1".to_string()),
            unread: true,
            created_at: Utc::now().into(),
        };
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", "p1", "u2")]]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u1")]])
                .append_exec_results([exec_ok()]),
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[notification]]),
        );

        let view = service
            .create(
                &create_test_user("u2", "bob"),
                CreateCommentInput {
                    post: "p1".to_string(),
                    content: "Nice post".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(view.author, "bob");
        assert_eq!(view.comment.post_id, "p1");
    }

    #[tokio::test]
    async fn test_comment_on_own_post_skips_notification() {
        // No notification results are queued; an attempted insert would only warn.
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", "p1", "u1")]]),
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u1")]])
                .append_exec_results([exec_ok()]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let view = service
            .create(
                &create_test_user("u1", "alice"),
                CreateCommentInput {
                    post: "p1".to_string(),
                    content: "Replying to myself".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(view.author, "alice");
    }

    #[tokio::test]
    async fn test_update_by_non_author_forbidden() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", "p1", "u2")]]),
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let result = service
            .update(
                &create_test_user("u3", "carol"),
                "c1",
                UpdateCommentInput {
                    content: Some("edited".to_string()),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_decrements_count() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", "p1", "u2")]])
                .append_exec_results([exec_ok()]),
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([exec_ok()]),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        assert!(
            service
                .delete(&create_test_user("u2", "bob"), "c1")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_delete_lost_race_leaves_count() {
        // The row vanished between lookup and delete; the post mock has no
        // exec result queued, so a decrement would fail with a database error.
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", "p1", "u2")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }]),
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        assert!(matches!(
            service.delete(&create_test_user("u2", "bob"), "c1").await,
            Err(AppError::NotFound(_))
        ));
    }
}
