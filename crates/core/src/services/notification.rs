//! Notification service.

use crate::services::user::usernames;
use agora_common::{AppError, AppResult, IdGenerator, Page, PageRequest};
use agora_db::{
    entities::notification::{self, TargetType},
    repositories::{NotificationRepository, UserRepository},
};
use sea_orm::Set;

pub const VERB_FOLLOW: &str = "started following you";
pub const VERB_LIKE: &str = "liked your post";
pub const VERB_COMMENT: &str = "commented on your post";

/// A notification together with the actor's username.
#[derive(Debug, Clone)]
pub struct NotificationView {
    pub notification: notification::Model,
    pub actor: String,
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository, user_repo: UserRepository) -> Self {
        Self {
            notification_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a follow notification.
    pub async fn create_follow_notification(
        &self,
        recipient_id: &str,
        actor_id: &str,
    ) -> AppResult<notification::Model> {
        self.create(
            recipient_id,
            actor_id,
            VERB_FOLLOW,
            Some((TargetType::User, actor_id)),
        )
        .await
    }

    /// Create a like notification.
    pub async fn create_like_notification(
        &self,
        recipient_id: &str,
        actor_id: &str,
        post_id: &str,
    ) -> AppResult<notification::Model> {
        self.create(
            recipient_id,
            actor_id,
            VERB_LIKE,
            Some((TargetType::Post, post_id)),
        )
        .await
    }

    /// Create a comment notification. The target is the new comment.
    pub async fn create_comment_notification(
        &self,
        recipient_id: &str,
        actor_id: &str,
        comment_id: &str,
    ) -> AppResult<notification::Model> {
        self.create(
            recipient_id,
            actor_id,
            VERB_COMMENT,
            Some((TargetType::Comment, comment_id)),
        )
        .await
    }

    /// Create a notification with an arbitrary verb.
    pub async fn create(
        &self,
        recipient_id: &str,
        actor_id: &str,
        verb: &str,
        target: Option<(TargetType, &str)>,
    ) -> AppResult<notification::Model> {
        if verb.is_empty() || verb.chars().count() > 255 {
            return Err(AppError::Validation(
                "verb must be between 1 and 255 characters".to_string(),
            ));
        }

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_id: Set(recipient_id.to_string()),
            actor_id: Set(actor_id.to_string()),
            verb: Set(verb.to_string()),
            target_type: Set(target.map(|(kind, _)| kind)),
            target_id: Set(target.map(|(_, id)| id.to_string())),
            unread: Set(true),
            created_at: Set(chrono::Utc::now().into()),
        };

        let created = self.notification_repo.create(model).await?;
        tracing::debug!(
            notification_id = %created.id,
            recipient_id = %recipient_id,
            verb = %verb,
            "Notification created"
        );
        Ok(created)
    }

    /// The caller's notifications, unread first.
    pub async fn list(
        &self,
        recipient_id: &str,
        unread_only: bool,
        page: PageRequest,
    ) -> AppResult<Page<NotificationView>> {
        let total = self
            .notification_repo
            .count_by_recipient(recipient_id, unread_only)
            .await?;
        let rows = self
            .notification_repo
            .find_by_recipient(recipient_id, unread_only, page.limit(), page.offset())
            .await?;

        let names = usernames(&self.user_repo, rows.iter().map(|n| &n.actor_id)).await?;

        let items = rows
            .into_iter()
            .map(|notification| NotificationView {
                actor: names
                    .get(&notification.actor_id)
                    .cloned()
                    .unwrap_or_default(),
                notification,
            })
            .collect();

        Ok(Page::new(items, total, page))
    }

    /// Mark one of the caller's notifications as read.
    ///
    /// Notifications belonging to someone else are reported as missing.
    pub async fn mark_read(&self, recipient_id: &str, id: &str) -> AppResult<()> {
        let found = self
            .notification_repo
            .find_by_id(id)
            .await?
            .filter(|n| n.recipient_id == recipient_id)
            .ok_or_else(|| AppError::NotFound(format!("Notification {id}")))?;

        if found.unread {
            self.notification_repo.mark_as_read(id).await?;
        }
        Ok(())
    }

    /// Mark all of the caller's notifications as read. Returns how many changed.
    pub async fn mark_all_read(&self, recipient_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(recipient_id).await
    }

    /// Number of unread notifications for the caller.
    pub async fn unread_count(&self, recipient_id: &str) -> AppResult<u64> {
        self.notification_repo
            .count_by_recipient(recipient_id, true)
            .await
    }
}
