//! Blog comment repository.

use std::sync::Arc;

use crate::entities::{BlogComment, blog_comment};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Blog comment repository for database operations.
#[derive(Clone)]
pub struct BlogCommentRepository {
    db: Arc<DatabaseConnection>,
}

impl BlogCommentRepository {
    /// Create a new blog comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<blog_comment::Model> {
        BlogComment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Comment {id}")))
    }

    /// Comments on a post, oldest first.
    pub async fn find_by_post(&self, post_id: &str) -> AppResult<Vec<blog_comment::Model>> {
        BlogComment::find()
            .filter(blog_comment::Column::PostId.eq(post_id))
            .order_by_asc(blog_comment::Column::CreatedAt)
            .order_by_asc(blog_comment::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a comment.
    pub async fn create(
        &self,
        model: blog_comment::ActiveModel,
    ) -> AppResult<blog_comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a comment.
    pub async fn update(
        &self,
        model: blog_comment::ActiveModel,
    ) -> AppResult<blog_comment::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        BlogComment::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
