//! Author repository.

use std::sync::Arc;

use crate::entities::{Author, author};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Author repository for database operations.
#[derive(Clone)]
pub struct AuthorRepository {
    db: Arc<DatabaseConnection>,
}

impl AuthorRepository {
    /// Create a new author repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an author by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<author::Model>> {
        Author::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find authors by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<author::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Author::find()
            .filter(author::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create an author.
    pub async fn create(&self, model: author::ActiveModel) -> AppResult<author::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List authors by name.
    pub async fn find_all(&self, limit: u64, offset: u64) -> AppResult<Vec<author::Model>> {
        Author::find()
            .order_by_asc(author::Column::Name)
            .order_by_asc(author::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count authors.
    pub async fn count(&self) -> AppResult<u64> {
        Author::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
