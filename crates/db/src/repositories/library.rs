//! Library repository, covering library holdings and librarians.

use std::sync::Arc;

use crate::entities::{Librarian, Library, LibraryBook, librarian, library, library_book};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Library repository for database operations.
#[derive(Clone)]
pub struct LibraryRepository {
    db: Arc<DatabaseConnection>,
}

impl LibraryRepository {
    /// Create a new library repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a library by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<library::Model> {
        Library::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Library {id}")))
    }

    /// Find a library by name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<library::Model>> {
        Library::find()
            .filter(library::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a library.
    pub async fn create(&self, model: library::ActiveModel) -> AppResult<library::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List libraries by name.
    pub async fn find_all(&self, limit: u64, offset: u64) -> AppResult<Vec<library::Model>> {
        Library::find()
            .order_by_asc(library::Column::Name)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count libraries.
    pub async fn count(&self) -> AppResult<u64> {
        Library::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether a library holds a book.
    pub async fn has_book(&self, library_id: &str, book_id: &str) -> AppResult<bool> {
        let link = LibraryBook::find()
            .filter(library_book::Column::LibraryId.eq(library_id))
            .filter(library_book::Column::BookId.eq(book_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(link.is_some())
    }

    /// Add a book to a library's holdings.
    pub async fn add_book(&self, model: library_book::ActiveModel) -> AppResult<()> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Remove a book from a library's holdings. Returns whether a row was removed.
    pub async fn remove_book(&self, library_id: &str, book_id: &str) -> AppResult<bool> {
        let result = LibraryBook::delete_many()
            .filter(library_book::Column::LibraryId.eq(library_id))
            .filter(library_book::Column::BookId.eq(book_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// The librarian of a library, if one is assigned.
    pub async fn find_librarian(&self, library_id: &str) -> AppResult<Option<librarian::Model>> {
        Librarian::find()
            .filter(librarian::Column::LibraryId.eq(library_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a librarian.
    pub async fn create_librarian(
        &self,
        model: librarian::ActiveModel,
    ) -> AppResult<librarian::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a librarian.
    pub async fn update_librarian(
        &self,
        model: librarian::ActiveModel,
    ) -> AppResult<librarian::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
