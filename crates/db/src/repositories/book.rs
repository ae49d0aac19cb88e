//! Book repository.

use std::sync::Arc;

use super::icontains;
use crate::entities::{Author, Book, LibraryBook, author, book, library_book};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, JoinType, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
    sea_query::{Expr, Query},
};

/// Sortable book fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSortField {
    Title,
    PublicationYear,
    /// Author name.
    Author,
    Id,
}

/// Filters for listing books.
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
    /// Exact title match.
    pub title: Option<String>,
    /// Exact author ID match.
    pub author_id: Option<String>,
    /// Exact year match.
    pub publication_year: Option<i32>,
    /// Case-insensitive match against title or author name.
    pub search: Option<String>,
    /// Sort keys. Empty means by title.
    pub ordering: Vec<(BookSortField, Order)>,
}

/// Book repository for database operations.
#[derive(Clone)]
pub struct BookRepository {
    db: Arc<DatabaseConnection>,
}

impl BookRepository {
    /// Create a new book repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a book by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<book::Model>> {
        Book::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a book by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<book::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::BookNotFound(id.to_string()))
    }

    /// Create a book.
    pub async fn create(&self, model: book::ActiveModel) -> AppResult<book::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a book.
    pub async fn update(&self, model: book::ActiveModel) -> AppResult<book::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a book.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Book::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    fn filtered(query: &BookQuery) -> Select<Book> {
        let mut select = Book::find().join(JoinType::InnerJoin, book::Relation::Author.def());

        if let Some(title) = &query.title {
            select = select.filter(book::Column::Title.eq(title.as_str()));
        }
        if let Some(author_id) = &query.author_id {
            select = select.filter(book::Column::AuthorId.eq(author_id.as_str()));
        }
        if let Some(year) = query.publication_year {
            select = select.filter(book::Column::PublicationYear.eq(year));
        }
        if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(icontains((Book, book::Column::Title), term))
                    .add(icontains((Author, author::Column::Name), term)),
            );
        }

        select
    }

    /// List books matching `query`.
    pub async fn search(
        &self,
        query: &BookQuery,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<book::Model>> {
        let mut select = Self::filtered(query);

        if query.ordering.is_empty() {
            select = select.order_by_asc(book::Column::Title);
        }
        for (field, order) in &query.ordering {
            select = match field {
                BookSortField::Title => select.order_by(book::Column::Title, order.clone()),
                BookSortField::PublicationYear => {
                    select.order_by(book::Column::PublicationYear, order.clone())
                }
                BookSortField::Author => select.order_by(author::Column::Name, order.clone()),
                BookSortField::Id => select.order_by(book::Column::Id, order.clone()),
            };
        }

        select
            .order_by_asc(book::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count books matching `query`.
    pub async fn count(&self, query: &BookQuery) -> AppResult<u64> {
        Self::filtered(query)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Books by one author, by title.
    pub async fn find_by_author(&self, author_id: &str) -> AppResult<Vec<book::Model>> {
        Book::find()
            .filter(book::Column::AuthorId.eq(author_id))
            .order_by_asc(book::Column::Title)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Books held by a library, by title.
    pub async fn find_by_library(&self, library_id: &str) -> AppResult<Vec<book::Model>> {
        let held = Query::select()
            .column(library_book::Column::BookId)
            .from(LibraryBook)
            .and_where(Expr::col(library_book::Column::LibraryId).eq(library_id))
            .to_owned();

        Book::find()
            .filter(book::Column::Id.in_subquery(held))
            .order_by_asc(book::Column::Title)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
