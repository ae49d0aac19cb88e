//! Library catalog service: books, authors, libraries and librarians.
//!
//! Reads are public. Writes go through [`PermissionService::require`].

use std::collections::{BTreeSet, HashMap};

use crate::services::{
    permission::{Permission, PermissionService},
    post::ensure_not_blank,
    query::parse_ordering,
};
use agora_common::{AppError, AppResult, IdGenerator, Page, PageRequest};
use agora_db::{
    entities::{author, book, librarian, library, library_book, user},
    repositories::{AuthorRepository, BookQuery, BookRepository, BookSortField, LibraryRepository},
};
use chrono::Datelike;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

const ORDERING_FIELDS: &[(&str, BookSortField)] = &[
    ("title", BookSortField::Title),
    ("publication_year", BookSortField::PublicationYear),
    ("author", BookSortField::Author),
    ("id", BookSortField::Id),
];

/// A book with its author's name.
#[derive(Debug, Clone)]
pub struct BookView {
    pub book: book::Model,
    pub author_name: String,
}

/// An author with the books they wrote.
#[derive(Debug, Clone)]
pub struct AuthorDetail {
    pub author: author::Model,
    pub books: Vec<book::Model>,
}

/// A library with its holdings and librarian.
#[derive(Debug, Clone)]
pub struct LibraryDetail {
    pub library: library::Model,
    pub books: Vec<BookView>,
    pub librarian: Option<librarian::Model>,
}

/// Query parameters for listing books.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListBooksQuery {
    pub title: Option<String>,
    /// Author ID.
    pub author: Option<String>,
    pub publication_year: Option<i32>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    pub publication_year: i32,

    /// Author ID.
    pub author: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBookInput {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,

    pub publication_year: Option<i32>,

    pub author: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NameInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddBookInput {
    /// Book ID.
    pub book: String,
}

fn validate_publication_year(year: i32) -> AppResult<()> {
    if year > chrono::Utc::now().year() {
        return Err(AppError::Validation(
            "publication_year cannot be in the future.".to_string(),
        ));
    }
    Ok(())
}

/// Library service for business logic.
#[derive(Clone)]
pub struct LibraryService {
    book_repo: BookRepository,
    author_repo: AuthorRepository,
    library_repo: LibraryRepository,
    permissions: PermissionService,
    id_gen: IdGenerator,
}

impl LibraryService {
    /// Create a new library service.
    #[must_use]
    pub const fn new(
        book_repo: BookRepository,
        author_repo: AuthorRepository,
        library_repo: LibraryRepository,
        permissions: PermissionService,
    ) -> Self {
        Self {
            book_repo,
            author_repo,
            library_repo,
            permissions,
            id_gen: IdGenerator::new(),
        }
    }

    async fn book_views(&self, books: Vec<book::Model>) -> AppResult<Vec<BookView>> {
        let author_ids: Vec<String> = books
            .iter()
            .map(|b| b.author_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let names: HashMap<String, String> = self
            .author_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect();

        Ok(books
            .into_iter()
            .map(|book| BookView {
                author_name: names.get(&book.author_id).cloned().unwrap_or_default(),
                book,
            })
            .collect())
    }

    async fn book_view(&self, book: book::Model) -> AppResult<BookView> {
        self.book_views(vec![book])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Book view missing".to_string()))
    }

    async fn author_for_write(&self, author_id: &str) -> AppResult<author::Model> {
        self.author_repo.find_by_id(author_id).await?.ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid author \"{author_id}\" - object does not exist."
            ))
        })
    }

    // === Books ===

    /// List books. Sorted by title unless `ordering` says otherwise.
    pub async fn list_books(
        &self,
        query: ListBooksQuery,
        page: PageRequest,
    ) -> AppResult<Page<BookView>> {
        let query = BookQuery {
            title: query.title,
            author_id: query.author,
            publication_year: query.publication_year,
            search: query.search,
            ordering: parse_ordering(query.ordering.as_deref(), ORDERING_FIELDS),
        };

        let total = self.book_repo.count(&query).await?;
        let books = self
            .book_repo
            .search(&query, page.limit(), page.offset())
            .await?;

        Ok(Page::new(self.book_views(books).await?, total, page))
    }

    pub async fn get_book(&self, id: &str) -> AppResult<BookView> {
        let book = self.book_repo.get_by_id(id).await?;
        self.book_view(book).await
    }

    pub async fn create_book(
        &self,
        caller: Option<&user::Model>,
        input: CreateBookInput,
    ) -> AppResult<BookView> {
        self.permissions.require(caller, Permission::Create).await?;
        input.validate()?;
        ensure_not_blank("title", &input.title)?;
        validate_publication_year(input.publication_year)?;
        let author = self.author_for_write(&input.author).await?;

        let book = self
            .book_repo
            .create(book::ActiveModel {
                id: Set(self.id_gen.generate()),
                title: Set(input.title),
                publication_year: Set(input.publication_year),
                author_id: Set(author.id),
            })
            .await?;

        tracing::info!(book_id = %book.id, "Book created");
        Ok(BookView {
            book,
            author_name: author.name,
        })
    }

    pub async fn update_book(
        &self,
        caller: Option<&user::Model>,
        id: &str,
        input: UpdateBookInput,
    ) -> AppResult<BookView> {
        self.permissions.require(caller, Permission::Edit).await?;
        input.validate()?;
        if let Some(title) = &input.title {
            ensure_not_blank("title", title)?;
        }
        if let Some(year) = input.publication_year {
            validate_publication_year(year)?;
        }

        let book = self.book_repo.get_by_id(id).await?;
        let mut active: book::ActiveModel = book.into();

        if let Some(author_id) = &input.author {
            let author = self.author_for_write(author_id).await?;
            active.author_id = Set(author.id);
        }
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(year) = input.publication_year {
            active.publication_year = Set(year);
        }

        let book = self.book_repo.update(active).await?;
        self.book_view(book).await
    }

    pub async fn delete_book(&self, caller: Option<&user::Model>, id: &str) -> AppResult<()> {
        self.permissions.require(caller, Permission::Delete).await?;
        self.book_repo.get_by_id(id).await?;
        self.book_repo.delete(id).await?;

        tracing::info!(book_id = %id, "Book deleted");
        Ok(())
    }

    // === Authors ===

    pub async fn list_authors(&self, page: PageRequest) -> AppResult<Page<author::Model>> {
        let total = self.author_repo.count().await?;
        let authors = self
            .author_repo
            .find_all(page.limit(), page.offset())
            .await?;
        Ok(Page::new(authors, total, page))
    }

    pub async fn create_author(
        &self,
        caller: Option<&user::Model>,
        input: NameInput,
    ) -> AppResult<author::Model> {
        self.permissions.require(caller, Permission::Create).await?;
        input.validate()?;
        ensure_not_blank("name", &input.name)?;

        self.author_repo
            .create(author::ActiveModel {
                id: Set(self.id_gen.generate()),
                name: Set(input.name),
            })
            .await
    }

    /// An author and all their books.
    pub async fn get_author(&self, id: &str) -> AppResult<AuthorDetail> {
        let author = self
            .author_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author {id}")))?;
        let books = self.book_repo.find_by_author(id).await?;

        Ok(AuthorDetail { author, books })
    }

    // === Libraries ===

    pub async fn list_libraries(&self, page: PageRequest) -> AppResult<Page<library::Model>> {
        let total = self.library_repo.count().await?;
        let libraries = self
            .library_repo
            .find_all(page.limit(), page.offset())
            .await?;
        Ok(Page::new(libraries, total, page))
    }

    pub async fn create_library(
        &self,
        caller: Option<&user::Model>,
        input: NameInput,
    ) -> AppResult<library::Model> {
        self.permissions.require(caller, Permission::Create).await?;
        input.validate()?;
        ensure_not_blank("name", &input.name)?;

        if self.library_repo.find_by_name(&input.name).await?.is_some() {
            return Err(AppError::BadRequest(
                "library with this name already exists.".to_string(),
            ));
        }

        self.library_repo
            .create(library::ActiveModel {
                id: Set(self.id_gen.generate()),
                name: Set(input.name),
            })
            .await
    }

    /// A library with its books and librarian.
    pub async fn get_library(&self, id: &str) -> AppResult<LibraryDetail> {
        let library = self.library_repo.get_by_id(id).await?;
        let books = self.book_repo.find_by_library(id).await?;
        let librarian = self.library_repo.find_librarian(id).await?;

        Ok(LibraryDetail {
            library,
            books: self.book_views(books).await?,
            librarian,
        })
    }

    /// Add a book to a library. Adding a held book changes nothing.
    pub async fn add_book(
        &self,
        caller: Option<&user::Model>,
        library_id: &str,
        input: AddBookInput,
    ) -> AppResult<()> {
        self.permissions.require(caller, Permission::Edit).await?;
        self.library_repo.get_by_id(library_id).await?;
        self.book_repo.find_by_id(&input.book).await?.ok_or_else(|| {
            AppError::BadRequest(format!(
                "Invalid book \"{}\" - object does not exist.",
                input.book
            ))
        })?;

        if self.library_repo.has_book(library_id, &input.book).await? {
            return Ok(());
        }

        self.library_repo
            .add_book(library_book::ActiveModel {
                id: Set(self.id_gen.generate()),
                library_id: Set(library_id.to_string()),
                book_id: Set(input.book),
            })
            .await
    }

    pub async fn remove_book(
        &self,
        caller: Option<&user::Model>,
        library_id: &str,
        book_id: &str,
    ) -> AppResult<()> {
        self.permissions.require(caller, Permission::Edit).await?;
        self.library_repo.get_by_id(library_id).await?;

        if !self.library_repo.remove_book(library_id, book_id).await? {
            return Err(AppError::NotFound(format!(
                "Book {book_id} in library {library_id}"
            )));
        }
        Ok(())
    }

    pub async fn get_librarian(&self, library_id: &str) -> AppResult<librarian::Model> {
        self.library_repo.get_by_id(library_id).await?;
        self.library_repo
            .find_librarian(library_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Librarian of library {library_id}")))
    }

    /// Assign a librarian, or rename the current one.
    pub async fn put_librarian(
        &self,
        caller: Option<&user::Model>,
        library_id: &str,
        input: NameInput,
    ) -> AppResult<librarian::Model> {
        self.permissions.require(caller, Permission::Edit).await?;
        input.validate()?;
        ensure_not_blank("name", &input.name)?;
        self.library_repo.get_by_id(library_id).await?;

        match self.library_repo.find_librarian(library_id).await? {
            Some(existing) => {
                let mut active: librarian::ActiveModel = existing.into();
                active.name = Set(input.name);
                self.library_repo.update_librarian(active).await
            }
            None => {
                self.library_repo
                    .create_librarian(librarian::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        name: Set(input.name),
                        library_id: Set(library_id.to_string()),
                    })
                    .await
            }
        }
    }
}
