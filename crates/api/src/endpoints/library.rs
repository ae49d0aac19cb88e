//! Library catalog endpoints and permission group management.
//!
//! Reads are public. Writes go through the book permissions, so an
//! anonymous caller gets 401 and an authenticated one lacking the
//! permission gets 403.

use agora_common::AppResult;
use agora_core::{
    AddBookInput, AuthorDetail, BookView, CreateBookInput, LibraryDetail, ListBooksQuery,
    NameInput, PermissionSet, UpdateBookInput,
};
use agora_db::entities::{author, book, librarian, library, permission_group};
use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
};
use serde::Serialize;

use crate::{
    extractors::{AuthUser, MaybeAuthUser, PageParams},
    middleware::AppState,
    response::{Detail, Paginated, created, no_content},
};

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: String,
    pub title: String,
    pub publication_year: i32,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

impl From<BookView> for BookResponse {
    fn from(view: BookView) -> Self {
        Self {
            author_name: Some(view.author_name),
            ..Self::from(view.book)
        }
    }
}

impl From<book::Model> for BookResponse {
    fn from(book: book::Model) -> Self {
        Self {
            id: book.id,
            title: book.title,
            publication_year: book.publication_year,
            author: book.author_id,
            author_name: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorResponse {
    pub id: String,
    pub name: String,
}

impl From<author::Model> for AuthorResponse {
    fn from(author: author::Model) -> Self {
        Self {
            id: author.id,
            name: author.name,
        }
    }
}

/// An author with every book they wrote.
#[derive(Debug, Serialize)]
pub struct AuthorDetailResponse {
    pub id: String,
    pub name: String,
    pub books: Vec<BookResponse>,
}

impl From<AuthorDetail> for AuthorDetailResponse {
    fn from(detail: AuthorDetail) -> Self {
        Self {
            id: detail.author.id,
            name: detail.author.name,
            books: detail.books.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub id: String,
    pub name: String,
}

impl From<library::Model> for LibraryResponse {
    fn from(library: library::Model) -> Self {
        Self {
            id: library.id,
            name: library.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LibrarianResponse {
    pub id: String,
    pub name: String,
    pub library: String,
}

impl From<librarian::Model> for LibrarianResponse {
    fn from(librarian: librarian::Model) -> Self {
        Self {
            id: librarian.id,
            name: librarian.name,
            library: librarian.library_id,
        }
    }
}

/// A library with its holdings and librarian.
#[derive(Debug, Serialize)]
pub struct LibraryDetailResponse {
    pub id: String,
    pub name: String,
    pub books: Vec<BookResponse>,
    pub librarian: Option<LibrarianResponse>,
}

impl From<LibraryDetail> for LibraryDetailResponse {
    fn from(detail: LibraryDetail) -> Self {
        Self {
            id: detail.library.id,
            name: detail.library.name,
            books: detail.books.into_iter().map(Into::into).collect(),
            librarian: detail.librarian.map(Into::into),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub permissions: PermissionSet,
}

impl From<permission_group::Model> for GroupResponse {
    fn from(group: permission_group::Model) -> Self {
        Self {
            permissions: PermissionSet::default().with_group(&group),
            id: group.id,
            name: group.name,
        }
    }
}

// === Books ===

async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    Query(query): Query<ListBooksQuery>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Paginated<BookResponse>> {
    let page = params.resolve(&state.pagination)?;
    let books = state.library_service.list_books(query, page).await?;
    Ok(Paginated::from_page(books, &uri))
}

async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<BookResponse>> {
    let book = state.library_service.get_book(&id).await?;
    Ok(Json(book.into()))
}

async fn create_book(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateBookInput>,
) -> AppResult<Response> {
    let book = state
        .library_service
        .create_book(caller.as_ref(), input)
        .await?;
    Ok(created(BookResponse::from(book)))
}

async fn update_book(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateBookInput>,
) -> AppResult<Json<BookResponse>> {
    let book = state
        .library_service
        .update_book(caller.as_ref(), &id, input)
        .await?;
    Ok(Json(book.into()))
}

async fn delete_book(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .library_service
        .delete_book(caller.as_ref(), &id)
        .await?;
    Ok(no_content())
}

// === Authors ===

async fn list_authors(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Paginated<AuthorResponse>> {
    let page = params.resolve(&state.pagination)?;
    let authors = state.library_service.list_authors(page).await?;
    Ok(Paginated::from_page(authors, &uri))
}

async fn create_author(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    Json(input): Json<NameInput>,
) -> AppResult<Response> {
    let author = state
        .library_service
        .create_author(caller.as_ref(), input)
        .await?;
    Ok(created(AuthorResponse::from(author)))
}

async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<AuthorDetailResponse>> {
    let detail = state.library_service.get_author(&id).await?;
    Ok(Json(detail.into()))
}

// === Libraries ===

async fn list_libraries(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Paginated<LibraryResponse>> {
    let page = params.resolve(&state.pagination)?;
    let libraries = state.library_service.list_libraries(page).await?;
    Ok(Paginated::from_page(libraries, &uri))
}

async fn create_library(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    Json(input): Json<NameInput>,
) -> AppResult<Response> {
    let library = state
        .library_service
        .create_library(caller.as_ref(), input)
        .await?;
    Ok(created(LibraryResponse::from(library)))
}

async fn get_library(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<LibraryDetailResponse>> {
    let detail = state.library_service.get_library(&id).await?;
    Ok(Json(detail.into()))
}

async fn add_book(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<AddBookInput>,
) -> AppResult<Detail> {
    state
        .library_service
        .add_book(caller.as_ref(), &id, input)
        .await?;
    Ok(Detail::new("Book added to library."))
}

async fn remove_book(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    Path((id, book_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state
        .library_service
        .remove_book(caller.as_ref(), &id, &book_id)
        .await?;
    Ok(no_content())
}

async fn get_librarian(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<LibrarianResponse>> {
    let librarian = state.library_service.get_librarian(&id).await?;
    Ok(Json(librarian.into()))
}

async fn put_librarian(
    MaybeAuthUser(caller): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<NameInput>,
) -> AppResult<Json<LibrarianResponse>> {
    let librarian = state
        .library_service
        .put_librarian(caller.as_ref(), &id, input)
        .await?;
    Ok(Json(librarian.into()))
}

// === Groups ===

async fn list_groups(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<GroupResponse>>> {
    let groups = state.permission_service.groups(&user).await?;
    Ok(Json(groups.into_iter().map(Into::into).collect()))
}

async fn add_member(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((name, user_id)): Path<(String, String)>,
) -> AppResult<Detail> {
    state
        .permission_service
        .add_member(&user, &name, &user_id)
        .await?;
    Ok(Detail::new(format!("Added to {name}.")))
}

async fn remove_member(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((name, user_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state
        .permission_service
        .remove_member(&user, &name, &user_id)
        .await?;
    Ok(no_content())
}

async fn my_permissions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<PermissionSet>> {
    Ok(Json(state.permission_service.effective(&user).await?))
}

/// Create the library router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/{id}",
            get(get_book)
                .put(update_book)
                .patch(update_book)
                .delete(delete_book),
        )
        .route("/authors", get(list_authors).post(create_author))
        .route("/authors/{id}", get(get_author))
        .route("/libraries", get(list_libraries).post(create_library))
        .route("/libraries/{id}", get(get_library))
        .route("/libraries/{id}/books", post(add_book))
        .route("/libraries/{id}/books/{book_id}", delete(remove_book))
        .route(
            "/libraries/{id}/librarian",
            get(get_librarian).put(put_librarian),
        )
        .route("/groups", get(list_groups))
        .route(
            "/groups/{name}/members/{user_id}",
            post(add_member).delete(remove_member),
        )
        .route("/permissions", get(my_permissions))
}
