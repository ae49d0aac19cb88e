//! Blog endpoints.

use agora_common::AppResult;
use agora_core::{
    BlogCommentInput, BlogCommentView, BlogPostDetail, BlogPostView, CreateBlogPostInput,
    UpdateBlogPostInput,
};
use agora_db::entities::tag;
use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, PageParams},
    middleware::AppState,
    response::{Paginated, created, no_content},
};

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
}

impl From<tag::Model> for TagResponse {
    fn from(tag: tag::Model) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlogPostResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub published_date: String,
    pub author: String,
    pub tags: Vec<TagResponse>,
}

impl From<BlogPostView> for BlogPostResponse {
    fn from(view: BlogPostView) -> Self {
        Self {
            id: view.post.id,
            title: view.post.title,
            content: view.post.content,
            published_date: view.post.published_date.to_rfc3339(),
            author: view.author,
            tags: view.tags.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlogPostDetailResponse {
    #[serde(flatten)]
    pub post: BlogPostResponse,
    pub comments: Vec<BlogCommentResponse>,
}

impl From<BlogPostDetail> for BlogPostDetailResponse {
    fn from(detail: BlogPostDetail) -> Self {
        Self {
            post: detail.post.into(),
            comments: detail.comments.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlogCommentResponse {
    pub id: String,
    pub post: String,
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<BlogCommentView> for BlogCommentResponse {
    fn from(view: BlogCommentView) -> Self {
        Self {
            id: view.comment.id,
            post: view.comment.post_id,
            author: view.author,
            content: view.comment.content,
            created_at: view.comment.created_at.to_rfc3339(),
            updated_at: view.comment.updated_at.to_rfc3339(),
        }
    }
}

/// Posts carrying one tag.
#[derive(Serialize)]
pub struct TagPostsResponse {
    pub tag: TagResponse,
    pub posts: Vec<BlogPostResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

// === Posts ===

async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    Query(search): Query<SearchQuery>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Paginated<BlogPostResponse>> {
    let page = params.resolve(&state.pagination)?;
    let q = search.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let posts = state.blog_service.list_posts(q, page).await?;
    Ok(Paginated::from_page(posts, &uri))
}

async fn create_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateBlogPostInput>,
) -> AppResult<Response> {
    let post = state.blog_service.create_post(&user, input).await?;
    Ok(created(BlogPostResponse::from(post)))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<BlogPostDetailResponse>> {
    let detail = state.blog_service.get_post(&id).await?;
    Ok(Json(detail.into()))
}

async fn update_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateBlogPostInput>,
) -> AppResult<Json<BlogPostResponse>> {
    let post = state.blog_service.update_post(&user, &id, input).await?;
    Ok(Json(post.into()))
}

async fn delete_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.blog_service.delete_post(&user, &id).await?;
    Ok(no_content())
}

// === Tags ===

async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<TagResponse>>> {
    let tags = state.blog_service.tags().await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

async fn tag_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<TagPostsResponse>> {
    let (tag, posts) = state.blog_service.posts_by_tag(&slug).await?;
    Ok(Json(TagPostsResponse {
        tag: tag.into(),
        posts: posts.into_iter().map(Into::into).collect(),
    }))
}

// === Comments ===

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<BlogCommentResponse>>> {
    let comments = state.blog_service.list_comments(&id).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

async fn add_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<BlogCommentInput>,
) -> AppResult<Response> {
    let comment = state.blog_service.add_comment(&user, &id, input).await?;
    Ok(created(BlogCommentResponse::from(comment)))
}

async fn update_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<BlogCommentInput>,
) -> AppResult<Json<BlogCommentResponse>> {
    let comment = state.blog_service.update_comment(&user, &id, input).await?;
    Ok(Json(comment.into()))
}

async fn delete_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.blog_service.delete_comment(&user, &id).await?;
    Ok(no_content())
}

/// Create the blog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post)
                .put(update_post)
                .patch(update_post)
                .delete(delete_post),
        )
        .route("/posts/{id}/comments", get(list_comments).post(add_comment))
        .route(
            "/comments/{id}",
            put(update_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
        .route("/tags", get(list_tags))
        .route("/tags/{slug}", get(tag_posts))
}
