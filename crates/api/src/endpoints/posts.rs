//! Social posts, comments, likes and the follow feed.

use agora_common::AppResult;
use agora_core::{
    CommentView, CreateCommentInput, CreatePostInput, ListCommentsQuery, ListPostsQuery,
    PostDetail, PostView, UpdateCommentInput, UpdatePostInput,
};
use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use serde::Serialize;

use crate::{
    extractors::{AuthUser, MaybeAuthUser, PageParams},
    middleware::AppState,
    response::{Detail, Paginated, created, no_content},
};

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: String,
    pub author: String,
    pub title: String,
    pub content: String,
    pub likes_count: i32,
    pub comments_count: i32,
    pub liked: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PostView> for PostResponse {
    fn from(view: PostView) -> Self {
        Self {
            id: view.post.id,
            author: view.author,
            title: view.post.title,
            content: view.post.content,
            likes_count: view.post.likes_count,
            comments_count: view.post.comments_count,
            liked: view.liked,
            created_at: view.post.created_at.to_rfc3339(),
            updated_at: view.post.updated_at.to_rfc3339(),
        }
    }
}

/// A post with its comments, oldest first.
#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    #[serde(flatten)]
    pub post: PostResponse,
    pub comments: Vec<CommentResponse>,
}

impl From<PostDetail> for PostDetailResponse {
    fn from(detail: PostDetail) -> Self {
        Self {
            post: detail.post.into(),
            comments: detail.comments.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub post: String,
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
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

// === Posts ===

async fn list_posts(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    Query(query): Query<ListPostsQuery>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Paginated<PostResponse>> {
    let page = params.resolve(&state.pagination)?;
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let posts = state.post_service.list(query, viewer_id, page).await?;
    Ok(Paginated::from_page(posts, &uri))
}

async fn create_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> AppResult<Response> {
    let post = state.post_service.create(&user, input).await?;
    Ok(created(PostResponse::from(post)))
}

async fn get_post(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PostDetailResponse>> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let detail = state.post_service.get(&id, viewer_id).await?;
    Ok(Json(detail.into()))
}

async fn update_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePostInput>,
) -> AppResult<Json<PostResponse>> {
    let post = state.post_service.update(&user, &id, input).await?;
    Ok(Json(post.into()))
}

async fn delete_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.post_service.delete(&user, &id).await?;
    Ok(no_content())
}

async fn like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Detail> {
    state.like_service.like(&user.id, &id).await?;
    Ok(Detail::new("Post liked."))
}

async fn unlike(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Detail> {
    state.like_service.unlike(&user.id, &id).await?;
    Ok(Detail::new("Like removed."))
}

async fn feed(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Paginated<PostResponse>> {
    let page = params.resolve(&state.pagination)?;
    let posts = state.post_service.feed(&user.id, page).await?;
    Ok(Paginated::from_page(posts, &uri))
}

// === Comments ===

async fn list_comments(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    Query(query): Query<ListCommentsQuery>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Paginated<CommentResponse>> {
    let page = params.resolve(&state.pagination)?;
    let comments = state.comment_service.list(query, page).await?;
    Ok(Paginated::from_page(comments, &uri))
}

async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<Response> {
    let comment = state.comment_service.create(&user, input).await?;
    Ok(created(CommentResponse::from(comment)))
}

async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<CommentResponse>> {
    let comment = state.comment_service.get(&id).await?;
    Ok(Json(comment.into()))
}

async fn update_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCommentInput>,
) -> AppResult<Json<CommentResponse>> {
    let comment = state.comment_service.update(&user, &id, input).await?;
    Ok(Json(comment.into()))
}

async fn delete_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.comment_service.delete(&user, &id).await?;
    Ok(no_content())
}

/// Create the posts router.
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
        .route("/posts/{id}/like", post(like))
        .route("/posts/{id}/unlike", post(unlike))
        .route("/comments", get(list_comments).post(create_comment))
        .route(
            "/comments/{id}",
            get(get_comment)
                .put(update_comment)
                .patch(update_comment)
                .delete(delete_comment),
        )
        .route("/feed", get(feed))
}
