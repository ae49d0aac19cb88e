//! Account endpoints: registration, tokens, profiles and follows.

use agora_common::AppResult;
use agora_core::{RegisterInput, UpdateProfileInput};
use agora_db::entities::user;
use axum::{
    Json, Router,
    extract::{OriginalUri, Path, Query, State},
    response::Response,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, PageParams},
    middleware::AppState,
    response::{Detail, Paginated, created},
};

/// Public view of a user. Never carries the password hash or token.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub followers_count: i32,
    pub following_count: i32,
    pub date_joined: String,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            profile_picture: user.profile_picture,
            followers_count: user.followers_count,
            following_count: user.following_count,
            date_joined: user.date_joined.to_rfc3339(),
        }
    }
}

/// A user together with their API token.
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<Response> {
    let session = state.user_service.register(input).await?;

    Ok(created(AuthResponse {
        user: session.user.into(),
        token: session.token,
    }))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = state
        .user_service
        .login(&req.username, &req.password)
        .await?;

    Ok(Json(AuthResponse {
        user: session.user.into(),
        token: session.token,
    }))
}

async fn logout(AuthUser(user): AuthUser, State(state): State<AppState>) -> AppResult<Detail> {
    state.user_service.logout(&user.id).await?;
    Ok(Detail::new("Successfully logged out."))
}

async fn profile(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}

/// Shared by PUT and PATCH; absent fields are left alone.
async fn update_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateProfileInput>,
) -> AppResult<Json<UserResponse>> {
    let user = state.user_service.update_profile(&user.id, input).await?;
    Ok(Json(user.into()))
}

async fn user_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = state.user_service.get(&id).await?;
    Ok(Json(user.into()))
}

async fn followers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Paginated<UserResponse>> {
    let page = params.resolve(&state.pagination)?;
    let users = state.following_service.followers(&id, page).await?;
    Ok(Paginated::from_page(users, &uri))
}

async fn following(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Paginated<UserResponse>> {
    let page = params.resolve(&state.pagination)?;
    let users = state.following_service.following(&id, page).await?;
    Ok(Paginated::from_page(users, &uri))
}

async fn follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Detail> {
    let followee = state.following_service.follow(&user.id, &user_id).await?;
    Ok(Detail::new(format!("Now following {}.", followee.username)))
}

async fn unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Detail> {
    let followee = state.following_service.unfollow(&user.id, &user_id).await?;
    Ok(Detail::new(format!("Unfollowed {}.", followee.username)))
}

/// Create the accounts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route(
            "/profile",
            get(profile).put(update_profile).patch(update_profile),
        )
        .route("/users/{id}", get(user_detail))
        .route("/users/{id}/followers", get(followers))
        .route("/users/{id}/following", get(following))
        .route("/follow/{user_id}", post(follow))
        .route("/unfollow/{user_id}", post(unfollow))
}
