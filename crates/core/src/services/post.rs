//! Post service: social posts, their detail view and the follow feed.

use std::collections::HashSet;

use crate::services::{comment::CommentView, query::parse_ordering, user::usernames};
use agora_common::{AppError, AppResult, IdGenerator, Page, PageRequest};
use agora_db::{
    entities::{post, user},
    repositories::{
        CommentRepository, FollowingRepository, PostLikeRepository, PostQuery, PostRepository,
        UserRepository,
    },
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

const ORDERING_FIELDS: &[(&str, post::Column)] = &[
    ("created_at", post::Column::CreatedAt),
    ("updated_at", post::Column::UpdatedAt),
];

pub(crate) const NOT_OWNER: &str = "You do not have permission to perform this action.";

/// A post as seen by a particular viewer.
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: post::Model,
    /// Author username.
    pub author: String,
    /// Whether the viewer has liked the post. Always false for anonymous viewers.
    pub liked: bool,
}

/// A post with its comments, oldest first.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostView,
    pub comments: Vec<CommentView>,
}

/// Query parameters for listing posts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPostsQuery {
    pub search: Option<String>,
    pub ordering: Option<String>,
}

/// Input for creating a post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostInput {
    #[serde(default)]
    #[validate(length(max = 200))]
    pub title: String,

    pub content: String,
}

/// Input for updating a post. Absent fields are left alone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePostInput {
    #[validate(length(max = 200))]
    pub title: Option<String>,

    pub content: Option<String>,
}

/// Reject empty or whitespace-only text.
pub(crate) fn ensure_not_blank(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "{field}: This field may not be blank."
        )));
    }
    Ok(())
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    comment_repo: CommentRepository,
    like_repo: PostLikeRepository,
    following_repo: FollowingRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        comment_repo: CommentRepository,
        like_repo: PostLikeRepository,
        following_repo: FollowingRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            post_repo,
            comment_repo,
            like_repo,
            following_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// List posts, newest first unless `ordering` says otherwise.
    pub async fn list(
        &self,
        query: ListPostsQuery,
        viewer: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<PostView>> {
        let query = PostQuery {
            search: query.search,
            author_ids: None,
            ordering: parse_ordering(query.ordering.as_deref(), ORDERING_FIELDS),
        };

        self.page_of(&query, viewer, page).await
    }

    /// Posts by users the viewer follows, newest first.
    pub async fn feed(&self, viewer_id: &str, page: PageRequest) -> AppResult<Page<PostView>> {
        let followee_ids = self.following_repo.followee_ids(viewer_id).await?;
        if followee_ids.is_empty() {
            return Ok(Page::new(vec![], 0, page));
        }

        let query = PostQuery {
            author_ids: Some(followee_ids),
            ..Default::default()
        };

        self.page_of(&query, Some(viewer_id), page).await
    }

    async fn page_of(
        &self,
        query: &PostQuery,
        viewer: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<PostView>> {
        let total = self.post_repo.count(query).await?;
        let posts = self
            .post_repo
            .search(query, page.limit(), page.offset())
            .await?;

        Ok(Page::new(self.views(posts, viewer).await?, total, page))
    }

    /// Attach author usernames and the viewer's liked flags.
    async fn views(&self, posts: Vec<post::Model>, viewer: Option<&str>) -> AppResult<Vec<PostView>> {
        let names = usernames(&self.user_repo, posts.iter().map(|p| &p.author_id)).await?;

        let liked: HashSet<String> = match viewer {
            Some(viewer_id) => {
                let ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
                self.like_repo
                    .liked_post_ids(viewer_id, &ids)
                    .await?
                    .into_iter()
                    .collect()
            }
            None => HashSet::new(),
        };

        Ok(posts
            .into_iter()
            .map(|post| PostView {
                author: names.get(&post.author_id).cloned().unwrap_or_default(),
                liked: liked.contains(&post.id),
                post,
            })
            .collect())
    }

    /// Create a post authored by `author`.
    pub async fn create(&self, author: &user::Model, input: CreatePostInput) -> AppResult<PostView> {
        input.validate()?;
        ensure_not_blank("content", &input.content)?;

        let now = chrono::Utc::now();
        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author.id.clone()),
            title: Set(input.title),
            content: Set(input.content),
            likes_count: Set(0),
            comments_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let post = self.post_repo.create(model).await?;
        tracing::info!(post_id = %post.id, author_id = %author.id, "Post created");

        Ok(PostView {
            post,
            author: author.username.clone(),
            liked: false,
        })
    }

    /// A post with its comments.
    pub async fn get(&self, id: &str, viewer: Option<&str>) -> AppResult<PostDetail> {
        let post = self.post_repo.get_by_id(id).await?;
        let comments = self.comment_repo.find_by_post(id).await?;

        let names = usernames(
            &self.user_repo,
            std::iter::once(&post.author_id).chain(comments.iter().map(|c| &c.author_id)),
        )
        .await?;

        let liked = match viewer {
            Some(viewer_id) => !self
                .like_repo
                .liked_post_ids(viewer_id, std::slice::from_ref(&post.id))
                .await?
                .is_empty(),
            None => false,
        };

        let comments = comments
            .into_iter()
            .map(|comment| CommentView {
                author: names.get(&comment.author_id).cloned().unwrap_or_default(),
                comment,
            })
            .collect();

        Ok(PostDetail {
            post: PostView {
                author: names.get(&post.author_id).cloned().unwrap_or_default(),
                liked,
                post,
            },
            comments,
        })
    }

    /// Update a post. Only its author may do so.
    pub async fn update(
        &self,
        actor: &user::Model,
        id: &str,
        input: UpdatePostInput,
    ) -> AppResult<PostView> {
        input.validate()?;
        if let Some(content) = &input.content {
            ensure_not_blank("content", content)?;
        }

        let post = self.post_repo.get_by_id(id).await?;
        if post.author_id != actor.id {
            return Err(AppError::Forbidden(NOT_OWNER.to_string()));
        }

        let mut active: post::ActiveModel = post.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        active.updated_at = Set(chrono::Utc::now().into());

        let post = self.post_repo.update(active).await?;
        let mut views = self.views(vec![post], Some(&actor.id)).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal("Updated post vanished".to_string()))
    }

    /// Delete a post. Only its author may do so.
    pub async fn delete(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(id).await?;
        if post.author_id != actor.id {
            return Err(AppError::Forbidden(NOT_OWNER.to_string()));
        }

        self.post_repo.delete(id).await?;
        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use agora_db::entities::comment;
    use std::collections::BTreeMap;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    pub(crate) fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            profile_picture: None,
            password_hash: "hash".to_string(),
            token: None,
            is_staff: false,
            followers_count: 0,
            following_count: 0,
            date_joined: Utc::now().into(),
            updated_at: None,
        }
    }

    pub(crate) fn create_test_post(id: &str, author_id: &str) -> post::Model {
        let now = Utc::now().into();
        post::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            title: "Hello".to_string(),
            content: "First post".to_string(),
            likes_count: 0,
            comments_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    struct Mocks {
        post: MockDatabase,
        comment: MockDatabase,
        like: MockDatabase,
        following: MockDatabase,
        user: MockDatabase,
    }

    impl Default for Mocks {
        fn default() -> Self {
            Self {
                post: MockDatabase::new(DatabaseBackend::Postgres),
                comment: MockDatabase::new(DatabaseBackend::Postgres),
                like: MockDatabase::new(DatabaseBackend::Postgres),
                following: MockDatabase::new(DatabaseBackend::Postgres),
                user: MockDatabase::new(DatabaseBackend::Postgres),
            }
        }
    }

    fn create_test_service(mocks: Mocks) -> PostService {
        PostService::new(
            PostRepository::new(Arc::new(mocks.post.into_connection())),
            CommentRepository::new(Arc::new(mocks.comment.into_connection())),
            PostLikeRepository::new(Arc::new(mocks.like.into_connection())),
            FollowingRepository::new(Arc::new(mocks.following.into_connection())),
            UserRepository::new(Arc::new(mocks.user.into_connection())),
        )
    }

    #[tokio::test]
    async fn test_create_rejects_blank_content() {
        let service = create_test_service(Mocks::default());
        let author = create_test_user("u1", "alice");

        let result = service
            .create(
                &author,
                CreatePostInput {
                    title: String::new(),
                    content: "   ".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_long_title() {
        let service = create_test_service(Mocks::default());
        let author = create_test_user("u1", "alice");

        let result = service
            .create(
                &author,
                CreatePostInput {
                    title: "t".repeat(201),
                    content: "body".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_uses_caller_as_author() {
        let service = create_test_service(Mocks {
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u1")]]),
            ..Default::default()
        });
        let author = create_test_user("u1", "alice");

        let view = service
            .create(
                &author,
                CreatePostInput {
                    title: String::new(),
                    content: "First post".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(view.author, "alice");
        assert_eq!(view.post.author_id, "u1");
        assert!(!view.liked);
    }

    #[tokio::test]
    async fn test_list_marks_liked_posts_for_viewer() {
        let service = create_test_service(Mocks {
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(2))
                }]])
                .append_query_results([[create_test_post("p2", "u2"), create_test_post("p1", "u1")]]),
            like: MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
                maplit::btreemap! { "post_id" => sea_orm::Value::from("p1") },
            ]]),
            user: MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
                create_test_user("u1", "alice"),
                create_test_user("u2", "bob"),
            ]]),
            ..Default::default()
        });

        let page = service
            .list(ListPostsQuery::default(), Some("u3"), PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].author, "bob");
        assert!(!page.items[0].liked);
        assert_eq!(page.items[1].author, "alice");
        assert!(page.items[1].liked);
    }

    #[tokio::test]
    async fn test_list_anonymous_never_liked() {
        let service = create_test_service(Mocks {
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .append_query_results([[create_test_post("p1", "u1")]]),
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", "alice")]]),
            ..Default::default()
        });

        let page = service
            .list(ListPostsQuery::default(), None, PageRequest::default())
            .await
            .unwrap();

        assert!(!page.items[0].liked);
    }

    #[tokio::test]
    async fn test_feed_without_followees_is_empty() {
        let service = create_test_service(Mocks {
            following: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<BTreeMap<&str, sea_orm::Value>>::new()]),
            ..Default::default()
        });

        let page = service.feed("u1", PageRequest::default()).await.unwrap();

        assert_eq!(page.total, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_feed_returns_followed_authors() {
        let service = create_test_service(Mocks {
            following: MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
                maplit::btreemap! { "followee_id" => sea_orm::Value::from("u2") },
            ]]),
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .append_query_results([[create_test_post("p9", "u2")]]),
            like: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<BTreeMap<&str, sea_orm::Value>>::new()]),
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u2", "bob")]]),
            ..Default::default()
        });

        let page = service.feed("u1", PageRequest::default()).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].author, "bob");
    }

    #[tokio::test]
    async fn test_get_includes_comments_in_order() {
        let now = Utc::now().into();
        let c1 = comment::Model {
            id: "c1".to_string(),
            post_id: "p1".to_string(),
            author_id: "u2".to_string(),
            content: "first!".to_string(),
            created_at: now,
            updated_at: now,
        };
        let service = create_test_service(Mocks {
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u1")]]),
            comment: MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[c1]]),
            user: MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
                create_test_user("u1", "alice"),
                create_test_user("u2", "bob"),
            ]]),
            ..Default::default()
        });

        let detail = service.get("p1", None).await.unwrap();

        assert_eq!(detail.post.author, "alice");
        assert_eq!(detail.comments.len(), 1);
        assert_eq!(detail.comments[0].author, "bob");
    }

    #[tokio::test]
    async fn test_update_by_non_owner_forbidden() {
        let service = create_test_service(Mocks {
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u1")]]),
            ..Default::default()
        });
        let intruder = create_test_user("u2", "mallory");

        let result = service
            .update(
                &intruder,
                "p1",
                UpdatePostInput {
                    title: Some("hijacked".to_string()),
                    content: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_by_owner() {
        let service = create_test_service(Mocks {
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_post("p1", "u1")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }]),
            ..Default::default()
        });
        let owner = create_test_user("u1", "alice");

        assert!(service.delete(&owner, "p1").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_missing_post() {
        let service = create_test_service(Mocks {
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()]),
            ..Default::default()
        });
        let owner = create_test_user("u1", "alice");

        assert!(matches!(
            service.delete(&owner, "missing").await,
            Err(AppError::PostNotFound(_))
        ));
    }
}
