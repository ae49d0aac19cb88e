//! Blog service: posts with tags and threaded comments.

use std::collections::{BTreeSet, HashMap};

use crate::services::{post::NOT_OWNER, user::usernames};
use agora_common::{AppError, AppResult, IdGenerator, Page, PageRequest, slugify};
use agora_db::{
    entities::{blog_comment, blog_post, blog_post_tag, tag, user},
    repositories::{BlogCommentRepository, BlogPostRepository, TagRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

const COMMENT_MIN_CHARS: usize = 3;
const COMMENT_MAX_CHARS: usize = 1000;
const TAG_NAME_MAX_CHARS: usize = 50;
const TAG_SLUG_MAX_CHARS: usize = 60;

/// A blog post with its author's username and tags.
#[derive(Debug, Clone)]
pub struct BlogPostView {
    pub post: blog_post::Model,
    pub author: String,
    pub tags: Vec<tag::Model>,
}

/// A blog post with its comments, oldest first.
#[derive(Debug, Clone)]
pub struct BlogPostDetail {
    pub post: BlogPostView,
    pub comments: Vec<BlogCommentView>,
}

#[derive(Debug, Clone)]
pub struct BlogCommentView {
    pub comment: blog_comment::Model,
    pub author: String,
}

/// Input for creating a blog post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBlogPostInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1))]
    pub content: String,

    /// Tag names. Unknown names create new tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for updating a blog post. `tags`, when present, replaces the tag set.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBlogPostInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1))]
    pub content: Option<String>,

    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct BlogCommentInput {
    pub content: String,
}

/// Trim a comment body and check its length.
fn clean_comment(content: &str) -> AppResult<String> {
    let trimmed = content.trim();
    let chars = trimmed.chars().count();

    if chars == 0 {
        return Err(AppError::Validation("Comment cannot be empty.".to_string()));
    }
    if chars < COMMENT_MIN_CHARS {
        return Err(AppError::Validation(format!(
            "Comment is too short (min {COMMENT_MIN_CHARS} characters)."
        )));
    }
    if chars > COMMENT_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "Comment is too long (max {COMMENT_MAX_CHARS} characters)."
        )));
    }

    Ok(trimmed.to_string())
}

/// Trim, dedupe and check tag names, pairing each with its slug.
///
/// Runs before any write so a bad name leaves the post and tag tables untouched.
fn clean_tag_names(names: &[String]) -> AppResult<Vec<(String, String)>> {
    let mut seen = BTreeSet::new();
    let mut cleaned = Vec::new();

    for name in names.iter().map(|n| n.trim()) {
        if name.is_empty() || !seen.insert(name) {
            continue;
        }
        if name.chars().count() > TAG_NAME_MAX_CHARS {
            return Err(AppError::Validation(format!(
                "Tag name must be at most {TAG_NAME_MAX_CHARS} characters."
            )));
        }

        let slug: String = slugify(name).chars().take(TAG_SLUG_MAX_CHARS).collect();
        if slug.is_empty() {
            return Err(AppError::Validation(format!(
                "Tag \"{name}\" has no ASCII letters or digits."
            )));
        }
        cleaned.push((name.to_string(), slug));
    }

    Ok(cleaned)
}

/// Blog service for business logic.
#[derive(Clone)]
pub struct BlogService {
    post_repo: BlogPostRepository,
    tag_repo: TagRepository,
    comment_repo: BlogCommentRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl BlogService {
    /// Create a new blog service.
    #[must_use]
    pub const fn new(
        post_repo: BlogPostRepository,
        tag_repo: TagRepository,
        comment_repo: BlogCommentRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            post_repo,
            tag_repo,
            comment_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// List posts, newest first. `q` matches title, content or tag name.
    pub async fn list_posts(
        &self,
        q: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<BlogPostView>> {
        let total = self.post_repo.count(q).await?;
        let posts = self
            .post_repo
            .search(q, page.limit(), page.offset())
            .await?;

        Ok(Page::new(self.views(posts).await?, total, page))
    }

    async fn views(&self, posts: Vec<blog_post::Model>) -> AppResult<Vec<BlogPostView>> {
        let names = usernames(&self.user_repo, posts.iter().map(|p| &p.author_id)).await?;

        let post_ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
        let links = self.tag_repo.find_links(&post_ids).await?;
        let tag_ids: Vec<String> = links
            .iter()
            .map(|l| l.tag_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let tags = self.tag_repo.find_by_ids(&tag_ids).await?;

        let mut by_post: HashMap<&str, Vec<tag::Model>> = HashMap::new();
        for tag in &tags {
            for link in links.iter().filter(|l| l.tag_id == tag.id) {
                by_post
                    .entry(link.post_id.as_str())
                    .or_default()
                    .push(tag.clone());
            }
        }

        let views = posts
            .iter()
            .map(|post| BlogPostView {
                author: names.get(&post.author_id).cloned().unwrap_or_default(),
                tags: by_post.remove(post.id.as_str()).unwrap_or_default(),
                post: post.clone(),
            })
            .collect();

        Ok(views)
    }

    async fn view(&self, post: blog_post::Model) -> AppResult<BlogPostView> {
        self.views(vec![post])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Blog post view missing".to_string()))
    }

    /// Find or create tags, in first-seen order. Takes the output of [`clean_tag_names`].
    async fn ensure_tags(&self, names: Vec<(String, String)>) -> AppResult<Vec<tag::Model>> {
        let mut tags = Vec::new();

        for (name, slug) in names {
            if let Some(existing) = self.tag_repo.find_by_name(&name).await? {
                tags.push(existing);
                continue;
            }

            let tag = match self.tag_repo.find_by_slug(&slug).await? {
                Some(existing) => existing,
                None => {
                    self.tag_repo
                        .create(tag::ActiveModel {
                            id: Set(self.id_gen.generate()),
                            name: Set(name),
                            slug: Set(slug),
                        })
                        .await?
                }
            };
            if !tags.iter().any(|t: &tag::Model| t.id == tag.id) {
                tags.push(tag);
            }
        }

        Ok(tags)
    }

    async fn link_tags(&self, post_id: &str, tags: &[tag::Model]) -> AppResult<()> {
        for tag in tags {
            self.tag_repo
                .link(blog_post_tag::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    post_id: Set(post_id.to_string()),
                    tag_id: Set(tag.id.clone()),
                })
                .await?;
        }
        Ok(())
    }

    /// Publish a post.
    pub async fn create_post(
        &self,
        author: &user::Model,
        input: CreateBlogPostInput,
    ) -> AppResult<BlogPostView> {
        input.validate()?;
        let tags = self.ensure_tags(clean_tag_names(&input.tags)?).await?;

        let post = self
            .post_repo
            .create(blog_post::ActiveModel {
                id: Set(self.id_gen.generate()),
                title: Set(input.title),
                content: Set(input.content),
                author_id: Set(author.id.clone()),
                published_date: Set(chrono::Utc::now().into()),
            })
            .await?;
        self.link_tags(&post.id, &tags).await?;

        tracing::info!(post_id = %post.id, tags = tags.len(), "Blog post published");

        Ok(BlogPostView {
            post,
            author: author.username.clone(),
            tags,
        })
    }

    /// A post with its tags and comments.
    pub async fn get_post(&self, id: &str) -> AppResult<BlogPostDetail> {
        let post = self.post_repo.get_by_id(id).await?;
        let comments = self.comments(id).await?;

        Ok(BlogPostDetail {
            post: self.view(post).await?,
            comments,
        })
    }

    /// Update a post. Only its author may do so.
    pub async fn update_post(
        &self,
        actor: &user::Model,
        id: &str,
        input: UpdateBlogPostInput,
    ) -> AppResult<BlogPostView> {
        input.validate()?;
        let tag_names = input.tags.as_deref().map(clean_tag_names).transpose()?;

        let post = self.post_repo.get_by_id(id).await?;
        if post.author_id != actor.id {
            return Err(AppError::Forbidden(NOT_OWNER.to_string()));
        }

        let tags = match tag_names {
            Some(names) => Some(self.ensure_tags(names).await?),
            None => None,
        };

        let mut active: blog_post::ActiveModel = post.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        let post = self.post_repo.update(active).await?;

        if let Some(tags) = tags {
            self.tag_repo.unlink_all(&post.id).await?;
            self.link_tags(&post.id, &tags).await?;
        }

        self.view(post).await
    }

    /// Delete a post. Only its author may do so.
    pub async fn delete_post(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(id).await?;
        if post.author_id != actor.id {
            return Err(AppError::Forbidden(NOT_OWNER.to_string()));
        }

        self.post_repo.delete(id).await
    }

    /// All tags, by name.
    pub async fn tags(&self) -> AppResult<Vec<tag::Model>> {
        self.tag_repo.find_all().await
    }

    /// The tag with `slug` and the posts carrying it.
    pub async fn posts_by_tag(&self, slug: &str) -> AppResult<(tag::Model, Vec<BlogPostView>)> {
        let tag = self
            .tag_repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {slug}")))?;

        let posts = self.post_repo.find_by_tag(&tag.id).await?;
        Ok((tag, self.views(posts).await?))
    }

    /// Comments on a post, oldest first.
    pub async fn comments(&self, post_id: &str) -> AppResult<Vec<BlogCommentView>> {
        let comments = self.comment_repo.find_by_post(post_id).await?;
        let names = usernames(&self.user_repo, comments.iter().map(|c| &c.author_id)).await?;

        Ok(comments
            .into_iter()
            .map(|comment| BlogCommentView {
                author: names.get(&comment.author_id).cloned().unwrap_or_default(),
                comment,
            })
            .collect())
    }

    /// Comments on a post, after checking the post exists.
    pub async fn list_comments(&self, post_id: &str) -> AppResult<Vec<BlogCommentView>> {
        self.post_repo.get_by_id(post_id).await?;
        self.comments(post_id).await
    }

    /// Comment on a post.
    pub async fn add_comment(
        &self,
        author: &user::Model,
        post_id: &str,
        input: BlogCommentInput,
    ) -> AppResult<BlogCommentView> {
        let content = clean_comment(&input.content)?;
        self.post_repo.get_by_id(post_id).await?;

        let now = chrono::Utc::now();
        let comment = self
            .comment_repo
            .create(blog_comment::ActiveModel {
                id: Set(self.id_gen.generate()),
                post_id: Set(post_id.to_string()),
                author_id: Set(author.id.clone()),
                content: Set(content),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            })
            .await?;

        Ok(BlogCommentView {
            comment,
            author: author.username.clone(),
        })
    }

    /// Edit a comment. Only its author may do so.
    pub async fn update_comment(
        &self,
        actor: &user::Model,
        id: &str,
        input: BlogCommentInput,
    ) -> AppResult<BlogCommentView> {
        let content = clean_comment(&input.content)?;

        let comment = self.comment_repo.get_by_id(id).await?;
        if comment.author_id != actor.id {
            return Err(AppError::Forbidden(NOT_OWNER.to_string()));
        }

        let mut active: blog_comment::ActiveModel = comment.into();
        active.content = Set(content);
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(BlogCommentView {
            comment: self.comment_repo.update(active).await?,
            author: actor.username.clone(),
        })
    }

    /// Delete a comment. Only its author may do so.
    pub async fn delete_comment(&self, actor: &user::Model, id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(id).await?;
        if comment.author_id != actor.id {
            return Err(AppError::Forbidden(NOT_OWNER.to_string()));
        }

        self.comment_repo.delete(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::post::tests::create_test_user;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_blog_post(id: &str, author_id: &str) -> blog_post::Model {
        blog_post::Model {
            id: id.to_string(),
            title: "Ownership".to_string(),
            content: "Borrowing rules".to_string(),
            author_id: author_id.to_string(),
            published_date: Utc::now().into(),
        }
    }

    fn create_test_tag(id: &str, name: &str) -> tag::Model {
        tag::Model {
            id: id.to_string(),
            name: name.to_string(),
            slug: slugify(name),
        }
    }

    fn create_test_comment(id: &str, author_id: &str) -> blog_comment::Model {
        let now = Utc::now().into();
        blog_comment::Model {
            id: id.to_string(),
            post_id: "b1".to_string(),
            author_id: author_id.to_string(),
            content: "Great write-up".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    struct Mocks {
        post: MockDatabase,
        tag: MockDatabase,
        comment: MockDatabase,
        user: MockDatabase,
    }

    impl Default for Mocks {
        fn default() -> Self {
            Self {
                post: MockDatabase::new(DatabaseBackend::Postgres),
                tag: MockDatabase::new(DatabaseBackend::Postgres),
                comment: MockDatabase::new(DatabaseBackend::Postgres),
                user: MockDatabase::new(DatabaseBackend::Postgres),
            }
        }
    }

    fn create_test_service(mocks: Mocks) -> BlogService {
        BlogService::new(
            BlogPostRepository::new(Arc::new(mocks.post.into_connection())),
            TagRepository::new(Arc::new(mocks.tag.into_connection())),
            BlogCommentRepository::new(Arc::new(mocks.comment.into_connection())),
            UserRepository::new(Arc::new(mocks.user.into_connection())),
        )
    }

    #[test]
    fn test_clean_comment_rules() {
        match clean_comment("   ") {
            Err(AppError::Validation(msg)) => assert_eq!(msg, "Comment cannot be empty."),
            other => panic!("Expected Validation, got {other:?}"),
        }
        match clean_comment(" hi ") {
            Err(AppError::Validation(msg)) => {
                assert_eq!(msg, "Comment is too short (min 3 characters).");
            }
            other => panic!("Expected Validation, got {other:?}"),
        }
        assert!(clean_comment(&"x".repeat(1001)).is_err());
        assert_eq!(clean_comment("  hey  ").unwrap(), "hey");
        assert_eq!(clean_comment(&"x".repeat(1000)).unwrap().len(), 1000);
    }

    #[tokio::test]
    async fn test_create_post_requires_title() {
        let service = create_test_service(Mocks::default());

        let result = service
            .create_post(
                &create_test_user("u1", "alice"),
                CreateBlogPostInput {
                    title: String::new(),
                    content: "body".to_string(),
                    tags: vec![],
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_post_reuses_and_creates_tags() {
        let service = create_test_service(Mocks {
            tag: MockDatabase::new(DatabaseBackend::Postgres)
                // "Rust" exists
                .append_query_results([[create_test_tag("t1", "Rust")]])
                // "Web Dev" is new: no name match, no slug match, then insert
                .append_query_results([Vec::<tag::Model>::new()])
                .append_query_results([Vec::<tag::Model>::new()])
                .append_query_results([[create_test_tag("t2", "Web Dev")]])
                // two links
                .append_query_results([[blog_post_tag::Model {
                    id: "l1".to_string(),
                    post_id: "b1".to_string(),
                    tag_id: "t1".to_string(),
                }]])
                .append_query_results([[blog_post_tag::Model {
                    id: "l2".to_string(),
                    post_id: "b1".to_string(),
                    tag_id: "t2".to_string(),
                }]]),
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog_post("b1", "u1")]]),
            ..Default::default()
        });

        let view = service
            .create_post(
                &create_test_user("u1", "alice"),
                CreateBlogPostInput {
                    title: "Ownership".to_string(),
                    content: "Borrowing rules".to_string(),
                    tags: vec!["Rust".to_string(), "Web Dev".to_string(), " Rust ".to_string()],
                },
            )
            .await
            .unwrap();

        let slugs: Vec<_> = view.tags.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["rust", "web-dev"]);
        assert_eq!(view.author, "alice");
    }

    #[tokio::test]
    async fn test_update_post_by_non_author_forbidden() {
        let service = create_test_service(Mocks {
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog_post("b1", "u1")]]),
            ..Default::default()
        });

        let result = service
            .update_post(
                &create_test_user("u2", "bob"),
                "b1",
                UpdateBlogPostInput {
                    title: Some("Mine now".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_clean_tag_names() {
        let names = vec![
            " Rust ".to_string(),
            "Web Dev".to_string(),
            "Rust".to_string(),
            String::new(),
        ];
        let cleaned = clean_tag_names(&names).unwrap();
        assert_eq!(
            cleaned,
            vec![
                ("Rust".to_string(), "rust".to_string()),
                ("Web Dev".to_string(), "web-dev".to_string()),
            ]
        );

        assert!(matches!(
            clean_tag_names(&["x".repeat(51)]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            clean_tag_names(&["日本語".to_string()]),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_post_with_bad_tag_writes_nothing() {
        let post_conn = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog_post("b1", "u1")]])
                .into_connection(),
        );
        let service = BlogService::new(
            BlogPostRepository::new(post_conn.clone()),
            TagRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            BlogCommentRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            UserRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
        );

        let result = service
            .update_post(
                &create_test_user("u1", "alice"),
                "b1",
                UpdateBlogPostInput {
                    title: Some("Changed".to_string()),
                    tags: Some(vec!["fine".to_string(), "x".repeat(51)]),
                    ..Default::default()
                },
            )
            .await;

        match result {
            Err(AppError::Validation(msg)) => assert!(msg.contains("at most 50")),
            other => panic!("Expected Validation, got {other:?}"),
        }

        drop(service);
        let log = Arc::try_unwrap(post_conn).ok().unwrap().into_transaction_log();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_posts_by_unknown_tag() {
        let service = create_test_service(Mocks {
            tag: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<tag::Model>::new()]),
            ..Default::default()
        });

        assert!(matches!(
            service.posts_by_tag("nope").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_posts_attaches_tags() {
        let service = create_test_service(Mocks {
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .append_query_results([[create_test_blog_post("b1", "u1")]]),
            tag: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[blog_post_tag::Model {
                    id: "l1".to_string(),
                    post_id: "b1".to_string(),
                    tag_id: "t1".to_string(),
                }]])
                .append_query_results([[create_test_tag("t1", "Rust")]]),
            user: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", "alice")]]),
            ..Default::default()
        });

        let page = service
            .list_posts(Some("rust"), PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].tags[0].name, "Rust");
        assert_eq!(page.items[0].author, "alice");
    }

    #[tokio::test]
    async fn test_add_comment_to_missing_post() {
        let service = create_test_service(Mocks {
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<blog_post::Model>::new()]),
            ..Default::default()
        });

        let result = service
            .add_comment(
                &create_test_user("u1", "alice"),
                "missing",
                BlogCommentInput {
                    content: "Nice one".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_add_comment_stores_trimmed_content() {
        let service = create_test_service(Mocks {
            post: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_blog_post("b1", "u1")]]),
            comment: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", "u2")]]),
            ..Default::default()
        });

        let view = service
            .add_comment(
                &create_test_user("u2", "bob"),
                "b1",
                BlogCommentInput {
                    content: "  Great write-up  ".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(view.author, "bob");
    }

    #[tokio::test]
    async fn test_delete_comment_by_other_user_forbidden() {
        let service = create_test_service(Mocks {
            comment: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", "u2")]]),
            ..Default::default()
        });

        assert!(matches!(
            service
                .delete_comment(&create_test_user("u3", "carol"), "c1")
                .await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_comment_by_author() {
        let service = create_test_service(Mocks {
            comment: MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", "u2")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }]),
            ..Default::default()
        });

        assert!(
            service
                .delete_comment(&create_test_user("u2", "bob"), "c1")
                .await
                .is_ok()
        );
    }
}
