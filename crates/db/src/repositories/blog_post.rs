//! Blog post repository.

use std::sync::Arc;

use super::icontains;
use crate::entities::{BlogPost, BlogPostTag, Tag, blog_post, blog_post_tag, tag};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select,
    sea_query::{Expr, Query},
};

/// Blog post repository for database operations.
#[derive(Clone)]
pub struct BlogPostRepository {
    db: Arc<DatabaseConnection>,
}

impl BlogPostRepository {
    /// Create a new blog post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a blog post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<blog_post::Model>> {
        BlogPost::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a blog post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<blog_post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a blog post.
    pub async fn create(&self, model: blog_post::ActiveModel) -> AppResult<blog_post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a blog post.
    pub async fn update(&self, model: blog_post::ActiveModel) -> AppResult<blog_post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a blog post together with its tag links and comments.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        BlogPost::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    fn filtered(search: Option<&str>) -> Select<BlogPost> {
        let mut select = BlogPost::find();

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let tagged = Query::select()
                .column((BlogPostTag, blog_post_tag::Column::PostId))
                .from(BlogPostTag)
                .inner_join(
                    Tag,
                    Expr::col((Tag, tag::Column::Id))
                        .equals((BlogPostTag, blog_post_tag::Column::TagId)),
                )
                .and_where(icontains((Tag, tag::Column::Name), term))
                .to_owned();

            select = select.filter(
                Condition::any()
                    .add(icontains(blog_post::Column::Title, term))
                    .add(icontains(blog_post::Column::Content, term))
                    .add(blog_post::Column::Id.in_subquery(tagged)),
            );
        }

        select
    }

    /// List blog posts, newest first, optionally searching title, content and tag names.
    pub async fn search(
        &self,
        search: Option<&str>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<blog_post::Model>> {
        Self::filtered(search)
            .order_by_desc(blog_post::Column::PublishedDate)
            .order_by_desc(blog_post::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count blog posts matching `search`.
    pub async fn count(&self, search: Option<&str>) -> AppResult<u64> {
        Self::filtered(search)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Blog posts carrying a tag, newest first.
    pub async fn find_by_tag(&self, tag_id: &str) -> AppResult<Vec<blog_post::Model>> {
        let tagged = Query::select()
            .column(blog_post_tag::Column::PostId)
            .from(BlogPostTag)
            .and_where(Expr::col(blog_post_tag::Column::TagId).eq(tag_id))
            .to_owned();

        BlogPost::find()
            .filter(blog_post::Column::Id.in_subquery(tagged))
            .order_by_desc(blog_post::Column::PublishedDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
