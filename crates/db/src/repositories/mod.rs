//! Database repositories.

mod author;
mod blog_comment;
mod blog_post;
mod book;
mod comment;
mod following;
mod library;
mod notification;
mod permission_group;
mod post;
mod post_like;
mod tag;
mod user;

pub use author::AuthorRepository;
pub use blog_comment::BlogCommentRepository;
pub use blog_post::BlogPostRepository;
pub use book::{BookQuery, BookRepository, BookSortField};
pub use comment::{CommentQuery, CommentRepository};
pub use following::FollowingRepository;
pub use library::LibraryRepository;
pub use notification::NotificationRepository;
pub use permission_group::PermissionGroupRepository;
pub use post::{PostQuery, PostRepository};
pub use post_like::PostLikeRepository;
pub use tag::TagRepository;
pub use user::UserRepository;

use agora_common::AppError;
use sea_orm::sea_query::{Expr, Func, IntoColumnRef, SimpleExpr};
use sea_orm::{DbErr, SqlErr};

/// Map an insert failure, reporting unique index violations as [`AppError::Conflict`].
pub(crate) fn insert_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::Conflict(detail),
        _ => AppError::Database(err.to_string()),
    }
}

/// Case-insensitive substring match on a column.
///
/// LIKE wildcards in `term` are escaped so they match literally.
pub(crate) fn icontains<C: IntoColumnRef>(column: C, term: &str) -> SimpleExpr {
    let escaped = term
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{escaped}%"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{Alias, PostgresQueryBuilder, Query};

    #[test]
    fn test_icontains_lowercases_term() {
        let sql = Query::select()
            .column(Alias::new("id"))
            .from(Alias::new("post"))
            .and_where(icontains(Alias::new("title"), "50%_Off"))
            .to_string(PostgresQueryBuilder);

        assert!(sql.contains("LOWER(\"title\")"));
        assert!(sql.contains("off"));
        assert!(!sql.contains("Off"));
    }

    #[test]
    fn test_insert_error_keeps_other_failures_as_database() {
        let err = insert_error(DbErr::Custom("connection reset".to_string()));
        assert!(matches!(err, AppError::Database(msg) if msg.contains("connection reset")));
    }
}
