//! Business logic services.

#![allow(missing_docs)]

pub mod blog;
pub mod comment;
pub mod following;
pub mod library;
pub mod like;
pub mod notification;
pub mod permission;
pub mod post;
pub mod query;
pub mod user;

pub use blog::{
    BlogCommentInput, BlogCommentView, BlogPostDetail, BlogPostView, BlogService,
    CreateBlogPostInput, UpdateBlogPostInput,
};
pub use comment::{
    CommentService, CommentView, CreateCommentInput, ListCommentsQuery, UpdateCommentInput,
};
pub use following::FollowingService;
pub use library::{
    AddBookInput, AuthorDetail, BookView, CreateBookInput, LibraryDetail, LibraryService,
    ListBooksQuery, NameInput, UpdateBookInput,
};
pub use like::LikeService;
pub use notification::{NotificationService, NotificationView};
pub use permission::{DEFAULT_GROUPS, Permission, PermissionService, PermissionSet};
pub use post::{
    CreatePostInput, ListPostsQuery, PostDetail, PostService, PostView, UpdatePostInput,
};
pub use query::parse_ordering;
pub use user::{AuthSession, RegisterInput, UpdateProfileInput, UserService};

use agora_common::AppError;

/// Report a unique index violation with the same 400 the pre-check gives,
/// for inserts that lose a race against a concurrent duplicate.
pub(crate) fn conflict_as(message: &'static str) -> impl FnOnce(AppError) -> AppError {
    move |err| match err {
        AppError::Conflict(_) => AppError::BadRequest(message.to_string()),
        other => other,
    }
}
