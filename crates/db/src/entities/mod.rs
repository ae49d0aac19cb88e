//! Database entities.

pub mod author;
pub mod blog_comment;
pub mod blog_post;
pub mod blog_post_tag;
pub mod book;
pub mod comment;
pub mod following;
pub mod librarian;
pub mod library;
pub mod library_book;
pub mod notification;
pub mod permission_group;
pub mod post;
pub mod post_like;
pub mod tag;
pub mod user;
pub mod user_group;

pub use author::Entity as Author;
pub use blog_comment::Entity as BlogComment;
pub use blog_post::Entity as BlogPost;
pub use blog_post_tag::Entity as BlogPostTag;
pub use book::Entity as Book;
pub use comment::Entity as Comment;
pub use following::Entity as Following;
pub use librarian::Entity as Librarian;
pub use library::Entity as Library;
pub use library_book::Entity as LibraryBook;
pub use notification::Entity as Notification;
pub use permission_group::Entity as PermissionGroup;
pub use post::Entity as Post;
pub use post_like::Entity as PostLike;
pub use tag::Entity as Tag;
pub use user::Entity as User;
pub use user_group::Entity as UserGroup;
