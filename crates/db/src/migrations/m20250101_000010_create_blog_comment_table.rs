//! Create blog_comment table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BlogComment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BlogComment::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BlogComment::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(BlogComment::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(BlogComment::Content).text().not_null())
                    .col(
                        ColumnDef::new(BlogComment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(BlogComment::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_comment_post")
                            .from(BlogComment::Table, BlogComment::PostId)
                            .to(BlogPost::Table, BlogPost::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_comment_author")
                            .from(BlogComment::Table, BlogComment::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blog_comment_post_created_at")
                    .table(BlogComment::Table)
                    .col(BlogComment::PostId)
                    .col(BlogComment::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BlogComment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum BlogComment {
    Table,
    Id,
    PostId,
    AuthorId,
    Content,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum BlogPost {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
