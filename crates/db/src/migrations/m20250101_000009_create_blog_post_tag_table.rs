//! Create blog_post_tag join table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BlogPostTag::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BlogPostTag::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BlogPostTag::PostId).string_len(32).not_null())
                    .col(ColumnDef::new(BlogPostTag::TagId).string_len(32).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_post_tag_post")
                            .from(BlogPostTag::Table, BlogPostTag::PostId)
                            .to(BlogPost::Table, BlogPost::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_post_tag_tag")
                            .from(BlogPostTag::Table, BlogPostTag::TagId)
                            .to(Tag::Table, Tag::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blog_post_tag_post_tag")
                    .table(BlogPostTag::Table)
                    .col(BlogPostTag::PostId)
                    .col(BlogPostTag::TagId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: tag_id (for posts by tag)
        manager
            .create_index(
                Index::create()
                    .name("idx_blog_post_tag_tag_id")
                    .table(BlogPostTag::Table)
                    .col(BlogPostTag::TagId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BlogPostTag::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum BlogPostTag {
    Table,
    Id,
    PostId,
    TagId,
}

#[derive(Iden)]
enum BlogPost {
    Table,
    Id,
}

#[derive(Iden)]
enum Tag {
    Table,
    Id,
}
