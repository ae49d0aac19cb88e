//! Create library table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Library::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Library::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Library::Name).string_len(255).not_null().unique_key())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Library::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Library {
    Table,
    Id,
    Name,
}
