//! Create librarian table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Librarian::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Librarian::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Librarian::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Librarian::LibraryId)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_librarian_library")
                            .from(Librarian::Table, Librarian::LibraryId)
                            .to(Library::Table, Library::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Librarian::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Librarian {
    Table,
    Id,
    Name,
    LibraryId,
}

#[derive(Iden)]
enum Library {
    Table,
    Id,
}
