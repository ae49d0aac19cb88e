//! Create library_book join table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LibraryBook::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LibraryBook::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LibraryBook::LibraryId).string_len(32).not_null())
                    .col(ColumnDef::new(LibraryBook::BookId).string_len(32).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_library_book_library")
                            .from(LibraryBook::Table, LibraryBook::LibraryId)
                            .to(Library::Table, Library::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_library_book_book")
                            .from(LibraryBook::Table, LibraryBook::BookId)
                            .to(Book::Table, Book::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_library_book_library_book")
                    .table(LibraryBook::Table)
                    .col(LibraryBook::LibraryId)
                    .col(LibraryBook::BookId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LibraryBook::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum LibraryBook {
    Table,
    Id,
    LibraryId,
    BookId,
}

#[derive(Iden)]
enum Library {
    Table,
    Id,
}

#[derive(Iden)]
enum Book {
    Table,
    Id,
}
