//! Create permission_group and user_group tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PermissionGroup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PermissionGroup::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PermissionGroup::Name)
                            .string_len(150)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PermissionGroup::CanView)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PermissionGroup::CanCreate)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PermissionGroup::CanEdit)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PermissionGroup::CanDelete)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserGroup::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserGroup::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(UserGroup::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(UserGroup::GroupId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(UserGroup::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_group_user")
                            .from(UserGroup::Table, UserGroup::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_group_group")
                            .from(UserGroup::Table, UserGroup::GroupId)
                            .to(PermissionGroup::Table, PermissionGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, group_id) - one membership per group
        manager
            .create_index(
                Index::create()
                    .name("idx_user_group_user_group")
                    .table(UserGroup::Table)
                    .col(UserGroup::UserId)
                    .col(UserGroup::GroupId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserGroup::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PermissionGroup::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PermissionGroup {
    Table,
    Id,
    Name,
    CanView,
    CanCreate,
    CanEdit,
    CanDelete,
}

#[derive(Iden)]
enum UserGroup {
    Table,
    Id,
    UserId,
    GroupId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
