//! Create `store` table with nullable FK to `user`.
//!
//! `owner_id` clears rather than cascades when the owner account is
//! deleted; the store itself survives.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Store::Table)
                    .if_not_exists()
                    .col(uuid(Store::Id).primary_key())
                    .col(string_len(Store::Name, 60).not_null())
                    .col(string_len(Store::Email, 255).unique_key().not_null())
                    .col(
                        ColumnDef::new(Store::Address)
                            .string_len(400)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Store::OwnerId)
                            .uuid()
                            .null(),
                    )
                    .col(timestamp_with_time_zone(Store::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Store::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_store_owner")
                            .from(Store::Table, Store::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Store::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Store { Table, Id, Name, Email, Address, OwnerId, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum User { Table, Id }
