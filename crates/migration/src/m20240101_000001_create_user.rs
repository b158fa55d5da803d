//! Create `user` table.
//!
//! Stores platform accounts across all three roles. `store_id` is the
//! nullable back-reference a store owner carries to the store they own;
//! it deliberately has no FK so the provisioning transaction can insert
//! the store and the owner in either order.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Name, 60).not_null())
                    .col(string_len(User::Email, 255).unique_key().not_null())
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(
                        ColumnDef::new(User::Address)
                            .string_len(400)
                            .null(),
                    )
                    .col(string_len(User::Role, 32).not_null())
                    .col(
                        ColumnDef::new(User::StoreId)
                            .uuid()
                            .null(),
                    )
                    .col(timestamp_with_time_zone(User::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(User::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(User::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum User { Table, Id, Name, Email, PasswordHash, Address, Role, StoreId, CreatedAt, UpdatedAt }
