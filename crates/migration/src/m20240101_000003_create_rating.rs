//! Create `rating` table with FKs to `user` and `store`.
//!
//! Ratings are owned by both sides: deleting either the rating user or the
//! rated store cascades the row away. The `(user_id, store_id)` uniqueness
//! lives in the index migration.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rating::Table)
                    .if_not_exists()
                    .col(uuid(Rating::Id).primary_key())
                    .col(uuid(Rating::UserId).not_null())
                    .col(uuid(Rating::StoreId).not_null())
                    .col(integer(Rating::Value).not_null())
                    .col(timestamp_with_time_zone(Rating::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Rating::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rating_user")
                            .from(Rating::Table, Rating::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rating_store")
                            .from(Rating::Table, Rating::StoreId)
                            .to(Store::Table, Store::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Rating::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Rating { Table, Id, UserId, StoreId, Value, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum User { Table, Id }

#[derive(DeriveIden)]
enum Store { Table, Id }
