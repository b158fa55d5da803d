use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Rating: composite unique (user_id, store_id) — one rating per user
        // per store; concurrent submissions serialize here.
        manager
            .create_index(
                Index::create()
                    .name("uniq_rating_user_store")
                    .table(Rating::Table)
                    .col(Rating::UserId)
                    .col(Rating::StoreId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Rating: index on store_id for aggregate reads
        manager
            .create_index(
                Index::create()
                    .name("idx_rating_store")
                    .table(Rating::Table)
                    .col(Rating::StoreId)
                    .to_owned(),
            )
            .await?;

        // Store: index on owner_id for owner-session resolution
        manager
            .create_index(
                Index::create()
                    .name("idx_store_owner")
                    .table(Store::Table)
                    .col(Store::OwnerId)
                    .to_owned(),
            )
            .await?;

        // User: index on role for admin filtering
        manager
            .create_index(
                Index::create()
                    .name("idx_user_role")
                    .table(User::Table)
                    .col(User::Role)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uniq_rating_user_store").table(Rating::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_rating_store").table(Rating::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_store_owner").table(Store::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_user_role").table(User::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Rating { Table, UserId, StoreId }

#[derive(DeriveIden)]
enum Store { Table, OwnerId }

#[derive(DeriveIden)]
enum User { Table, Role }
