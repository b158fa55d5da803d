use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use models::{rating, store};
use crate::errors::ServiceError;

/// Whether a submission created a fresh rating or overwrote the caller's
/// previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingOutcome {
    Created,
    Updated,
}

/// Aggregates for one store, computed from the rating rows at read time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average: f64,
    pub total: u64,
}

impl RatingSummary {
    pub const EMPTY: RatingSummary = RatingSummary { average: 0.0, total: 0 };
}

/// One of the caller's ratings joined with the rated store's identity.
#[derive(Debug, Clone, Serialize)]
pub struct MyRating {
    pub id: Uuid,
    pub value: i32,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
    pub updated_at: chrono::DateTime<chrono::FixedOffset>,
    pub store_id: Uuid,
    pub store_name: String,
    pub store_address: Option<String>,
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

async fn overwrite_value(
    db: &DatabaseConnection,
    existing: rating::Model,
    value: i32,
) -> Result<(), ServiceError> {
    let mut am: rating::ActiveModel = existing.into();
    am.value = Set(value);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await.map_err(ServiceError::from_db_err)?;
    Ok(())
}

/// Submit the caller's rating for a store: at most one row per (user, store)
/// pair ever exists. An existing row is overwritten in place (same id,
/// bumped `updated_at`); otherwise a new row is inserted. When a concurrent
/// submission wins the insert race, the unique index reports it and this
/// call falls back to the update path — last committed value wins.
pub async fn submit_rating(
    db: &DatabaseConnection,
    user_id: Uuid,
    store_id: Uuid,
    value: i32,
) -> Result<RatingOutcome, ServiceError> {
    rating::validate_value(value)?;

    store::Entity::find_by_id(store_id)
        .one(db)
        .await
        .map_err(ServiceError::from_db_err)?
        .ok_or_else(|| ServiceError::not_found("store"))?;

    if let Some(existing) = rating::find_by_user_and_store(db, user_id, store_id).await? {
        overwrite_value(db, existing, value).await?;
        info!(%user_id, %store_id, value, "rating_updated");
        return Ok(RatingOutcome::Updated);
    }

    let now = Utc::now().into();
    let am = rating::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        store_id: Set(store_id),
        value: Set(value),
        created_at: Set(now),
        updated_at: Set(now),
    };

    match am.insert(db).await {
        Ok(_) => {
            info!(%user_id, %store_id, value, "rating_created");
            Ok(RatingOutcome::Created)
        }
        Err(e) if is_unique_violation(&e) => {
            // Lost the race: a concurrent submission inserted the pair first.
            debug!(%user_id, %store_id, "insert conflicted, overwriting existing rating");
            let existing = rating::find_by_user_and_store(db, user_id, store_id)
                .await?
                .ok_or_else(|| ServiceError::Db("rating row missing after unique conflict".into()))?;
            overwrite_value(db, existing, value).await?;
            info!(%user_id, %store_id, value, "rating_updated");
            Ok(RatingOutcome::Updated)
        }
        Err(e) => Err(ServiceError::from_db_err(e)),
    }
}

/// Average and count over a store's current rating rows. Empty stores read
/// as 0.0 / 0 rather than an error.
pub async fn compute_aggregates(db: &DatabaseConnection, store_id: Uuid) -> Result<RatingSummary, ServiceError> {
    let values: Vec<i32> = rating::Entity::find()
        .filter(rating::Column::StoreId.eq(store_id))
        .all(db)
        .await
        .map_err(ServiceError::from_db_err)?
        .into_iter()
        .map(|r| r.value)
        .collect();

    if values.is_empty() {
        return Ok(RatingSummary::EMPTY);
    }
    let total = values.len() as u64;
    let average = values.iter().map(|v| *v as f64).sum::<f64>() / total as f64;
    Ok(RatingSummary { average, total })
}

/// The caller's own rating for one store, if they have rated it.
pub async fn user_rating_for(
    db: &DatabaseConnection,
    user_id: Uuid,
    store_id: Uuid,
) -> Result<Option<i32>, ServiceError> {
    Ok(rating::find_by_user_and_store(db, user_id, store_id).await?.map(|r| r.value))
}

/// All of one user's ratings with store identity, most recent first.
pub async fn list_my_ratings(db: &DatabaseConnection, user_id: Uuid) -> Result<Vec<MyRating>, ServiceError> {
    let rows = rating::Entity::find()
        .filter(rating::Column::UserId.eq(user_id))
        .find_also_related(store::Entity)
        .order_by_desc(rating::Column::CreatedAt)
        .all(db)
        .await
        .map_err(ServiceError::from_db_err)?;

    Ok(rows
        .into_iter()
        .filter_map(|(r, s)| {
            s.map(|s| MyRating {
                id: r.id,
                value: r.value,
                created_at: r.created_at,
                updated_at: r.updated_at,
                store_id: s.id,
                store_name: s.name,
                store_address: s.address,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use models::user;
    use sea_orm::PaginatorTrait;

    fn unique_email(prefix: &str) -> String {
        format!("{}_{}@example.com", prefix, Uuid::new_v4())
    }

    async fn seed_user_and_store(db: &DatabaseConnection) -> anyhow::Result<(Uuid, Uuid)> {
        let u = user::create(db, "Rating Tester", &unique_email("rating_user"), "h$1", None, "user", None).await?;
        let s = store::create(db, "Rated Store", &unique_email("rating_store"), Some("5 Market Sq")).await?;
        Ok((u.id, s.id))
    }

    async fn pair_count(db: &DatabaseConnection, user_id: Uuid, store_id: Uuid) -> anyhow::Result<u64> {
        Ok(rating::Entity::find()
            .filter(rating::Column::UserId.eq(user_id))
            .filter(rating::Column::StoreId.eq(store_id))
            .count(db)
            .await?)
    }

    #[tokio::test]
    async fn submit_twice_keeps_one_row_with_second_value() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let (user_id, store_id) = seed_user_and_store(&db).await?;

        let first = submit_rating(&db, user_id, store_id, 2).await?;
        assert_eq!(first, RatingOutcome::Created);
        let row = rating::find_by_user_and_store(&db, user_id, store_id).await?.unwrap();

        let second = submit_rating(&db, user_id, store_id, 5).await?;
        assert_eq!(second, RatingOutcome::Updated);

        assert_eq!(pair_count(&db, user_id, store_id).await?, 1);
        let after = rating::find_by_user_and_store(&db, user_id, store_id).await?.unwrap();
        assert_eq!(after.value, 5);
        // Update in place: the row id survives the re-rate
        assert_eq!(after.id, row.id);

        user::hard_delete(&db, user_id).await?;
        store::hard_delete(&db, store_id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn boundary_values_accepted_out_of_range_rejected() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let (user_id, store_id) = seed_user_and_store(&db).await?;

        assert!(matches!(
            submit_rating(&db, user_id, store_id, 0).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            submit_rating(&db, user_id, store_id, 6).await,
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(submit_rating(&db, user_id, store_id, 1).await?, RatingOutcome::Created);
        assert_eq!(submit_rating(&db, user_id, store_id, 5).await?, RatingOutcome::Updated);

        user::hard_delete(&db, user_id).await?;
        store::hard_delete(&db, store_id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn submit_for_missing_store_is_not_found() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let (user_id, store_id) = seed_user_and_store(&db).await?;
        store::hard_delete(&db, store_id).await?;

        let r = submit_rating(&db, user_id, store_id, 3).await;
        assert!(matches!(r, Err(ServiceError::NotFound(_))));

        user::hard_delete(&db, user_id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn aggregates_reflect_current_rows() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;

        let s = store::create(&db, "Aggregate Store", &unique_email("agg_store"), None).await?;
        let empty = compute_aggregates(&db, s.id).await?;
        assert_eq!(empty.average, 0.0);
        assert_eq!(empty.total, 0);

        let mut raters = Vec::new();
        for value in [3, 4, 5] {
            let u = user::create(&db, "Agg Rater", &unique_email("agg_rater"), "h$1", None, "user", None).await?;
            submit_rating(&db, u.id, s.id, value).await?;
            raters.push(u.id);
        }

        let summary = compute_aggregates(&db, s.id).await?;
        assert_eq!(summary.total, 3);
        assert!((summary.average - 4.0).abs() < f64::EPSILON);

        for id in raters {
            user::hard_delete(&db, id).await?;
        }
        store::hard_delete(&db, s.id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn my_ratings_join_store_identity_most_recent_first() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;

        let u = user::create(&db, "History User", &unique_email("hist_user"), "h$1", None, "user", None).await?;
        let s1 = store::create(&db, "First Store", &unique_email("hist_store1"), Some("1 First St")).await?;
        let s2 = store::create(&db, "Second Store", &unique_email("hist_store2"), None).await?;

        submit_rating(&db, u.id, s1.id, 2).await?;
        submit_rating(&db, u.id, s2.id, 4).await?;

        let mine = list_my_ratings(&db, u.id).await?;
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].store_id, s2.id);
        assert_eq!(mine[0].value, 4);
        assert_eq!(mine[1].store_name, "First Store");
        assert_eq!(mine[1].store_address.as_deref(), Some("1 First St"));

        user::hard_delete(&db, u.id).await?;
        store::hard_delete(&db, s1.id).await?;
        store::hard_delete(&db, s2.id).await?;
        Ok(())
    }
}
