use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use models::{rating, store, user};

use crate::auth::domain::SessionIdentity;
use crate::errors::ServiceError;
use crate::rating_service::{self, RatingSummary};

/// A store as the listing and dashboard views present it: identity plus
/// live aggregates, plus the viewer's own rating when a viewer is known.
#[derive(Debug, Clone, Serialize)]
pub struct StoreView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub average_rating: f64,
    pub total_ratings: u64,
    pub user_rating: Option<i32>,
}

/// Whitelisted sort keys for store listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSortKey {
    Name,
    Email,
    CreatedAt,
    AverageRating,
}

impl StoreSortKey {
    /// Unknown keys fall back to name ordering rather than erroring.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "email" => StoreSortKey::Email,
            "created_at" => StoreSortKey::CreatedAt,
            "average_rating" => StoreSortKey::AverageRating,
            _ => StoreSortKey::Name,
        }
    }
}

async fn to_view(
    db: &DatabaseConnection,
    viewer: Option<Uuid>,
    s: store::Model,
) -> Result<StoreView, ServiceError> {
    let RatingSummary { average, total } = rating_service::compute_aggregates(db, s.id).await?;
    let user_rating = match viewer {
        Some(user_id) => rating_service::user_rating_for(db, user_id, s.id).await?,
        None => None,
    };
    Ok(StoreView {
        id: s.id,
        name: s.name,
        email: s.email,
        address: s.address,
        average_rating: average,
        total_ratings: total,
        user_rating,
    })
}

/// Public store listing with live aggregates. `search` matches name or
/// address as a substring; aggregates are computed per row at read time so
/// the listing can never lag the rating set.
pub async fn list_stores(
    db: &DatabaseConnection,
    viewer: Option<Uuid>,
    search: Option<&str>,
    sort: StoreSortKey,
    descending: bool,
) -> Result<Vec<StoreView>, ServiceError> {
    let mut query = store::Entity::find();

    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(store::Column::Name.contains(term))
                .add(store::Column::Address.contains(term)),
        );
    }

    let order = if descending { sea_orm::Order::Desc } else { sea_orm::Order::Asc };
    query = match sort {
        StoreSortKey::Email => query.order_by(store::Column::Email, order),
        StoreSortKey::CreatedAt => query.order_by(store::Column::CreatedAt, order),
        // Aggregate ordering happens after computation below
        StoreSortKey::Name | StoreSortKey::AverageRating => query.order_by(store::Column::Name, sea_orm::Order::Asc),
    };

    let rows = query.all(db).await.map_err(ServiceError::from_db_err)?;
    let mut views = Vec::with_capacity(rows.len());
    for s in rows {
        views.push(to_view(db, viewer, s).await?);
    }

    if sort == StoreSortKey::AverageRating {
        views.sort_by(|a, b| {
            let ord = a.average_rating.partial_cmp(&b.average_rating).unwrap_or(std::cmp::Ordering::Equal);
            if descending { ord.reverse() } else { ord }
        });
    }

    Ok(views)
}

/// One store with aggregates and the viewer's rating; NotFound when absent.
pub async fn get_store(
    db: &DatabaseConnection,
    viewer: Option<Uuid>,
    store_id: Uuid,
) -> Result<StoreView, ServiceError> {
    let s = store::Entity::find_by_id(store_id)
        .one(db)
        .await
        .map_err(ServiceError::from_db_err)?
        .ok_or_else(|| ServiceError::not_found("store"))?;
    to_view(db, viewer, s).await
}

/// Resolve which store a store-owner session refers to.
///
/// The live `owner_id` lookup is authoritative: a token minted before the
/// store existed carries no claim, and a claim minted before an ownership
/// change may point at a store the caller no longer owns. The embedded
/// claim is only honored when the lookup finds nothing and the claimed
/// store still exists.
pub async fn resolve_owned_store(
    db: &DatabaseConnection,
    identity: &SessionIdentity,
) -> Result<store::Model, ServiceError> {
    if let Some(owned) = store::find_by_owner(db, identity.user_id).await? {
        if identity.store_id.is_some_and(|claimed| claimed != owned.id) {
            debug!(
                user_id = %identity.user_id,
                claimed = ?identity.store_id,
                actual = %owned.id,
                "stale store claim in session token, using live lookup"
            );
        }
        return Ok(owned);
    }

    if let Some(claimed) = identity.store_id {
        if let Some(s) = store::Entity::find_by_id(claimed)
            .one(db)
            .await
            .map_err(ServiceError::from_db_err)?
        {
            return Ok(s);
        }
    }

    Err(ServiceError::not_found("store"))
}

/// One row of the owner dashboard's rater list.
#[derive(Debug, Clone, Serialize)]
pub struct RaterEntry {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub value: i32,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerDashboard {
    pub store: StoreView,
    pub raters: Vec<RaterEntry>,
}

/// The owner's store with aggregates plus everyone who rated it,
/// most recent first.
pub async fn owner_dashboard(
    db: &DatabaseConnection,
    identity: &SessionIdentity,
) -> Result<OwnerDashboard, ServiceError> {
    let owned = resolve_owned_store(db, identity).await?;
    let view = to_view(db, None, owned.clone()).await?;

    let rows = rating::Entity::find()
        .filter(rating::Column::StoreId.eq(owned.id))
        .find_also_related(user::Entity)
        .order_by_desc(rating::Column::CreatedAt)
        .all(db)
        .await
        .map_err(ServiceError::from_db_err)?;

    let raters = rows
        .into_iter()
        .filter_map(|(r, u)| {
            u.map(|u| RaterEntry {
                user_id: u.id,
                name: u.name,
                email: u.email,
                value: r.value,
                created_at: r.created_at,
            })
        })
        .collect();

    Ok(OwnerDashboard { store: view, raters })
}

/// Store-owner self-service deletion of their own store.
pub async fn delete_own_store(db: &DatabaseConnection, identity: &SessionIdentity) -> Result<(), ServiceError> {
    let owned = resolve_owned_store(db, identity).await?;
    crate::provisioning::delete_store(db, owned.id).await
}
