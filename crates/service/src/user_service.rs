use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use models::{rating, store, user};

use crate::auth::domain::Role;
use crate::errors::ServiceError;
use crate::pagination::Pagination;
use crate::rating_service;

/// Get a user by id (profile view).
pub async fn get_profile(db: &DatabaseConnection, user_id: Uuid) -> Result<user::Model, ServiceError> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(ServiceError::from_db_err)?
        .ok_or_else(|| ServiceError::not_found("user"))
}

/// Whitelisted sort keys for the admin user listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortKey {
    Name,
    Email,
    Role,
    CreatedAt,
}

impl UserSortKey {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "email" => UserSortKey::Email,
            "role" => UserSortKey::Role,
            "created_at" => UserSortKey::CreatedAt,
            _ => UserSortKey::Name,
        }
    }
}

/// Admin listing: search over name/email/address, optional role filter,
/// whitelisted sorting, paginated.
pub async fn list_users(
    db: &DatabaseConnection,
    search: Option<&str>,
    role: Option<Role>,
    sort: UserSortKey,
    descending: bool,
    opts: Pagination,
) -> Result<Vec<user::Model>, ServiceError> {
    let mut query = user::Entity::find();

    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(user::Column::Name.contains(term))
                .add(user::Column::Email.contains(term))
                .add(user::Column::Address.contains(term)),
        );
    }
    if let Some(role) = role {
        query = query.filter(user::Column::Role.eq(role.as_str()));
    }

    let order = if descending { sea_orm::Order::Desc } else { sea_orm::Order::Asc };
    query = match sort {
        UserSortKey::Name => query.order_by(user::Column::Name, order),
        UserSortKey::Email => query.order_by(user::Column::Email, order),
        UserSortKey::Role => query.order_by(user::Column::Role, order),
        UserSortKey::CreatedAt => query.order_by(user::Column::CreatedAt, order),
    };

    let (page_idx, per_page) = opts.normalize();
    query
        .paginate(db, per_page)
        .fetch_page(page_idx)
        .await
        .map_err(ServiceError::from_db_err)
}

/// Admin detail view: the account plus, for store owners, the average
/// rating of the store they own.
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: user::Model,
    pub store_rating: Option<f64>,
}

pub async fn get_user_detail(db: &DatabaseConnection, user_id: Uuid) -> Result<UserDetail, ServiceError> {
    let found = get_profile(db, user_id).await?;

    let store_rating = match (Role::normalize(&found.role), found.store_id) {
        (Some(Role::StoreOwner), Some(store_id)) => {
            Some(rating_service::compute_aggregates(db, store_id).await?.average)
        }
        _ => None,
    };

    Ok(UserDetail { user: found, store_rating })
}

/// Platform totals for the admin dashboard.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_stores: u64,
    pub total_ratings: u64,
}

pub async fn dashboard_stats(db: &DatabaseConnection) -> Result<DashboardStats, ServiceError> {
    let total_users = user::Entity::find().count(db).await.map_err(ServiceError::from_db_err)?;
    let total_stores = store::Entity::find().count(db).await.map_err(ServiceError::from_db_err)?;
    let total_ratings = rating::Entity::find().count(db).await.map_err(ServiceError::from_db_err)?;
    Ok(DashboardStats { total_users, total_stores, total_ratings })
}
