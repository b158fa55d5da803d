use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use service::auth::domain::Role;
use service::errors::ServiceError;
use service::pagination::Pagination;
use service::provisioning::{self, NewAccount, NewStoreWithOwner};
use service::store_service::{self, StoreSortKey, StoreView};
use service::user_service::{self, DashboardStats, UserDetail, UserSortKey};

use crate::auth::{RequireAdmin, ServerState};
use crate::errors::ApiError;

pub async fn dashboard(
    State(state): State<ServerState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<DashboardStats>, ApiError> {
    let stats = user_service::dashboard_stats(&state.db).await?;
    Ok(Json(stats))
}

#[derive(Deserialize, Default)]
pub struct UserListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub per_page: Option<u32>,
}

fn is_descending(order: Option<&str>) -> bool {
    matches!(order, Some(o) if o.eq_ignore_ascii_case("desc"))
}

fn pagination(page: Option<u32>, per_page: Option<u32>) -> Pagination {
    let default = Pagination::default();
    Pagination {
        page: page.unwrap_or(default.page),
        per_page: per_page.unwrap_or(default.per_page),
    }
}

pub async fn list_users(
    State(state): State<ServerState>,
    RequireAdmin(_): RequireAdmin,
    Query(q): Query<UserListQuery>,
) -> Result<Json<Vec<models::user::Model>>, ApiError> {
    let role = match q.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => Some(
            Role::normalize(raw)
                .ok_or_else(|| ServiceError::Validation(format!("unknown role filter: {}", raw)))?,
        ),
        None => None,
    };
    let sort = UserSortKey::parse(q.sort_by.as_deref().unwrap_or("name"));
    let users = user_service::list_users(
        &state.db,
        q.search.as_deref(),
        role,
        sort,
        is_descending(q.sort_order.as_deref()),
        pagination(q.page, q.per_page),
    )
    .await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<ServerState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDetail>, ApiError> {
    let detail = user_service::get_user_detail(&state.db, id).await?;
    Ok(Json(detail))
}

#[derive(Serialize)]
pub struct CreateUserOutput {
    pub user_id: Uuid,
}

pub async fn create_user(
    State(state): State<ServerState>,
    RequireAdmin(_): RequireAdmin,
    Json(input): Json<NewAccount>,
) -> Result<(StatusCode, Json<CreateUserOutput>), ApiError> {
    let created = provisioning::create_standalone_user(&state.db, &input).await?;
    Ok((StatusCode::CREATED, Json(CreateUserOutput { user_id: created.id })))
}

pub async fn delete_user(
    State(state): State<ServerState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    provisioning::delete_user(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Default)]
pub struct StoreListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

pub async fn list_stores(
    State(state): State<ServerState>,
    RequireAdmin(_): RequireAdmin,
    Query(q): Query<StoreListQuery>,
) -> Result<Json<Vec<StoreView>>, ApiError> {
    let sort = StoreSortKey::parse(q.sort_by.as_deref().unwrap_or("name"));
    let stores = store_service::list_stores(
        &state.db,
        None,
        q.search.as_deref(),
        sort,
        is_descending(q.sort_order.as_deref()),
    )
    .await?;
    Ok(Json(stores))
}

#[derive(Serialize)]
pub struct CreateStoreOutput {
    pub store_id: Uuid,
    pub owner_id: Uuid,
}

/// Provision a store with its owner account as one atomic unit.
pub async fn create_store(
    State(state): State<ServerState>,
    RequireAdmin(_): RequireAdmin,
    Json(input): Json<NewStoreWithOwner>,
) -> Result<(StatusCode, Json<CreateStoreOutput>), ApiError> {
    let out = provisioning::create_store_with_owner(&state.db, &state.retry, &input).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateStoreOutput { store_id: out.store.id, owner_id: out.owner.id }),
    ))
}

pub async fn delete_store(
    State(state): State<ServerState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    provisioning::delete_store(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
