use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use service::store_service::{self, StoreSortKey, StoreView};

use crate::auth::{CurrentUser, ServerState};
use crate::errors::ApiError;

#[derive(Deserialize, Default)]
pub struct StoreListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

fn is_descending(order: Option<&str>) -> bool {
    matches!(order, Some(o) if o.eq_ignore_ascii_case("desc"))
}

/// Public listing; a logged-in viewer additionally sees their own rating
/// per store.
pub async fn list_stores(
    State(state): State<ServerState>,
    viewer: Option<CurrentUser>,
    Query(q): Query<StoreListQuery>,
) -> Result<Json<Vec<StoreView>>, ApiError> {
    let sort = StoreSortKey::parse(q.sort_by.as_deref().unwrap_or("name"));
    let stores = store_service::list_stores(
        &state.db,
        viewer.map(|c| c.0.user_id),
        q.search.as_deref(),
        sort,
        is_descending(q.sort_order.as_deref()),
    )
    .await?;
    Ok(Json(stores))
}

pub async fn get_store(
    State(state): State<ServerState>,
    viewer: Option<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoreView>, ApiError> {
    let store = store_service::get_store(&state.db, viewer.map(|c| c.0.user_id), id).await?;
    Ok(Json(store))
}
