use axum::{extract::State, http::StatusCode, Json};

use service::store_service::{self, OwnerDashboard};

use crate::auth::{RequireStoreOwner, ServerState};
use crate::errors::ApiError;

/// The owner's store with live aggregates and its rater list. The store is
/// resolved from the live ownership row, with the token's embedded claim as
/// fallback only.
pub async fn dashboard(
    State(state): State<ServerState>,
    RequireStoreOwner(identity): RequireStoreOwner,
) -> Result<Json<OwnerDashboard>, ApiError> {
    let dash = store_service::owner_dashboard(&state.db, &identity).await?;
    Ok(Json(dash))
}

/// Owner self-service deletion of their own store.
pub async fn delete_store(
    State(state): State<ServerState>,
    RequireStoreOwner(identity): RequireStoreOwner,
) -> Result<StatusCode, ApiError> {
    store_service::delete_own_store(&state.db, &identity).await?;
    Ok(StatusCode::NO_CONTENT)
}
