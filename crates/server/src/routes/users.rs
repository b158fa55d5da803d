use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use service::user_service;

use crate::auth::{CurrentUser, ServerState};
use crate::errors::ApiError;

pub async fn profile(
    State(state): State<ServerState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<models::user::Model>, ApiError> {
    let user = user_service::get_profile(&state.db, identity.user_id).await?;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<ServerState>,
    CurrentUser(identity): CurrentUser,
    Json(input): Json<ChangePasswordInput>,
) -> Result<StatusCode, ApiError> {
    state
        .auth_service()
        .change_password(identity.user_id, &input.current_password, &input.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
