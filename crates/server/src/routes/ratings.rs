use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use service::rating_service::{self, MyRating, RatingOutcome};

use crate::auth::{CurrentUser, ServerState};
use crate::errors::ApiError;

#[derive(Deserialize)]
pub struct SubmitRatingInput {
    pub store_id: Uuid,
    pub rating: i32,
}

#[derive(Serialize)]
pub struct SubmitRatingOutput {
    pub outcome: RatingOutcome,
}

/// Submit or overwrite the caller's rating for a store. A fresh rating
/// answers 201, an overwrite answers 200.
pub async fn submit_rating(
    State(state): State<ServerState>,
    CurrentUser(identity): CurrentUser,
    Json(input): Json<SubmitRatingInput>,
) -> Result<(StatusCode, Json<SubmitRatingOutput>), ApiError> {
    let outcome = rating_service::submit_rating(&state.db, identity.user_id, input.store_id, input.rating).await?;
    let status = match outcome {
        RatingOutcome::Created => StatusCode::CREATED,
        RatingOutcome::Updated => StatusCode::OK,
    };
    Ok((status, Json(SubmitRatingOutput { outcome })))
}

pub async fn my_ratings(
    State(state): State<ServerState>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<MyRating>>, ApiError> {
    let ratings = rating_service::list_my_ratings(&state.db, identity.user_id).await?;
    Ok(Json(ratings))
}
