pub mod admin;
pub mod auth;
pub mod ratings;
pub mod store_owner;
pub mod stores;
pub mod users;

use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::auth::ServerState;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: public store/health routes, the
/// authenticated user surface, and the role-gated admin and store-owner
/// surfaces.
pub fn build_router(cors: CorsLayer, state: ServerState) -> Router {
    let api = Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/users/profile", get(users::profile))
        .route("/api/users/change-password", put(users::change_password))
        .route("/api/stores", get(stores::list_stores))
        .route("/api/stores/:id", get(stores::get_store))
        .route("/api/ratings", post(ratings::submit_rating))
        .route("/api/ratings/my-ratings", get(ratings::my_ratings))
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/users", get(admin::list_users).post(admin::create_user))
        .route("/api/admin/users/:id", get(admin::get_user).delete(admin::delete_user))
        .route("/api/admin/stores", get(admin::list_stores).post(admin::create_store))
        .route("/api/admin/stores/:id", delete(admin::delete_store))
        .route("/api/store-owner/dashboard", get(store_owner::dashboard))
        .route("/api/store-owner/store", delete(store_owner::delete_store));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
