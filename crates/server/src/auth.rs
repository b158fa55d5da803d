use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use axum_extra::extract::cookie::CookieJar;
use sea_orm::DatabaseConnection;

use service::auth::domain::{Role, SessionIdentity};
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::service::{AuthConfig, AuthService};
use service::errors::ServiceError;
use service::retry::RetryPolicy;

use crate::errors::ApiError;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: ServerAuthConfig,
    pub retry: RetryPolicy,
}

impl ServerState {
    pub fn auth_service(&self) -> AuthService<SeaOrmAuthRepository> {
        AuthService::new(
            Arc::new(SeaOrmAuthRepository { db: self.db.clone() }),
            AuthConfig {
                jwt_secret: self.auth.jwt_secret.clone(),
                token_ttl_hours: self.auth.token_ttl_hours,
            },
        )
    }
}

/// Session token from the `Authorization: Bearer` header, falling back to
/// the cookie set at login.
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }
    CookieJar::from_headers(&parts.headers)
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
}

/// Extractor requiring a valid session of any role.
pub struct CurrentUser(pub SessionIdentity);

#[async_trait]
impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts).ok_or(ApiError(ServiceError::Unauthorized))?;
        let identity = state
            .auth_service()
            .decode_token(&token)
            .map_err(|_| ApiError(ServiceError::Unauthorized))?;
        Ok(CurrentUser(identity))
    }
}

/// Extractor requiring an admin session.
pub struct RequireAdmin(pub SessionIdentity);

#[async_trait]
impl FromRequestParts<ServerState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        if identity.role != Role::Admin {
            return Err(ApiError(ServiceError::Forbidden("admins only".into())));
        }
        Ok(RequireAdmin(identity))
    }
}

/// Extractor requiring a store-owner session.
pub struct RequireStoreOwner(pub SessionIdentity);

#[async_trait]
impl FromRequestParts<ServerState> for RequireStoreOwner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ServerState) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        if identity.role != Role::StoreOwner {
            return Err(ApiError(ServiceError::Forbidden("store owners only".into())));
        }
        Ok(RequireStoreOwner(identity))
    }
}
