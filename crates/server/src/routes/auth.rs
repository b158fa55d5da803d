use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use uuid::Uuid;

use service::auth::domain::{AuthUser, LoginInput, SignupInput};

use crate::auth::{ServerState, AUTH_COOKIE};
use crate::errors::ApiError;

#[derive(Serialize)]
pub struct SignupOutput {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct LoginOutput {
    pub token: String,
    pub user: AuthUser,
}

pub async fn signup(
    State(state): State<ServerState>,
    Json(input): Json<SignupInput>,
) -> Result<(StatusCode, Json<SignupOutput>), ApiError> {
    let user = state.auth_service().signup(input).await?;
    Ok((StatusCode::CREATED, Json(SignupOutput { user_id: user.id })))
}

pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<LoginOutput>), ApiError> {
    let session = state.auth_service().login(input).await?;

    let mut cookie = Cookie::new(AUTH_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    let jar = jar.add(cookie);

    Ok((jar, Json(LoginOutput { token: session.token, user: session.user })))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::from(AUTH_COOKIE));
    (jar, StatusCode::NO_CONTENT)
}
