use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use server::auth::{ServerAuthConfig, ServerState};
use server::routes;
use service::retry::RetryPolicy;

fn cors() -> tower_http::cors::CorsLayer {
    tower_http::cors::CorsLayer::very_permissive()
}

async fn build_app() -> anyhow::Result<Router> {
    let db = models::db::connect().await?;
    if let Err(e) = migration::Migrator::up(&db, None).await {
        let msg = format!("{}", e);
        if msg.contains("duplicate key value violates unique constraint") {
            eprintln!("migrations already applied, continue: {}", msg);
        } else {
            return Err(e.into());
        }
    }
    let state = ServerState {
        db,
        auth: ServerAuthConfig { jwt_secret: "test-secret".into(), token_ttl_hours: 24 },
        retry: RetryPolicy::default(),
    };
    Ok(routes::build_router(cors(), state))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn authed_request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json");
    match body {
        Some(v) => builder.body(Body::from(serde_json::to_vec(&v).unwrap())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(resp: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = resp.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

async fn login_token(app: &Router, email: &str, password: &str) -> anyhow::Result<String> {
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/login", json!({"email": email, "password": password})))
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await?;
    Ok(body["token"].as_str().expect("token in login body").to_string())
}

#[tokio::test]
async fn test_signup_and_login_flow() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app().await?;

    let email = format!("user_{}@example.com", Uuid::new_v4());
    let password = "S3curePass!";

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            json!({"name": "Flow Tester", "email": email, "password": password}),
        ))
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/login", json!({"email": email, "password": password})))
        .await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers().get("set-cookie").cloned();
    assert!(cookie.is_some_and(|c| c.to_str().unwrap().starts_with("auth_token=")));

    let body = body_json(resp).await?;
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["role"], "user");

    // Profile via Bearer header
    let resp = app.clone().oneshot(authed_request("GET", "/api/users/profile", &token, None)).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile = body_json(resp).await?;
    assert_eq!(profile["email"].as_str(), Some(email.as_str()));
    // The credential hash never leaves the server
    assert!(profile.get("password_hash").is_none());
    Ok(())
}

#[tokio::test]
async fn test_login_wrong_password() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app().await?;

    let email = format!("user_{}@example.com", Uuid::new_v4());

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            json!({"name": "Wrong Pass", "email": email, "password": "StrongPass1!"}),
        ))
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/login", json!({"email": email, "password": "wrong"})))
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await?;
    assert_eq!(body["category"], "unauthorized");
    Ok(())
}

#[tokio::test]
async fn test_signup_weak_password_rejected() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app().await?;

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            json!({"name": "Weak Pass", "email": format!("weak_{}@example.com", Uuid::new_v4()), "password": "short"}),
        ))
        .await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await?;
    assert_eq!(body["category"], "validation_error");
    Ok(())
}

#[tokio::test]
async fn test_profile_requires_session() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app().await?;

    let resp = app
        .clone()
        .oneshot(Request::builder().method("GET").uri("/api/users/profile").body(Body::empty())?)
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_change_password_flow() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app().await?;

    let email = format!("user_{}@example.com", Uuid::new_v4());
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/signup",
            json!({"name": "Change Pass", "email": email, "password": "OldPass12!"}),
        ))
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let token = login_token(&app, &email, "OldPass12!").await?;

    let resp = app
        .clone()
        .oneshot(authed_request(
            "PUT",
            "/api/users/change-password",
            &token,
            Some(json!({"current_password": "NotTheOne1!", "new_password": "NewPass12!"})),
        ))
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(authed_request(
            "PUT",
            "/api/users/change-password",
            &token,
            Some(json!({"current_password": "OldPass12!", "new_password": "NewPass12!"})),
        ))
        .await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let _ = login_token(&app, &email, "NewPass12!").await?;
    Ok(())
}
