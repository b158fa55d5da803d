use std::{env, net::SocketAddr};

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use service::auth::domain::Role;
use service::provisioning::{self, NewAccount};
use service::retry::RetryPolicy;

use crate::auth::{ServerAuthConfig, ServerState};
use crate::routes;

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_default();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Load host/port from configs or env vars, with sensible fallbacks
fn load_bind_addr() -> anyhow::Result<SocketAddr> {
    let (host, port) = match configs::load_default() {
        Ok(cfg) => {
            let s = cfg.server;
            (s.host, s.port)
        }
        Err(_) => {
            let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
            let port = env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(8081);
            (host, port)
        }
    };
    Ok(format!("{}:{}", host, port).parse()?)
}

fn load_auth_config() -> ServerAuthConfig {
    let mut auth = configs::load_default().map(|c| c.auth).unwrap_or_default();
    auth.normalize_from_env();
    if auth.jwt_secret.trim().is_empty() {
        warn!("JWT_SECRET not configured, using development fallback");
        auth.jwt_secret = "dev-secret-change-me".to_string();
    }
    ServerAuthConfig { jwt_secret: auth.jwt_secret, token_ttl_hours: auth.token_ttl_hours }
}

/// Create the bootstrap admin account when SEED_ADMIN_EMAIL and
/// SEED_ADMIN_PASSWORD are set and the account does not exist yet.
/// Credentials always come from the environment, never from source.
async fn seed_admin(db: &DatabaseConnection) -> anyhow::Result<()> {
    let (email, password) = match (env::var("SEED_ADMIN_EMAIL"), env::var("SEED_ADMIN_PASSWORD")) {
        (Ok(e), Ok(p)) => (e, p),
        _ => return Ok(()),
    };
    let name = env::var("SEED_ADMIN_NAME").unwrap_or_else(|_| "System Administrator".to_string());

    let input = NewAccount {
        name,
        email: email.clone(),
        password,
        address: None,
        role: Role::Admin,
    };
    match provisioning::create_standalone_user(db, &input).await {
        Ok(admin) => info!(admin_id = %admin.id, "seed admin created"),
        Err(service::errors::ServiceError::Conflict(_)) => {
            info!(email = %email, "seed admin already exists");
        }
        Err(e) => return Err(anyhow::anyhow!("seed admin failed: {}", e)),
    }
    Ok(())
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    // DB connection + schema
    let db = models::db::connect().await?;
    migration::Migrator::up(&db, None).await?;

    seed_admin(&db).await?;

    let state = ServerState {
        db,
        auth: load_auth_config(),
        retry: RetryPolicy::default(),
    };

    // Build router
    let cors = build_cors();
    let app: Router = routes::build_router(cors, state);

    // Bind and serve
    let addr = load_bind_addr()?;
    info!(%addr, "starting store ratings server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
