use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::domain::{AuthSession, AuthUser, LoginInput, Role, SessionIdentity, SignupInput};
use super::errors::AuthError;
use super::repository::{AuthRepository, NewUser, StoredUser};

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self { jwt_secret: jwt_secret.into(), token_ttl_hours: 24 }
    }
}

/// Hash a plaintext password with argon2 and a fresh OS salt.
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| AuthError::HashError(e.to_string()))?
        .to_string())
}

/// Verify a plaintext password against a stored argon2 hash.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::HashError(e.to_string()))?;
    Ok(Argon2::default().verify_password(plain.as_bytes(), &parsed).is_ok())
}

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    role: String,
    store_id: Option<Uuid>,
    exp: usize,
}

fn to_auth_user(user: &StoredUser) -> Result<AuthUser, AuthError> {
    let role = Role::normalize(&user.role)
        .ok_or_else(|| AuthError::Validation(format!("unknown role: {}", user.role)))?;
    Ok(AuthUser {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role,
        store_id: user.store_id,
    })
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    /// Register a new rating user with a hashed password.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::SignupInput;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::new("secret"));
    /// let input = SignupInput { name: "Test Person".into(), email: "user@example.com".into(), password: "Secret12!".into(), address: None };
    /// let user = tokio_test::block_on(svc.signup(input)).unwrap();
    /// assert_eq!(user.email, "user@example.com");
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn signup(&self, input: SignupInput) -> Result<AuthUser, AuthError> {
        models::user::validate_name(&input.name).map_err(|e| AuthError::Validation(e.to_string()))?;
        models::user::validate_email(&input.email).map_err(|e| AuthError::Validation(e.to_string()))?;
        models::user::validate_password(&input.password).map_err(|e| AuthError::Validation(e.to_string()))?;
        if let Some(addr) = &input.address {
            models::user::validate_address(addr).map_err(|e| AuthError::Validation(e.to_string()))?;
        }

        if let Some(existing) = self.repo.find_user_by_email(&input.email).await? {
            debug!("account exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let hash = hash_password(&input.password)?;
        let user = self
            .repo
            .create_user(NewUser {
                name: input.name,
                email: input.email,
                password_hash: hash,
                address: input.address,
                role: Role::User.as_str().to_string(),
                store_id: None,
            })
            .await?;

        info!(user_id = %user.id, email = %user.email, "user_registered");
        to_auth_user(&user)
    }

    /// Authenticate a user and issue a session token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{SignupInput, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo.clone(), AuthConfig::new("secret"));
    /// let _ = tokio_test::block_on(svc.signup(SignupInput { name: "Some Name".into(), email: "u@e.com".into(), password: "Passw0rd!".into(), address: None }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "u@e.com".into(), password: "Passw0rd!".into() })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let user = self
            .repo
            .find_user_by_email(&input.email)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(AuthError::Unauthorized);
        }

        let auth_user = to_auth_user(&user)?;
        let token = self.issue_token(&auth_user)?;
        info!(user_id = %auth_user.id, role = auth_user.role.as_str(), "user_logged_in");
        Ok(AuthSession { user: auth_user, token })
    }

    /// Replace the caller's password after verifying the current one.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn change_password(&self, user_id: Uuid, current: &str, new: &str) -> Result<(), AuthError> {
        let user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !verify_password(current, &user.password_hash)? {
            return Err(AuthError::Unauthorized);
        }

        models::user::validate_password(new).map_err(|e| AuthError::Validation(e.to_string()))?;
        let hash = hash_password(new)?;
        self.repo.set_password_hash(user_id, hash).await?;
        info!("password_changed");
        Ok(())
    }

    /// Sign a session token carrying id, email, normalized role and the
    /// store linkage as of issuance time.
    pub fn issue_token(&self, user: &AuthUser) -> Result<String, AuthError> {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(self.cfg.token_ttl_hours)).timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            store_id: user.store_id,
            exp,
        };
        encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()))
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    /// Validate a token's signature and expiry and build the caller's
    /// session identity. Role normalization happens here, once.
    pub fn decode_token(&self, token: &str) -> Result<SessionIdentity, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.cfg.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AuthError::TokenError(e.to_string()))?;

        let user_id = data
            .claims
            .sub
            .parse::<Uuid>()
            .map_err(|e| AuthError::TokenError(e.to_string()))?;
        let role = Role::normalize(&data.claims.role)
            .ok_or_else(|| AuthError::TokenError(format!("unknown role claim: {}", data.claims.role)))?;

        Ok(SessionIdentity {
            user_id,
            email: data.claims.email,
            role,
            store_id: data.claims.store_id,
        })
    }
}
