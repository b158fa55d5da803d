use async_trait::async_trait;
use uuid::Uuid;

use super::errors::AuthError;

/// A user row as the auth workflows see it: identity fields plus the
/// credential hash. The hash never leaves this layer.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub address: Option<String>,
    pub role: String,
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub address: Option<String>,
    pub role: String,
    pub store_id: Option<Uuid>,
}

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>, AuthError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<StoredUser>, AuthError>;
    async fn create_user(&self, input: NewUser) -> Result<StoredUser, AuthError>;
    async fn set_password_hash(&self, user_id: Uuid, password_hash: String) -> Result<(), AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockAuthRepository {
        users: Mutex<HashMap<String, StoredUser>>, // key: email
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.get(email).cloned())
        }

        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<StoredUser>, AuthError> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|u| u.id == id).cloned())
        }

        async fn create_user(&self, input: NewUser) -> Result<StoredUser, AuthError> {
            let mut users = self.users.lock().unwrap();
            if users.contains_key(&input.email) {
                return Err(AuthError::Conflict);
            }
            let user = StoredUser {
                id: Uuid::new_v4(),
                name: input.name,
                email: input.email.clone(),
                password_hash: input.password_hash,
                address: input.address,
                role: input.role,
                store_id: input.store_id,
            };
            users.insert(input.email, user.clone());
            Ok(user)
        }

        async fn set_password_hash(&self, user_id: Uuid, password_hash: String) -> Result<(), AuthError> {
            let mut users = self.users.lock().unwrap();
            match users.values_mut().find(|u| u.id == user_id) {
                Some(u) => {
                    u.password_hash = password_hash;
                    Ok(())
                }
                None => Err(AuthError::NotFound),
            }
        }
    }
}
