use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::errors::AuthError;
use crate::auth::repository::{AuthRepository, NewUser, StoredUser};

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

fn to_stored(u: models::user::Model) -> StoredUser {
    StoredUser {
        id: u.id,
        name: u.name,
        email: u.email,
        password_hash: u.password_hash,
        address: u.address,
        role: u.role,
        store_id: u.store_id,
    }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<StoredUser>, AuthError> {
        let res = models::user::find_by_email(&self.db, email)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(to_stored))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<StoredUser>, AuthError> {
        let res = models::user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(to_stored))
    }

    async fn create_user(&self, input: NewUser) -> Result<StoredUser, AuthError> {
        let created = models::user::create(
            &self.db,
            &input.name,
            &input.email,
            &input.password_hash,
            input.address.as_deref(),
            &input.role,
            input.store_id,
        )
        .await
        .map_err(|e| match e {
            models::errors::ModelError::Validation(msg) => AuthError::Validation(msg),
            models::errors::ModelError::Db(msg) => AuthError::Repository(msg),
        })?;
        Ok(to_stored(created))
    }

    async fn set_password_hash(&self, user_id: Uuid, password_hash: String) -> Result<(), AuthError> {
        let found = models::user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?
            .ok_or(AuthError::NotFound)?;
        let mut am: models::user::ActiveModel = found.into();
        am.password_hash = Set(password_hash);
        am.updated_at = Set(Utc::now().into());
        am.update(&self.db)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(())
    }
}
