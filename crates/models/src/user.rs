use sea_orm::{entity::prelude::*, Set, DatabaseConnection, QueryFilter, ColumnTrait};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::store;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub address: Option<String>,
    pub role: String,
    pub store_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Store,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Store => Entity::belongs_to(store::Entity).from(Column::StoreId).to(store::Column::Id).into() }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_name(name: &str) -> Result<(), errors::ModelError> {
    let len = name.trim().chars().count();
    if !(3..=60).contains(&len) {
        return Err(errors::ModelError::Validation("name must be between 3 and 60 characters".into()));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), errors::ModelError> {
    let email = email.trim();
    if email.len() > 255 || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(errors::ModelError::Validation("invalid email".into()));
    }
    Ok(())
}

pub fn validate_address(address: &str) -> Result<(), errors::ModelError> {
    if address.trim().chars().count() > 400 {
        return Err(errors::ModelError::Validation("address must not exceed 400 characters".into()));
    }
    Ok(())
}

const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Plaintext password policy, checked before hashing: 8..=16 chars with at
/// least one uppercase letter and one special character.
pub fn validate_password(password: &str) -> Result<(), errors::ModelError> {
    let len = password.chars().count();
    if !(8..=16).contains(&len) {
        return Err(errors::ModelError::Validation("password must be between 8 and 16 characters".into()));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(errors::ModelError::Validation("password must contain at least one uppercase letter".into()));
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(errors::ModelError::Validation("password must contain at least one special character".into()));
    }
    Ok(())
}

pub async fn create(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    password_hash: &str,
    address: Option<&str>,
    role: &str,
    store_id: Option<Uuid>,
) -> Result<Model, errors::ModelError> {
    validate_name(name)?;
    validate_email(email)?;
    if let Some(addr) = address { validate_address(addr)?; }
    if password_hash.trim().is_empty() {
        return Err(errors::ModelError::Validation("password hash required".into()));
    }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.trim().to_string()),
        email: Set(email.trim().to_string()),
        password_hash: Set(password_hash.to_string()),
        address: Set(address.map(|a| a.trim().to_string())),
        role: Set(role.to_string()),
        store_id: Set(store_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::Email.eq(email.trim().to_string()))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

pub async fn hard_delete(db: &DatabaseConnection, id: Uuid) -> Result<(), errors::ModelError> {
    Entity::delete_by_id(id).exec(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))?;
    Ok(())
}
