use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use models::{store, user};

use crate::auth::domain::Role;
use crate::auth::service::hash_password;
use crate::errors::ServiceError;
use crate::retry::{retry_with_policy, RetryPolicy};

/// Admin request to create a store together with its owner account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStoreWithOwner {
    pub store_name: String,
    pub store_email: String,
    #[serde(default)]
    pub address: Option<String>,
    pub owner_email: String,
    pub owner_password: String,
}

/// Admin request for a plain account of any role.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: Option<String>,
    pub role: Role,
}

/// Result of a successful provisioning run: both rows, cross-linked.
#[derive(Debug, Clone)]
pub struct ProvisionedStore {
    pub store: store::Model,
    pub owner: user::Model,
}

fn validate_provision_input(input: &NewStoreWithOwner) -> Result<(), ServiceError> {
    user::validate_name(&input.store_name)?;
    user::validate_email(&input.store_email)?;
    if let Some(addr) = &input.address {
        user::validate_address(addr)?;
    }
    user::validate_email(&input.owner_email)?;
    user::validate_password(&input.owner_password)?;
    Ok(())
}

/// Create a store and its owner account as one unit: either both rows land,
/// cross-linked in both directions, or neither persists.
///
/// Preconditions (checked before any mutation): neither the store email nor
/// the owner email is taken. The transaction itself is retried under
/// `policy` when it fails transiently; all other failures surface at once.
/// The owner's password is hashed up front and the plaintext is dropped
/// before any storage call.
#[instrument(skip(db, policy, input), fields(store_email = %input.store_email, owner_email = %input.owner_email))]
pub async fn create_store_with_owner(
    db: &DatabaseConnection,
    policy: &RetryPolicy,
    input: &NewStoreWithOwner,
) -> Result<ProvisionedStore, ServiceError> {
    validate_provision_input(input)?;

    if store::find_by_email(db, &input.store_email).await?.is_some() {
        return Err(ServiceError::Conflict("store already exists with this email".into()));
    }
    if user::find_by_email(db, &input.owner_email).await?.is_some() {
        return Err(ServiceError::Conflict("owner email already exists".into()));
    }

    let password_hash = hash_password(&input.owner_password)?;

    let provisioned = retry_with_policy(policy, || provision_once(db, input, &password_hash)).await?;
    info!(
        store_id = %provisioned.store.id,
        owner_id = %provisioned.owner.id,
        "store_provisioned"
    );
    Ok(provisioned)
}

/// One transactional provisioning attempt: insert store, insert owner,
/// link the store back. Rolls back in full on any failure; the retry
/// wrapper decides whether to run another attempt.
pub async fn provision_once(
    db: &DatabaseConnection,
    input: &NewStoreWithOwner,
    password_hash: &str,
) -> Result<ProvisionedStore, ServiceError> {
    let txn = db.begin().await.map_err(ServiceError::from_db_err)?;

    match insert_linked_pair(&txn, input, password_hash).await {
        Ok(pair) => {
            txn.commit().await.map_err(ServiceError::from_db_err)?;
            Ok(pair)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "rollback failed after provisioning error");
            }
            Err(e)
        }
    }
}

async fn insert_linked_pair(
    txn: &DatabaseTransaction,
    input: &NewStoreWithOwner,
    password_hash: &str,
) -> Result<ProvisionedStore, ServiceError> {
    let now = Utc::now().into();

    let store_am = store::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.store_name.trim().to_string()),
        email: Set(input.store_email.trim().to_string()),
        address: Set(input.address.as_ref().map(|a| a.trim().to_string())),
        owner_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let created_store = store_am.insert(txn).await.map_err(ServiceError::from_db_err)?;

    let owner_am = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.store_name.trim().to_string()),
        email: Set(input.owner_email.trim().to_string()),
        password_hash: Set(password_hash.to_string()),
        address: Set(input.address.as_ref().map(|a| a.trim().to_string())),
        role: Set(Role::StoreOwner.as_str().to_string()),
        store_id: Set(Some(created_store.id)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let owner = owner_am.insert(txn).await.map_err(ServiceError::from_db_err)?;

    let mut link: store::ActiveModel = created_store.into();
    link.owner_id = Set(Some(owner.id));
    link.updated_at = Set(now);
    let linked_store = link.update(txn).await.map_err(ServiceError::from_db_err)?;

    Ok(ProvisionedStore { store: linked_store, owner })
}

/// Admin-created account: existence check plus a single insert, no
/// transaction needed.
#[instrument(skip(db, input), fields(email = %input.email, role = input.role.as_str()))]
pub async fn create_standalone_user(
    db: &DatabaseConnection,
    input: &NewAccount,
) -> Result<user::Model, ServiceError> {
    user::validate_name(&input.name)?;
    user::validate_email(&input.email)?;
    user::validate_password(&input.password)?;
    if let Some(addr) = &input.address {
        user::validate_address(addr)?;
    }

    if user::find_by_email(db, &input.email).await?.is_some() {
        return Err(ServiceError::Conflict("user already exists with this email".into()));
    }

    let password_hash = hash_password(&input.password)?;
    let created = user::create(
        db,
        &input.name,
        &input.email,
        &password_hash,
        input.address.as_deref(),
        input.role.as_str(),
        None,
    )
    .await?;
    info!(user_id = %created.id, "user_created");
    Ok(created)
}

/// Delete a store. Its ratings cascade away at the FK; the owning user's
/// back-reference is cleared in the same transaction so no account keeps
/// pointing at a store that no longer exists.
pub async fn delete_store(db: &DatabaseConnection, store_id: Uuid) -> Result<(), ServiceError> {
    store::Entity::find_by_id(store_id)
        .one(db)
        .await
        .map_err(ServiceError::from_db_err)?
        .ok_or_else(|| ServiceError::not_found("store"))?;

    let txn = db.begin().await.map_err(ServiceError::from_db_err)?;

    let result = async {
        user::Entity::update_many()
            .col_expr(user::Column::StoreId, Expr::value(Option::<Uuid>::None))
            .filter(user::Column::StoreId.eq(store_id))
            .exec(&txn)
            .await
            .map_err(ServiceError::from_db_err)?;

        store::Entity::delete_by_id(store_id)
            .exec(&txn)
            .await
            .map_err(ServiceError::from_db_err)?;
        Ok::<(), ServiceError>(())
    }
    .await;

    match result {
        Ok(()) => {
            txn.commit().await.map_err(ServiceError::from_db_err)?;
            info!(%store_id, "store_deleted");
            Ok(())
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "rollback failed after store deletion error");
            }
            Err(e)
        }
    }
}

/// Delete a user. Their ratings cascade away; any store they owned stays,
/// with `owner_id` cleared by the FK.
pub async fn delete_user(db: &DatabaseConnection, user_id: Uuid) -> Result<(), ServiceError> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(ServiceError::from_db_err)?
        .ok_or_else(|| ServiceError::not_found("user"))?;

    user::hard_delete(db, user_id).await?;
    info!(%user_id, "user_deleted");
    Ok(())
}
