use sea_orm::{entity::prelude::*, DatabaseConnection, QueryFilter, ColumnTrait};
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::store;
use crate::user;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rating")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_id: Uuid,
    pub value: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
    Store,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity).from(Column::UserId).to(user::Column::Id).into(),
            Relation::Store => Entity::belongs_to(store::Entity).from(Column::StoreId).to(store::Column::Id).into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl Related<store::Entity> for Entity {
    fn to() -> RelationDef { Relation::Store.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_value(value: i32) -> Result<(), errors::ModelError> {
    if !(1..=5).contains(&value) {
        return Err(errors::ModelError::Validation("rating must be between 1 and 5".into()));
    }
    Ok(())
}

/// The row for one (user, store) pair, if any. At most one exists; the
/// composite unique index enforces it.
pub async fn find_by_user_and_store(
    db: &DatabaseConnection,
    user_id: Uuid,
    store_id: Uuid,
) -> Result<Option<Model>, errors::ModelError> {
    Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::StoreId.eq(store_id))
        .one(db)
        .await
        .map_err(|e| errors::ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use chrono::Utc;

    #[test]
    fn construct_model() {
        let m = Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            value: 4,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        };
        assert_eq!(m.value, 4);
    }

    #[test]
    fn value_bounds() {
        assert!(validate_value(0).is_err());
        assert!(validate_value(1).is_ok());
        assert!(validate_value(5).is_ok());
        assert!(validate_value(6).is_err());
    }
}
