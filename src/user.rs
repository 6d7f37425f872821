//! User profile data as routes and templates consume it.

use crate::orm::users;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};

/// The slice of a user row that templates and the client context need.
#[derive(Clone, Debug, FromQueryResult)]
pub struct Profile {
    pub id: i32,
    pub name: String,
}

impl Profile {
    pub async fn get_by_id(db: &DatabaseConnection, id: i32) -> Result<Option<Profile>, DbErr> {
        users::Entity::find_by_id(id)
            .select_only()
            .column(users::Column::Id)
            .column_as(users::Column::Username, "name")
            .into_model::<Profile>()
            .one(db)
            .await
    }

    pub async fn get_by_name(
        db: &DatabaseConnection,
        name: &str,
    ) -> Result<Option<Profile>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Username.eq(name))
            .select_only()
            .column(users::Column::Id)
            .column_as(users::Column::Username, "name")
            .into_model::<Profile>()
            .one(db)
            .await
    }
}
