//! SeaORM Entity for comment_polls table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "comment_polls")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub comment_id: i32,
    pub name: String,
    pub title: String,
    pub choice_min: i32,
    pub choice_max: i32,
    pub close_at: Option<DateTime>,
    pub is_removed: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::comments::Entity",
        from = "Column::CommentId",
        to = "super::comments::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Comment,
    #[sea_orm(has_many = "super::comment_poll_choices::Entity")]
    CommentPollChoices,
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl Related<super::comment_poll_choices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommentPollChoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
