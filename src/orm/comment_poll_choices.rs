//! SeaORM Entity for comment_poll_choices table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "comment_poll_choices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub poll_id: i32,
    pub number: i32,
    pub description: String,
    /// Denormalized. Adjusted atomically inside the voting transaction.
    pub vote_count: i32,
    pub is_removed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::comment_polls::Entity",
        from = "Column::PollId",
        to = "super::comment_polls::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Poll,
    #[sea_orm(has_many = "super::comment_poll_votes::Entity")]
    CommentPollVotes,
}

impl Related<super::comment_polls::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl Related<super::comment_poll_votes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommentPollVotes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
