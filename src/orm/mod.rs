//! SeaORM entities, one module per table.

pub mod categories;
pub mod comment_poll_choices;
pub mod comment_poll_votes;
pub mod comment_polls;
pub mod comments;
pub mod feature_flags;
pub mod settings;
pub mod topic_notifications;
pub mod topics;
pub mod topics_private;
pub mod users;
