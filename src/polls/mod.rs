//! Polls attached to comments.
//!
//! A poll owns an ordered set of choices; each choice carries a
//! denormalized vote count. Removal is always soft (`is_removed`), both
//! for polls and for ballots, so re-voting keeps an audit trail.

use crate::db::get_db_pool;
use crate::orm::{comment_poll_choices, comment_poll_votes, comment_polls};
use chrono::Utc;
use sea_orm::{entity::*, query::*, sea_query::Expr, DbErr, Set};
use std::fmt;

/// Live polls attached to a comment.
pub async fn polls_for_comment(comment_id: i32) -> Result<Vec<comment_polls::Model>, DbErr> {
    let db = get_db_pool();

    comment_polls::Entity::find()
        .filter(comment_polls::Column::CommentId.eq(comment_id))
        .filter(comment_polls::Column::IsRemoved.eq(false))
        .order_by_asc(comment_polls::Column::Id)
        .all(db)
        .await
}

/// Soft-removed polls attached to a comment.
pub async fn removed_polls_for_comment(
    comment_id: i32,
) -> Result<Vec<comment_polls::Model>, DbErr> {
    let db = get_db_pool();

    comment_polls::Entity::find()
        .filter(comment_polls::Column::CommentId.eq(comment_id))
        .filter(comment_polls::Column::IsRemoved.eq(true))
        .order_by_asc(comment_polls::Column::Id)
        .all(db)
        .await
}

/// Live choices of a poll, in display order.
pub async fn choices_for_poll(poll_id: i32) -> Result<Vec<comment_poll_choices::Model>, DbErr> {
    let db = get_db_pool();

    comment_poll_choices::Entity::find()
        .filter(comment_poll_choices::Column::PollId.eq(poll_id))
        .filter(comment_poll_choices::Column::IsRemoved.eq(false))
        .order_by_asc(comment_poll_choices::Column::Number)
        .all(db)
        .await
}

/// Live choices across every live poll of a comment.
pub async fn choices_for_comment(
    comment_id: i32,
) -> Result<Vec<comment_poll_choices::Model>, DbErr> {
    let db = get_db_pool();

    let poll_ids: Vec<i32> = polls_for_comment(comment_id)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    if poll_ids.is_empty() {
        return Ok(Vec::new());
    }

    comment_poll_choices::Entity::find()
        .filter(comment_poll_choices::Column::PollId.is_in(poll_ids))
        .filter(comment_poll_choices::Column::IsRemoved.eq(false))
        .order_by_asc(comment_poll_choices::Column::PollId)
        .order_by_asc(comment_poll_choices::Column::Number)
        .all(db)
        .await
}

/// Create a poll and its choices in one transaction. Choices are numbered
/// 1..N in the order given.
pub async fn create_poll(
    comment_id: i32,
    name: &str,
    title: &str,
    choice_min: i32,
    choice_max: i32,
    close_at: Option<chrono::NaiveDateTime>,
    choices: &[String],
) -> Result<comment_polls::Model, DbErr> {
    let db = get_db_pool();
    let txn = db.begin().await?;

    let poll = comment_polls::ActiveModel {
        comment_id: Set(comment_id),
        name: Set(name.to_string()),
        title: Set(title.to_string()),
        choice_min: Set(choice_min),
        choice_max: Set(choice_max),
        close_at: Set(close_at),
        is_removed: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let poll = poll.insert(&txn).await?;

    for (i, description) in choices.iter().enumerate() {
        let choice = comment_poll_choices::ActiveModel {
            poll_id: Set(poll.id),
            number: Set(i as i32 + 1),
            description: Set(description.clone()),
            vote_count: Set(0),
            is_removed: Set(false),
            ..Default::default()
        };
        choice.insert(&txn).await?;
    }

    txn.commit().await?;
    Ok(poll)
}

/// Soft-remove a poll.
pub async fn remove_poll(poll_id: i32) -> Result<(), DbErr> {
    let db = get_db_pool();

    comment_polls::Entity::update_many()
        .col_expr(comment_polls::Column::IsRemoved, Expr::value(true))
        .filter(comment_polls::Column::Id.eq(poll_id))
        .exec(db)
        .await?;

    Ok(())
}

/// Choice ids of a user's live ballots in a poll.
pub async fn user_vote_choice_ids(poll_id: i32, user_id: i32) -> Result<Vec<i32>, DbErr> {
    let db = get_db_pool();

    let choice_ids: Vec<i32> = comment_poll_choices::Entity::find()
        .filter(comment_poll_choices::Column::PollId.eq(poll_id))
        .all(db)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    if choice_ids.is_empty() {
        return Ok(Vec::new());
    }

    let votes = comment_poll_votes::Entity::find()
        .filter(comment_poll_votes::Column::VoterId.eq(user_id))
        .filter(comment_poll_votes::Column::ChoiceId.is_in(choice_ids))
        .filter(comment_poll_votes::Column::IsRemoved.eq(false))
        .all(db)
        .await?;

    Ok(votes.into_iter().map(|v| v.choice_id).collect())
}

#[derive(Debug)]
pub enum VoteError {
    PollNotFound,
    PollClosed,
    TooFewChoices(i32),
    TooManyChoices(i32),
    InvalidChoice,
    Db(DbErr),
}

impl fmt::Display for VoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PollNotFound => write!(f, "Poll not found."),
            Self::PollClosed => write!(f, "This poll is closed."),
            Self::TooFewChoices(min) => {
                write!(f, "Please select at least {} option(s).", min)
            }
            Self::TooManyChoices(max) => {
                write!(f, "You can only select up to {} option(s).", max)
            }
            Self::InvalidChoice => write!(f, "Invalid poll option(s) selected."),
            Self::Db(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for VoteError {}

impl From<DbErr> for VoteError {
    fn from(e: DbErr) -> Self {
        Self::Db(e)
    }
}

/// Record a user's ballot. Prior ballots in the poll are soft-removed and
/// their choices' counts decremented; the new ballots insert and
/// increment, all in one transaction.
pub async fn cast_votes(
    user_id: i32,
    poll_id: i32,
    choice_ids: &[i32],
) -> Result<(), VoteError> {
    let db = get_db_pool();

    let poll = comment_polls::Entity::find_by_id(poll_id)
        .filter(comment_polls::Column::IsRemoved.eq(false))
        .one(db)
        .await?
        .ok_or(VoteError::PollNotFound)?;

    if let Some(close_at) = poll.close_at {
        if close_at < Utc::now().naive_utc() {
            return Err(VoteError::PollClosed);
        }
    }

    if (choice_ids.len() as i32) < poll.choice_min {
        return Err(VoteError::TooFewChoices(poll.choice_min));
    }
    if (choice_ids.len() as i32) > poll.choice_max {
        return Err(VoteError::TooManyChoices(poll.choice_max));
    }

    // Every selected choice must be a live choice of this poll.
    let valid_choices = comment_poll_choices::Entity::find()
        .filter(comment_poll_choices::Column::PollId.eq(poll_id))
        .filter(comment_poll_choices::Column::Id.is_in(choice_ids.to_vec()))
        .filter(comment_poll_choices::Column::IsRemoved.eq(false))
        .all(db)
        .await?;

    if valid_choices.len() != choice_ids.len() {
        return Err(VoteError::InvalidChoice);
    }

    let old_choice_ids = user_vote_choice_ids(poll_id, user_id).await?;

    let txn = db.begin().await?;

    for old_choice_id in &old_choice_ids {
        comment_poll_choices::Entity::update_many()
            .col_expr(
                comment_poll_choices::Column::VoteCount,
                Expr::cust("GREATEST(vote_count - 1, 0)"),
            )
            .filter(comment_poll_choices::Column::Id.eq(*old_choice_id))
            .exec(&txn)
            .await?;
    }

    if !old_choice_ids.is_empty() {
        comment_poll_votes::Entity::update_many()
            .col_expr(comment_poll_votes::Column::IsRemoved, Expr::value(true))
            .filter(comment_poll_votes::Column::VoterId.eq(user_id))
            .filter(comment_poll_votes::Column::ChoiceId.is_in(old_choice_ids.clone()))
            .filter(comment_poll_votes::Column::IsRemoved.eq(false))
            .exec(&txn)
            .await?;
    }

    let now = Utc::now().naive_utc();
    for choice_id in choice_ids {
        let vote = comment_poll_votes::ActiveModel {
            voter_id: Set(user_id),
            choice_id: Set(*choice_id),
            is_removed: Set(false),
            created_at: Set(now),
            ..Default::default()
        };
        comment_poll_votes::Entity::insert(vote).exec(&txn).await?;

        comment_poll_choices::Entity::update_many()
            .col_expr(
                comment_poll_choices::Column::VoteCount,
                Expr::col(comment_poll_choices::Column::VoteCount).add(1),
            )
            .filter(comment_poll_choices::Column::Id.eq(*choice_id))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;
    Ok(())
}
