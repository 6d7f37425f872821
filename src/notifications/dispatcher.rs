//! Event fan-out for comment activity.
//!
//! The original design reacted to comment events with signal handlers;
//! here the posting and moving routes call these functions directly after
//! their own writes commit. Counter maintenance uses atomic column
//! expressions so concurrent requests cannot lose an increment.

use crate::db::get_db_pool;
use crate::orm::{topics, users};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{entity::*, query::*, sea_query::Expr};

static MENTION_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"@([a-zA-Z0-9_-]+)").unwrap());

/// A comment landed in a topic: bump the denormalized comment count,
/// refresh the activity timestamp, reset subscribers to unread, and
/// notify anyone @named in the body.
pub async fn comment_posted(
    comment: &crate::orm::comments::Model,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = get_db_pool();

    topics::Entity::update_many()
        .col_expr(
            topics::Column::CommentCount,
            Expr::col(topics::Column::CommentCount).add(1),
        )
        .col_expr(
            topics::Column::LastActive,
            Expr::value(chrono::Utc::now().naive_utc()),
        )
        .filter(topics::Column::Id.eq(comment.topic_id))
        .exec(db)
        .await?;

    super::notify_new_comment(comment).await?;

    let mentioned = find_mentioned_users(&comment.content, comment.user_id).await?;
    super::notify_new_mentions(comment, &mentioned).await?;

    Ok(())
}

/// Comments were moved between topics: shrink the source topic's count by
/// the number moved and grow the target's. The source is floored at zero
/// in SQL since the counter is denormalized and may already be stale.
pub async fn comments_moved(
    topic_from_id: i32,
    topic_to_id: i32,
    moved: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if moved == 0 {
        return Ok(());
    }

    let db = get_db_pool();

    topics::Entity::update_many()
        .col_expr(
            topics::Column::CommentCount,
            Expr::cust(&format!("GREATEST(comment_count - {}, 0)", moved)),
        )
        .filter(topics::Column::Id.eq(topic_from_id))
        .exec(db)
        .await?;

    topics::Entity::update_many()
        .col_expr(
            topics::Column::CommentCount,
            Expr::cust(&format!("comment_count + {}", moved)),
        )
        .col_expr(
            topics::Column::LastActive,
            Expr::value(chrono::Utc::now().naive_utc()),
        )
        .filter(topics::Column::Id.eq(topic_to_id))
        .exec(db)
        .await?;

    Ok(())
}

/// Resolve `@username` references in a comment body to user ids. The
/// author is never included, and each user is reported once no matter how
/// often they are named.
pub async fn find_mentioned_users(
    content: &str,
    author_id: i32,
) -> Result<Vec<i32>, sea_orm::DbErr> {
    let db = get_db_pool();

    let mut names: Vec<&str> = MENTION_REGEX
        .captures_iter(content)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str())
        .collect();
    names.sort_unstable();
    names.dedup();

    if names.is_empty() {
        return Ok(Vec::new());
    }

    let found = users::Entity::find()
        .filter(users::Column::Username.is_in(names))
        .all(db)
        .await?;

    Ok(found
        .into_iter()
        .map(|u| u.id)
        .filter(|id| *id != author_id)
        .collect())
}
