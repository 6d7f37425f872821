//! Topic notification records.
//!
//! One row tracks one user's relationship to one topic: whether they are
//! subscribed (`is_active`), whether they have seen the latest activity
//! (`is_read`), and which comment last touched the row. The operations
//! here keep the one-row-per-(user, topic) invariant through
//! create-if-missing semantics; nothing ever hard-deletes a row.

pub mod dispatcher;
pub mod types;

use crate::db::get_db_pool;
use crate::orm::{comments, topic_notifications, topics, topics_private};
use chrono::Utc;
use sea_orm::{entity::*, query::*, sea_query::Expr, DbBackend, DbErr, FromQueryResult, Set, Statement};

pub use types::NotificationAction;

/// Joined notification row as the list views and the AJAX endpoint
/// consume it. `username` is the author of the triggering comment.
#[derive(Debug, FromQueryResult)]
pub struct NotificationForTemplate {
    pub id: i32,
    pub action: String,
    pub is_read: bool,
    pub date: chrono::NaiveDateTime,
    pub topic_id: i32,
    pub topic_title: String,
    pub comment_id: Option<i32>,
    pub username: Option<String>,
}

impl NotificationForTemplate {
    /// Anchor URL of the comment that raised this notification.
    pub fn url(&self) -> String {
        match self.comment_id {
            Some(comment_id) => format!("/topics/{}#comment-{}", self.topic_id, comment_id),
            None => format!("/topics/{}", self.topic_id),
        }
    }
}

#[derive(FromQueryResult)]
struct CountRow {
    cnt: i64,
}

/// Joins and conditions shared by every listing and count query. A
/// notification is visible when the user may still reach its topic:
/// neither the topic, its category, nor the category's parent is removed,
/// and private topics carry an access grant for the viewer. Bare
/// subscription rows that no comment has touched yet are skipped.
const VISIBLE_SQL: &str = r#"
    FROM topic_notifications n
    INNER JOIN topics t ON t.id = n.topic_id
    INNER JOIN categories c ON c.id = t.category_id
    LEFT JOIN categories cp ON cp.id = c.parent_id
    LEFT JOIN comments cm ON cm.id = n.comment_id
    LEFT JOIN users cu ON cu.id = cm.user_id
    WHERE n.user_id = $1
      AND n.is_active = TRUE
      AND n.comment_id IS NOT NULL
      AND t.is_removed = FALSE
      AND c.is_removed = FALSE
      AND COALESCE(cp.is_removed, FALSE) = FALSE
      AND (t.is_private = FALSE
           OR EXISTS (SELECT 1 FROM topics_private tp
                      WHERE tp.topic_id = t.id AND tp.user_id = $1))
"#;

const SELECT_SQL: &str = r#"
    SELECT n.id, n.action, n.is_read, n.date,
           t.id AS topic_id, t.title AS topic_title,
           n.comment_id, cu.username AS username
"#;

/// Subscribe a user to a topic unless a record already exists. The new
/// record starts read, so the subscriber is not nagged about activity
/// that predates their subscription. An existing record is left exactly
/// as it is, inactive or not.
pub async fn create_maybe(user_id: i32, topic_id: i32) -> Result<(), DbErr> {
    let db = get_db_pool();

    let existing = topic_notifications::Entity::find()
        .filter(topic_notifications::Column::UserId.eq(user_id))
        .filter(topic_notifications::Column::TopicId.eq(topic_id))
        .one(db)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let notification = topic_notifications::ActiveModel {
        user_id: Set(user_id),
        topic_id: Set(topic_id),
        comment_id: Set(None),
        action: Set(NotificationAction::Comment.as_str().to_string()),
        is_active: Set(true),
        is_read: Set(true),
        date: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    notification.insert(db).await?;

    Ok(())
}

/// Mark a user's notification for a topic as read.
pub async fn mark_as_read(user_id: i32, topic_id: i32) -> Result<(), DbErr> {
    let db = get_db_pool();

    topic_notifications::Entity::update_many()
        .col_expr(topic_notifications::Column::IsRead, Expr::value(true))
        .filter(topic_notifications::Column::UserId.eq(user_id))
        .filter(topic_notifications::Column::TopicId.eq(topic_id))
        .exec(db)
        .await?;

    Ok(())
}

/// A new comment was posted: flip every active subscriber of the topic
/// back to unread, except the comment's author. Inactive rows stay put.
pub async fn notify_new_comment(comment: &comments::Model) -> Result<(), DbErr> {
    let db = get_db_pool();

    topic_notifications::Entity::update_many()
        .col_expr(
            topic_notifications::Column::CommentId,
            Expr::value(Some(comment.id)),
        )
        .col_expr(
            topic_notifications::Column::Action,
            Expr::value(NotificationAction::Comment.as_str()),
        )
        .col_expr(topic_notifications::Column::IsRead, Expr::value(false))
        .col_expr(
            topic_notifications::Column::Date,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(topic_notifications::Column::TopicId.eq(comment.topic_id))
        .filter(topic_notifications::Column::IsActive.eq(true))
        .filter(topic_notifications::Column::UserId.ne(comment.user_id))
        .exec(db)
        .await?;

    Ok(())
}

/// Users were @named in a comment: their rows go unread with the mention
/// action, whether or not they subscribe to the topic. Users without a
/// row get one, unsubscribed, so the mention alone does not opt them into
/// future comment notifications.
pub async fn notify_new_mentions(
    comment: &comments::Model,
    mentioned_user_ids: &[i32],
) -> Result<(), DbErr> {
    if mentioned_user_ids.is_empty() {
        return Ok(());
    }

    let db = get_db_pool();

    let existing: Vec<i32> = topic_notifications::Entity::find()
        .filter(topic_notifications::Column::TopicId.eq(comment.topic_id))
        .filter(topic_notifications::Column::UserId.is_in(mentioned_user_ids.to_vec()))
        .all(db)
        .await?
        .into_iter()
        .map(|n| n.user_id)
        .collect();

    topic_notifications::Entity::update_many()
        .col_expr(
            topic_notifications::Column::CommentId,
            Expr::value(Some(comment.id)),
        )
        .col_expr(
            topic_notifications::Column::Action,
            Expr::value(NotificationAction::Mention.as_str()),
        )
        .col_expr(topic_notifications::Column::IsRead, Expr::value(false))
        .col_expr(
            topic_notifications::Column::Date,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(topic_notifications::Column::TopicId.eq(comment.topic_id))
        .filter(topic_notifications::Column::UserId.is_in(mentioned_user_ids.to_vec()))
        .exec(db)
        .await?;

    for user_id in mentioned_user_ids {
        if existing.contains(user_id) {
            continue;
        }
        let notification = topic_notifications::ActiveModel {
            user_id: Set(*user_id),
            topic_id: Set(comment.topic_id),
            comment_id: Set(Some(comment.id)),
            action: Set(NotificationAction::Mention.as_str().to_string()),
            is_active: Set(false),
            is_read: Set(false),
            date: Set(Utc::now().naive_utc()),
            ..Default::default()
        };
        notification.insert(db).await?;
    }

    Ok(())
}

/// A private topic was created with invitees: seed an unread notification
/// for every grantee except the topic owner, pointing at the opening
/// comment.
pub async fn notify_private_topic_users(
    grants: &[topics_private::Model],
    comment: &comments::Model,
) -> Result<(), DbErr> {
    let db = get_db_pool();

    let topic = topics::Entity::find_by_id(comment.topic_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::Custom("notify_private_topic_users: topic is gone".to_string()))?;

    for grant in grants {
        if grant.user_id == topic.user_id {
            continue;
        }
        let notification = topic_notifications::ActiveModel {
            user_id: Set(grant.user_id),
            topic_id: Set(grant.topic_id),
            comment_id: Set(Some(comment.id)),
            action: Set(NotificationAction::Comment.as_str().to_string()),
            is_active: Set(true),
            is_read: Set(false),
            date: Set(Utc::now().naive_utc()),
            ..Default::default()
        };
        notification.insert(db).await?;
    }

    Ok(())
}

/// A user was granted access to a private topic: give them an unread
/// notification pointing at the topic's latest comment so the grant shows
/// up in their list. Granting the same access twice does nothing.
pub async fn notify_access_granted(user_id: i32, topic_id: i32) -> Result<(), DbErr> {
    let db = get_db_pool();

    let existing = topic_notifications::Entity::find()
        .filter(topic_notifications::Column::UserId.eq(user_id))
        .filter(topic_notifications::Column::TopicId.eq(topic_id))
        .one(db)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let last_comment = comments::Entity::find()
        .filter(comments::Column::TopicId.eq(topic_id))
        .order_by_desc(comments::Column::Id)
        .one(db)
        .await?;

    let notification = topic_notifications::ActiveModel {
        user_id: Set(user_id),
        topic_id: Set(topic_id),
        comment_id: Set(last_comment.map(|c| c.id)),
        action: Set(NotificationAction::Comment.as_str().to_string()),
        is_active: Set(true),
        is_read: Set(false),
        date: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    notification.insert(db).await?;

    Ok(())
}

/// Access-filtered unread count; drives the navbar badge.
pub async fn count_unread(user_id: i32) -> Result<i64, DbErr> {
    let db = get_db_pool();

    let sql = format!(
        "SELECT COUNT(*) AS cnt {} AND n.is_read = FALSE",
        VISIBLE_SQL
    );
    let row = CountRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        &sql,
        [user_id.into()],
    ))
    .one(db)
    .await?;

    Ok(row.map(|r| r.cnt).unwrap_or(0))
}

/// One page of a user's notifications, unread first and newest within
/// each group, plus the total for the paginator.
pub async fn list_for_user(
    user_id: i32,
    page: i64,
    per_page: i64,
) -> Result<(Vec<NotificationForTemplate>, i64), DbErr> {
    let db = get_db_pool();

    let offset = (page.max(1) - 1) * per_page;
    let sql = format!(
        "{} {} ORDER BY n.is_read ASC, n.date DESC LIMIT $2 OFFSET $3",
        SELECT_SQL, VISIBLE_SQL
    );
    let rows = NotificationForTemplate::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        &sql,
        [user_id.into(), per_page.into(), offset.into()],
    ))
    .all(db)
    .await?;

    let count_sql = format!("SELECT COUNT(*) AS cnt {}", VISIBLE_SQL);
    let total = CountRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        &count_sql,
        [user_id.into()],
    ))
    .one(db)
    .await?
    .map(|r| r.cnt)
    .unwrap_or(0);

    Ok((rows, total))
}

/// Unread notifications only, cursor-paginated: pass the last id of the
/// previous page to get the next one.
pub async fn list_unread(
    user_id: i32,
    before_id: Option<i32>,
    per_page: i64,
) -> Result<Vec<NotificationForTemplate>, DbErr> {
    let db = get_db_pool();

    let stmt = match before_id {
        Some(before_id) => {
            let sql = format!(
                "{} {} AND n.is_read = FALSE AND n.id < $2 ORDER BY n.id DESC LIMIT $3",
                SELECT_SQL, VISIBLE_SQL
            );
            Statement::from_sql_and_values(
                DbBackend::Postgres,
                &sql,
                [user_id.into(), before_id.into(), per_page.into()],
            )
        }
        None => {
            let sql = format!(
                "{} {} AND n.is_read = FALSE ORDER BY n.id DESC LIMIT $2",
                SELECT_SQL, VISIBLE_SQL
            );
            Statement::from_sql_and_values(
                DbBackend::Postgres,
                &sql,
                [user_id.into(), per_page.into()],
            )
        }
    };

    NotificationForTemplate::find_by_statement(stmt).all(db).await
}

/// The freshest notifications for the AJAX dropdown, unread first.
pub async fn list_recent(
    user_id: i32,
    limit: i64,
) -> Result<Vec<NotificationForTemplate>, DbErr> {
    let db = get_db_pool();

    let sql = format!(
        "{} {} ORDER BY n.is_read ASC, n.date DESC LIMIT $2",
        SELECT_SQL, VISIBLE_SQL
    );
    NotificationForTemplate::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        &sql,
        [user_id.into(), limit.into()],
    ))
    .all(db)
    .await
}

/// Look up a notification by id for its owner. Returns None for other
/// users' rows so ownership mismatches read as missing records.
pub async fn get_for_owner(
    notification_id: i32,
    user_id: i32,
) -> Result<Option<topic_notifications::Model>, DbErr> {
    let db = get_db_pool();

    topic_notifications::Entity::find_by_id(notification_id)
        .filter(topic_notifications::Column::UserId.eq(user_id))
        .one(db)
        .await
}

/// Find the notification a user holds for a topic, if any.
pub async fn get_for_topic(
    user_id: i32,
    topic_id: i32,
) -> Result<Option<topic_notifications::Model>, DbErr> {
    let db = get_db_pool();

    topic_notifications::Entity::find()
        .filter(topic_notifications::Column::UserId.eq(user_id))
        .filter(topic_notifications::Column::TopicId.eq(topic_id))
        .one(db)
        .await
}

/// Toggle the subscription flag on an existing notification.
pub async fn set_active(notification_id: i32, is_active: bool) -> Result<(), DbErr> {
    let db = get_db_pool();

    topic_notifications::Entity::update_many()
        .col_expr(topic_notifications::Column::IsActive, Expr::value(is_active))
        .filter(topic_notifications::Column::Id.eq(notification_id))
        .exec(db)
        .await?;

    Ok(())
}
