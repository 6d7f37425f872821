//! Test fixtures for creating test data
#![allow(dead_code)]

use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use chrono::Utc;
use kindling::orm::{categories, comments, topic_notifications, topics, topics_private, users};
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Create a test user with a known password ("password123")
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
) -> Result<users::Model, DbErr> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = kindling::session::get_argon2()
        .hash_password("password123".as_bytes(), &salt)
        .map_err(|e| DbErr::Custom(format!("Password hashing failed: {}", e)))?
        .to_string();

    let user = users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(Some(format!("{}@test.com", username))),
        password: Set(password_hash),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    user.insert(db).await
}

/// Create a category, optionally nested and optionally removed
pub async fn create_test_category_with(
    db: &DatabaseConnection,
    parent_id: Option<i32>,
    is_removed: bool,
) -> Result<categories::Model, DbErr> {
    let category = categories::ActiveModel {
        parent_id: Set(parent_id),
        title: Set("Test Category".to_string()),
        is_removed: Set(is_removed),
        ..Default::default()
    };
    category.insert(db).await
}

pub async fn create_test_category(db: &DatabaseConnection) -> Result<categories::Model, DbErr> {
    create_test_category_with(db, None, false).await
}

/// Create a topic in a category
pub async fn create_test_topic(
    db: &DatabaseConnection,
    category_id: i32,
    user_id: i32,
) -> Result<topics::Model, DbErr> {
    create_test_topic_with(db, category_id, user_id, false, false).await
}

pub async fn create_test_topic_with(
    db: &DatabaseConnection,
    category_id: i32,
    user_id: i32,
    is_private: bool,
    is_removed: bool,
) -> Result<topics::Model, DbErr> {
    let now = Utc::now().naive_utc();
    let topic = topics::ActiveModel {
        user_id: Set(user_id),
        category_id: Set(category_id),
        title: Set("Test Topic".to_string()),
        comment_count: Set(0),
        last_active: Set(now),
        is_private: Set(is_private),
        is_removed: Set(is_removed),
        created_at: Set(now),
        ..Default::default()
    };
    topic.insert(db).await
}

/// Create a private topic owned by the user, with the owner's access grant
pub async fn create_private_topic(
    db: &DatabaseConnection,
    category_id: i32,
    owner_id: i32,
) -> Result<(topics::Model, topics_private::Model), DbErr> {
    let topic = create_test_topic_with(db, category_id, owner_id, true, false).await?;
    let grant = grant_topic_access(db, topic.id, owner_id).await?;
    Ok((topic, grant))
}

/// Grant a user access to a private topic
pub async fn grant_topic_access(
    db: &DatabaseConnection,
    topic_id: i32,
    user_id: i32,
) -> Result<topics_private::Model, DbErr> {
    let grant = topics_private::ActiveModel {
        user_id: Set(user_id),
        topic_id: Set(topic_id),
        created_at: Set(Utc::now().naive_utc()),
    };
    grant.insert(db).await
}

/// Create a comment in a topic
pub async fn create_test_comment(
    db: &DatabaseConnection,
    topic_id: i32,
    user_id: i32,
) -> Result<comments::Model, DbErr> {
    create_test_comment_with(db, topic_id, user_id, "A test comment.").await
}

pub async fn create_test_comment_with(
    db: &DatabaseConnection,
    topic_id: i32,
    user_id: i32,
    content: &str,
) -> Result<comments::Model, DbErr> {
    let comment = comments::ActiveModel {
        topic_id: Set(topic_id),
        user_id: Set(user_id),
        content: Set(content.to_string()),
        is_removed: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    comment.insert(db).await
}

/// Insert a notification row directly, bypassing the module operations
pub async fn create_test_notification(
    db: &DatabaseConnection,
    user_id: i32,
    topic_id: i32,
    comment_id: Option<i32>,
    is_active: bool,
    is_read: bool,
) -> Result<topic_notifications::Model, DbErr> {
    let notification = topic_notifications::ActiveModel {
        user_id: Set(user_id),
        topic_id: Set(topic_id),
        comment_id: Set(comment_id),
        action: Set("comment".to_string()),
        is_active: Set(is_active),
        is_read: Set(is_read),
        date: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    notification.insert(db).await
}
