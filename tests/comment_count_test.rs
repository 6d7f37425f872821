/// Integration tests for the denormalized topic comment counter
/// Tests atomic increment on post, decrement on move, and the zero floor
mod common;
use serial_test::serial;

use common::*;
use kindling::notifications::dispatcher;
use kindling::orm::{topic_notifications, topics};
use sea_orm::{entity::*, query::*};

async fn get_topic(db: &sea_orm::DatabaseConnection, topic_id: i32) -> topics::Model {
    topics::Entity::find_by_id(topic_id)
        .one(db)
        .await
        .expect("Failed to query topic")
        .expect("Topic should exist")
}

#[actix_rt::test]
#[serial]
async fn test_comment_posted_increments_count() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = create_test_user(&db, "alice").await.expect("user");
    let category = create_test_category(&db).await.expect("category");
    let topic = create_test_topic(&db, category.id, user.id)
        .await
        .expect("topic");
    let before = get_topic(&db, topic.id).await;

    let comment = create_test_comment(&db, topic.id, user.id)
        .await
        .expect("comment");
    dispatcher::comment_posted(&comment)
        .await
        .expect("comment_posted");

    let after = get_topic(&db, topic.id).await;
    assert_eq!(after.comment_count, 1);
    assert!(after.last_active >= before.last_active);

    let comment = create_test_comment(&db, topic.id, user.id)
        .await
        .expect("comment");
    dispatcher::comment_posted(&comment)
        .await
        .expect("comment_posted");

    assert_eq!(get_topic(&db, topic.id).await.comment_count, 2);
}

#[actix_rt::test]
#[serial]
async fn test_comment_posted_notifies_subscribers_and_mentions() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let author = create_test_user(&db, "author").await.expect("user");
    let subscriber = create_test_user(&db, "subscriber").await.expect("user");
    let mentioned = create_test_user(&db, "mentioned").await.expect("user");
    let category = create_test_category(&db).await.expect("category");
    let topic = create_test_topic(&db, category.id, author.id)
        .await
        .expect("topic");

    create_test_notification(&db, subscriber.id, topic.id, None, true, true)
        .await
        .expect("subscription");

    let comment =
        create_test_comment_with(&db, topic.id, author.id, "ping @mentioned about this")
            .await
            .expect("comment");
    dispatcher::comment_posted(&comment)
        .await
        .expect("comment_posted");

    let sub_row = topic_notifications::Entity::find()
        .filter(topic_notifications::Column::UserId.eq(subscriber.id))
        .one(&db)
        .await
        .expect("query")
        .expect("subscriber row");
    assert!(!sub_row.is_read);
    assert_eq!(sub_row.action, "comment");

    let mention_row = topic_notifications::Entity::find()
        .filter(topic_notifications::Column::UserId.eq(mentioned.id))
        .one(&db)
        .await
        .expect("query")
        .expect("mention row");
    assert!(!mention_row.is_read);
    assert_eq!(mention_row.action, "mention");
}

#[actix_rt::test]
#[serial]
async fn test_comments_moved_shifts_counts() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = create_test_user(&db, "alice").await.expect("user");
    let category = create_test_category(&db).await.expect("category");
    let source = create_test_topic(&db, category.id, user.id)
        .await
        .expect("topic");
    let target = create_test_topic(&db, category.id, user.id)
        .await
        .expect("topic");

    for _ in 0..3 {
        let comment = create_test_comment(&db, source.id, user.id)
            .await
            .expect("comment");
        dispatcher::comment_posted(&comment)
            .await
            .expect("comment_posted");
    }
    assert_eq!(get_topic(&db, source.id).await.comment_count, 3);

    dispatcher::comments_moved(source.id, target.id, 2)
        .await
        .expect("comments_moved");

    assert_eq!(get_topic(&db, source.id).await.comment_count, 1);
    assert_eq!(get_topic(&db, target.id).await.comment_count, 2);
}

#[actix_rt::test]
#[serial]
async fn test_comments_moved_floors_at_zero() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let user = create_test_user(&db, "alice").await.expect("user");
    let category = create_test_category(&db).await.expect("category");
    let source = create_test_topic(&db, category.id, user.id)
        .await
        .expect("topic");
    let target = create_test_topic(&db, category.id, user.id)
        .await
        .expect("topic");

    let comment = create_test_comment(&db, source.id, user.id)
        .await
        .expect("comment");
    dispatcher::comment_posted(&comment)
        .await
        .expect("comment_posted");

    // A stale counter must clamp, never go negative.
    dispatcher::comments_moved(source.id, target.id, 5)
        .await
        .expect("comments_moved");

    assert_eq!(get_topic(&db, source.id).await.comment_count, 0);
    assert_eq!(get_topic(&db, target.id).await.comment_count, 5);
}

#[actix_rt::test]
#[serial]
async fn test_mention_scanner_dedupes_and_skips_author() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let author = create_test_user(&db, "carol").await.expect("user");
    let alice = create_test_user(&db, "alice").await.expect("user");
    let bob = create_test_user(&db, "bob").await.expect("user");

    let mentioned = dispatcher::find_mentioned_users(
        "hey @alice and @bob, also @alice again and @ghost who does not exist",
        author.id,
    )
    .await
    .expect("find_mentioned_users");

    let mut mentioned = mentioned;
    mentioned.sort_unstable();
    let mut expected = vec![alice.id, bob.id];
    expected.sort_unstable();
    assert_eq!(mentioned, expected);

    let self_mention = dispatcher::find_mentioned_users("talking about @carol", author.id)
        .await
        .expect("find_mentioned_users");
    assert!(self_mention.is_empty(), "authors never mention themselves");
}
