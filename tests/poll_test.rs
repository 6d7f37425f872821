/// Integration tests for comment polls
/// Tests query helpers, poll creation, soft removal, and the voting
/// transaction with its counter maintenance
mod common;
use serial_test::serial;

use common::*;
use kindling::orm::{comment_poll_votes, comment_polls};
use kindling::polls::{self, VoteError};
use sea_orm::{entity::*, query::*};

async fn setup_comment(
    db: &sea_orm::DatabaseConnection,
) -> (kindling::orm::users::Model, kindling::orm::comments::Model) {
    let user = create_test_user(db, "alice").await.expect("user");
    let category = create_test_category(db).await.expect("category");
    let topic = create_test_topic(db, category.id, user.id)
        .await
        .expect("topic");
    let comment = create_test_comment(db, topic.id, user.id)
        .await
        .expect("comment");
    (user, comment)
}

#[actix_rt::test]
#[serial]
async fn test_polls_for_comment_filters_removed() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let (_, comment) = setup_comment(&db).await;

    let keep = polls::create_poll(
        comment.id,
        "lunch",
        "Where do we eat?",
        1,
        1,
        None,
        &["Here".to_string(), "There".to_string()],
    )
    .await
    .expect("poll");
    let gone = polls::create_poll(
        comment.id,
        "dinner",
        "And dinner?",
        1,
        1,
        None,
        &["Home".to_string(), "Out".to_string()],
    )
    .await
    .expect("poll");

    polls::remove_poll(gone.id).await.expect("remove_poll");

    let live = polls::polls_for_comment(comment.id).await.expect("live");
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, keep.id);

    let removed = polls::removed_polls_for_comment(comment.id)
        .await
        .expect("removed");
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id, gone.id);
}

#[actix_rt::test]
#[serial]
async fn test_create_poll_numbers_choices() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let (_, comment) = setup_comment(&db).await;

    let poll = polls::create_poll(
        comment.id,
        "colors",
        "Favorite color?",
        1,
        2,
        None,
        &["Red".to_string(), "Green".to_string(), "Blue".to_string()],
    )
    .await
    .expect("poll");

    let choices = polls::choices_for_poll(poll.id).await.expect("choices");
    assert_eq!(choices.len(), 3);
    for (i, choice) in choices.iter().enumerate() {
        assert_eq!(choice.number, i as i32 + 1);
        assert_eq!(choice.vote_count, 0);
    }

    let via_comment = polls::choices_for_comment(comment.id)
        .await
        .expect("choices_for_comment");
    assert_eq!(via_comment.len(), 3);
}

#[actix_rt::test]
#[serial]
async fn test_cast_votes_counts_and_revote() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let (_, comment) = setup_comment(&db).await;
    let voter = create_test_user(&db, "bob").await.expect("user");

    let poll = polls::create_poll(
        comment.id,
        "colors",
        "Favorite color?",
        1,
        1,
        None,
        &["Red".to_string(), "Green".to_string()],
    )
    .await
    .expect("poll");
    let choices = polls::choices_for_poll(poll.id).await.expect("choices");

    polls::cast_votes(voter.id, poll.id, &[choices[0].id])
        .await
        .expect("vote");

    let after = polls::choices_for_poll(poll.id).await.expect("choices");
    assert_eq!(after[0].vote_count, 1);
    assert_eq!(after[1].vote_count, 0);
    assert_eq!(
        polls::user_vote_choice_ids(poll.id, voter.id)
            .await
            .expect("ballots"),
        vec![choices[0].id]
    );

    // Re-voting moves the ballot and keeps the old one, soft-removed.
    polls::cast_votes(voter.id, poll.id, &[choices[1].id])
        .await
        .expect("revote");

    let after = polls::choices_for_poll(poll.id).await.expect("choices");
    assert_eq!(after[0].vote_count, 0);
    assert_eq!(after[1].vote_count, 1);
    assert_eq!(
        polls::user_vote_choice_ids(poll.id, voter.id)
            .await
            .expect("ballots"),
        vec![choices[1].id]
    );

    let all_ballots = comment_poll_votes::Entity::find()
        .filter(comment_poll_votes::Column::VoterId.eq(voter.id))
        .all(&db)
        .await
        .expect("ballots");
    assert_eq!(all_ballots.len(), 2);
    assert_eq!(all_ballots.iter().filter(|v| v.is_removed).count(), 1);
}

#[actix_rt::test]
#[serial]
async fn test_cast_votes_rejections() {
    let db = setup_test_database()
        .await
        .expect("Failed to connect to test database");
    cleanup_test_data(&db).await.expect("Failed to cleanup");

    let (_, comment) = setup_comment(&db).await;
    let voter = create_test_user(&db, "bob").await.expect("user");

    let poll = polls::create_poll(
        comment.id,
        "colors",
        "Favorite color?",
        1,
        1,
        None,
        &["Red".to_string(), "Green".to_string()],
    )
    .await
    .expect("poll");
    let choices = polls::choices_for_poll(poll.id).await.expect("choices");

    // Empty selection is below choice_min.
    let err = polls::cast_votes(voter.id, poll.id, &[])
        .await
        .expect_err("too few");
    assert!(matches!(err, VoteError::TooFewChoices(1)));

    // Both options exceed choice_max.
    let err = polls::cast_votes(voter.id, poll.id, &[choices[0].id, choices[1].id])
        .await
        .expect_err("too many");
    assert!(matches!(err, VoteError::TooManyChoices(1)));

    // A choice from some other poll is rejected.
    let other_poll = polls::create_poll(
        comment.id,
        "other",
        "Another?",
        1,
        1,
        None,
        &["Yes".to_string(), "No".to_string()],
    )
    .await
    .expect("poll");
    let other_choices = polls::choices_for_poll(other_poll.id).await.expect("choices");
    let err = polls::cast_votes(voter.id, poll.id, &[other_choices[0].id])
        .await
        .expect_err("foreign choice");
    assert!(matches!(err, VoteError::InvalidChoice));

    // Votes on a closed poll bounce.
    let yesterday = chrono::Utc::now().naive_utc() - chrono::Duration::days(1);
    comment_polls::Entity::update_many()
        .col_expr(
            comment_polls::Column::CloseAt,
            sea_orm::sea_query::Expr::value(Some(yesterday)),
        )
        .filter(comment_polls::Column::Id.eq(poll.id))
        .exec(&db)
        .await
        .expect("close poll");

    let err = polls::cast_votes(voter.id, poll.id, &[choices[0].id])
        .await
        .expect_err("closed");
    assert!(matches!(err, VoteError::PollClosed));

    // A removed poll reads as missing.
    polls::remove_poll(other_poll.id).await.expect("remove");
    let err = polls::cast_votes(voter.id, other_poll.id, &[other_choices[0].id])
        .await
        .expect_err("removed");
    assert!(matches!(err, VoteError::PollNotFound));
}
