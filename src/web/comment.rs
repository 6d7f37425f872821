//! Comment posting and moving.

use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::notifications::dispatcher;
use crate::orm::comments;
use actix_web::{error, post, web, Error, HttpResponse, Responder};
use chrono::Utc;
use sea_orm::{entity::*, query::*, Set};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(create_comment).service(move_comments);
}

#[derive(Deserialize, Validate)]
pub struct NewCommentFormData {
    pub csrf_token: String,
    #[validate(length(min = 1, max = 65535, message = "Content must be 1-65535 characters."))]
    pub content: String,
}

#[post("/topics/{topic_id}/comments")]
pub async fn create_comment(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<NewCommentFormData>,
) -> Result<impl Responder, Error> {
    crate::middleware::csrf::validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    form.validate()
        .map_err(|e| error::ErrorBadRequest(e.to_string()))?;

    let topic_id = path.into_inner();
    let (topic, _) = super::topic::get_topic_for_viewer(topic_id, Some(user_id))
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Topic not found."))?;

    let db = get_db_pool();
    let comment = comments::ActiveModel {
        topic_id: Set(topic.id),
        user_id: Set(user_id),
        content: Set(form.content.clone()),
        is_removed: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    let comment = comment
        .insert(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    // Counter bump, subscriber unread flips, and mention notifications.
    if let Err(e) = dispatcher::comment_posted(&comment).await {
        log::error!("create_comment dispatcher: {}", e);
    }

    Ok(HttpResponse::Found()
        .append_header((
            "Location",
            format!("/topics/{}#comment-{}", topic.id, comment.id),
        ))
        .finish())
}

#[derive(Deserialize)]
pub struct MoveCommentsFormData {
    pub csrf_token: String,
    pub target_topic_id: i32,
    #[serde(default)]
    pub comment_ids: Vec<i32>,
}

/// Move comments from one topic to another. Only the source topic's owner
/// may do this, and only comments that actually live in the source move.
#[post("/topics/{topic_id}/move-comments")]
pub async fn move_comments(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<MoveCommentsFormData>,
) -> Result<impl Responder, Error> {
    crate::middleware::csrf::validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    let topic_id = path.into_inner();
    let (topic, _) = super::topic::get_topic_for_viewer(topic_id, Some(user_id))
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Topic not found."))?;

    if topic.user_id != user_id {
        return Err(error::ErrorForbidden("You do not own this topic."));
    }

    let (target, _) = super::topic::get_topic_for_viewer(form.target_topic_id, Some(user_id))
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Target topic not found."))?;

    if target.id == topic.id {
        return Err(error::ErrorBadRequest("Cannot move comments onto themselves."));
    }
    if form.comment_ids.is_empty() {
        return Err(error::ErrorBadRequest("No comments selected."));
    }

    let db = get_db_pool();

    // Restrict to comments that really belong to the source topic.
    let moving = comments::Entity::find()
        .filter(comments::Column::TopicId.eq(topic.id))
        .filter(comments::Column::Id.is_in(form.comment_ids.clone()))
        .all(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if moving.is_empty() {
        return Err(error::ErrorBadRequest("No comments selected."));
    }

    let moving_ids: Vec<i32> = moving.iter().map(|c| c.id).collect();
    comments::Entity::update_many()
        .col_expr(
            comments::Column::TopicId,
            sea_orm::sea_query::Expr::value(target.id),
        )
        .filter(comments::Column::Id.is_in(moving_ids))
        .exec(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if let Err(e) = dispatcher::comments_moved(topic.id, target.id, moving.len()).await {
        log::error!("move_comments dispatcher: {}", e);
    }

    Ok(HttpResponse::Found()
        .append_header(("Location", format!("/topics/{}", target.id)))
        .finish())
}
