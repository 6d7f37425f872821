//! Poll creation, removal, and voting endpoints.

use crate::config::get_config;
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::{comment_polls, comments};
use crate::polls::{self, VoteError};
use actix_web::{error, post, web, Error, HttpResponse, Responder};
use sea_orm::{entity::*, query::*};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(create_poll)
        .service(remove_poll)
        .service(vote_on_poll);
}

async fn get_comment(comment_id: i32) -> Result<comments::Model, Error> {
    comments::Entity::find_by_id(comment_id)
        .filter(comments::Column::IsRemoved.eq(false))
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Comment not found."))
}

#[derive(Deserialize, Validate)]
pub struct NewPollFormData {
    pub csrf_token: String,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters."))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters."))]
    pub title: String,
    #[validate(range(min = 1, message = "At least one choice must be selectable."))]
    pub choice_min: i32,
    #[validate(range(min = 1, message = "At least one choice must be selectable."))]
    pub choice_max: i32,
    pub close_at: Option<chrono::NaiveDateTime>,
    /// One choice per line.
    pub choices: String,
}

#[post("/comments/{comment_id}/poll")]
pub async fn create_poll(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<NewPollFormData>,
) -> Result<impl Responder, Error> {
    crate::middleware::csrf::validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    if !get_config().polls_enabled() {
        return Err(error::ErrorForbidden("Polls are disabled."));
    }

    form.validate()
        .map_err(|e| error::ErrorBadRequest(e.to_string()))?;

    let comment = get_comment(path.into_inner()).await?;
    if comment.user_id != user_id {
        return Err(error::ErrorForbidden(
            "Only the comment author can attach a poll.",
        ));
    }

    let choices: Vec<String> = form
        .choices
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();

    if choices.len() < 2 {
        return Err(error::ErrorBadRequest("A poll needs at least two choices."));
    }
    if form.choice_min > form.choice_max {
        return Err(error::ErrorBadRequest(
            "Minimum selection cannot exceed the maximum.",
        ));
    }
    if form.choice_max as usize > choices.len() {
        return Err(error::ErrorBadRequest(
            "Maximum selection cannot exceed the number of choices.",
        ));
    }

    polls::create_poll(
        comment.id,
        &form.name,
        &form.title,
        form.choice_min,
        form.choice_max,
        form.close_at,
        &choices,
    )
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Found()
        .append_header(("Location", format!("/topics/{}", comment.topic_id)))
        .finish())
}

#[derive(Deserialize)]
pub struct RemovePollFormData {
    pub csrf_token: String,
}

#[post("/polls/{poll_id}/remove")]
pub async fn remove_poll(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<RemovePollFormData>,
) -> Result<impl Responder, Error> {
    crate::middleware::csrf::validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    let poll = comment_polls::Entity::find_by_id(path.into_inner())
        .filter(comment_polls::Column::IsRemoved.eq(false))
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Poll not found."))?;

    let comment = get_comment(poll.comment_id).await?;
    if comment.user_id != user_id {
        return Err(error::ErrorForbidden(
            "Only the comment author can remove this poll.",
        ));
    }

    polls::remove_poll(poll.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Found()
        .append_header(("Location", format!("/topics/{}", comment.topic_id)))
        .finish())
}

#[derive(Deserialize)]
pub struct VoteFormData {
    pub csrf_token: String,
    #[serde(default)]
    pub choice_ids: Vec<i32>,
}

#[post("/polls/{poll_id}/vote")]
pub async fn vote_on_poll(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<VoteFormData>,
) -> Result<impl Responder, Error> {
    crate::middleware::csrf::validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    if !get_config().polls_enabled() {
        return Err(error::ErrorForbidden("Polls are disabled."));
    }

    let poll_id = path.into_inner();

    polls::cast_votes(user_id, poll_id, &form.choice_ids)
        .await
        .map_err(|e| match e {
            VoteError::PollNotFound => error::ErrorNotFound(e.to_string()),
            VoteError::PollClosed => error::ErrorForbidden(e.to_string()),
            VoteError::TooFewChoices(_)
            | VoteError::TooManyChoices(_)
            | VoteError::InvalidChoice => error::ErrorBadRequest(e.to_string()),
            VoteError::Db(db_err) => error::ErrorInternalServerError(db_err),
        })?;

    // Votes land back on the topic page.
    let poll = comment_polls::Entity::find_by_id(poll_id)
        .one(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Poll not found."))?;
    let comment = get_comment(poll.comment_id).await?;

    Ok(HttpResponse::Found()
        .append_header(("Location", format!("/topics/{}", comment.topic_id)))
        .finish())
}
