//! Topic pages: index of a single topic, topic creation, private-topic
//! access grants.

use crate::config::get_config;
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::notifications;
use crate::orm::{categories, topic_notifications, topics, topics_private};
use crate::template::{page_count, Paginator, PaginatorToHtml};
use crate::user::Profile;
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use chrono::Utc;
use sea_orm::{entity::*, query::*, DbBackend, DbErr, FromQueryResult, Set, Statement};
use serde::Deserialize;
use validator::Validate;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(create_topic)
        .service(grant_access)
        .service(view_topic);
}

/// A comment joined with its author, as the topic page renders it.
#[derive(Debug, FromQueryResult)]
pub struct CommentForTemplate {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub content: String,
    pub created_at: chrono::NaiveDateTime,
}

/// One poll with its choices, as the topic page renders it.
pub struct PollForTemplate {
    pub poll: crate::orm::comment_polls::Model,
    pub choices: Vec<crate::orm::comment_poll_choices::Model>,
    pub user_choice_ids: Vec<i32>,
    pub total_votes: i32,
    pub is_closed: bool,
}

impl PollForTemplate {
    pub fn has_voted(&self) -> bool {
        !self.user_choice_ids.is_empty()
    }

    pub fn user_chose(&self, choice_id: &i32) -> bool {
        self.user_choice_ids.contains(choice_id)
    }
}

/// A comment plus everything hanging off it.
pub struct CommentDisplay {
    pub comment: CommentForTemplate,
    pub polls: Vec<PollForTemplate>,
}

/// Context for the subscribe/unsubscribe widget partial.
pub struct NotificationFormContext {
    pub topic_id: i32,
    pub notification: Option<topic_notifications::Model>,
}

#[derive(Template)]
#[template(path = "topic.html")]
pub struct TopicTemplate {
    pub client: ClientCtx,
    pub topic: topics::Model,
    pub category: categories::Model,
    pub comments: Vec<CommentDisplay>,
    pub paginator: Paginator,
    pub notification_form: NotificationFormContext,
    pub polls_enabled: bool,
    pub is_owner: bool,
}

#[derive(Deserialize)]
pub struct TopicPageQuery {
    pub page: Option<i64>,
}

/// Resolve a topic a user is allowed to see: the topic, its category, and
/// the category's parent must not be removed, and private topics need an
/// access grant. Everything else reads as missing.
pub(crate) async fn get_topic_for_viewer(
    topic_id: i32,
    viewer_id: Option<i32>,
) -> Result<Option<(topics::Model, categories::Model)>, DbErr> {
    let db = get_db_pool();

    let topic = topics::Entity::find_by_id(topic_id)
        .filter(topics::Column::IsRemoved.eq(false))
        .one(db)
        .await?;
    let topic = match topic {
        Some(topic) => topic,
        None => return Ok(None),
    };

    let category = categories::Entity::find_by_id(topic.category_id)
        .filter(categories::Column::IsRemoved.eq(false))
        .one(db)
        .await?;
    let category = match category {
        Some(category) => category,
        None => return Ok(None),
    };

    if let Some(parent_id) = category.parent_id {
        let parent_ok = categories::Entity::find_by_id(parent_id)
            .filter(categories::Column::IsRemoved.eq(false))
            .one(db)
            .await?
            .is_some();
        if !parent_ok {
            return Ok(None);
        }
    }

    if topic.is_private {
        let viewer_id = match viewer_id {
            Some(viewer_id) => viewer_id,
            None => return Ok(None),
        };
        let grant = topics_private::Entity::find()
            .filter(topics_private::Column::UserId.eq(viewer_id))
            .filter(topics_private::Column::TopicId.eq(topic_id))
            .one(db)
            .await?;
        if grant.is_none() {
            return Ok(None);
        }
    }

    Ok(Some((topic, category)))
}

async fn get_comments_page(
    topic_id: i32,
    page: i64,
    per_page: i64,
) -> Result<Vec<CommentForTemplate>, DbErr> {
    let db = get_db_pool();

    let sql = r#"
        SELECT cm.id, cm.user_id, u.username, cm.content, cm.created_at
        FROM comments cm
        INNER JOIN users u ON u.id = cm.user_id
        WHERE cm.topic_id = $1 AND cm.is_removed = FALSE
        ORDER BY cm.id ASC
        LIMIT $2 OFFSET $3
    "#;
    CommentForTemplate::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        sql,
        [
            topic_id.into(),
            per_page.into(),
            ((page.max(1) - 1) * per_page).into(),
        ],
    ))
    .all(db)
    .await
}

async fn build_poll_displays(
    comment_id: i32,
    viewer_id: Option<i32>,
) -> Result<Vec<PollForTemplate>, DbErr> {
    let mut displays = Vec::new();
    for poll in crate::polls::polls_for_comment(comment_id).await? {
        let choices = crate::polls::choices_for_poll(poll.id).await?;
        let user_choice_ids = match viewer_id {
            Some(viewer_id) => crate::polls::user_vote_choice_ids(poll.id, viewer_id).await?,
            None => Vec::new(),
        };
        let total_votes = choices.iter().map(|c| c.vote_count).sum();
        let is_closed = poll
            .close_at
            .map(|t| t < Utc::now().naive_utc())
            .unwrap_or(false);
        displays.push(PollForTemplate {
            poll,
            choices,
            user_choice_ids,
            total_votes,
            is_closed,
        });
    }
    Ok(displays)
}

#[get("/topics/{topic_id}")]
pub async fn view_topic(
    client: ClientCtx,
    path: web::Path<i32>,
    query: web::Query<TopicPageQuery>,
) -> Result<impl Responder, Error> {
    let topic_id = path.into_inner();

    let (topic, category) = get_topic_for_viewer(topic_id, client.get_id())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Topic not found."))?;

    let per_page = get_config().comments_per_page();
    let page = query.page.unwrap_or(1).max(1);

    let comments = get_comments_page(topic_id, page, per_page)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let mut displays = Vec::with_capacity(comments.len());
    for comment in comments {
        let polls = build_poll_displays(comment.id, client.get_id())
            .await
            .map_err(error::ErrorInternalServerError)?;
        displays.push(CommentDisplay { comment, polls });
    }

    // Visiting the topic clears its notification.
    let notification = if let Some(user_id) = client.get_id() {
        actix_web::rt::spawn(async move {
            let _ = notifications::mark_as_read(user_id, topic_id)
                .await
                .map_err(|e| log::error!("view_topic mark_as_read: {}", e));
        });
        notifications::get_for_topic(user_id, topic_id)
            .await
            .map_err(error::ErrorInternalServerError)?
    } else {
        None
    };

    let paginator = Paginator {
        base_url: format!("/topics/{}", topic_id),
        this_page: page,
        page_count: page_count(topic.comment_count as i64, per_page),
    };

    let is_owner = client.get_id() == Some(topic.user_id);

    Ok(TopicTemplate {
        client,
        topic,
        category,
        comments: displays,
        paginator,
        notification_form: NotificationFormContext {
            topic_id,
            notification,
        },
        polls_enabled: get_config().polls_enabled(),
        is_owner,
    }
    .to_response())
}

#[derive(Deserialize, Validate)]
pub struct NewTopicFormData {
    pub csrf_token: String,
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters."))]
    pub title: String,
    pub category_id: i32,
    #[validate(length(min = 1, max = 65535, message = "Content must be 1-65535 characters."))]
    pub content: String,
    #[serde(default)]
    pub is_private: Option<String>,
    /// Comma-separated usernames to grant access when the topic is private.
    #[serde(default)]
    pub invite: String,
}

#[post("/topics")]
pub async fn create_topic(
    client: ClientCtx,
    cookies: actix_session::Session,
    form: web::Form<NewTopicFormData>,
) -> Result<impl Responder, Error> {
    crate::middleware::csrf::validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    form.validate()
        .map_err(|e| error::ErrorBadRequest(e.to_string()))?;

    let db = get_db_pool();
    let is_private = form.is_private.is_some();

    let category = categories::Entity::find_by_id(form.category_id)
        .filter(categories::Column::IsRemoved.eq(false))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Category not found."))?;

    let now = Utc::now().naive_utc();
    let topic = topics::ActiveModel {
        user_id: Set(user_id),
        category_id: Set(category.id),
        title: Set(form.title.clone()),
        comment_count: Set(0),
        last_active: Set(now),
        is_private: Set(is_private),
        is_removed: Set(false),
        created_at: Set(now),
        ..Default::default()
    };
    let topic = topic
        .insert(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let comment = crate::orm::comments::ActiveModel {
        topic_id: Set(topic.id),
        user_id: Set(user_id),
        content: Set(form.content.clone()),
        is_removed: Set(false),
        created_at: Set(now),
        ..Default::default()
    };
    let comment = comment
        .insert(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    // The author follows their own topic; the record starts read.
    notifications::create_maybe(user_id, topic.id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if let Err(e) = notifications::dispatcher::comment_posted(&comment).await {
        log::error!("create_topic dispatcher: {}", e);
    }

    if is_private {
        let mut grants = Vec::new();
        let mut grantee_ids = vec![user_id];
        for name in form.invite.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(profile) = Profile::get_by_name(db, name)
                .await
                .map_err(error::ErrorInternalServerError)?
            {
                if !grantee_ids.contains(&profile.id) {
                    grantee_ids.push(profile.id);
                }
            }
        }
        for grantee_id in grantee_ids {
            let grant = topics_private::ActiveModel {
                user_id: Set(grantee_id),
                topic_id: Set(topic.id),
                created_at: Set(now),
            };
            let grant = grant
                .insert(db)
                .await
                .map_err(error::ErrorInternalServerError)?;
            grants.push(grant);
        }
        notifications::notify_private_topic_users(&grants, &comment)
            .await
            .map_err(error::ErrorInternalServerError)?;
    }

    Ok(HttpResponse::Found()
        .append_header(("Location", format!("/topics/{}", topic.id)))
        .finish())
}

#[derive(Deserialize)]
pub struct GrantAccessFormData {
    pub csrf_token: String,
    pub username: String,
}

/// Grant another user access to a private topic. Owner only. The grant
/// also seeds a notification pointing at the latest comment.
#[post("/topics/{topic_id}/invite")]
pub async fn grant_access(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<GrantAccessFormData>,
) -> Result<impl Responder, Error> {
    crate::middleware::csrf::validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    let topic_id = path.into_inner();
    let db = get_db_pool();

    let (topic, _) = get_topic_for_viewer(topic_id, Some(user_id))
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Topic not found."))?;

    if topic.user_id != user_id {
        return Err(error::ErrorNotFound("Topic not found."));
    }
    if !topic.is_private {
        return Err(error::ErrorBadRequest("This topic is not private."));
    }

    let grantee = Profile::get_by_name(db, form.username.trim())
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("No such user."))?;

    let existing = topics_private::Entity::find()
        .filter(topics_private::Column::UserId.eq(grantee.id))
        .filter(topics_private::Column::TopicId.eq(topic_id))
        .one(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if existing.is_none() {
        // Seed the notification before the grant lands, so the row exists
        // by the time the topic becomes visible to the grantee.
        notifications::notify_access_granted(grantee.id, topic_id)
            .await
            .map_err(error::ErrorInternalServerError)?;

        let grant = topics_private::ActiveModel {
            user_id: Set(grantee.id),
            topic_id: Set(topic_id),
            created_at: Set(Utc::now().naive_utc()),
        };
        grant
            .insert(db)
            .await
            .map_err(error::ErrorInternalServerError)?;
    }

    Ok(HttpResponse::Found()
        .append_header(("Location", format!("/topics/{}", topic_id)))
        .finish())
}
