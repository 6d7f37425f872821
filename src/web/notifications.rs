//! Notification list, unread feed, AJAX dropdown, and the
//! subscribe/unsubscribe endpoints.

use crate::config::get_config;
use crate::middleware::ClientCtx;
use crate::notifications::{self, NotificationForTemplate};
use crate::template::{page_count, Paginator, PaginatorToHtml};
use actix_web::{error, get, post, web, Error, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use serde::{Deserialize, Serialize};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_notifications)
        .service(view_unread)
        .service(ajax_notifications)
        .service(create_notification)
        .service(update_notification);
}

#[derive(Template)]
#[template(path = "notifications.html")]
struct NotificationsTemplate {
    client: ClientCtx,
    notifications: Vec<NotificationForTemplate>,
    paginator: Paginator,
}

#[derive(Template)]
#[template(path = "notifications_unread.html")]
struct UnreadNotificationsTemplate {
    client: ClientCtx,
    notifications: Vec<NotificationForTemplate>,
    /// Cursor for the next page; None when this page came up short.
    next_cursor: Option<i32>,
}

/// Redisplay target when the subscribe form is rejected.
#[derive(Template)]
#[template(path = "notification_form.html")]
struct NotificationFormTemplate {
    client: ClientCtx,
    topic_id: i32,
    error: String,
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<i64>,
}

/// GET /notifications - paginated list, unread first, then newest
#[get("/notifications")]
pub async fn view_notifications(
    client: ClientCtx,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;

    let per_page = get_config().notifications_per_page();
    let page = query.page.unwrap_or(1).max(1);

    let (notifications, total) = notifications::list_for_user(user_id, page, per_page)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let paginator = Paginator {
        base_url: "/notifications".to_string(),
        this_page: page,
        page_count: page_count(total, per_page),
    };

    Ok(NotificationsTemplate {
        client,
        notifications,
        paginator,
    }
    .to_response())
}

#[derive(Deserialize)]
struct UnreadQuery {
    /// Id of the last notification seen on the previous page.
    notif: Option<i32>,
}

/// GET /notifications/unread - unread only, cursor-paginated
#[get("/notifications/unread")]
pub async fn view_unread(
    client: ClientCtx,
    query: web::Query<UnreadQuery>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;

    let per_page = get_config().notifications_per_page();
    let notifications = notifications::list_unread(user_id, query.notif, per_page)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let next_cursor = if notifications.len() as i64 == per_page {
        notifications.last().map(|n| n.id)
    } else {
        None
    };

    Ok(UnreadNotificationsTemplate {
        client,
        notifications,
        next_cursor,
    }
    .to_response())
}

#[derive(Serialize)]
struct NotificationJson {
    user: String,
    action: String,
    title: String,
    url: String,
    is_read: bool,
}

/// Minimal HTML escaping for values embedded into the dropdown markup by
/// the client script.
fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// GET /notifications/ajax - fixed-shape JSON for the navbar dropdown
#[get("/notifications/ajax")]
pub async fn ajax_notifications(client: ClientCtx) -> Result<impl Responder, Error> {
    let user_id = client.require_login()?;

    let limit = get_config().notifications_per_page();
    let notifications = notifications::list_recent(user_id, limit)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let entries: Vec<NotificationJson> = notifications
        .iter()
        .map(|n| NotificationJson {
            user: escape_html(n.username.as_deref().unwrap_or("")),
            action: n.action.clone(),
            title: escape_html(&n.topic_title),
            url: n.url(),
            is_read: n.is_read,
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({ "n": entries })))
}

#[derive(Deserialize)]
pub struct NotificationFormData {
    pub csrf_token: String,
    #[serde(default)]
    pub is_active: Option<String>,
}

/// POST /topics/{topic_id}/notify - subscribe to a topic
///
/// One record per (user, topic): a second subscription attempt redisplays
/// the form with an error instead of creating a duplicate.
#[post("/topics/{topic_id}/notify")]
pub async fn create_notification(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<NotificationFormData>,
) -> Result<impl Responder, Error> {
    crate::middleware::csrf::validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    let topic_id = path.into_inner();
    let (topic, _) = super::topic::get_topic_for_viewer(topic_id, Some(user_id))
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Topic not found."))?;

    let existing = notifications::get_for_topic(user_id, topic_id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    if existing.is_some() {
        return Ok(NotificationFormTemplate {
            client,
            topic_id,
            error: "You are already subscribed to this topic.".to_string(),
        }
        .to_response());
    }

    notifications::create_maybe(user_id, topic_id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    // An unchecked box means the record is created switched off.
    if form.is_active.is_none() {
        if let Some(notification) = notifications::get_for_topic(user_id, topic_id)
            .await
            .map_err(error::ErrorInternalServerError)?
        {
            notifications::set_active(notification.id, false)
                .await
                .map_err(error::ErrorInternalServerError)?;
        }
    }

    Ok(HttpResponse::Found()
        .append_header(("Location", format!("/topics/{}", topic.id)))
        .finish())
}

/// POST /notifications/{id} - toggle a subscription on or off
///
/// Another user's record reads as missing, so tampering with foreign ids
/// yields a 404 rather than a hint that the record exists.
#[post("/notifications/{id}")]
pub async fn update_notification(
    client: ClientCtx,
    cookies: actix_session::Session,
    path: web::Path<i32>,
    form: web::Form<NotificationFormData>,
) -> Result<impl Responder, Error> {
    crate::middleware::csrf::validate_csrf_token(&cookies, &form.csrf_token)?;
    let user_id = client.require_login()?;

    let notification = notifications::get_for_owner(path.into_inner(), user_id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Notification not found."))?;

    notifications::set_active(notification.id, form.is_active.is_some())
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Found()
        .append_header(("Location", format!("/topics/{}", notification.topic_id)))
        .finish())
}

#[cfg(test)]
mod tests {
    use super::escape_html;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_html("<>taggy"), "&lt;&gt;taggy");
        assert_eq!(
            escape_html("<tag>Have you met Ted?</tag>"),
            "&lt;tag&gt;Have you met Ted?&lt;/tag&gt;"
        );
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("plain"), "plain");
    }
}
