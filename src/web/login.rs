use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::users;
use crate::session;
use crate::session::get_sess;
use actix_web::{error, get, post, web, Error, Responder};
use askama::Template;
use askama_actix::TemplateToResponse;
use sea_orm::{entity::*, query::*, DbErr};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(post_login).service(view_login);
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate<'a> {
    pub client: ClientCtx,
    pub logged_in: bool,
    pub username: Option<&'a str>,
    pub error: Option<&'a str>,
}

#[derive(Deserialize)]
pub struct FormData {
    username: String,
    password: String,
}

/// Verify credentials. Returns the user id on success; a bad name and a
/// bad password are indistinguishable to the caller.
pub async fn login(name: &str, pass: &str) -> Result<Option<i32>, DbErr> {
    let db = get_db_pool();

    let user = users::Entity::find()
        .filter(users::Column::Username.eq(name))
        .one(db)
        .await?;

    let user = match user {
        Some(user) => user,
        None => return Ok(None),
    };

    if !session::verify_password(pass, &user.password) {
        return Ok(None);
    }

    Ok(Some(user.id))
}

#[post("/login")]
pub async fn post_login(
    cookies: actix_session::Session,
    form: web::Form<FormData>,
) -> Result<impl Responder, Error> {
    let user_id = login(&form.username, &form.password).await.map_err(|e| {
        log::error!("post_login: {:?}", e);
        error::ErrorInternalServerError("DB error")
    })?;

    let user_id = match user_id {
        Some(user_id) => user_id,
        None => {
            log::debug!("login failure for {}", form.username);
            // Redisplay with a generic message to avoid username enumeration.
            let client = ClientCtx::from_session(&cookies).await;
            return Ok(LoginTemplate {
                client,
                logged_in: false,
                username: Some(&form.username),
                error: Some("Invalid username or password."),
            }
            .to_response());
        }
    };

    let token = session::new_session(get_sess(), user_id).to_string();

    cookies
        .insert("logged_in", true)
        .map_err(|_| error::ErrorInternalServerError("middleware error"))?;
    cookies
        .insert("token", token)
        .map_err(|_| error::ErrorInternalServerError("middleware error"))?;

    Ok(LoginTemplate {
        client: ClientCtx::from_session(&cookies).await,
        logged_in: true,
        username: Some(&form.username),
        error: None,
    }
    .to_response())
}

#[get("/login")]
pub async fn view_login(client: ClientCtx) -> Result<impl Responder, Error> {
    let logged_in = client.is_user();
    Ok(LoginTemplate {
        client,
        logged_in,
        username: None,
        error: None,
    }
    .to_response())
}
