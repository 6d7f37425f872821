use crate::middleware::ClientCtx;
use crate::session::{get_sess, remove_session};
use actix_web::{get, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use uuid::Uuid;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_logout);
}

#[derive(Template)]
#[template(path = "logout.html")]
struct LogoutTemplate {
    client: ClientCtx,
}

#[get("/logout")]
pub async fn view_logout(cookies: actix_session::Session) -> Result<impl Responder, Error> {
    match cookies.get::<String>("token") {
        Ok(Some(token)) => match Uuid::parse_str(&token) {
            Ok(token) => {
                if !remove_session(get_sess(), token) {
                    log::debug!("view_logout: session was already gone");
                }
            }
            Err(e) => {
                log::error!("view_logout: parse_str() {}", e);
            }
        },
        Ok(None) => {
            log::debug!("view_logout: missing token (already logged out?)");
        }
        Err(e) => {
            log::error!("view_logout: cookies.get() {}", e);
        }
    }

    cookies.remove("logged_in");
    cookies.remove("token");

    // Rebuild a guest context so the page renders logged out.
    let guest_client = ClientCtx::from_session(&cookies).await;

    Ok(LogoutTemplate {
        client: guest_client,
    }
    .to_response())
}
