//! Front page: public topics, newest activity first.

use crate::config::get_config;
use crate::db::get_db_pool;
use crate::middleware::ClientCtx;
use crate::orm::categories;
use crate::template::{page_count, Paginator, PaginatorToHtml};
use actix_web::{error, get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::{entity::*, query::*, DbBackend, DbErr, FromQueryResult, Statement};
use serde::Deserialize;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index);
}

#[derive(Debug, FromQueryResult)]
pub struct TopicForTemplate {
    pub id: i32,
    pub title: String,
    pub comment_count: i32,
    pub last_active: chrono::NaiveDateTime,
    pub username: String,
    pub category_title: String,
}

#[derive(FromQueryResult)]
struct CountRow {
    cnt: i64,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    client: ClientCtx,
    topics: Vec<TopicForTemplate>,
    categories: Vec<categories::Model>,
    paginator: Paginator,
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<i64>,
}

const PUBLIC_TOPICS_SQL: &str = r#"
    FROM topics t
    INNER JOIN categories c ON c.id = t.category_id
    LEFT JOIN categories cp ON cp.id = c.parent_id
    INNER JOIN users u ON u.id = t.user_id
    WHERE t.is_removed = FALSE
      AND t.is_private = FALSE
      AND c.is_removed = FALSE
      AND COALESCE(cp.is_removed, FALSE) = FALSE
"#;

async fn get_topics_page(page: i64, per_page: i64) -> Result<(Vec<TopicForTemplate>, i64), DbErr> {
    let db = get_db_pool();

    let sql = format!(
        "SELECT t.id, t.title, t.comment_count, t.last_active,
                u.username, c.title AS category_title
         {} ORDER BY t.last_active DESC LIMIT $1 OFFSET $2",
        PUBLIC_TOPICS_SQL
    );
    let rows = TopicForTemplate::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        &sql,
        [per_page.into(), ((page.max(1) - 1) * per_page).into()],
    ))
    .all(db)
    .await?;

    let count_sql = format!("SELECT COUNT(*) AS cnt {}", PUBLIC_TOPICS_SQL);
    let total = CountRow::find_by_statement(Statement::from_string(
        DbBackend::Postgres,
        count_sql,
    ))
    .one(db)
    .await?
    .map(|r| r.cnt)
    .unwrap_or(0);

    Ok((rows, total))
}

#[get("/")]
pub async fn view_index(
    client: ClientCtx,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, Error> {
    let per_page = get_config().topics_per_page();
    let page = query.page.unwrap_or(1).max(1);

    let (topics, total) = get_topics_page(page, per_page)
        .await
        .map_err(error::ErrorInternalServerError)?;

    let categories = categories::Entity::find()
        .filter(categories::Column::IsRemoved.eq(false))
        .order_by_asc(categories::Column::Title)
        .all(get_db_pool())
        .await
        .map_err(error::ErrorInternalServerError)?;

    let paginator = Paginator {
        base_url: "/".to_string(),
        this_page: page,
        page_count: page_count(total, per_page),
    };

    Ok(IndexTemplate {
        client,
        topics,
        categories,
        paginator,
    }
    .to_response())
}
