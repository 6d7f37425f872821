//! Rendered error pages for the ErrorHandlers middleware.

use actix_web::dev::ServiceResponse;
use actix_web::http::header::{HeaderValue, CONTENT_TYPE};
use actix_web::middleware::ErrorHandlerResponse;

fn render_page<B>(
    res: ServiceResponse<B>,
    title: &str,
    message: &str,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let body = format!(
        "<!DOCTYPE html>\
         <html><head><title>{title}</title></head>\
         <body><main><h1>{title}</h1><p>{message}</p>\
         <p><a href=\"/\">Back to the index</a></p></main></body></html>",
        title = title,
        message = message,
    );

    let (req, mut res) = res.into_parts();
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    let res = res.set_body(body);

    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, res)
            .map_into_boxed_body()
            .map_into_right_body(),
    ))
}

pub fn render_400<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    render_page(res, "Bad Request", "The request could not be understood.")
}

pub fn render_404<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    render_page(res, "Not Found", "That page does not exist, or you cannot see it.")
}

pub fn render_500<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    render_page(res, "Server Error", "Something went wrong on our end.")
}
