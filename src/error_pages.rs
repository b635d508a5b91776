use askama::Template;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};

use crate::auth::Caller;
use crate::flash::Flash;
use crate::VERSION;

/// Message attached to an error response for the error page to display.
#[derive(Clone)]
pub struct ErrorMessage(pub String);

#[derive(Template)]
#[template(path = "pages/error.html")]
struct ErrorPageTemplate {
    title: String,
    version: &'static str,
    logged_in: bool,
    flash: Option<Flash>,
    status_code: u16,
    status_text: &'static str,
    message: String,
}

/// Logs every 4xx/5xx response and swaps its body for the HTML error page.
/// `/health` keeps its plain-text body.
pub async fn error_page_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let logged_in = request
        .extensions()
        .get::<Caller>()
        .is_some_and(Caller::is_logged_in);

    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let message = attached_message(&response);
    tracing::warn!(
        %status,
        %method,
        %path,
        message = message.as_deref().unwrap_or(""),
        "request failed"
    );

    if path == "/health" {
        return response;
    }

    let (status_text, fallback) = describe(status);
    let page = ErrorPageTemplate {
        title: status_text.to_string(),
        version: VERSION,
        logged_in,
        flash: None,
        status_code: status.as_u16(),
        status_text,
        message: message.unwrap_or(fallback),
    };

    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render error page template: {}", e);
            (status, "Internal Server Error").into_response()
        }
    }
}

/// Fallback handler for unmatched routes.
pub async fn fallback_handler() -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    response
        .extensions_mut()
        .insert(ErrorMessage(describe(StatusCode::NOT_FOUND).1));
    response
}

fn attached_message(response: &Response) -> Option<String> {
    response
        .extensions()
        .get::<ErrorMessage>()
        .map(|m| m.0.clone())
        .filter(|m| !m.is_empty())
}

/// Short title and default explanation for a status code.
fn describe(status: StatusCode) -> (&'static str, String) {
    let (title, detail) = match status.as_u16() {
        400 => ("Bad Request", "The request could not be understood."),
        403 => ("Forbidden", "You don't have permission to access this."),
        404 => ("Not Found", "The page you're looking for doesn't exist."),
        405 => ("Method Not Allowed", "This action is not supported."),
        413 => ("Payload Too Large", "The uploaded file is too large."),
        429 => ("Too Many Requests", "Please wait a moment and try again."),
        500 => ("Internal Server Error", "Something went wrong on our end."),
        _ => {
            return (
                "Error",
                format!("An unexpected error occurred ({}).", status.as_u16()),
            )
        }
    };
    (title, detail.to_string())
}
