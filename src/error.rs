use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use thiserror::Error;

use crate::error_pages::ErrorMessage;
use crate::services::csv_parser::ImportError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Username already exists!")]
    DuplicateUsername,

    #[error("Invalid username or password!")]
    InvalidCredentials,

    #[error("Too many failed login attempts. Please try again later.")]
    TooManyAttempts,

    #[error("Please log in to continue.")]
    NotAuthenticated,

    #[error("This expense belongs to another user")]
    NotOwner,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid date format: '{0}' (expected YYYY-MM-DD)")]
    InvalidDateFormat(String),

    #[error("Invalid amount: '{0}'")]
    InvalidAmount(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Error importing CSV: {0}")]
    ImportFailure(#[from] ImportError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors caused by user input, safe to show verbatim in a notice.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::DuplicateUsername
                | AppError::InvalidCredentials
                | AppError::TooManyAttempts
                | AppError::InvalidDateFormat(_)
                | AppError::InvalidAmount(_)
                | AppError::Validation(_)
                | AppError::ImportFailure(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, AppError::NotAuthenticated) {
            return Redirect::to("/login").into_response();
        }

        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::NotOwner => (
                StatusCode::FORBIDDEN,
                "You don't have permission to access this expense.".to_string(),
            ),
            AppError::TooManyAttempts => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            e if e.is_user_facing() => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database connection error".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "IO error".to_string())
            }
            e => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong on our end.".to_string(),
                )
            }
        };

        let html = format!(r#"<div class="notice error">{}</div>"#, html_escape(&message));

        let mut response = (status, Html(html)).into_response();
        response.extensions_mut().insert(ErrorMessage(message));
        response
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

pub type AppResult<T> = Result<T, AppError>;

pub trait RenderHtml {
    fn render_html(self) -> AppResult<Html<String>>;
}

impl<T: Template> RenderHtml for T {
    fn render_html(self) -> AppResult<Html<String>> {
        self.render()
            .map(Html)
            .map_err(|e| AppError::Internal(format!("Template error: {}", e)))
    }
}
