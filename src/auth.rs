//! Accounts, sessions and the per-request caller identity.
//!
//! Passwords are stored as salted Argon2id PHC strings. Session tokens are
//! random UUIDs kept in the `sessions` table and handed to the browser in an
//! `HttpOnly` cookie. The session middleware resolves that cookie into a
//! [`Caller`] on every request; handlers call [`Caller::require`] to insist on
//! a logged-in user and [`require_ownership`] before touching an expense.

use std::convert::Infallible;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use askama::Template;
use axum::async_trait;
use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use rusqlite::Connection;
use serde::Deserialize;
use tower_cookies::cookie::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::config::Config;
use crate::db::queries::{login_attempts, sessions, users};
use crate::error::{AppError, AppResult, RenderHtml};
use crate::flash::{self, Flash};
use crate::models::user::MAX_USERNAME_LEN;
use crate::models::{Expense, User, UserId};
use crate::state::AppState;
use crate::VERSION;

/// Cookie name for the session token.
pub const SESSION_COOKIE: &str = "session";

// Verified when the username is unknown so both paths cost one Argon2 run.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$rJQH0emBAuPPLwwjO9XGAN1BANE";

/// Who is making the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Caller {
    #[default]
    Anonymous,
    User(UserId),
}

impl Caller {
    pub fn require(self) -> AppResult<UserId> {
        match self {
            Caller::User(id) => Ok(id),
            Caller::Anonymous => Err(AppError::NotAuthenticated),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, Caller::User(_))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Caller>()
            .copied()
            .unwrap_or_default())
    }
}

pub fn require_ownership(expense: &Expense, user_id: UserId) -> AppResult<()> {
    if expense.is_owned_by(user_id) {
        Ok(())
    } else {
        tracing::warn!(
            expense_id = expense.id,
            user_id,
            "Rejected access to another user's expense"
        );
        Err(AppError::NotOwner)
    }
}

/// Resolves the session cookie into a [`Caller`] request extension.
pub async fn session_middleware(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let caller = match cookies.get(SESSION_COOKIE) {
        Some(cookie) => {
            let caller = resolve_session(&state, cookie.value());
            if caller == Caller::Anonymous {
                cookies.remove(session_cookie(String::new(), false));
            }
            caller
        }
        None => Caller::Anonymous,
    };

    request.extensions_mut().insert(caller);
    next.run(request).await
}

fn resolve_session(state: &AppState, token: &str) -> Caller {
    let conn = match state.db.get() {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get connection for session lookup: {}", e);
            return Caller::Anonymous;
        }
    };

    let max_age_hours = state.config.session_max_age_hours;
    match sessions::find_session_user(&conn, token, max_age_hours) {
        Ok(Some(user_id)) => Caller::User(user_id),
        Ok(None) => {
            tracing::debug!("Unknown or expired session token");
            Caller::Anonymous
        }
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            Caller::Anonymous
        }
    }
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against an Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        tracing::error!("Invalid password hash format in database");
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn register_user(conn: &Connection, username: &str, password: &str) -> AppResult<User> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::Validation("Username is required".into()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }

    let hash = hash_password(password)?;
    let user = users::create_user(conn, username, &hash)?;
    tracing::info!(user_id = user.id, "Registered user");
    Ok(user)
}

/// Checks credentials, applying the per-username failure limit first.
pub fn authenticate(
    conn: &Connection,
    config: &Config,
    username: &str,
    password: &str,
) -> AppResult<User> {
    let username = username.trim();

    if config.max_login_attempts > 0 {
        let failures =
            login_attempts::count_recent_failures(conn, username, config.login_window_minutes)?;
        if failures >= config.max_login_attempts {
            tracing::warn!(username, failures, "Login throttled");
            return Err(AppError::TooManyAttempts);
        }
    }

    let user = users::find_user_by_username(conn, username)?;
    let hash = user
        .as_ref()
        .map(|u| u.password_hash.as_str())
        .unwrap_or(DUMMY_HASH);
    let valid = verify_password(password, hash);

    match user {
        Some(user) if valid => {
            login_attempts::clear_failures(conn, username)?;
            Ok(user)
        }
        _ => {
            login_attempts::record_failure(conn, username, config.login_window_minutes)?;
            tracing::warn!(username, "Failed login");
            Err(AppError::InvalidCredentials)
        }
    }
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub title: String,
    pub version: &'static str,
    pub logged_in: bool,
    pub flash: Option<Flash>,
}

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub title: String,
    pub version: &'static str,
    pub logged_in: bool,
    pub flash: Option<Flash>,
}

/// Form data for both login and registration.
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn render_login(flash: Option<Flash>) -> AppResult<Response> {
    let template = LoginTemplate {
        title: "Login".into(),
        version: VERSION,
        logged_in: false,
        flash,
    };
    Ok(template.render_html()?.into_response())
}

fn render_register(flash: Option<Flash>) -> AppResult<Response> {
    let template = RegisterTemplate {
        title: "Register".into(),
        version: VERSION,
        logged_in: false,
        flash,
    };
    Ok(template.render_html()?.into_response())
}

pub async fn register_page(caller: Caller, cookies: Cookies) -> AppResult<Response> {
    if caller.is_logged_in() {
        return Ok(Redirect::to("/").into_response());
    }
    render_register(flash::take(&cookies))
}

pub async fn register_submit(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    match register_user(&conn, &form.username, &form.password) {
        Ok(_) => {
            flash::success(&cookies, "Registration successful! Please login.");
            Ok(Redirect::to("/login").into_response())
        }
        Err(e) if e.is_user_facing() => render_register(Some(Flash::error(e.to_string()))),
        Err(e) => Err(e),
    }
}

/// Render the login page.
pub async fn login_page(caller: Caller, cookies: Cookies) -> AppResult<Response> {
    if caller.is_logged_in() {
        return Ok(Redirect::to("/").into_response());
    }
    render_login(flash::take(&cookies))
}

/// Handle login form submission.
pub async fn login_submit(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let user = match authenticate(&conn, &state.config, &form.username, &form.password) {
        Ok(user) => user,
        Err(e @ (AppError::InvalidCredentials | AppError::TooManyAttempts)) => {
            return render_login(Some(Flash::error(e.to_string())));
        }
        Err(e) => return Err(e),
    };

    let max_age_hours = state.config.session_max_age_hours;
    sessions::prune_sessions(&conn, max_age_hours)?;

    let token = Uuid::new_v4().to_string();
    sessions::create_session(&conn, &token, user.id)?;
    let mut cookie = session_cookie(token, state.config.secure_cookies);
    cookie.set_max_age(Duration::hours(i64::from(max_age_hours)));
    cookies.add(cookie);

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Redirect::to("/").into_response())
}

/// Handle logout.
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> AppResult<Redirect> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        let conn = state.db.get()?;
        sessions::delete_session(&conn, cookie.value())?;
    }
    cookies.remove(session_cookie(String::new(), state.config.secure_cookies));

    Ok(Redirect::to("/login"))
}
