//! Shared test utilities for integration tests.
//!
//! `TestClient` drives the full router against an in-memory database and keeps
//! a cookie jar between requests, so a sequence of calls behaves like one
//! browser session. Methods are intentionally broad to support various test
//! scenarios across different test files.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use family_finance::config::Config;
use family_finance::db::{create_in_memory_pool, migrations};
use family_finance::server::build_router;
use family_finance::state::AppState;
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const MULTIPART_BOUNDARY: &str = "----family-finance-test-boundary";

/// Status, redirect target and body of a response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    /// Raw `Set-Cookie` header values.
    pub set_cookies: Vec<String>,
    pub body: String,
}

impl TestResponse {
    pub fn is_redirect_to(&self, path: &str) -> bool {
        self.status == StatusCode::SEE_OTHER && self.location.as_deref() == Some(path)
    }
}

/// A test client that simulates a browser session, allowing sequential requests
/// against the application.
pub struct TestClient {
    state: AppState,
    cookies: Mutex<HashMap<String, String>>,
}

impl TestClient {
    /// Create a new test client with a fresh in-memory database.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let pool = create_in_memory_pool().expect("Failed to create in-memory pool");
        {
            let mut conn = pool.get().expect("Failed to get connection");
            migrations::run_migrations(&mut conn, Path::new("migrations"))
                .expect("Failed to run migrations");
        }

        let config = Config {
            host: "127.0.0.1".into(),
            port: 5050,
            database_path: PathBuf::from(":memory:"),
            migrations_path: PathBuf::from("migrations"),
            ..config
        };

        Self {
            state: AppState::new(pool, config),
            cookies: Mutex::new(HashMap::new()),
        }
    }

    /// A second browser sharing this client's database but none of its cookies.
    pub fn new_session(&self) -> Self {
        Self {
            state: self.state.clone(),
            cookies: Mutex::new(HashMap::new()),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.lock().unwrap().get(name).cloned()
    }

    pub fn set_cookie(&self, name: &str, value: &str) {
        self.cookies
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    fn cookie_header(&self) -> Option<String> {
        let jar = self.cookies.lock().unwrap();
        if jar.is_empty() {
            return None;
        }
        Some(
            jar.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn store_cookies(&self, response: &Response<Body>) {
        let mut jar = self.cookies.lock().unwrap();
        for value in response.headers().get_all(header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let pair = raw.split(';').next().unwrap_or("");
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let expired = value.is_empty() || raw.to_ascii_lowercase().contains("max-age=0");
            if expired {
                jar.remove(name.trim());
            } else {
                jar.insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }

    async fn send(&self, builder: axum::http::request::Builder, body: Body) -> TestResponse {
        let builder = match self.cookie_header() {
            Some(cookies) => builder.header(header::COOKIE, cookies),
            None => builder,
        };

        let response = self
            .router()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        self.store_cookies(&response);

        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(String::from))
            .collect();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let body = response.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            location,
            set_cookies,
            body: String::from_utf8_lossy(&body).to_string(),
        }
    }

    /// Make a GET request.
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::builder().uri(uri), Body::empty()).await
    }

    /// Make a POST request with form data.
    pub async fn post_form(&self, uri: &str, form_data: &[(&str, &str)]) -> TestResponse {
        let body = form_data
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
            Body::from(body),
        )
        .await
    }

    /// POST a single file in a multipart form.
    pub async fn post_file(
        &self,
        uri: &str,
        field: &str,
        file_name: &str,
        content: &[u8],
    ) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
                ),
            Body::from(body),
        )
        .await
    }

    // =========================================================================
    // Helpers for common flows
    // =========================================================================

    pub async fn register(&self, username: &str, password: &str) -> TestResponse {
        self.post_form(
            "/register",
            &[("username", username), ("password", password)],
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.post_form("/login", &[("username", username), ("password", password)])
            .await
    }

    /// Register and log in the way a browser would, following the redirect
    /// to the login page. Panics if either step fails.
    pub async fn register_and_login(&self, username: &str, password: &str) {
        assert!(self.register(username, password).await.is_redirect_to("/login"));
        self.get("/login").await;
        assert!(self.login(username, password).await.is_redirect_to("/"));
    }

    /// Add an expense via the web form and return success status.
    pub async fn add_expense(
        &self,
        category: &str,
        amount: &str,
        description: &str,
        date: &str,
    ) -> bool {
        let response = self
            .post_form(
                "/add",
                &[
                    ("category", category),
                    ("amount", amount),
                    ("description", description),
                    ("date", date),
                ],
            )
            .await;
        response.is_redirect_to("/")
    }

    /// Ids of the expenses owned by `username`, newest first.
    pub fn expense_ids(&self, username: &str) -> Vec<i64> {
        let conn = self.state.db.get().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT e.id FROM expenses e JOIN users u ON u.id = e.user_id
                 WHERE u.username = ? ORDER BY e.date DESC, e.id DESC",
            )
            .unwrap();
        stmt.query_map([username], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<i64>, _>>()
            .unwrap()
    }

    pub fn expense_count(&self) -> i64 {
        let conn = self.state.db.get().unwrap();
        conn.query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))
            .unwrap()
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}
