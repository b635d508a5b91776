pub mod dashboard;
pub mod expenses;
pub mod import;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Pages
        .route("/", get(dashboard::index))
        // Expense CRUD
        .route("/add", get(expenses::new_form).post(expenses::create))
        .route("/edit/:id", get(expenses::edit_form).post(expenses::update))
        .route("/delete/:id", get(expenses::delete))
        // Import
        .route("/upload", post(import::upload))
        // Health check
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "OK"
}
