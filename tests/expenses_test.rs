//! Integration tests for adding, editing and deleting expenses.

mod common;

use axum::http::StatusCode;
use common::TestClient;

async fn alice() -> TestClient {
    let client = TestClient::new();
    client.register_and_login("alice", "pw1").await;
    client
}

#[tokio::test]
async fn test_add_form_prefills_today() {
    let client = alice().await;
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();

    let response = client.get("/add").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains(&format!("value=\"{}\"", today)));
}

#[tokio::test]
async fn test_add_expense() {
    let client = alice().await;

    assert!(
        client
            .add_expense("Food", "12.50", "Lunch", "2024-01-05")
            .await
    );

    let dashboard = client.get("/").await;
    assert!(dashboard.body.contains("Expense added successfully!"));
    assert!(dashboard.body.contains("Lunch"));
    assert!(dashboard.body.contains("2024-01-05"));
    assert!(dashboard.body.contains("12.50"));
}

#[tokio::test]
async fn test_add_expense_blank_date_defaults_to_today() {
    let client = alice().await;
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();

    assert!(client.add_expense("Food", "3", "", "").await);

    let conn = client.state().db.get().unwrap();
    let date: String = conn
        .query_row("SELECT date FROM expenses", [], |row| row.get(0))
        .unwrap();
    assert_eq!(date, today);
}

#[tokio::test]
async fn test_add_expense_invalid_amount() {
    let client = alice().await;

    let response = client
        .post_form(
            "/add",
            &[
                ("category", "Food"),
                ("amount", "twelve"),
                ("date", "2024-01-05"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Invalid amount"));
    // The rejected value is not echoed back into the form.
    assert!(!response.body.contains("value=\"twelve\""));
    assert_eq!(client.expense_count(), 0);
}

#[tokio::test]
async fn test_add_expense_invalid_date() {
    let client = alice().await;

    let response = client
        .post_form(
            "/add",
            &[("category", "Food"), ("amount", "1"), ("date", "05/01/2024")],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Invalid date format"));
    assert_eq!(client.expense_count(), 0);
}

#[tokio::test]
async fn test_add_expense_requires_category() {
    let client = alice().await;

    let response = client
        .post_form(
            "/add",
            &[("category", "  "), ("amount", "1"), ("date", "2024-01-01")],
        )
        .await;

    assert!(response.body.contains("Category is required"));
    assert_eq!(client.expense_count(), 0);
}

#[tokio::test]
async fn test_huge_amounts_are_rejected() {
    let client = alice().await;
    assert!(!client.add_expense("Food", "1e308", "", "2024-01-01").await);
    assert!(!client.add_expense("Food", "1e308", "", "2024-01-02").await);
    assert_eq!(client.expense_count(), 0);

    let dashboard = client.get("/").await;
    assert!(dashboard.body.contains("<strong>$0.00</strong>"));
    assert!(!dashboard.body.contains("$inf"));
}

#[tokio::test]
async fn test_negative_amounts_are_accepted() {
    let client = alice().await;
    assert!(client.add_expense("Refund", "-20", "", "2024-02-10").await);
    assert_eq!(client.expense_count(), 1);
}

#[tokio::test]
async fn test_edit_expense() {
    let client = alice().await;
    client
        .add_expense("Food", "12.50", "Lunch", "2024-01-05")
        .await;
    let id = client.expense_ids("alice")[0];

    let form = client.get(&format!("/edit/{}", id)).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("value=\"Food\""));
    assert!(form.body.contains("value=\"12.50\""));
    assert!(form.body.contains("value=\"2024-01-05\""));

    let response = client
        .post_form(
            &format!("/edit/{}", id),
            &[
                ("category", "Travel"),
                ("amount", "99"),
                ("description", "Train"),
                ("date", "2023-12-31"),
            ],
        )
        .await;
    assert!(response.is_redirect_to("/"));

    let dashboard = client.get("/").await;
    assert!(dashboard.body.contains("Expense updated successfully!"));
    assert!(dashboard.body.contains("Train"));
    assert!(!dashboard.body.contains("Lunch"));
}

#[tokio::test]
async fn test_edit_with_bad_input_shows_stored_values() {
    let client = alice().await;
    client
        .add_expense("Food", "12.50", "Lunch", "2024-01-05")
        .await;
    let id = client.expense_ids("alice")[0];

    let response = client
        .post_form(
            &format!("/edit/{}", id),
            &[("category", "Travel"), ("amount", "1"), ("date", "2024-13-01")],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Invalid date format"));
    assert!(response.body.contains("value=\"Food\""));
    assert!(response.body.contains("value=\"2024-01-05\""));
}

#[tokio::test]
async fn test_edit_missing_expense() {
    let client = alice().await;
    let response = client.get("/edit/9999").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_expense() {
    let client = alice().await;
    client.add_expense("Food", "1", "", "2024-01-01").await;
    let id = client.expense_ids("alice")[0];

    assert!(client
        .get(&format!("/delete/{}", id))
        .await
        .is_redirect_to("/"));
    assert_eq!(client.expense_count(), 0);

    let dashboard = client.get("/").await;
    assert!(dashboard.body.contains("Expense deleted successfully!"));
}

#[tokio::test]
async fn test_delete_missing_expense() {
    let client = alice().await;
    assert_eq!(client.get("/delete/9999").await.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Ownership
// =============================================================================

#[tokio::test]
async fn test_other_user_cannot_edit() {
    let alice = alice().await;
    alice.add_expense("Food", "12.50", "Lunch", "2024-01-05").await;
    let id = alice.expense_ids("alice")[0];

    let bob = alice.new_session();
    bob.register_and_login("bob", "pw2").await;

    let form = bob.get(&format!("/edit/{}", id)).await;
    assert!(form.is_redirect_to("/"));
    assert!(bob.get("/").await.body.contains("You cannot edit this expense!"));

    let response = bob
        .post_form(
            &format!("/edit/{}", id),
            &[("category", "Stolen"), ("amount", "0"), ("date", "2024-01-01")],
        )
        .await;
    assert!(response.is_redirect_to("/"));

    let conn = alice.state().db.get().unwrap();
    let category: String = conn
        .query_row("SELECT category FROM expenses WHERE id = ?", [id], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(category, "Food");
}

#[tokio::test]
async fn test_other_user_cannot_delete() {
    let alice = alice().await;
    alice.add_expense("Food", "12.50", "Lunch", "2024-01-05").await;
    let id = alice.expense_ids("alice")[0];

    let bob = alice.new_session();
    bob.register_and_login("bob", "pw2").await;

    assert!(bob.get(&format!("/delete/{}", id)).await.is_redirect_to("/"));
    assert!(bob
        .get("/")
        .await
        .body
        .contains("You cannot delete this expense!"));
    assert_eq!(alice.expense_ids("alice"), vec![id]);
}
