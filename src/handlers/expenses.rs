use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use rusqlite::Connection;
use serde::Deserialize;
use tower_cookies::Cookies;
use tracing::{debug, info, warn};

use crate::auth::{require_ownership, Caller};
use crate::date_utils::DATE_FORMAT;
use crate::db::queries::expenses;
use crate::error::{AppError, AppResult, RenderHtml};
use crate::flash::{self, Flash};
use crate::models::{Expense, NewExpense, UserId};
use crate::state::AppState;
use crate::VERSION;

#[derive(Template)]
#[template(path = "pages/add_expense.html")]
pub struct AddExpenseTemplate {
    pub title: String,
    pub version: &'static str,
    pub logged_in: bool,
    pub flash: Option<Flash>,
    pub today: String,
}

#[derive(Template)]
#[template(path = "pages/edit_expense.html")]
pub struct EditExpenseTemplate {
    pub title: String,
    pub version: &'static str,
    pub logged_in: bool,
    pub flash: Option<Flash>,
    pub expense: Expense,
}

#[derive(Debug, Deserialize)]
pub struct ExpenseFormData {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
}

impl ExpenseFormData {
    fn to_new_expense(&self) -> AppResult<NewExpense> {
        NewExpense::parse(&self.category, &self.amount, &self.description, &self.date)
    }
}

fn render_add_form(flash: Option<Flash>) -> AppResult<Response> {
    let template = AddExpenseTemplate {
        title: "Add Expense".into(),
        version: VERSION,
        logged_in: true,
        flash,
        today: chrono::Utc::now().date_naive().format(DATE_FORMAT).to_string(),
    };
    Ok(template.render_html()?.into_response())
}

fn render_edit_form(expense: Expense, flash: Option<Flash>) -> AppResult<Response> {
    let template = EditExpenseTemplate {
        title: "Edit Expense".into(),
        version: VERSION,
        logged_in: true,
        flash,
        expense,
    };
    Ok(template.render_html()?.into_response())
}

/// Loads an expense and checks that `user_id` owns it.
fn owned_expense(conn: &Connection, id: i64, user_id: UserId) -> AppResult<Expense> {
    let expense = expenses::find_expense_by_id(conn, id)?;
    require_ownership(&expense, user_id)?;
    Ok(expense)
}

/// Turns an ownership failure into a redirect home with a notice. Everything
/// else propagates unchanged.
fn deny_foreign(cookies: &Cookies, err: AppError, message: &str) -> AppResult<Response> {
    match err {
        AppError::NotOwner => {
            flash::error(cookies, message);
            Ok(Redirect::to("/").into_response())
        }
        other => Err(other),
    }
}

pub async fn new_form(caller: Caller, cookies: Cookies) -> AppResult<Response> {
    caller.require()?;
    render_add_form(flash::take(&cookies))
}

pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    cookies: Cookies,
    Form(form): Form<ExpenseFormData>,
) -> AppResult<Response> {
    let user_id = caller.require()?;
    debug!(user_id, category = %form.category, amount = %form.amount, "Creating expense");

    let new_expense = match form.to_new_expense() {
        Ok(expense) => expense,
        Err(e) if e.is_user_facing() => {
            warn!(user_id, error = %e, "Rejected expense form");
            return render_add_form(Some(Flash::error(e.to_string())));
        }
        Err(e) => return Err(e),
    };

    let conn = state.db.get()?;
    let expense = expenses::create_expense(&conn, user_id, &new_expense)?;
    info!(expense_id = expense.id, user_id, "Expense created via web form");

    flash::success(&cookies, "Expense added successfully!");
    Ok(Redirect::to("/").into_response())
}

pub async fn edit_form(
    State(state): State<AppState>,
    caller: Caller,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let user_id = caller.require()?;
    let conn = state.db.get()?;

    match owned_expense(&conn, id, user_id) {
        Ok(expense) => render_edit_form(expense, flash::take(&cookies)),
        Err(e) => deny_foreign(&cookies, e, "You cannot edit this expense!"),
    }
}

pub async fn update(
    State(state): State<AppState>,
    caller: Caller,
    cookies: Cookies,
    Path(id): Path<i64>,
    Form(form): Form<ExpenseFormData>,
) -> AppResult<Response> {
    let user_id = caller.require()?;
    debug!(expense_id = id, user_id, "Updating expense");
    let conn = state.db.get()?;

    let existing = match owned_expense(&conn, id, user_id) {
        Ok(expense) => expense,
        Err(e) => return deny_foreign(&cookies, e, "You cannot edit this expense!"),
    };

    let new_expense = match form.to_new_expense() {
        Ok(expense) => expense,
        Err(e) if e.is_user_facing() => {
            warn!(expense_id = id, error = %e, "Rejected expense form");
            return render_edit_form(existing, Some(Flash::error(e.to_string())));
        }
        Err(e) => return Err(e),
    };

    expenses::update_expense(&conn, id, &new_expense)?;
    info!(expense_id = id, user_id, "Expense updated via web form");

    flash::success(&cookies, "Expense updated successfully!");
    Ok(Redirect::to("/").into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    caller: Caller,
    cookies: Cookies,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let user_id = caller.require()?;
    let conn = state.db.get()?;

    if let Err(e) = owned_expense(&conn, id, user_id) {
        return deny_foreign(&cookies, e, "You cannot delete this expense!");
    }

    expenses::delete_expense(&conn, id)?;
    info!(expense_id = id, user_id, "Deleted expense");

    flash::success(&cookies, "Expense deleted successfully!");
    Ok(Redirect::to("/").into_response())
}
