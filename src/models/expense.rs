use chrono::NaiveDate;
use serde::Serialize;

use crate::date_utils::parse_date;
use crate::error::{AppError, AppResult};
use crate::models::user::UserId;

pub const MAX_CATEGORY_LEN: usize = 50;
pub const MAX_DESCRIPTION_LEN: usize = 100;
/// Largest accepted absolute amount. Keeps every sum finite.
pub const MAX_AMOUNT: f64 = 1e12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: UserId,
    pub category: String,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
}

impl Expense {
    pub fn amount_display(&self) -> String {
        format_amount(self.amount)
    }

    pub fn date_display(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// Validated field values for creating or overwriting an expense. The owner is
/// passed separately so an update can never move an expense between users.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub category: String,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
}

impl NewExpense {
    /// Validates raw form or CSV values. A blank date falls back to today (UTC).
    pub fn parse(category: &str, amount: &str, description: &str, date: &str) -> AppResult<Self> {
        let date = if date.trim().is_empty() {
            chrono::Utc::now().date_naive()
        } else {
            parse_date(date)?
        };
        let amount = parse_amount(amount)?;

        let category = category.trim();
        if category.is_empty() {
            return Err(AppError::Validation("Category is required".into()));
        }
        if category.chars().count() > MAX_CATEGORY_LEN {
            return Err(AppError::Validation(format!(
                "Category must be at most {} characters",
                MAX_CATEGORY_LEN
            )));
        }

        let description = description.trim();
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(AppError::Validation(format!(
                "Description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }

        Ok(Self {
            category: category.to_string(),
            amount,
            description: description.to_string(),
            date,
        })
    }
}

/// Parses a plain decimal amount. No sign constraint, but NaN, infinities and
/// magnitudes of [`MAX_AMOUNT`] or more are rejected.
pub fn parse_amount(raw: &str) -> AppResult<f64> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value.abs() < MAX_AMOUNT => Ok(value),
        _ => Err(AppError::InvalidAmount(trimmed.to_string())),
    }
}

pub fn format_amount(amount: f64) -> String {
    // Avoid rendering "-0.00" for tiny negative rounding residue.
    let rounded = (amount * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0.00".to_string()
    } else {
        format!("{:.2}", rounded)
    }
}
