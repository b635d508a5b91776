//! Reduces a user's expenses to the totals behind the dashboard charts.
//!
//! Both aggregations return vectors in a fixed order so that charts built from
//! them are stable across requests: categories by descending total (ties by
//! name), periods in ascending chronological order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::date_utils::Granularity;
use crate::models::expense::format_amount;
use crate::models::Expense;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub expense_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodTotal {
    /// First day of the bucket.
    pub period_start: NaiveDate,
    pub label: String,
    pub total: f64,
    pub expense_count: usize,
}

impl CategoryTotal {
    pub fn total_display(&self) -> String {
        format_amount(self.total)
    }
}

impl PeriodTotal {
    pub fn total_display(&self) -> String {
        format_amount(self.total)
    }
}

/// Sums amounts per category. Category names are compared exactly, so
/// "Food" and "food" are separate slices.
pub fn aggregate_by_category(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut by_category: HashMap<&str, (f64, usize)> = HashMap::new();

    for expense in expenses {
        let entry = by_category.entry(expense.category.as_str()).or_insert((0.0, 0));
        entry.0 += expense.amount;
        entry.1 += 1;
    }

    let mut result: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, (total, expense_count))| CategoryTotal {
            category: category.to_string(),
            total,
            expense_count,
        })
        .collect();

    result.sort_by(|a, b| match b.total.total_cmp(&a.total) {
        Ordering::Equal => a.category.cmp(&b.category),
        other => other,
    });
    result
}

/// Sums amounts per time bucket, oldest bucket first.
pub fn aggregate_by_period(expenses: &[Expense], granularity: Granularity) -> Vec<PeriodTotal> {
    let mut by_period: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

    for expense in expenses {
        let entry = by_period
            .entry(granularity.truncate(expense.date))
            .or_insert((0.0, 0));
        entry.0 += expense.amount;
        entry.1 += 1;
    }

    by_period
        .into_iter()
        .map(|(period_start, (total, expense_count))| PeriodTotal {
            period_start,
            label: granularity.period_label(period_start),
            total,
            expense_count,
        })
        .collect()
}

pub fn grand_total(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}
