use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::error::AppError;
use crate::models::NewExpense;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Why an upload was rejected. Any one of these aborts the whole import.
#[derive(Debug, Error, PartialEq)]
pub enum ImportError {
    #[error("file is not valid UTF-8")]
    InvalidUtf8,

    #[error("could not read CSV: {0}")]
    Malformed(String),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: invalid amount '{value}'")]
    InvalidAmount { row: usize, value: String },

    #[error("row {row}: invalid date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { row: usize, value: String },

    #[error("row {row}: category is required")]
    MissingCategory { row: usize },

    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ImportColumns {
    category: usize,
    amount: usize,
    date: usize,
    description: Option<usize>,
}

impl ImportColumns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, ImportError> {
        Ok(Self {
            category: find_column(headers, "category")
                .ok_or(ImportError::MissingColumn("Category"))?,
            amount: find_column(headers, "amount").ok_or(ImportError::MissingColumn("Amount"))?,
            date: find_column(headers, "date").ok_or(ImportError::MissingColumn("Date"))?,
            description: find_column(headers, "description"),
        })
    }
}

/// Parses an uploaded expense file with columns Category, Amount, Date and an
/// optional Description. Returns every row or the first error; never a subset.
pub fn parse_expense_csv(content: &[u8]) -> Result<Vec<NewExpense>, ImportError> {
    trace!(content_size = content.len(), "Starting CSV parsing");

    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    let content_str = std::str::from_utf8(content).map_err(|_| ImportError::InvalidUtf8)?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content_str.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ImportError::Malformed(e.to_string()))?
        .clone();
    let columns = ImportColumns::from_headers(&headers)?;
    debug!(column_count = headers.len(), "CSV headers parsed");

    let mut expenses = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        // Header is row 1.
        let row = row_idx + 2;
        let record = result.map_err(|e| ImportError::Malformed(format!("row {}: {}", row, e)))?;

        match parse_row(&record, &columns, row) {
            Ok(expense) => expenses.push(expense),
            Err(e) => {
                warn!(row, error = %e, "Rejecting CSV import");
                return Err(e);
            }
        }
    }

    debug!(row_count = expenses.len(), "CSV parsing completed");
    Ok(expenses)
}

fn parse_row(
    record: &csv::StringRecord,
    columns: &ImportColumns,
    row: usize,
) -> Result<NewExpense, ImportError> {
    let field = |col: usize| record.get(col).unwrap_or("").trim();

    let category = field(columns.category);
    let amount = field(columns.amount);
    let date = field(columns.date);
    let description = columns.description.map(field).unwrap_or("");

    if category.is_empty() {
        return Err(ImportError::MissingCategory { row });
    }
    // A blank date means "today" in the web form, but not in a file.
    if date.is_empty() {
        return Err(ImportError::InvalidDate {
            row,
            value: String::new(),
        });
    }

    NewExpense::parse(category, amount, description, date).map_err(|e| match e {
        AppError::InvalidDateFormat(value) => ImportError::InvalidDate { row, value },
        AppError::InvalidAmount(value) => ImportError::InvalidAmount { row, value },
        other => ImportError::InvalidRow {
            row,
            message: other.to_string(),
        },
    })
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
}
