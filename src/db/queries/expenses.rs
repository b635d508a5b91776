use crate::error::{AppError, AppResult};
use crate::models::{Expense, NewExpense, UserId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, trace};

const EXPENSE_COLUMNS: &str = "id, user_id, category, amount, description, date";

fn map_expense(row: &Row<'_>) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category: row.get(2)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        date: row.get(5)?,
    })
}

/// All expenses owned by `user_id`, newest first.
pub fn list_expenses_for_user(conn: &Connection, user_id: UserId) -> rusqlite::Result<Vec<Expense>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EXPENSE_COLUMNS} FROM expenses
         WHERE user_id = ?
         ORDER BY date DESC, id DESC"
    ))?;

    let expenses = stmt
        .query_map([user_id], map_expense)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(user_id, count = expenses.len(), "Listed expenses");
    Ok(expenses)
}

/// Looks up an expense regardless of owner. Callers must check ownership.
pub fn find_expense_by_id(conn: &Connection, id: i64) -> AppResult<Expense> {
    trace!(expense_id = id, "Fetching expense");
    conn.query_row(
        &format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?"),
        [id],
        map_expense,
    )
    .optional()?
    .ok_or_else(|| AppError::NotFound(format!("Expense {} not found", id)))
}

pub fn create_expense(
    conn: &Connection,
    user_id: UserId,
    expense: &NewExpense,
) -> rusqlite::Result<Expense> {
    conn.execute(
        "INSERT INTO expenses (user_id, category, amount, description, date)
         VALUES (?, ?, ?, ?, ?)",
        params![
            user_id,
            expense.category,
            expense.amount,
            expense.description,
            expense.date,
        ],
    )?;

    let id = conn.last_insert_rowid();
    debug!(expense_id = id, user_id, amount = expense.amount, "Created expense");

    Ok(Expense {
        id,
        user_id,
        category: expense.category.clone(),
        amount: expense.amount,
        description: expense.description.clone(),
        date: expense.date,
    })
}

/// Overwrites the editable fields. The owner column is never touched.
pub fn update_expense(conn: &Connection, id: i64, expense: &NewExpense) -> AppResult<()> {
    let rows = conn.execute(
        "UPDATE expenses SET category = ?, amount = ?, description = ?, date = ?,
         updated_at = datetime('now')
         WHERE id = ?",
        params![
            expense.category,
            expense.amount,
            expense.description,
            expense.date,
            id,
        ],
    )?;

    if rows == 0 {
        return Err(AppError::NotFound(format!("Expense {} not found", id)));
    }

    debug!(expense_id = id, "Updated expense");
    Ok(())
}

pub fn delete_expense(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM expenses WHERE id = ?", [id])?;
    if rows > 0 {
        debug!(expense_id = id, "Deleted expense");
    }
    Ok(rows > 0)
}

/// Inserts every row for `user_id` in a single transaction. If any insert
/// fails nothing is committed.
pub fn insert_expenses(
    conn: &mut Connection,
    user_id: UserId,
    expenses: &[NewExpense],
) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO expenses (user_id, category, amount, description, date)
             VALUES (?, ?, ?, ?, ?)",
        )?;
        for expense in expenses {
            stmt.execute(params![
                user_id,
                expense.category,
                expense.amount,
                expense.description,
                expense.date,
            ])?;
        }
    }
    tx.commit()?;

    debug!(user_id, count = expenses.len(), "Bulk inserted expenses");
    Ok(expenses.len())
}
