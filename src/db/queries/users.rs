use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{User, UserId};

/// SQLITE_CONSTRAINT_UNIQUE
const UNIQUE_CONSTRAINT_FAILED: i32 = 2067;

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn create_user(conn: &Connection, username: &str, password_hash: &str) -> AppResult<User> {
    let result = conn.execute(
        "INSERT INTO users (username, password_hash) VALUES (?, ?)",
        params![username, password_hash],
    );

    match result {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.extended_code == UNIQUE_CONSTRAINT_FAILED => {
            debug!(username, "Rejected duplicate username");
            return Err(AppError::DuplicateUsername);
        }
        Err(e) => return Err(e.into()),
    }

    let id = conn.last_insert_rowid();
    info!(user_id = id, "Created user");

    find_user_by_id(conn, id)?
        .ok_or_else(|| AppError::Internal(format!("User {} vanished after insert", id)))
}

pub fn find_user_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        [username],
        map_user,
    )
    .optional()
}

pub fn find_user_by_id(conn: &Connection, id: UserId) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, username, password_hash, created_at FROM users WHERE id = ?",
        [id],
        map_user,
    )
    .optional()
}

/// Removes a user together with their expenses and sessions (via cascade).
/// Not reachable from any route.
pub fn delete_user(conn: &Connection, id: UserId) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM users WHERE id = ?", [id])?;
    if rows > 0 {
        tracing::warn!(user_id = id, "Deleted user and all owned expenses");
    }
    Ok(rows > 0)
}
