use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::models::UserId;

fn age_modifier(max_age_hours: u32) -> String {
    format!("-{} hours", max_age_hours)
}

pub fn create_session(conn: &Connection, token: &str, user_id: UserId) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO sessions (token, user_id) VALUES (?, ?)",
        params![token, user_id],
    )?;
    debug!(user_id, "Created session");
    Ok(())
}

/// The user a session token belongs to, if the session is younger than
/// `max_age_hours`. Tokens of deleted users are gone with the cascade, so a
/// hit always names an existing user.
pub fn find_session_user(
    conn: &Connection,
    token: &str,
    max_age_hours: u32,
) -> rusqlite::Result<Option<UserId>> {
    conn.query_row(
        "SELECT s.user_id FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.token = ? AND s.created_at > datetime('now', ?)",
        params![token, age_modifier(max_age_hours)],
        |row| row.get(0),
    )
    .optional()
}

pub fn delete_session(conn: &Connection, token: &str) -> rusqlite::Result<bool> {
    let rows = conn.execute("DELETE FROM sessions WHERE token = ?", [token])?;
    Ok(rows > 0)
}

/// Deletes sessions older than `max_age_hours`.
pub fn prune_sessions(conn: &Connection, max_age_hours: u32) -> rusqlite::Result<usize> {
    let rows = conn.execute(
        "DELETE FROM sessions WHERE created_at <= datetime('now', ?)",
        [age_modifier(max_age_hours)],
    )?;
    if rows > 0 {
        debug!(rows, "Pruned expired sessions");
    }
    Ok(rows)
}
