use rusqlite::{params, Connection};

fn window_modifier(window_minutes: u32) -> String {
    format!("-{} minutes", window_minutes)
}

/// Failed login attempts for `username` within the last `window_minutes`.
pub fn count_recent_failures(
    conn: &Connection,
    username: &str,
    window_minutes: u32,
) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM login_attempts
         WHERE username = ? AND attempted_at > datetime('now', ?)",
        params![username, window_modifier(window_minutes)],
        |row| row.get(0),
    )
}

/// Records a failure, dropping every attempt that has already left the window.
pub fn record_failure(
    conn: &Connection,
    username: &str,
    window_minutes: u32,
) -> rusqlite::Result<()> {
    prune_failures(conn, window_minutes)?;
    conn.execute("INSERT INTO login_attempts (username) VALUES (?)", [username])?;
    Ok(())
}

/// Deletes attempts older than `window_minutes`, for all usernames.
pub fn prune_failures(conn: &Connection, window_minutes: u32) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM login_attempts WHERE attempted_at <= datetime('now', ?)",
        [window_modifier(window_minutes)],
    )
}

pub fn clear_failures(conn: &Connection, username: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM login_attempts WHERE username = ?", [username])?;
    Ok(())
}
