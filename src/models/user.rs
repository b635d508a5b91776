use serde::Serialize;

pub type UserId = i64;

/// A registered account. The password is only ever held as an Argon2 PHC string.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: String,
}

pub const MAX_USERNAME_LEN: usize = 50;
