use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub migrations_path: PathBuf,
    /// Mark the session cookie `Secure`. Enable when served behind HTTPS.
    pub secure_cookies: bool,
    /// Failed logins allowed per username inside `login_window_minutes`. Zero disables the limit.
    pub max_login_attempts: u32,
    pub login_window_minutes: u32,
    /// Sessions older than this are rejected and pruned.
    pub session_max_age_hours: u32,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            database_path: PathBuf::from("data/family_finance.db"),
            migrations_path: PathBuf::from("migrations"),
            secure_cookies: false,
            max_login_attempts: 5,
            login_window_minutes: 15,
            session_max_age_hours: 7 * 24,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Self {
            host: env::var("FAMILY_FINANCE_HOST").unwrap_or(defaults.host),
            port: parse_var("FAMILY_FINANCE_PORT").unwrap_or(defaults.port),
            database_path: env::var("FAMILY_FINANCE_DATABASE_URL")
                .map(|v| {
                    PathBuf::from(
                        v.strip_prefix("sqlite://")
                            .or_else(|| v.strip_prefix("sqlite:"))
                            .unwrap_or(&v),
                    )
                })
                .unwrap_or(defaults.database_path),
            migrations_path: env::var("FAMILY_FINANCE_MIGRATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.migrations_path),
            secure_cookies: env::var("FAMILY_FINANCE_SECURE_COOKIES")
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.secure_cookies),
            max_login_attempts: parse_var("FAMILY_FINANCE_MAX_LOGIN_ATTEMPTS")
                .unwrap_or(defaults.max_login_attempts),
            login_window_minutes: parse_var("FAMILY_FINANCE_LOGIN_WINDOW_MINUTES")
                .unwrap_or(defaults.login_window_minutes),
            session_max_age_hours: parse_var::<u32>("FAMILY_FINANCE_SESSION_MAX_AGE_HOURS")
                .filter(|hours| *hours > 0)
                .unwrap_or(defaults.session_max_age_hours),
            max_upload_bytes: parse_var("FAMILY_FINANCE_MAX_UPLOAD_BYTES")
                .unwrap_or(defaults.max_upload_bytes),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(var = name, value = %value, "Ignoring unparsable environment variable");
            None
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
