//! One-shot notices carried across a redirect in a short-lived cookie.
//!
//! A handler calls [`set`] before redirecting; the next page that renders
//! calls [`take`], which reads the notice and deletes the cookie.

use tower_cookies::{Cookie, Cookies};

const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// CSS class used by the notice banner.
    pub fn css_class(&self) -> &'static str {
        self.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    fn encode(&self) -> String {
        format!("{}:{}", self.kind.as_str(), urlencoding::encode(&self.message))
    }

    fn decode(raw: &str) -> Option<Self> {
        let (kind, message) = raw.split_once(':')?;
        let kind = match kind {
            "success" => FlashKind::Success,
            "error" => FlashKind::Error,
            _ => return None,
        };
        let message = urlencoding::decode(message).ok()?.into_owned();
        Some(Self { kind, message })
    }
}

pub fn set(cookies: &Cookies, flash: Flash) {
    let cookie = Cookie::build((FLASH_COOKIE, flash.encode()))
        .path("/")
        .http_only(true)
        .same_site(tower_cookies::cookie::SameSite::Lax)
        .build();
    cookies.add(cookie);
}

pub fn success(cookies: &Cookies, message: impl Into<String>) {
    set(cookies, Flash::success(message));
}

pub fn error(cookies: &Cookies, message: impl Into<String>) {
    set(cookies, Flash::error(message));
}

/// Reads and clears the pending notice, if any.
pub fn take(cookies: &Cookies) -> Option<Flash> {
    let raw = cookies.get(FLASH_COOKIE)?.value().to_string();
    cookies.remove(Cookie::build((FLASH_COOKIE, "")).path("/").build());

    let flash = Flash::decode(&raw);
    if flash.is_none() {
        tracing::debug!("Discarding malformed flash cookie");
    }
    flash
}
