//! # Admin Sessions
//!
//! ## Server
//! - Login checks the admin password and hands out a cookie holding an HMAC signed timestamp
//! - Cookie has no Max-Age, so the browser drops it when the session ends
//! - Every admin and import request must carry a cookie whose signature checks out and whose
//!   timestamp is younger than the configured lifetime
//! - Logout overwrites the cookie with an expired one
//!
//! ## Client
//! - [`SessionFlag`] is the browser-session boolean the admin pages look at before rendering
//! - It only decides which view to show, the server still checks the cookie on every request
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use cookie::{Cookie, SameSite};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::{error::AppError, state::AppState};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "admin_session";
pub const LOGIN_PATH: &str = "/admin/login";

pub struct SessionKeys {
    secret: Vec<u8>,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    fn mac(&self) -> Result<HmacSha256, AppError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AppError::Config(format!("SESSION_SECRET: {e}")))
    }

    /// `<issued_at>.<hex signature>`
    pub fn issue(&self, issued_at: i64) -> Result<String, AppError> {
        let mut mac = self.mac()?;
        mac.update(issued_at.to_string().as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{issued_at}.{signature}"))
    }

    pub fn verify(&self, token: &str, now: i64) -> bool {
        let Some((issued_at, signature)) = token.split_once('.') else {
            return false;
        };
        let Ok(timestamp) = issued_at.parse::<i64>() else {
            return false;
        };
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };

        let age = now - timestamp;
        if age < 0 || age as u64 > self.ttl.as_secs() {
            return false;
        }

        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(issued_at.as_bytes());

        mac.verify_slice(&signature).is_ok()
    }
}

pub fn password_matches(expected: &str, given: &str) -> bool {
    expected.as_bytes().ct_eq(given.as_bytes()).into()
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

pub fn expired_cookie() -> Cookie<'static> {
    let mut cookie = session_cookie(String::new());
    cookie.make_removal();
    cookie
}

pub fn set_cookie_header(cookie: &Cookie<'_>) -> Result<HeaderMap, AppError> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| AppError::InternalError(Box::new(e)))?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, value);
    Ok(headers)
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Middleware for every route that reads or writes admin data.
pub async fn require_session(
    State(state): State<std::sync::Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authenticated = session_token(request.headers())
        .is_some_and(|token| state.sessions.verify(&token, Utc::now().timestamp()));

    if !authenticated {
        warn!("Rejected unauthenticated {} {}", request.method(), request.uri());
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Authenticated,
    Unauthenticated,
}

/// Browser-session scoped login flag. Starts unauthenticated and is never persisted.
#[derive(Debug, Default)]
pub struct SessionFlag {
    authenticated: AtomicBool,
}

impl SessionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Session {
        if self.authenticated.load(Ordering::SeqCst) {
            Session::Authenticated
        } else {
            Session::Unauthenticated
        }
    }

    pub fn sign_in(&self) {
        self.authenticated.store(true, Ordering::SeqCst);
    }

    /// Clears the flag and returns where the page should go next.
    pub fn sign_out(&self) -> &'static str {
        self.authenticated.store(false, Ordering::SeqCst);
        LOGIN_PATH
    }
}
