//! Admin session handling.
//!
//! A single shared admin password; a successful login yields an HS256 token in
//! an HttpOnly cookie. Non-browser clients may send the same token as
//! `Authorization: Bearer`. With no password configured the admin surface is open.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::{config::AuthConfig, state::AppState, Error, Result};

const SESSION_COOKIE: &str = "ppdb_session";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    iat: usize,
    exp: usize,
}

#[derive(Clone)]
pub struct SessionManager {
    password: Option<String>,
    ttl_seconds: usize,
    secret: Vec<u8>,
}

impl SessionManager {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = match &config.session_secret {
            Some(s) if !s.is_empty() => s.as_bytes().to_vec(),
            _ => {
                if config.admin_password.is_some() {
                    tracing::warn!(
                        "Admin password set but `auth.session_secret` is not; sessions reset on restart"
                    );
                }
                format!("{}{}", Uuid::new_v4(), Uuid::new_v4()).into_bytes()
            }
        };

        Self {
            password: config.admin_password.clone(),
            ttl_seconds: config.session_ttl_seconds as usize,
            secret,
        }
    }

    pub fn requires_auth(&self) -> bool {
        self.password.is_some()
    }

    pub fn verify_password(&self, provided: &str) -> bool {
        let Some(expected) = &self.password else {
            return true;
        };
        constant_time_eq(expected.as_bytes(), provided.as_bytes())
    }

    /// Sign a fresh session token.
    pub fn issue_token(&self) -> Result<String> {
        let now = now_epoch_seconds();
        let claims = SessionClaims {
            sub: "admin".to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| Error::Internal(format!("Failed to sign session token: {e}")))
    }

    pub fn session_cookie(&self, token: &str, is_https: bool) -> Result<HeaderValue> {
        let cookie = build_set_cookie(SESSION_COOKIE, token, self.ttl_seconds, is_https);
        HeaderValue::from_str(&cookie).map_err(|e| Error::Internal(e.to_string()))
    }

    pub fn clear_session_cookie(&self, is_https: bool) -> HeaderValue {
        let cookie = build_clear_cookie(SESSION_COOKIE, is_https);
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
    }

    pub fn validate_session(&self, headers: &HeaderMap) -> Result<()> {
        if let Some(authz) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        {
            if let Some(token) = authz
                .strip_prefix("Bearer ")
                .or_else(|| authz.strip_prefix("bearer "))
            {
                return self.validate_token(token);
            }
        }

        let token = extract_cookie_value(headers, SESSION_COOKIE).ok_or(Error::MissingSession)?;
        self.validate_token(&token)
    }

    fn validate_token(&self, token: &str) -> Result<()> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        decode::<SessionClaims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map_err(|e| Error::InvalidSession(e.to_string()))?;
        Ok(())
    }
}

/// Guards the admin routes. A no-op when no admin password is configured.
pub async fn session_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !state.session.requires_auth() || req.method() == axum::http::Method::OPTIONS {
        return next.run(req).await;
    }

    match state.session.validate_session(req.headers()) {
        Ok(()) => next.run(req).await,
        Err(e) => {
            let mut response = e.into_response();
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            response
        }
    }
}

pub fn is_https(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}

fn now_epoch_seconds() -> usize {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as usize
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

fn extract_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|part| part.trim().split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim().to_string())
}

fn build_set_cookie(name: &str, value: &str, max_age_seconds: usize, is_https: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, value, max_age_seconds
    );
    if is_https {
        cookie.push_str("; Secure");
    }
    cookie
}

fn build_clear_cookie(name: &str, is_https: bool) -> String {
    let mut cookie = format!("{name}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
    if is_https {
        cookie.push_str("; Secure");
    }
    cookie
}
