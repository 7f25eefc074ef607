//! Admin login, logout and session probe.

use super::json_body;
use crate::models::Envelope;
use crate::session::is_https;
use crate::{state::AppState, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    /// Only set on login, for clients that cannot keep cookies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// `POST /user/login`
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response> {
    let request = json_body(payload)?;

    // No password configured = no auth required
    if !state.session.requires_auth() {
        return Ok(Envelope::ok(
            "Authentication is disabled",
            SessionStatus {
                authenticated: true,
                token: None,
            },
        )
        .into_response());
    }

    if !state.session.verify_password(&request.password) {
        tracing::warn!("Admin login failed");
        return Ok(Envelope::<()>::failure(
            StatusCode::UNAUTHORIZED,
            "Invalid password",
            None,
        )
        .into_response());
    }

    let token = state.session.issue_token()?;
    let cookie = state.session.session_cookie(&token, is_https(&headers))?;

    let mut response = Envelope::ok(
        "Login successful",
        SessionStatus {
            authenticated: true,
            token: Some(token),
        },
    )
    .into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    tracing::info!("Admin logged in");
    Ok(response)
}

/// `POST /user/logout`. Clears the cookie; bearer tokens simply expire.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut response = Envelope::ok(
        "Logout successful",
        SessionStatus {
            authenticated: false,
            token: None,
        },
    )
    .into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        state.session.clear_session_cookie(is_https(&headers)),
    );
    response
}

/// `GET /user/session`
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if state.session.requires_auth() {
        state.session.validate_session(&headers)?;
    }
    Ok(Envelope::ok(
        "Session is valid",
        SessionStatus {
            authenticated: true,
            token: None,
        },
    )
    .into_response())
}
