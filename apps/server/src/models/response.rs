//! JSON envelope shared by every endpoint.

use super::Pagination;
use crate::error::FieldErrors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
}

impl From<Pagination> for PageMeta {
    fn from(p: Pagination) -> Self {
        Self {
            page: p.page,
            limit: p.limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            status: status.as_u16(),
            message: message.into(),
            data: Some(data),
            meta: None,
            errors: None,
        }
    }

    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::success(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::success(StatusCode::CREATED, message, data)
    }

    pub fn with_meta(mut self, meta: impl Into<PageMeta>) -> Self {
        self.meta = Some(meta.into());
        self
    }
}

impl Envelope<()> {
    /// Success without a payload (deletes, logout).
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status: status.as_u16(),
            message: message.into(),
            data: None,
            meta: None,
            errors: None,
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>, errors: Option<FieldErrors>) -> Self {
        Self {
            success: false,
            status: status.as_u16(),
            message: message.into(),
            data: None,
            meta: None,
            errors,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}
