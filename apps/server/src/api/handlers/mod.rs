//! Request/response adapters.
//!
//! Handlers decode and validate input, call one service, and wrap the result in
//! the JSON envelope. Business rules live in `crate::services`.

pub mod batch;
pub mod dashboard;
pub mod health;
pub mod parent;
pub mod ppdb;
pub mod student;
pub mod user;

use crate::error::Entity;
use crate::i18n::Locale;
use crate::models::required_field_errors;
use crate::{Error, Result};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use serde::Deserialize;
use validator::Validate;

/// Unwrap a JSON body, turning malformed input into `InvalidBody`.
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| Error::InvalidBody(rejection.body_text()))
}

pub(crate) fn query_params<T>(query: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| Error::field("query", rejection.body_text()))
}

/// Parse a path id; anything but a positive integer is `InvalidId`.
pub(crate) fn parse_id(raw: &str, entity: Entity) -> Result<i32> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(Error::InvalidId(entity))
}

pub(crate) fn validate_payload<T: Validate>(payload: &T, locale: Locale) -> Result<()> {
    payload
        .validate()
        .map_err(|e| Error::Validation(required_field_errors(&e, locale, None)))
}

/// `?limit=&page=&q=`
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub q: Option<String>,
}
