//! Enrollment batch management.

use super::{json_body, parse_id, query_params, PageQuery};
use crate::error::Entity;
use crate::models::{BatchChanges, Envelope, NewBatch};
use crate::{state::AppState, Error, Result};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

pub async fn create_batch(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewBatch>, JsonRejection>,
) -> Result<Response> {
    let batch = state.services.batches.create_batch(json_body(payload)?).await?;
    Ok(Envelope::created("Batch created successfully", batch).into_response())
}

pub async fn get_batch(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let id = parse_id(&id, Entity::Batch)?;
    let batch = state.services.batches.get_batch(id).await?;
    Ok(Envelope::ok("Batch retrieved successfully", batch).into_response())
}

/// `GET /batch/active`; 404 when no batch is active.
pub async fn get_active_batch(State(state): State<AppState>) -> Result<Response> {
    let batch = state
        .services
        .batches
        .active_batch()
        .await?
        .ok_or_else(|| Error::not_found(Entity::Batch, "active"))?;
    Ok(Envelope::ok("Batch retrieved successfully", batch).into_response())
}

pub async fn list_batches(
    State(state): State<AppState>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Response> {
    let query = query_params(query)?;
    let page = state.pagination(query.limit, query.page);

    let batches = state
        .services
        .batches
        .list_batches(page, query.q.as_deref())
        .await?;
    Ok(Envelope::ok("Batch list retrieved successfully", batches)
        .with_meta(page)
        .into_response())
}

pub async fn update_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<BatchChanges>, JsonRejection>,
) -> Result<Response> {
    let id = parse_id(&id, Entity::Batch)?;
    let changes = json_body(payload)?;

    let batch = state.services.batches.update_batch(id, changes).await?;
    Ok(Envelope::ok("Batch updated successfully", batch).into_response())
}

pub async fn delete_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_id(&id, Entity::Batch)?;
    state.services.batches.delete_batch(id).await?;
    Ok(Envelope::message(StatusCode::OK, "Batch deleted successfully").into_response())
}
