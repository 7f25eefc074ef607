//! Admin parent management.

use super::{json_body, parse_id, query_params, PageQuery};
use crate::error::Entity;
use crate::models::{Envelope, ParentDetails};
use crate::{state::AppState, Result};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

pub async fn create_parent(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ParentDetails>, JsonRejection>,
) -> Result<Response> {
    let parent = state.services.parents.create(json_body(payload)?).await?;
    Ok(Envelope::created("Parent created successfully", parent).into_response())
}

pub async fn get_parent(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let id = parse_id(&id, Entity::Parent)?;
    let parent = state.services.parents.get(id).await?;
    Ok(Envelope::ok("Parent retrieved successfully", parent).into_response())
}

pub async fn list_parents(
    State(state): State<AppState>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Response> {
    let query = query_params(query)?;
    let page = state.pagination(query.limit, query.page);

    let parents = state.services.parents.list(page).await?;
    Ok(Envelope::ok("Parents retrieved successfully", parents)
        .with_meta(page)
        .into_response())
}

pub async fn update_parent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ParentDetails>, JsonRejection>,
) -> Result<Response> {
    let id = parse_id(&id, Entity::Parent)?;
    let changes = json_body(payload)?;

    let parent = state.services.parents.update(id, changes).await?;
    Ok(Envelope::ok("Parent updated successfully", parent).into_response())
}

pub async fn delete_parent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_id(&id, Entity::Parent)?;
    state.services.parents.delete(id).await?;
    Ok(Envelope::message(StatusCode::OK, "Parent deleted successfully").into_response())
}
