//! Admin student management.

use super::{json_body, parse_id, query_params, PageQuery};
use crate::error::Entity;
use crate::models::{Envelope, NewStudent, StudentChanges, StudentFilter};
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
use serde::Deserialize;

/// `?limit=&page=&q=&batch_id=&accepted=`
#[derive(Debug, Default, Deserialize)]
pub struct StudentListQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub q: Option<String>,
    pub batch_id: Option<i32>,
    pub accepted: Option<bool>,
}

pub async fn create_student(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewStudent>, JsonRejection>,
) -> Result<Response> {
    let candidate = json_body(payload)?;

    let student = state.services.enrollment.create_student_admin(candidate).await?;
    Ok(Envelope::created("Student created successfully", student).into_response())
}

/// `POST /student/bulk-add` with a JSON array of students; errors are keyed by index.
pub async fn create_students_bulk(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Vec<NewStudent>>, JsonRejection>,
) -> Result<Response> {
    let candidates = json_body(payload)?;

    let students = state
        .services
        .enrollment
        .create_students_bulk(candidates)
        .await?;
    Ok(Envelope::created("All students created successfully", students).into_response())
}

pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_id(&id, Entity::Student)?;
    let student = state.services.students.get(id).await?;
    Ok(Envelope::ok("Student retrieved successfully", student).into_response())
}

pub async fn list_students(
    State(state): State<AppState>,
    query: std::result::Result<Query<StudentListQuery>, QueryRejection>,
) -> Result<Response> {
    let query = query_params(query)?;
    let filter = StudentFilter {
        pagination: state.pagination(query.limit, query.page),
        search: query.q,
        batch_id: query.batch_id,
        accepted: query.accepted,
    };

    let students = state.services.students.list(&filter).await?;
    Ok(Envelope::ok("Students retrieved successfully", students)
        .with_meta(filter.pagination)
        .into_response())
}

/// `GET /student/batch/:year`
pub async fn list_students_by_batch_year(
    State(state): State<AppState>,
    Path(year): Path<String>,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Response> {
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|_| Error::field("year", "year must be a number"))?;
    let query = query_params(query)?;
    let filter = StudentFilter {
        pagination: state.pagination(query.limit, query.page),
        search: query.q,
        ..Default::default()
    };
    let pagination = filter.pagination;

    let students = state
        .services
        .students
        .list_by_batch_year(year, filter)
        .await?;
    Ok(Envelope::ok("Students retrieved successfully", students)
        .with_meta(pagination)
        .into_response())
}

pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<StudentChanges>, JsonRejection>,
) -> Result<Response> {
    let id = parse_id(&id, Entity::Student)?;
    let changes = json_body(payload)?;

    let student = state.services.students.update(id, changes).await?;
    Ok(Envelope::ok("Student updated successfully", student).into_response())
}

pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = parse_id(&id, Entity::Student)?;
    state.services.students.delete(id).await?;
    Ok(Envelope::message(StatusCode::OK, "Student deleted successfully").into_response())
}
