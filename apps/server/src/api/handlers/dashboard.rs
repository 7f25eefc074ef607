use crate::models::Envelope;
use crate::{state::AppState, Result};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

pub async fn get_dashboard(State(state): State<AppState>) -> Result<Response> {
    let summary = state.services.dashboard.summary().await?;
    Ok(Envelope::ok("Dashboard data retrieved successfully", summary).into_response())
}
