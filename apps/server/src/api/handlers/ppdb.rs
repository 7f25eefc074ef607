//! Public admissions form.

use super::{json_body, validate_payload};
use crate::i18n::Locale;
use crate::models::{Envelope, NewStudent, Student};
use crate::{state::AppState, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};

/// `POST /ppdb/add`. Messages are Indonesian unless the caller prefers English.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<NewStudent>, JsonRejection>,
) -> Response {
    let locale = Locale::from_headers(&headers, Locale::Id);

    match register_candidate(&state, locale, payload).await {
        Ok(student) => Envelope::created(
            locale.pick(
                "Registration successful! Your data has been received.",
                "Pendaftaran berhasil! Data Anda telah kami terima.",
            ),
            student,
        )
        .into_response(),
        Err(e) => e.into_localized_response(locale),
    }
}

async fn register_candidate(
    state: &AppState,
    locale: Locale,
    payload: std::result::Result<Json<NewStudent>, JsonRejection>,
) -> Result<Student> {
    let candidate = json_body(payload)?.normalize();
    validate_payload(&candidate, locale)?;
    state.services.enrollment.register_admission(candidate).await
}
