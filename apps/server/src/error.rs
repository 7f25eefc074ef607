//! Crate-wide error type and its HTTP mapping.

use crate::i18n::Locale;
use crate::models::response::Envelope;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::BTreeMap;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Field name -> human readable message.
pub type FieldErrors = BTreeMap<String, String>;

/// Record kinds named in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Student,
    Parent,
    Batch,
}

impl Entity {
    pub fn label(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Entity::Student, Locale::En) => "student",
            (Entity::Student, Locale::Id) => "siswa",
            (Entity::Parent, Locale::En) => "parent",
            (Entity::Parent, Locale::Id) => "orang tua",
            (Entity::Batch, Locale::En) => "batch",
            (Entity::Batch, Locale::Id) => "gelombang",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label(Locale::En))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),

    #[error("Invalid {0} ID")]
    InvalidId(Entity),

    /// A uniqueness constraint was violated; `field` is the wire name (`nisn`, `nik`, ...).
    #[error("{field} already exists")]
    DuplicateIdentifier { field: String },

    #[error("Currently there is no active batch")]
    NoActiveBatch,

    #[error("Batch has invalid start_date or end_date")]
    InvalidBatchWindow,

    #[error("The registration period has not started yet")]
    RegistrationNotYetOpen,

    #[error("The registration period has ended")]
    RegistrationClosed,

    #[error("There is already an active batch (id {active_id})")]
    BatchAlreadyActive { active_id: i32 },

    #[error("{entity} cannot be deleted because it has associated {dependents}")]
    ReferentialConstraint { entity: Entity, dependents: Entity },

    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },

    #[error("Missing session")]
    MissingSession,

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(entity: Entity, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), message.into());
        Error::Validation(errors)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::InvalidBody(_)
            | Error::InvalidId(_)
            | Error::DuplicateIdentifier { .. }
            | Error::NoActiveBatch
            | Error::InvalidBatchWindow
            | Error::RegistrationNotYetOpen
            | Error::RegistrationClosed
            | Error::BatchAlreadyActive { .. }
            | Error::ReferentialConstraint { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::MissingSession | Error::InvalidSession(_) => StatusCode::UNAUTHORIZED,
            Error::Database(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Top-level `message` of the response envelope.
    pub fn message(&self, locale: Locale) -> String {
        match self {
            Error::Validation(_) => locale.pick("Validation failed", "Validasi gagal").into(),
            Error::InvalidBody(_) => locale
                .pick("Validation failed", "Format data tidak valid")
                .into(),
            Error::InvalidId(entity) => match locale {
                Locale::En => format!("Invalid {} ID", entity.label(locale)),
                Locale::Id => format!("ID {} tidak valid", entity.label(locale)),
            },
            Error::DuplicateIdentifier { field } => duplicate_message(field, locale),
            Error::NoActiveBatch => locale
                .pick(
                    "Currently there is no active batch",
                    "Saat ini tidak ada gelombang pendaftaran yang aktif",
                )
                .into(),
            Error::InvalidBatchWindow => locale
                .pick(
                    "Batch has invalid start_date or end_date",
                    "Gelombang pendaftaran belum memiliki tanggal mulai dan tanggal selesai",
                )
                .into(),
            Error::RegistrationNotYetOpen => locale
                .pick(
                    "The registration period has not started yet",
                    "Periode pendaftaran belum dibuka",
                )
                .into(),
            Error::RegistrationClosed => locale
                .pick(
                    "The registration period has ended",
                    "Periode pendaftaran telah berakhir",
                )
                .into(),
            Error::BatchAlreadyActive { .. } => locale
                .pick(
                    "There is already an active batch",
                    "Sudah ada gelombang pendaftaran yang aktif",
                )
                .into(),
            Error::ReferentialConstraint { entity, dependents } => match locale {
                Locale::En => format!(
                    "{} cannot be deleted because it has associated {}s",
                    capitalize(entity.label(locale)),
                    dependents.label(locale)
                ),
                Locale::Id => format!(
                    "{} tidak dapat dihapus karena masih memiliki data {}",
                    capitalize(entity.label(locale)),
                    dependents.label(locale)
                ),
            },
            Error::NotFound { entity, .. } => match locale {
                Locale::En => format!("{} not found", capitalize(entity.label(locale))),
                Locale::Id => format!("{} tidak ditemukan", capitalize(entity.label(locale))),
            },
            Error::MissingSession | Error::InvalidSession(_) => {
                locale.pick("Unauthorized", "Tidak memiliki akses").into()
            }
            Error::Database(_) | Error::Internal(_) => locale
                .pick("Internal server error", "Terjadi kesalahan pada server")
                .into(),
        }
    }

    /// The `errors` map of the response envelope, if the kind carries one.
    pub fn field_errors(&self, locale: Locale) -> Option<FieldErrors> {
        match self {
            Error::Validation(errors) => Some(errors.clone()),
            Error::InvalidBody(_) => Some(single("body", "Invalid JSON format")),
            Error::DuplicateIdentifier { field } => {
                Some(single(field, duplicate_message(field, locale)))
            }
            Error::InvalidSession(msg) => Some(single("session", msg.clone())),
            Error::Database(e) => Some(single("server", e.to_string())),
            Error::Internal(msg) => Some(single("server", msg.clone())),
            _ => None,
        }
    }

    /// Render this error as an envelope response in the given locale.
    pub fn into_localized_response(self, locale: Locale) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = Envelope::<()>::failure(status, self.message(locale), self.field_errors(locale));
        (status, axum::Json(body)).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_localized_response(Locale::En)
    }
}

fn duplicate_message(field: &str, locale: Locale) -> String {
    let label = field.to_ascii_uppercase();
    match locale {
        Locale::En => format!("{label} already exists"),
        Locale::Id => format!("{label} sudah terdaftar"),
    }
}

fn single(field: &str, message: impl Into<String>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), message.into());
    errors
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
