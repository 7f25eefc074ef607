//! Domain records and request/response payloads.

/// Declare a closed set of text values stored as-is in the database and on the wire.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(format!(
                        "unknown {} value '{}'",
                        stringify!($name),
                        other
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Copy every `Some` field of `$source` onto `$target`.
macro_rules! overlay {
    ($target:expr, $source:expr; $($field:ident),+ $(,)?) => {
        $(
            if $source.$field.is_some() {
                $target.$field = $source.$field;
            }
        )+
    };
}

pub mod batch;
pub mod parent;
pub mod response;
pub mod student;

pub use batch::{Batch, BatchChanges, NewBatch};
pub use parent::{Parent, ParentDetails};
pub use response::{Envelope, PageMeta};
pub use student::{
    BloodType, FamilyStatus, Gender, LivingWith, NewStudent, ParentStatus, Religion, Student,
    StudentChanges, StudentFilter, StudentProfile, StudentRecord,
};

use crate::error::FieldErrors;
use crate::i18n::Locale;
use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;
use validator::ValidationErrors;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub page: i64,
}

impl Pagination {
    pub fn new(limit: Option<i64>, page: Option<i64>) -> Self {
        Self::with_bounds(limit, page, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT)
    }

    /// Non-positive or missing values fall back to the defaults; `limit` is capped at `max_limit`.
    pub fn with_bounds(
        limit: Option<i64>,
        page: Option<i64>,
        default_limit: i64,
        max_limit: i64,
    ) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => l.min(max_limit),
            _ => default_limit,
        };
        let page = match page {
            Some(p) if p > 0 => p,
            _ => 1,
        };
        Self { limit, page }
    }

    /// Saturates instead of overflowing on absurd page numbers.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Message for a missing required field.
pub fn required_message(field: &str, locale: Locale) -> String {
    match (locale, field) {
        (Locale::Id, "full_name") => "Nama lengkap wajib diisi".to_string(),
        (Locale::Id, "gender") => "Jenis kelamin wajib diisi".to_string(),
        (Locale::Id, "name") => "Nama wajib diisi".to_string(),
        (Locale::Id, "year") => "Tahun wajib diisi".to_string(),
        (Locale::Id, other) => format!("{other} wajib diisi"),
        (Locale::En, other) => format!("{other} is required"),
    }
}

/// Flatten `validator` output into the envelope's field map.
///
/// Every rule used on request payloads is a presence rule, so each failing field
/// maps to its "required" message. `prefix` keys entries as `"<prefix>.<field>"`.
pub fn required_field_errors(
    errors: &ValidationErrors,
    locale: Locale,
    prefix: Option<usize>,
) -> FieldErrors {
    errors
        .field_errors()
        .keys()
        .map(|field| {
            let key = match prefix {
                Some(index) => format!("{index}.{field}"),
                None => field.to_string(),
            };
            (key, required_message(field, locale))
        })
        .collect()
}

/// Deserialize an optional text value, treating `""` (and whitespace) like `null`.
pub(crate) fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
