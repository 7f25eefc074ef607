use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An admissions intake period ("gelombang").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Batch {
    pub id: i32,
    pub name: String,
    pub year: i32,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Registration window, only when both bounds are set.
    pub fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.start_date?, self.end_date?))
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewBatch {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    #[validate(required)]
    pub year: Option<i32>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl NewBatch {
    pub fn normalize(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl BatchChanges {
    pub fn apply_to(self, batch: &mut Batch) {
        if let Some(name) = self.name {
            batch.name = name;
        }
        if let Some(year) = self.year {
            batch.year = year;
        }
        if let Some(is_active) = self.is_active {
            batch.is_active = is_active;
        }
        if self.start_date.is_some() {
            batch.start_date = self.start_date;
        }
        if self.end_date.is_some() {
            batch.end_date = self.end_date;
        }
    }
}
