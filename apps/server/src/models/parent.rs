use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Guardian information; every field is optional free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(default)]
pub struct ParentDetails {
    pub father_name: Option<String>,
    pub father_education: Option<String>,
    pub father_job: Option<String>,
    pub father_income: Option<String>,
    pub mother_name: Option<String>,
    pub mother_education: Option<String>,
    pub mother_job: Option<String>,
    pub mother_income: Option<String>,
    pub parent_email: Option<String>,
    pub wali_name: Option<String>,
    pub alamat_ortu_wali: Option<String>,
    pub no_hp_ortu_wali: Option<String>,
}

impl ParentDetails {
    /// Overlay the fields present in `changes`.
    pub fn merge(&mut self, changes: ParentDetails) {
        overlay!(self, changes;
            father_name, father_education, father_job, father_income,
            mother_name, mother_education, mother_job, mother_income,
            parent_email, wali_name, alamat_ortu_wali, no_hp_ortu_wali,
        );
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Parent {
    pub id: i32,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub details: ParentDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
