//! Persistence contracts and their PostgreSQL / in-memory implementations.

pub mod batch;
pub mod memory;
pub mod parent;
pub mod student;

pub use batch::PostgresBatchStore;
pub use memory::InMemoryStore;
pub use parent::PostgresParentStore;
pub use student::PostgresStudentStore;

use crate::models::{
    Batch, BatchChanges, NewBatch, Pagination, Parent, ParentDetails, Student, StudentFilter,
    StudentRecord,
};
use crate::{error::Entity, Error, Result};
use async_trait::async_trait;
use sqlx::{error::ErrorKind, PgPool};
use std::sync::Arc;

#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Duplicate `year` fails with `DuplicateIdentifier { field: "year" }`.
    async fn create(&self, batch: &NewBatch) -> Result<Batch>;

    /// The active batch; the lowest id wins if several are flagged.
    async fn get_active(&self) -> Result<Option<Batch>>;

    async fn get_by_id(&self, id: i32) -> Result<Option<Batch>>;

    async fn get_by_year(&self, year: i32) -> Result<Option<Batch>>;

    /// Apply the fields present in `changes`. `None` when the batch does not exist.
    async fn update(&self, id: i32, changes: &BatchChanges) -> Result<Option<Batch>>;

    /// `false` when nothing was deleted. Students still referencing the batch
    /// fail with `ReferentialConstraint`.
    async fn delete(&self, id: i32) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    /// Newest first; `search` matches the name case-insensitively.
    async fn list(&self, page: Pagination, search: Option<&str>) -> Result<Vec<Batch>>;
}

#[async_trait]
pub trait ParentStore: Send + Sync {
    async fn create(&self, details: &ParentDetails) -> Result<Parent>;

    async fn get_by_id(&self, id: i32) -> Result<Option<Parent>>;

    /// Overlay the fields present in `changes`.
    async fn update(&self, id: i32, changes: &ParentDetails) -> Result<Option<Parent>>;

    /// Detaches the parent from its student, if any.
    async fn delete(&self, id: i32) -> Result<bool>;

    async fn list(&self, page: Pagination) -> Result<Vec<Parent>>;
}

#[async_trait]
pub trait StudentStore: Send + Sync {
    /// Duplicate NISN/NIK fails with `DuplicateIdentifier`.
    async fn create(&self, record: &StudentRecord) -> Result<Student>;

    /// The student with its parent embedded.
    async fn get_by_id(&self, id: i32) -> Result<Option<Student>>;

    /// Replace every column with `record`.
    async fn update(&self, id: i32, record: &StudentRecord) -> Result<Option<Student>>;

    async fn delete(&self, id: i32) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    async fn count_by_batch(&self, batch_id: i32) -> Result<i64>;

    /// Ordered by full name, parents embedded.
    async fn list(&self, filter: &StudentFilter) -> Result<Vec<Student>>;
}

/// The three stores, sharing one backend.
#[derive(Clone)]
pub struct Stores {
    pub batches: Arc<dyn BatchStore>,
    pub parents: Arc<dyn ParentStore>,
    pub students: Arc<dyn StudentStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            batches: Arc::new(PostgresBatchStore::new(pool.clone())),
            parents: Arc::new(PostgresParentStore::new(pool.clone())),
            students: Arc::new(PostgresStudentStore::new(pool)),
        }
    }

    pub fn memory() -> Self {
        let store = InMemoryStore::new();
        Self {
            batches: Arc::new(store.clone()),
            parents: Arc::new(store.clone()),
            students: Arc::new(store),
        }
    }
}

/// Constraint names declared by the migrations.
pub(crate) mod constraints {
    pub const BATCH_YEAR: &str = "idx_batches_year";
    pub const STUDENT_NISN: &str = "idx_students_nisn";
    pub const STUDENT_NIK: &str = "idx_students_nik";
    pub const STUDENT_PARENT: &str = "idx_students_parent";
    pub const STUDENT_BATCH_FK: &str = "fk_students_batch";
    pub const STUDENT_PARENT_FK: &str = "fk_students_parent";
}

/// A constraint violation reported by Postgres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Violation<'a> {
    Unique(&'a str),
    ForeignKey(&'a str),
}

pub(crate) fn violation(err: &sqlx::Error) -> Option<Violation<'_>> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    let constraint = db_err.constraint()?;
    match db_err.kind() {
        ErrorKind::UniqueViolation => Some(Violation::Unique(constraint)),
        ErrorKind::ForeignKeyViolation => Some(Violation::ForeignKey(constraint)),
        _ => None,
    }
}

/// Wire field guarded by a unique index.
pub(crate) fn unique_field(constraint: &str) -> Option<&'static str> {
    match constraint {
        constraints::BATCH_YEAR => Some("year"),
        constraints::STUDENT_NISN => Some("nisn"),
        constraints::STUDENT_NIK => Some("nik"),
        constraints::STUDENT_PARENT => Some("parent_id"),
        _ => None,
    }
}

/// Map a failed insert/update to a typed error where the constraint is known.
pub(crate) fn classify_write_error(err: sqlx::Error) -> Error {
    let classified = match violation(&err) {
        Some(Violation::Unique(constraint)) => {
            unique_field(constraint).map(|field| Error::DuplicateIdentifier {
                field: field.to_string(),
            })
        }
        Some(Violation::ForeignKey(constraints::STUDENT_BATCH_FK)) => {
            Some(unknown_reference("batch_id"))
        }
        Some(Violation::ForeignKey(constraints::STUDENT_PARENT_FK)) => {
            Some(unknown_reference("parent_id"))
        }
        _ => None,
    };
    classified.unwrap_or(Error::Database(err))
}

pub(crate) fn unknown_reference(field: &str) -> Error {
    Error::field(field, format!("{field} does not reference an existing record"))
}

pub(crate) fn batch_in_use() -> Error {
    Error::ReferentialConstraint {
        entity: Entity::Batch,
        dependents: Entity::Student,
    }
}

pub(crate) fn required_year(batch: &NewBatch) -> Result<i32> {
    batch
        .year
        .ok_or_else(|| Error::field("year", "year is required"))
}

/// `%term%` with LIKE wildcards in `term` matched literally; backslash is the default escape.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_constraints_map_to_wire_fields() {
        assert_eq!(unique_field("idx_students_nisn"), Some("nisn"));
        assert_eq!(unique_field("idx_students_nik"), Some("nik"));
        assert_eq!(unique_field("idx_batches_year"), Some("year"));
        assert_eq!(unique_field("students_pkey"), None);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("budi"), "%budi%");
        assert_eq!(like_pattern("_"), "%\\_%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn non_database_errors_stay_unclassified() {
        assert!(violation(&sqlx::Error::RowNotFound).is_none());
        assert!(matches!(
            classify_write_error(sqlx::Error::RowNotFound),
            Error::Database(_)
        ));
    }
}
