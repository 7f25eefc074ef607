//! In-process storage backend.
//!
//! Used by tests and by `storage.backend = "memory"`. Emulates the schema's
//! unique indexes and foreign keys so callers see the same typed errors as
//! with PostgreSQL.

use super::{
    batch_in_use, required_year, unique_field, unknown_reference, constraints, BatchStore,
    ParentStore, StudentStore,
};
use crate::models::{
    Batch, BatchChanges, NewBatch, Pagination, Parent, ParentDetails, Student, StudentFilter,
    StudentRecord,
};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StudentRow {
    record: StudentRecord,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    batches: BTreeMap<i32, Batch>,
    parents: BTreeMap<i32, Parent>,
    students: BTreeMap<i32, StudentRow>,
    last_batch_id: i32,
    last_parent_id: i32,
    last_student_id: i32,
}

impl Tables {
    fn student(&self, id: i32, row: &StudentRow) -> Student {
        let record = &row.record;
        Student {
            id,
            full_name: record.full_name.clone(),
            gender: record.gender,
            profile: record.profile.clone(),
            is_accepted: record.is_accepted,
            parent_id: record.parent_id,
            batch_id: record.batch_id,
            parent: record
                .parent_id
                .and_then(|pid| self.parents.get(&pid).cloned()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    /// Unique indexes and foreign keys of `students`, excluding row `id` itself.
    fn check_student(&self, id: Option<i32>, record: &StudentRecord) -> Result<()> {
        let others = self
            .students
            .iter()
            .filter(|(other_id, _)| Some(**other_id) != id)
            .map(|(_, row)| &row.record);

        for other in others {
            let clashes = [
                (
                    constraints::STUDENT_NISN,
                    record.profile.nisn.is_some() && record.profile.nisn == other.profile.nisn,
                ),
                (
                    constraints::STUDENT_NIK,
                    record.profile.nik.is_some() && record.profile.nik == other.profile.nik,
                ),
                (
                    constraints::STUDENT_PARENT,
                    record.parent_id.is_some() && record.parent_id == other.parent_id,
                ),
            ];
            if let Some((constraint, _)) = clashes.iter().find(|(_, clash)| *clash) {
                let field = unique_field(constraint).unwrap_or("id");
                return Err(Error::DuplicateIdentifier {
                    field: field.to_string(),
                });
            }
        }

        if let Some(batch_id) = record.batch_id {
            if !self.batches.contains_key(&batch_id) {
                return Err(unknown_reference("batch_id"));
            }
        }
        if let Some(parent_id) = record.parent_id {
            if !self.parents.contains_key(&parent_id) {
                return Err(unknown_reference("parent_id"));
            }
        }
        Ok(())
    }

    fn year_taken(&self, year: i32, except: Option<i32>) -> bool {
        self.batches
            .values()
            .any(|b| b.year == year && Some(b.id) != except)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::Internal("in-memory store lock poisoned".to_string()))
    }
}

fn page<T>(items: impl Iterator<Item = T>, page: Pagination) -> Vec<T> {
    items
        .skip(page.offset().max(0) as usize)
        .take(page.limit.max(0) as usize)
        .collect()
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

#[async_trait]
impl BatchStore for InMemoryStore {
    async fn create(&self, batch: &NewBatch) -> Result<Batch> {
        let year = required_year(batch)?;
        let mut tables = self.lock()?;
        if tables.year_taken(year, None) {
            return Err(Error::DuplicateIdentifier {
                field: "year".to_string(),
            });
        }

        tables.last_batch_id += 1;
        let now = Utc::now();
        let created = Batch {
            id: tables.last_batch_id,
            name: batch.name.clone(),
            year,
            is_active: batch.is_active,
            start_date: batch.start_date,
            end_date: batch.end_date,
            created_at: now,
            updated_at: now,
        };
        tables.batches.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_active(&self) -> Result<Option<Batch>> {
        let tables = self.lock()?;
        Ok(tables.batches.values().find(|b| b.is_active).cloned())
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Batch>> {
        Ok(self.lock()?.batches.get(&id).cloned())
    }

    async fn get_by_year(&self, year: i32) -> Result<Option<Batch>> {
        let tables = self.lock()?;
        Ok(tables.batches.values().find(|b| b.year == year).cloned())
    }

    async fn update(&self, id: i32, changes: &BatchChanges) -> Result<Option<Batch>> {
        let mut tables = self.lock()?;
        if let Some(year) = changes.year {
            if tables.year_taken(year, Some(id)) {
                return Err(Error::DuplicateIdentifier {
                    field: "year".to_string(),
                });
            }
        }
        let Some(batch) = tables.batches.get_mut(&id) else {
            return Ok(None);
        };
        changes.clone().apply_to(batch);
        batch.updated_at = Utc::now();
        Ok(Some(batch.clone()))
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let mut tables = self.lock()?;
        if tables
            .students
            .values()
            .any(|row| row.record.batch_id == Some(id))
        {
            return Err(batch_in_use());
        }
        Ok(tables.batches.remove(&id).is_some())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.lock()?.batches.len() as i64)
    }

    async fn list(&self, pagination: Pagination, search: Option<&str>) -> Result<Vec<Batch>> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let tables = self.lock()?;
        let mut batches: Vec<Batch> = tables
            .batches
            .values()
            .filter(|b| match &needle {
                Some(n) => contains_ci(Some(b.name.as_str()), n),
                None => true,
            })
            .cloned()
            .collect();
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(batches.into_iter(), pagination))
    }
}

#[async_trait]
impl ParentStore for InMemoryStore {
    async fn create(&self, details: &ParentDetails) -> Result<Parent> {
        let mut tables = self.lock()?;
        tables.last_parent_id += 1;
        let now = Utc::now();
        let parent = Parent {
            id: tables.last_parent_id,
            details: details.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.parents.insert(parent.id, parent.clone());
        Ok(parent)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Parent>> {
        Ok(self.lock()?.parents.get(&id).cloned())
    }

    async fn update(&self, id: i32, changes: &ParentDetails) -> Result<Option<Parent>> {
        let mut tables = self.lock()?;
        let Some(parent) = tables.parents.get_mut(&id) else {
            return Ok(None);
        };
        parent.details.merge(changes.clone());
        parent.updated_at = Utc::now();
        Ok(Some(parent.clone()))
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let mut tables = self.lock()?;
        if tables.parents.remove(&id).is_none() {
            return Ok(false);
        }
        for row in tables.students.values_mut() {
            if row.record.parent_id == Some(id) {
                row.record.parent_id = None;
            }
        }
        Ok(true)
    }

    async fn list(&self, pagination: Pagination) -> Result<Vec<Parent>> {
        let tables = self.lock()?;
        Ok(page(tables.parents.values().cloned(), pagination))
    }
}

#[async_trait]
impl StudentStore for InMemoryStore {
    async fn create(&self, record: &StudentRecord) -> Result<Student> {
        let mut tables = self.lock()?;
        tables.check_student(None, record)?;

        tables.last_student_id += 1;
        let id = tables.last_student_id;
        let now = Utc::now();
        let row = StudentRow {
            record: record.clone(),
            created_at: now,
            updated_at: now,
        };
        let student = tables.student(id, &row);
        tables.students.insert(id, row);
        Ok(student)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Student>> {
        let tables = self.lock()?;
        Ok(tables.students.get(&id).map(|row| tables.student(id, row)))
    }

    async fn update(&self, id: i32, record: &StudentRecord) -> Result<Option<Student>> {
        let mut tables = self.lock()?;
        if !tables.students.contains_key(&id) {
            return Ok(None);
        }
        tables.check_student(Some(id), record)?;

        let Some(row) = tables.students.get_mut(&id) else {
            return Ok(None);
        };
        row.record = record.clone();
        row.updated_at = Utc::now();
        let row = row.clone();
        Ok(Some(tables.student(id, &row)))
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        Ok(self.lock()?.students.remove(&id).is_some())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.lock()?.students.len() as i64)
    }

    async fn count_by_batch(&self, batch_id: i32) -> Result<i64> {
        let tables = self.lock()?;
        Ok(tables
            .students
            .values()
            .filter(|row| row.record.batch_id == Some(batch_id))
            .count() as i64)
    }

    async fn list(&self, filter: &StudentFilter) -> Result<Vec<Student>> {
        let needle = filter.search_term().map(str::to_lowercase);
        let tables = self.lock()?;
        let mut students: Vec<Student> = tables
            .students
            .iter()
            .filter(|(_, row)| {
                let r = &row.record;
                let matches_search = match &needle {
                    Some(n) => {
                        contains_ci(Some(r.full_name.as_str()), n)
                            || contains_ci(r.profile.nisn.as_deref(), n)
                            || contains_ci(r.profile.nik.as_deref(), n)
                    }
                    None => true,
                };
                matches_search
                    && filter.batch_id.map_or(true, |b| r.batch_id == Some(b))
                    && filter.accepted.map_or(true, |a| r.is_accepted == a)
            })
            .map(|(id, row)| tables.student(*id, row))
            .collect();
        students.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        Ok(page(students.into_iter(), filter.pagination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, StudentProfile};

    fn record(name: &str, nisn: Option<&str>) -> StudentRecord {
        StudentRecord {
            full_name: name.to_string(),
            gender: Gender::Female,
            profile: StudentProfile {
                nisn: nisn.map(str::to_string),
                ..Default::default()
            },
            is_accepted: false,
            parent_id: None,
            batch_id: None,
        }
    }

    fn new_batch(year: i32, is_active: bool) -> NewBatch {
        NewBatch {
            name: format!("Gelombang {year}"),
            year: Some(year),
            is_active,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn duplicate_nisn_names_the_field() {
        let store = InMemoryStore::new();
        StudentStore::create(&store, &record("A", Some("1234567890")))
            .await
            .unwrap();
        let err = StudentStore::create(&store, &record("B", Some("1234567890")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentifier { ref field } if field == "nisn"));
        assert_eq!(StudentStore::count(&store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn active_batch_is_lowest_id() {
        let store = InMemoryStore::new();
        BatchStore::create(&store, &new_batch(2023, false)).await.unwrap();
        let first = BatchStore::create(&store, &new_batch(2024, true)).await.unwrap();
        BatchStore::create(&store, &new_batch(2025, true)).await.unwrap();

        let active = store.get_active().await.unwrap().unwrap();
        assert_eq!(active.id, first.id);
        assert_eq!(store.get_active().await.unwrap().unwrap().id, active.id);
    }

    #[tokio::test]
    async fn batch_with_students_cannot_be_deleted() {
        let store = InMemoryStore::new();
        let batch = BatchStore::create(&store, &new_batch(2024, true)).await.unwrap();
        let mut r = record("A", None);
        r.batch_id = Some(batch.id);
        StudentStore::create(&store, &r).await.unwrap();

        let err = BatchStore::delete(&store, batch.id).await.unwrap_err();
        assert!(matches!(err, Error::ReferentialConstraint { .. }));
    }

    #[tokio::test]
    async fn deleting_parent_detaches_student() {
        let store = InMemoryStore::new();
        let parent = ParentStore::create(&store, &ParentDetails::default())
            .await
            .unwrap();
        let mut r = record("A", None);
        r.parent_id = Some(parent.id);
        let student = StudentStore::create(&store, &r).await.unwrap();
        assert_eq!(student.parent.as_ref().map(|p| p.id), Some(parent.id));

        assert!(ParentStore::delete(&store, parent.id).await.unwrap());
        let student = StudentStore::get_by_id(&store, student.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(student.parent_id, None);
        assert!(student.parent.is_none());
    }

    #[tokio::test]
    async fn student_list_filters_and_sorts_by_name() {
        let store = InMemoryStore::new();
        StudentStore::create(&store, &record("Citra", Some("333"))).await.unwrap();
        StudentStore::create(&store, &record("andi", Some("111"))).await.unwrap();
        StudentStore::create(&store, &record("Budi", Some("222"))).await.unwrap();

        let all = StudentStore::list(&store, &StudentFilter::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|s| s.full_name.as_str()).collect();
        assert_eq!(names, vec!["Budi", "Citra", "andi"]);

        let filter = StudentFilter {
            search: Some("22".into()),
            ..Default::default()
        };
        let found = StudentStore::list(&store, &filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].full_name, "Budi");
    }
}
