//! Student enrollment against the active batch.
//!
//! A student may arrive with an embedded parent. The parent is written first so
//! the student can reference it; if anything after that fails, the parent is
//! deleted again before the error is returned.

use super::{discard_parent, Clock};
use crate::db::{BatchStore, ParentStore, Stores, StudentStore};
use crate::i18n::Locale;
use crate::models::{
    required_field_errors, Batch, NewStudent, Parent, ParentDetails, Student, StudentRecord,
};
use crate::{error::FieldErrors, Error, Result};
use std::sync::Arc;
use validator::Validate;

pub struct EnrollmentService {
    batches: Arc<dyn BatchStore>,
    parents: Arc<dyn ParentStore>,
    students: Arc<dyn StudentStore>,
    clock: Arc<dyn Clock>,
}

impl EnrollmentService {
    pub fn new(stores: Stores, clock: Arc<dyn Clock>) -> Self {
        Self {
            batches: stores.batches,
            parents: stores.parents,
            students: stores.students,
            clock,
        }
    }

    /// Public admissions registration.
    ///
    /// The student is always placed in the active batch, only while its
    /// registration window is open, and never pre-accepted. A client-supplied
    /// `parent_id` is ignored.
    pub async fn register_admission(&self, candidate: NewStudent) -> Result<Student> {
        let (mut record, parent) = split(candidate)?;
        // Only a parent embedded in this request may be linked.
        record.parent_id = None;
        let created_parent = self.create_parent(parent, &mut record).await?;

        match self.admit(record).await {
            Ok(student) => {
                tracing::info!(
                    student_id = student.id,
                    batch_id = ?student.batch_id,
                    parent_id = ?student.parent_id,
                    "Admission registered"
                );
                Ok(student)
            }
            Err(e) => {
                self.rollback_parent(created_parent).await;
                Err(e)
            }
        }
    }

    /// Admin-side creation: keeps a caller-supplied batch, otherwise uses the
    /// active batch if there is one. No window checks.
    pub async fn create_student_admin(&self, candidate: NewStudent) -> Result<Student> {
        let (mut record, parent) = split(candidate)?;
        let created_parent = self.create_parent(parent, &mut record).await?;

        match self.assign_and_create(record).await {
            Ok(student) => {
                tracing::info!(
                    student_id = student.id,
                    batch_id = ?student.batch_id,
                    "Student created"
                );
                Ok(student)
            }
            Err(e) => {
                self.rollback_parent(created_parent).await;
                Err(e)
            }
        }
    }

    /// Validate every candidate, then create them in order.
    ///
    /// Stops at the first failure; students created before it are kept.
    pub async fn create_students_bulk(&self, candidates: Vec<NewStudent>) -> Result<Vec<Student>> {
        if candidates.is_empty() {
            return Err(Error::field("students", "at least one student is required"));
        }

        let candidates: Vec<NewStudent> = candidates.into_iter().map(NewStudent::normalize).collect();
        let mut errors = FieldErrors::new();
        for (index, candidate) in candidates.iter().enumerate() {
            if let Err(e) = candidate.validate() {
                errors.extend(required_field_errors(&e, Locale::En, Some(index)));
            }
        }
        if !errors.is_empty() {
            return Err(Error::Validation(errors));
        }

        let total = candidates.len();
        let mut created = Vec::with_capacity(total);
        for (index, candidate) in candidates.into_iter().enumerate() {
            match self.create_student_admin(candidate).await {
                Ok(student) => created.push(student),
                Err(e) => {
                    tracing::warn!(
                        index,
                        created = created.len(),
                        total,
                        error = %e,
                        "Bulk student creation stopped"
                    );
                    return Err(e);
                }
            }
        }
        Ok(created)
    }

    async fn admit(&self, mut record: StudentRecord) -> Result<Student> {
        let batch = self
            .batches
            .get_active()
            .await?
            .ok_or(Error::NoActiveBatch)?;
        self.check_window(&batch)?;

        record.batch_id = Some(batch.id);
        record.is_accepted = false;
        self.students.create(&record).await
    }

    async fn assign_and_create(&self, mut record: StudentRecord) -> Result<Student> {
        if record.batch_id.is_none() {
            if let Some(batch) = self.batches.get_active().await? {
                record.batch_id = Some(batch.id);
            }
        }
        self.students.create(&record).await
    }

    /// Both bounds are inclusive.
    fn check_window(&self, batch: &Batch) -> Result<()> {
        let (start, end) = batch.window().ok_or(Error::InvalidBatchWindow)?;
        let now = self.clock.now();
        if now < start {
            return Err(Error::RegistrationNotYetOpen);
        }
        if now > end {
            return Err(Error::RegistrationClosed);
        }
        Ok(())
    }

    async fn create_parent(
        &self,
        details: Option<ParentDetails>,
        record: &mut StudentRecord,
    ) -> Result<Option<Parent>> {
        let Some(details) = details else {
            return Ok(None);
        };
        let parent = self.parents.create(&details).await?;
        record.parent_id = Some(parent.id);
        Ok(Some(parent))
    }

    async fn rollback_parent(&self, parent: Option<Parent>) {
        let Some(parent) = parent else {
            return;
        };
        discard_parent(self.parents.as_ref(), parent.id).await;
    }
}

fn split(candidate: NewStudent) -> Result<(StudentRecord, Option<ParentDetails>)> {
    let candidate = candidate.normalize();
    if let Err(e) = candidate.validate() {
        return Err(Error::Validation(required_field_errors(&e, Locale::En, None)));
    }
    candidate
        .into_parts()
        .ok_or_else(|| Error::field("gender", "gender is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentFilter;
    use crate::services::testing::{at, batch, candidate, june_batch};
    use crate::services::FixedClock;
    use async_trait::async_trait;
    use crate::models::Pagination;

    fn service(stores: &Stores, now: chrono::DateTime<chrono::Utc>) -> EnrollmentService {
        EnrollmentService::new(stores.clone(), Arc::new(FixedClock(now)))
    }

    fn with_parent(name: &str) -> NewStudent {
        NewStudent {
            parent: Some(ParentDetails {
                father_name: Some(format!("Ayah {name}")),
                ..Default::default()
            }),
            ..candidate(name)
        }
    }

    async fn parent_count(stores: &Stores) -> usize {
        stores
            .parents
            .list(Pagination::new(Some(100), None))
            .await
            .unwrap()
            .len()
    }

    #[tokio::test]
    async fn registration_inside_window_links_batch_and_parent() {
        let stores = Stores::memory();
        let batch = june_batch(&stores, true).await;
        let svc = service(&stores, at(2024, 6, 15));

        let mut input = with_parent("Budi");
        input.batch_id = Some(999);
        input.is_accepted = true;
        let student = svc.register_admission(input).await.unwrap();

        assert_eq!(student.batch_id, Some(batch.id));
        assert!(!student.is_accepted);
        let parent = student.parent.expect("parent embedded");
        assert_eq!(student.parent_id, Some(parent.id));
        assert_eq!(parent.details.father_name.as_deref(), Some("Ayah Budi"));
    }

    #[tokio::test]
    async fn registration_ignores_foreign_parent_id() {
        let stores = Stores::memory();
        june_batch(&stores, true).await;
        let existing = stores
            .parents
            .create(&ParentDetails {
                mother_name: Some("Ibu Lain".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let svc = service(&stores, at(2024, 6, 15));

        let mut input = candidate("Budi");
        input.parent_id = Some(existing.id);
        let student = svc.register_admission(input).await.unwrap();
        assert_eq!(student.parent_id, None);
        assert!(student.parent.is_none());

        let mut input = with_parent("Andi");
        input.parent_id = Some(existing.id);
        let student = svc.register_admission(input).await.unwrap();
        assert_ne!(student.parent_id, Some(existing.id));
        assert_eq!(
            student.parent.map(|p| p.details.father_name),
            Some(Some("Ayah Andi".to_string()))
        );
    }

    #[tokio::test]
    async fn no_active_batch_leaves_nothing_behind() {
        let stores = Stores::memory();
        june_batch(&stores, false).await;
        let svc = service(&stores, at(2024, 6, 15));

        let err = svc.register_admission(with_parent("Budi")).await.unwrap_err();

        assert!(matches!(err, Error::NoActiveBatch));
        assert_eq!(stores.students.count().await.unwrap(), 0);
        assert_eq!(parent_count(&stores).await, 0);
    }

    #[tokio::test]
    async fn window_bounds_are_enforced() {
        let stores = Stores::memory();
        june_batch(&stores, true).await;

        let err = service(&stores, at(2024, 7, 1))
            .register_admission(with_parent("Late"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RegistrationClosed));

        let err = service(&stores, at(2024, 5, 31))
            .register_admission(candidate("Early"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RegistrationNotYetOpen));

        // Inclusive on both ends.
        service(&stores, at(2024, 6, 1))
            .register_admission(candidate("First"))
            .await
            .unwrap();
        service(&stores, at(2024, 6, 30))
            .register_admission(candidate("Last"))
            .await
            .unwrap();

        assert_eq!(stores.students.count().await.unwrap(), 2);
        assert_eq!(parent_count(&stores).await, 0);
    }

    #[tokio::test]
    async fn batch_without_window_is_rejected() {
        let stores = Stores::memory();
        batch(&stores, 2024, true, Some(at(2024, 6, 1)), None).await;

        let err = service(&stores, at(2024, 6, 15))
            .register_admission(with_parent("Budi"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidBatchWindow));
        assert_eq!(parent_count(&stores).await, 0);
    }

    #[tokio::test]
    async fn duplicate_nisn_rolls_back_new_parent() {
        let stores = Stores::memory();
        june_batch(&stores, true).await;
        let svc = service(&stores, at(2024, 6, 15));

        let mut first = with_parent("Budi");
        first.profile.nisn = Some("1234567890".into());
        let first = svc.register_admission(first).await.unwrap();

        let mut second = with_parent("Andi");
        second.profile.nisn = Some("1234567890".into());
        let err = svc.register_admission(second).await.unwrap_err();

        assert!(matches!(err, Error::DuplicateIdentifier { ref field } if field == "nisn"));
        assert_eq!(parent_count(&stores).await, 1);
        let kept = stores.students.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(kept.parent_id, first.parent_id);
    }

    #[tokio::test]
    async fn missing_gender_fails_before_any_write() {
        let stores = Stores::memory();
        june_batch(&stores, true).await;
        let mut input = with_parent("Budi");
        input.gender = None;

        let err = service(&stores, at(2024, 6, 15))
            .register_admission(input)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(ref m) if m.contains_key("gender")));
        assert_eq!(parent_count(&stores).await, 0);
    }

    #[tokio::test]
    async fn admin_create_keeps_explicit_batch_and_tolerates_no_active() {
        let stores = Stores::memory();
        let old = batch(&stores, 2023, false, None, None).await;
        let svc = service(&stores, at(2030, 1, 1));

        let unassigned = svc.create_student_admin(candidate("Tanpa")).await.unwrap();
        assert_eq!(unassigned.batch_id, None);

        let mut explicit = candidate("Lama");
        explicit.batch_id = Some(old.id);
        explicit.is_accepted = true;
        let student = svc.create_student_admin(explicit).await.unwrap();
        assert_eq!(student.batch_id, Some(old.id));
        assert!(student.is_accepted);

        let active = june_batch(&stores, true).await;
        let student = svc.create_student_admin(candidate("Baru")).await.unwrap();
        assert_eq!(student.batch_id, Some(active.id));
    }

    #[tokio::test]
    async fn admin_create_rolls_back_parent_on_unknown_batch() {
        let stores = Stores::memory();
        let mut input = with_parent("Budi");
        input.batch_id = Some(42);

        let err = service(&stores, at(2024, 6, 15))
            .create_student_admin(input)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(ref m) if m.contains_key("batch_id")));
        assert_eq!(parent_count(&stores).await, 0);
    }

    #[tokio::test]
    async fn bulk_validates_everything_up_front() {
        let stores = Stores::memory();
        let svc = service(&stores, at(2024, 6, 15));
        let mut broken = candidate("");
        broken.gender = None;

        let err = svc
            .create_students_bulk(vec![candidate("Ok"), broken])
            .await
            .unwrap_err();

        let Error::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.contains_key("1.full_name"));
        assert!(fields.contains_key("1.gender"));
        assert_eq!(stores.students.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn bulk_stops_at_first_failure() {
        let stores = Stores::memory();
        let svc = service(&stores, at(2024, 6, 15));
        let mut a = candidate("A");
        a.profile.nik = Some("320101".into());
        let mut b = candidate("B");
        b.profile.nik = Some("320101".into());

        let err = svc
            .create_students_bulk(vec![a, b, candidate("C")])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateIdentifier { ref field } if field == "nik"));
        let names: Vec<_> = stores
            .students
            .list(&StudentFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.full_name)
            .collect();
        assert_eq!(names, vec!["A"]);
    }

    /// Parent store whose deletes always fail.
    struct StickyParents(Arc<dyn ParentStore>);

    #[async_trait]
    impl ParentStore for StickyParents {
        async fn create(&self, details: &ParentDetails) -> Result<Parent> {
            self.0.create(details).await
        }
        async fn get_by_id(&self, id: i32) -> Result<Option<Parent>> {
            self.0.get_by_id(id).await
        }
        async fn update(&self, id: i32, changes: &ParentDetails) -> Result<Option<Parent>> {
            self.0.update(id, changes).await
        }
        async fn delete(&self, _id: i32) -> Result<bool> {
            Err(Error::Internal("connection reset".into()))
        }
        async fn list(&self, page: Pagination) -> Result<Vec<Parent>> {
            self.0.list(page).await
        }
    }

    #[tokio::test]
    async fn failed_rollback_still_reports_student_error() {
        let mut stores = Stores::memory();
        stores.parents = Arc::new(StickyParents(stores.parents.clone()));
        let svc = service(&stores, at(2024, 6, 15));

        let err = svc.register_admission(with_parent("Budi")).await.unwrap_err();

        assert!(matches!(err, Error::NoActiveBatch));
        assert_eq!(parent_count(&stores).await, 1);
    }
}
