//! Admin-side student management.

use super::discard_parent;
use crate::db::{BatchStore, ParentStore, Stores, StudentStore};
use crate::error::Entity;
use crate::models::{Student, StudentChanges, StudentFilter};
use crate::{Error, Result};
use std::sync::Arc;

pub struct StudentService {
    batches: Arc<dyn BatchStore>,
    parents: Arc<dyn ParentStore>,
    students: Arc<dyn StudentStore>,
}

impl StudentService {
    pub fn new(stores: Stores) -> Self {
        Self {
            batches: stores.batches,
            parents: stores.parents,
            students: stores.students,
        }
    }

    pub async fn get(&self, id: i32) -> Result<Student> {
        self.students
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Student, id))
    }

    pub async fn list(&self, filter: &StudentFilter) -> Result<Vec<Student>> {
        self.students.list(filter).await
    }

    /// Students of the batch registered for `year`; `filter.batch_id` is replaced.
    pub async fn list_by_batch_year(&self, year: i32, filter: StudentFilter) -> Result<Vec<Student>> {
        let batch = self
            .batches
            .get_by_year(year)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Batch, year))?;
        let filter = StudentFilter {
            batch_id: Some(batch.id),
            ..filter
        };
        self.students.list(&filter).await
    }

    /// Merge `changes` into the stored student.
    ///
    /// An embedded parent updates the linked parent, or is created and linked
    /// when the student has none.
    pub async fn update(&self, id: i32, changes: StudentChanges) -> Result<Student> {
        let current = self.get(id).await?;
        let mut record = current.to_record();
        let parent_changes = changes.apply_to(&mut record);

        let mut created_parent = None;
        if let Some(details) = parent_changes {
            let updated = match record.parent_id {
                Some(parent_id) => self.parents.update(parent_id, &details).await?,
                None => None,
            };
            if updated.is_none() {
                let parent = self.parents.create(&details).await?;
                record.parent_id = Some(parent.id);
                created_parent = Some(parent.id);
            }
        }

        let result = match self.students.update(id, &record).await {
            Ok(Some(student)) => Ok(student),
            Ok(None) => Err(Error::not_found(Entity::Student, id)),
            Err(e) => Err(e),
        };
        match result {
            Ok(student) => {
                if let Some(parent_id) = created_parent {
                    tracing::info!(student_id = id, parent_id, "Parent linked to student");
                }
                tracing::info!(student_id = id, "Student updated");
                Ok(student)
            }
            Err(e) => {
                if let Some(parent_id) = created_parent {
                    discard_parent(self.parents.as_ref(), parent_id).await;
                }
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        if !self.students.delete(id).await? {
            return Err(Error::not_found(Entity::Student, id));
        }
        tracing::info!(student_id = id, "Student deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, ParentDetails, StudentProfile, StudentRecord};
    use crate::services::testing::june_batch;

    async fn seed(stores: &Stores, name: &str, batch_id: Option<i32>) -> Student {
        stores
            .students
            .create(&StudentRecord {
                full_name: name.into(),
                gender: Gender::Female,
                profile: StudentProfile::default(),
                is_accepted: false,
                parent_id: None,
                batch_id,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn update_creates_and_then_updates_parent() {
        let stores = Stores::memory();
        let svc = StudentService::new(stores.clone());
        let student = seed(&stores, "Siti", None).await;

        let updated = svc
            .update(
                student.id,
                StudentChanges {
                    parent: Some(ParentDetails {
                        mother_name: Some("Aminah".into()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let parent_id = updated.parent_id.expect("parent linked");

        let updated = svc
            .update(
                student.id,
                StudentChanges {
                    gender: Some(Gender::Male),
                    parent: Some(ParentDetails {
                        father_name: Some("Umar".into()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.gender, Gender::Male);
        assert_eq!(updated.parent_id, Some(parent_id));
        let parent = updated.parent.unwrap().details;
        assert_eq!(parent.mother_name.as_deref(), Some("Aminah"));
        assert_eq!(parent.father_name.as_deref(), Some("Umar"));
    }

    #[tokio::test]
    async fn failed_update_removes_parent_it_created() {
        let stores = Stores::memory();
        let svc = StudentService::new(stores.clone());
        let first = seed(&stores, "Andi", None).await;
        let mut taken = first.to_record();
        taken.profile.nisn = Some("111".into());
        stores.students.update(first.id, &taken).await.unwrap();
        let second = seed(&stores, "Budi", None).await;

        let err = svc
            .update(
                second.id,
                StudentChanges {
                    profile: StudentProfile {
                        nisn: Some("111".into()),
                        ..Default::default()
                    },
                    parent: Some(ParentDetails {
                        father_name: Some("Joko".into()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateIdentifier { ref field } if field == "nisn"));
        assert!(stores
            .parents
            .list(crate::models::Pagination::default())
            .await
            .unwrap()
            .is_empty());
        let unchanged = stores.students.get_by_id(second.id).await.unwrap().unwrap();
        assert_eq!(unchanged.parent_id, None);
    }

    #[tokio::test]
    async fn list_by_unknown_year_is_not_found() {
        let stores = Stores::memory();
        let svc = StudentService::new(stores.clone());

        let err = svc
            .list_by_batch_year(1999, StudentFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: Entity::Batch, .. }));
    }

    #[tokio::test]
    async fn list_by_year_only_returns_that_batch() {
        let stores = Stores::memory();
        let svc = StudentService::new(stores.clone());
        let batch = june_batch(&stores, true).await;
        seed(&stores, "Dalam", Some(batch.id)).await;
        seed(&stores, "Luar", None).await;

        let students = svc
            .list_by_batch_year(2024, StudentFilter::default())
            .await
            .unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].full_name, "Dalam");
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let svc = StudentService::new(Stores::memory());
        assert!(matches!(
            svc.delete(5).await.unwrap_err(),
            Error::NotFound { entity: Entity::Student, .. }
        ));
    }
}
