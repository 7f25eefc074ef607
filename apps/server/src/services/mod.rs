//! Business logic layer
//!
//! Services apply the admissions rules on top of the stores. They never hold
//! state of their own; the active batch is always read from the batch store.

pub mod batch;
pub mod clock;
pub mod dashboard;
pub mod enrollment;
pub mod parent;
pub mod student;

pub use batch::BatchService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use dashboard::{DashboardService, DashboardSummary};
pub use enrollment::EnrollmentService;
pub use parent::ParentService;
pub use student::StudentService;

use crate::db::{ParentStore, Stores};
use std::sync::Arc;

/// Every service, wired to one set of stores.
#[derive(Clone)]
pub struct Services {
    pub enrollment: Arc<EnrollmentService>,
    pub batches: Arc<BatchService>,
    pub students: Arc<StudentService>,
    pub parents: Arc<ParentService>,
    pub dashboard: Arc<DashboardService>,
}

impl Services {
    pub fn new(stores: Stores, clock: Arc<dyn Clock>) -> Self {
        Self {
            enrollment: Arc::new(EnrollmentService::new(stores.clone(), clock)),
            batches: Arc::new(BatchService::new(stores.batches.clone())),
            students: Arc::new(StudentService::new(stores.clone())),
            parents: Arc::new(ParentService::new(stores.parents.clone())),
            dashboard: Arc::new(DashboardService::new(stores)),
        }
    }
}

/// Delete a parent written earlier in a request whose student write failed.
///
/// A failed delete is logged and the parent is left orphaned.
pub(crate) async fn discard_parent(parents: &dyn ParentStore, parent_id: i32) {
    match parents.delete(parent_id).await {
        Ok(_) => tracing::debug!(parent_id, "Rolled back parent record"),
        Err(e) => tracing::warn!(
            parent_id,
            error = %e,
            "Failed to roll back parent record; it is left orphaned"
        ),
    }
}
