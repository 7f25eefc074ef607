use crate::db::{BatchStore, Stores, StudentStore};
use crate::models::Batch;
use crate::Result;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_students: i64,
    pub total_batches: i64,
    pub active_batch: Option<Batch>,
    pub students_in_active_batch: i64,
}

pub struct DashboardService {
    batches: Arc<dyn BatchStore>,
    students: Arc<dyn StudentStore>,
}

impl DashboardService {
    pub fn new(stores: Stores) -> Self {
        Self {
            batches: stores.batches,
            students: stores.students,
        }
    }

    pub async fn summary(&self) -> Result<DashboardSummary> {
        let total_students = self.students.count().await?;
        let total_batches = self.batches.count().await?;
        let active_batch = self.batches.get_active().await?;
        let students_in_active_batch = match &active_batch {
            Some(batch) => self.students.count_by_batch(batch.id).await?,
            None => 0,
        };

        Ok(DashboardSummary {
            total_students,
            total_batches,
            active_batch,
            students_in_active_batch,
        })
    }
}
