//! Batch lifecycle.
//!
//! At most one batch may be active. The rule is enforced when a batch is
//! switched on through `update_batch`; activating a second batch is refused
//! rather than deactivating the current one. The check and the write are not
//! atomic, so two concurrent activations can both pass.

use crate::db::BatchStore;
use crate::error::Entity;
use crate::i18n::Locale;
use crate::models::{required_field_errors, Batch, BatchChanges, NewBatch, Pagination};
use crate::{Error, Result};
use std::sync::Arc;
use validator::Validate;

pub struct BatchService {
    batches: Arc<dyn BatchStore>,
}

impl BatchService {
    pub fn new(batches: Arc<dyn BatchStore>) -> Self {
        Self { batches }
    }

    pub async fn create_batch(&self, batch: NewBatch) -> Result<Batch> {
        let batch = batch.normalize();
        if let Err(e) = batch.validate() {
            return Err(Error::Validation(required_field_errors(&e, Locale::En, None)));
        }

        let created = self.batches.create(&batch).await?;
        tracing::info!(
            batch_id = created.id,
            year = created.year,
            is_active = created.is_active,
            "Batch created"
        );
        Ok(created)
    }

    pub async fn update_batch(&self, id: i32, changes: BatchChanges) -> Result<Batch> {
        if changes.is_active == Some(true) {
            if let Some(active) = self.batches.get_active().await? {
                if active.id != id {
                    tracing::info!(
                        batch_id = id,
                        active_batch_id = active.id,
                        "Refusing to activate a second batch"
                    );
                    return Err(Error::BatchAlreadyActive {
                        active_id: active.id,
                    });
                }
            }
        }

        let updated = self
            .batches
            .update(id, &changes)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Batch, id))?;
        tracing::info!(batch_id = id, is_active = updated.is_active, "Batch updated");
        Ok(updated)
    }

    pub async fn delete_batch(&self, id: i32) -> Result<()> {
        if !self.batches.delete(id).await? {
            return Err(Error::not_found(Entity::Batch, id));
        }
        tracing::info!(batch_id = id, "Batch deleted");
        Ok(())
    }

    pub async fn get_batch(&self, id: i32) -> Result<Batch> {
        self.batches
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Batch, id))
    }

    pub async fn list_batches(&self, page: Pagination, search: Option<&str>) -> Result<Vec<Batch>> {
        self.batches.list(page, search).await
    }

    pub async fn active_batch(&self) -> Result<Option<Batch>> {
        self.batches.get_active().await
    }
}
