//! Admin-side parent management.

use crate::db::ParentStore;
use crate::error::Entity;
use crate::models::{Pagination, Parent, ParentDetails};
use crate::{Error, Result};
use std::sync::Arc;

pub struct ParentService {
    parents: Arc<dyn ParentStore>,
}

impl ParentService {
    pub fn new(parents: Arc<dyn ParentStore>) -> Self {
        Self { parents }
    }

    pub async fn create(&self, details: ParentDetails) -> Result<Parent> {
        let parent = self.parents.create(&details).await?;
        tracing::info!(parent_id = parent.id, "Parent created");
        Ok(parent)
    }

    pub async fn get(&self, id: i32) -> Result<Parent> {
        self.parents
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Parent, id))
    }

    pub async fn list(&self, page: Pagination) -> Result<Vec<Parent>> {
        self.parents.list(page).await
    }

    pub async fn update(&self, id: i32, changes: ParentDetails) -> Result<Parent> {
        self.get(id).await?;
        self.parents
            .update(id, &changes)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Parent, id))
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        self.get(id).await?;
        self.parents.delete(id).await?;
        tracing::info!(parent_id = id, "Parent deleted");
        Ok(())
    }
}
