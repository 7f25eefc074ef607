//! Parent repository (PostgreSQL).

use super::ParentStore;
use crate::models::{Pagination, Parent, ParentDetails};
use crate::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

pub(crate) const PARENT_COLUMNS: &str = "id, father_name, father_education, father_job, \
    father_income, mother_name, mother_education, mother_job, mother_income, parent_email, \
    wali_name, alamat_ortu_wali, no_hp_ortu_wali, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresParentStore {
    pool: PgPool,
}

impl PostgresParentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParentStore for PostgresParentStore {
    async fn create(&self, details: &ParentDetails) -> Result<Parent> {
        let parent = sqlx::query_as::<_, Parent>(&format!(
            r#"
            INSERT INTO parents (
                father_name, father_education, father_job, father_income,
                mother_name, mother_education, mother_job, mother_income,
                parent_email, wali_name, alamat_ortu_wali, no_hp_ortu_wali
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {PARENT_COLUMNS}
            "#
        ))
        .bind(&details.father_name)
        .bind(&details.father_education)
        .bind(&details.father_job)
        .bind(&details.father_income)
        .bind(&details.mother_name)
        .bind(&details.mother_education)
        .bind(&details.mother_job)
        .bind(&details.mother_income)
        .bind(&details.parent_email)
        .bind(&details.wali_name)
        .bind(&details.alamat_ortu_wali)
        .bind(&details.no_hp_ortu_wali)
        .fetch_one(&self.pool)
        .await?;
        Ok(parent)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Parent>> {
        let parent = sqlx::query_as::<_, Parent>(&format!(
            "SELECT {PARENT_COLUMNS} FROM parents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(parent)
    }

    async fn update(&self, id: i32, changes: &ParentDetails) -> Result<Option<Parent>> {
        let parent = sqlx::query_as::<_, Parent>(&format!(
            r#"
            UPDATE parents SET
                father_name = COALESCE($2, father_name),
                father_education = COALESCE($3, father_education),
                father_job = COALESCE($4, father_job),
                father_income = COALESCE($5, father_income),
                mother_name = COALESCE($6, mother_name),
                mother_education = COALESCE($7, mother_education),
                mother_job = COALESCE($8, mother_job),
                mother_income = COALESCE($9, mother_income),
                parent_email = COALESCE($10, parent_email),
                wali_name = COALESCE($11, wali_name),
                alamat_ortu_wali = COALESCE($12, alamat_ortu_wali),
                no_hp_ortu_wali = COALESCE($13, no_hp_ortu_wali),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PARENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.father_name)
        .bind(&changes.father_education)
        .bind(&changes.father_job)
        .bind(&changes.father_income)
        .bind(&changes.mother_name)
        .bind(&changes.mother_education)
        .bind(&changes.mother_job)
        .bind(&changes.mother_income)
        .bind(&changes.parent_email)
        .bind(&changes.wali_name)
        .bind(&changes.alamat_ortu_wali)
        .bind(&changes.no_hp_ortu_wali)
        .fetch_optional(&self.pool)
        .await?;
        Ok(parent)
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM parents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, page: Pagination) -> Result<Vec<Parent>> {
        let parents = sqlx::query_as::<_, Parent>(&format!(
            "SELECT {PARENT_COLUMNS} FROM parents ORDER BY id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(parents)
    }
}

/// Load parents by id for embedding into students.
pub(crate) async fn load_parents(pool: &PgPool, ids: &[i32]) -> Result<HashMap<i32, Parent>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let parents = sqlx::query_as::<_, Parent>(&format!(
        "SELECT {PARENT_COLUMNS} FROM parents WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(parents.into_iter().map(|p| (p.id, p)).collect())
}
