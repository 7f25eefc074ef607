//! Batch repository (PostgreSQL).

use super::{batch_in_use, classify_write_error, like_pattern, required_year, violation, BatchStore, Violation};
use crate::models::{Batch, BatchChanges, NewBatch, Pagination};
use crate::Result;
use async_trait::async_trait;
use sqlx::PgPool;

const BATCH_COLUMNS: &str =
    "id, name, year, is_active, start_date, end_date, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresBatchStore {
    pool: PgPool,
}

impl PostgresBatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchStore for PostgresBatchStore {
    async fn create(&self, batch: &NewBatch) -> Result<Batch> {
        let year = required_year(batch)?;
        sqlx::query_as::<_, Batch>(&format!(
            r#"
            INSERT INTO batches (name, year, is_active, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BATCH_COLUMNS}
            "#
        ))
        .bind(&batch.name)
        .bind(year)
        .bind(batch.is_active)
        .bind(batch.start_date)
        .bind(batch.end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(classify_write_error)
    }

    async fn get_active(&self) -> Result<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE is_active ORDER BY id ASC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(batch)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(batch)
    }

    async fn get_by_year(&self, year: i32) -> Result<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE year = $1"
        ))
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;
        Ok(batch)
    }

    async fn update(&self, id: i32, changes: &BatchChanges) -> Result<Option<Batch>> {
        sqlx::query_as::<_, Batch>(&format!(
            r#"
            UPDATE batches SET
                name = COALESCE($2, name),
                year = COALESCE($3, year),
                is_active = COALESCE($4, is_active),
                start_date = COALESCE($5, start_date),
                end_date = COALESCE($6, end_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BATCH_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(changes.year)
        .bind(changes.is_active)
        .bind(changes.start_date)
        .bind(changes.end_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify_write_error)
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM batches WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if matches!(violation(&e), Some(Violation::ForeignKey(_))) {
                    batch_in_use()
                } else {
                    crate::Error::Database(e)
                }
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM batches")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn list(&self, page: Pagination, search: Option<&str>) -> Result<Vec<Batch>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        let mut query_str = format!("SELECT {BATCH_COLUMNS} FROM batches");
        let mut bind_count = 0;
        if search.is_some() {
            bind_count += 1;
            query_str.push_str(&format!(" WHERE name ILIKE ${bind_count}"));
        }
        query_str.push_str(&format!(
            " ORDER BY created_at DESC, id DESC LIMIT ${} OFFSET ${}",
            bind_count + 1,
            bind_count + 2
        ));

        let mut query = sqlx::query_as::<_, Batch>(&query_str);
        if let Some(term) = search {
            query = query.bind(like_pattern(term));
        }
        let batches = query
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(batches)
    }
}
