//! Student repository (PostgreSQL).
//!
//! Enumerations are stored as their wire text. Parents are loaded with a
//! second query and embedded into each student.

use super::parent::load_parents;
use super::{classify_write_error, like_pattern, StudentStore};
use crate::models::{Student, StudentFilter, StudentProfile, StudentRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use std::str::FromStr;

/// Columns written from a [`StudentRecord`], in bind order.
const WRITE_COLUMNS: &[&str] = &[
    "full_name",
    "gender",
    "nisn",
    "nik",
    "asal_sekolah",
    "tempat_lahir",
    "tanggal_lahir",
    "agama",
    "keadaan_ortu",
    "status_keluarga",
    "anak_ke",
    "dari_bersaudara",
    "tinggal_bersama",
    "tinggal_bersama_lainnya",
    "kewarganegaraan",
    "alamat_jalan",
    "rt",
    "rw",
    "desa_kelurahan",
    "kecamatan",
    "kabupaten",
    "provinsi",
    "kode_pos",
    "phone",
    "email",
    "photo",
    "kartu_keluarga",
    "akta_kelahiran",
    "ijazah_skl",
    "blood_type",
    "berat_kg",
    "tinggi_cm",
    "riwayat_penyakit",
    "is_accepted",
    "parent_id",
    "batch_id",
];

#[derive(Clone)]
pub struct PostgresStudentStore {
    pool: PgPool,
}

impl PostgresStudentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn select_columns() -> String {
        format!("id, {}, created_at, updated_at", WRITE_COLUMNS.join(", "))
    }

    /// Map rows and embed their parents.
    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Student>> {
        let mut students = rows
            .iter()
            .map(student_from_row)
            .collect::<Result<Vec<_>>>()?;

        let parent_ids: Vec<i32> = students.iter().filter_map(|s| s.parent_id).collect();
        let mut parents = load_parents(&self.pool, &parent_ids).await?;
        for student in &mut students {
            student.parent = student.parent_id.and_then(|id| parents.remove(&id));
        }
        Ok(students)
    }

    async fn hydrate_one(&self, row: Option<PgRow>) -> Result<Option<Student>> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StudentStore for PostgresStudentStore {
    async fn create(&self, record: &StudentRecord) -> Result<Student> {
        let placeholders = (1..=WRITE_COLUMNS.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO students ({}) VALUES ({}) RETURNING {}",
            WRITE_COLUMNS.join(", "),
            placeholders,
            Self::select_columns()
        );

        let row = bind_record(sqlx::query(&sql), record)
            .fetch_one(&self.pool)
            .await
            .map_err(classify_write_error)?;

        self.hydrate_one(Some(row))
            .await?
            .ok_or_else(|| Error::Internal("inserted student row missing".to_string()))
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<Student>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM students WHERE id = $1",
            Self::select_columns()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        self.hydrate_one(row).await
    }

    async fn update(&self, id: i32, record: &StudentRecord) -> Result<Option<Student>> {
        let placeholders = (2..=WRITE_COLUMNS.len() + 1)
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE students SET ({}) = ({}), updated_at = NOW() WHERE id = $1 RETURNING {}",
            WRITE_COLUMNS.join(", "),
            placeholders,
            Self::select_columns()
        );

        let row = bind_record(sqlx::query(&sql).bind(id), record)
            .fetch_optional(&self.pool)
            .await
            .map_err(classify_write_error)?;
        self.hydrate_one(row).await
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM students WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn count_by_batch(&self, batch_id: i32) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE batch_id = $1")
            .bind(batch_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn list(&self, filter: &StudentFilter) -> Result<Vec<Student>> {
        let mut where_clauses = vec![];
        let mut bind_count = 0;

        if filter.search_term().is_some() {
            bind_count += 1;
            where_clauses.push(format!(
                "(full_name ILIKE ${0} OR nisn ILIKE ${0} OR nik ILIKE ${0})",
                bind_count
            ));
        }
        if filter.batch_id.is_some() {
            bind_count += 1;
            where_clauses.push(format!("batch_id = ${}", bind_count));
        }
        if filter.accepted.is_some() {
            bind_count += 1;
            where_clauses.push(format!("is_accepted = ${}", bind_count));
        }

        let mut query_str = format!("SELECT {} FROM students", Self::select_columns());
        if !where_clauses.is_empty() {
            query_str.push_str(" WHERE ");
            query_str.push_str(&where_clauses.join(" AND "));
        }
        query_str.push_str(&format!(
            " ORDER BY full_name ASC, id ASC LIMIT ${} OFFSET ${}",
            bind_count + 1,
            bind_count + 2
        ));

        let mut query = sqlx::query(&query_str);
        if let Some(term) = filter.search_term() {
            query = query.bind(like_pattern(term));
        }
        if let Some(batch_id) = filter.batch_id {
            query = query.bind(batch_id);
        }
        if let Some(accepted) = filter.accepted {
            query = query.bind(accepted);
        }
        let rows = query
            .bind(filter.pagination.limit)
            .bind(filter.pagination.offset())
            .fetch_all(&self.pool)
            .await?;

        self.hydrate(rows).await
    }
}

/// Bind a record's values in [`WRITE_COLUMNS`] order.
fn bind_record<'q>(
    query: Query<'q, Postgres, PgArguments>,
    record: &'q StudentRecord,
) -> Query<'q, Postgres, PgArguments> {
    let p = &record.profile;
    query
        .bind(&record.full_name)
        .bind(record.gender.as_str())
        .bind(&p.nisn)
        .bind(&p.nik)
        .bind(&p.asal_sekolah)
        .bind(&p.tempat_lahir)
        .bind(&p.tanggal_lahir)
        .bind(p.agama.map(|v| v.as_str()))
        .bind(p.keadaan_ortu.map(|v| v.as_str()))
        .bind(p.status_keluarga.map(|v| v.as_str()))
        .bind(p.anak_ke)
        .bind(p.dari_bersaudara)
        .bind(p.tinggal_bersama.map(|v| v.as_str()))
        .bind(&p.tinggal_bersama_lainnya)
        .bind(&p.kewarganegaraan)
        .bind(&p.alamat_jalan)
        .bind(&p.rt)
        .bind(&p.rw)
        .bind(&p.desa_kelurahan)
        .bind(&p.kecamatan)
        .bind(&p.kabupaten)
        .bind(&p.provinsi)
        .bind(&p.kode_pos)
        .bind(&p.phone)
        .bind(&p.email)
        .bind(&p.photo)
        .bind(&p.kartu_keluarga)
        .bind(&p.akta_kelahiran)
        .bind(&p.ijazah_skl)
        .bind(p.blood_type.map(|v| v.as_str()))
        .bind(p.berat_kg)
        .bind(p.tinggi_cm)
        .bind(&p.riwayat_penyakit)
        .bind(record.is_accepted)
        .bind(record.parent_id)
        .bind(record.batch_id)
}

fn student_from_row(row: &PgRow) -> Result<Student> {
    Ok(Student {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        gender: text_column(row, "gender")?,
        profile: StudentProfile {
            nisn: row.try_get("nisn")?,
            nik: row.try_get("nik")?,
            asal_sekolah: row.try_get("asal_sekolah")?,
            tempat_lahir: row.try_get("tempat_lahir")?,
            tanggal_lahir: row.try_get("tanggal_lahir")?,
            agama: optional_text_column(row, "agama")?,
            keadaan_ortu: optional_text_column(row, "keadaan_ortu")?,
            status_keluarga: optional_text_column(row, "status_keluarga")?,
            anak_ke: row.try_get("anak_ke")?,
            dari_bersaudara: row.try_get("dari_bersaudara")?,
            tinggal_bersama: optional_text_column(row, "tinggal_bersama")?,
            tinggal_bersama_lainnya: row.try_get("tinggal_bersama_lainnya")?,
            kewarganegaraan: row.try_get("kewarganegaraan")?,
            alamat_jalan: row.try_get("alamat_jalan")?,
            rt: row.try_get("rt")?,
            rw: row.try_get("rw")?,
            desa_kelurahan: row.try_get("desa_kelurahan")?,
            kecamatan: row.try_get("kecamatan")?,
            kabupaten: row.try_get("kabupaten")?,
            provinsi: row.try_get("provinsi")?,
            kode_pos: row.try_get("kode_pos")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
            photo: row.try_get("photo")?,
            kartu_keluarga: row.try_get("kartu_keluarga")?,
            akta_kelahiran: row.try_get("akta_kelahiran")?,
            ijazah_skl: row.try_get("ijazah_skl")?,
            blood_type: optional_text_column(row, "blood_type")?,
            berat_kg: row.try_get("berat_kg")?,
            tinggi_cm: row.try_get("tinggi_cm")?,
            riwayat_penyakit: row.try_get("riwayat_penyakit")?,
        },
        is_accepted: row.try_get("is_accepted")?,
        parent_id: row.try_get("parent_id")?,
        batch_id: row.try_get("batch_id")?,
        parent: None,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn text_column<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e| Error::Internal(format!("column {column}: {e}")))
}

fn optional_text_column<T>(row: &PgRow, column: &str) -> Result<Option<T>>
where
    T: FromStr<Err = String>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| value.parse())
        .transpose()
        .map_err(|e| Error::Internal(format!("column {column}: {e}")))
}
