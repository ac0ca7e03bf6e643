//! Dispensary lookups used by carts, proposals and public authentication

use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DispensaryRecord {
    pub id: Uuid,
    pub name: String,
    pub license_number: String,
    pub sales_rep_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct DispensaryService {
    db: PgPool,
}

impl DispensaryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Dispensary whose license number matches exactly
    pub async fn by_license(&self, license_number: &str) -> AppResult<Option<DispensaryRecord>> {
        let record = sqlx::query_as::<_, DispensaryRecord>(
            r#"
            SELECT id, name, license_number, sales_rep_id
            FROM dispensaries
            WHERE license_number = $1
            "#,
        )
        .bind(license_number)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    /// Fetch a dispensary inside an open transaction
    pub async fn find(conn: &mut PgConnection, id: Uuid) -> AppResult<DispensaryRecord> {
        sqlx::query_as::<_, DispensaryRecord>(
            r#"
            SELECT id, name, license_number, sales_rep_id
            FROM dispensaries
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Dispensary".to_string()))
    }

    /// Fetch and row-lock a dispensary. Serializes proposal creation per dispensary.
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> AppResult<DispensaryRecord> {
        sqlx::query_as::<_, DispensaryRecord>(
            r#"
            SELECT id, name, license_number, sales_rep_id
            FROM dispensaries
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Dispensary".to_string()))
    }
}
