//! PostgreSQL implementation of the link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{Link, NewLink, TrackingParams};
use crate::domain::repositories::{InsertOutcome, LinkRepository};
use crate::error::AppError;

/// Column list shared by every query returning a full record.
///
/// `utm_params` is read back as text so the stored key order survives.
const LINK_COLUMNS: &str = "id, code, long_url, custom_slug, expires_at, \
     utm_params::text AS utm_params, click_count, created_at, updated_at";

/// PostgreSQL repository for link storage and retrieval.
///
/// Uniqueness of `code` is enforced by the `links_code_key` constraint; an
/// insert that loses the race is reported as [`InsertOutcome::CodeTaken`].
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    id: i64,
    code: String,
    long_url: String,
    custom_slug: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    utm_params: Option<String>,
    click_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LinkRow> for Link {
    type Error = AppError;

    fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
        let utm_params = row
            .utm_params
            .map(|raw| serde_json::from_str::<TrackingParams>(&raw))
            .transpose()
            .map_err(|e| {
                tracing::error!("Corrupt utm_params for link {}: {}", row.id, e);
                AppError::internal("Corrupt link record", json!({ "id": row.id }))
            })?;

        Ok(Link {
            id: row.id,
            code: row.code,
            long_url: row.long_url,
            custom_slug: row.custom_slug,
            expires_at: row.expires_at,
            utm_params,
            click_count: row.click_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn insert(&self, new_link: NewLink) -> Result<InsertOutcome, AppError> {
        let utm_params = new_link
            .utm_params
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| {
                AppError::internal("Failed to encode tracking parameters", json!({ "reason": e.to_string() }))
            })?;

        let sql = format!(
            r#"
            INSERT INTO links (code, long_url, custom_slug, expires_at, utm_params)
            VALUES ($1, $2, $3, $4, CAST($5 AS JSON))
            ON CONFLICT (code) DO NOTHING
            RETURNING {LINK_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(&new_link.code)
            .bind(&new_link.long_url)
            .bind(&new_link.custom_slug)
            .bind(new_link.expires_at)
            .bind(utm_params)
            .fetch_optional(self.pool.as_ref())
            .await?;

        match row {
            Some(row) => Ok(InsertOutcome::Inserted(row.try_into()?)),
            None => Ok(InsertOutcome::CodeTaken),
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE code = $1");

        sqlx::query_as::<_, LinkRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Link::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Link>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE id = $1");

        sqlx::query_as::<_, LinkRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Link::try_from)
            .transpose()
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM links WHERE code = $1)")
            .bind(code)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(exists)
    }

    async fn increment_clicks(&self, id: i64) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE links SET click_count = click_count + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }
}
