//! Postgres request store
//!
//! Documents live in one JSONB column. Writes run in a transaction that
//! takes `SELECT ... FOR UPDATE` on the document's row, so concurrent
//! writers to the same request ID are serialized by the database.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::types::Json;
use sqlx::{PgPool, Transaction};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::model::{Request, RequestStatus, Submission};
use crate::store::{apply_patch, apply_submission, prepare_new, RequestStore};

const CREATE_TABLE: &str = "\
    CREATE TABLE IF NOT EXISTS requests ( \
        id TEXT PRIMARY KEY, \
        data JSONB NOT NULL, \
        created_at TIMESTAMPTZ DEFAULT now() \
    )";

/// Request store backed by a Postgres `requests` table
#[derive(Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using `config` and make sure the table exists
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| StoreError::Config("DATABASE_URL is not set".into()))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Create the `requests` table if it is missing
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Lock and load one document inside `tx`
    async fn lock_document(
        tx: &mut Transaction<'_, Postgres>,
        id: &str,
    ) -> StoreResult<Request> {
        let row: Option<Json<Request>> =
            sqlx::query_scalar("SELECT data FROM requests WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;
        row.map(|Json(request)| request)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Read-modify-write of one document under its row lock
    ///
    /// Any error rolls the transaction back when `tx` is dropped.
    async fn modify<F>(&self, id: &str, change: F) -> StoreResult<Request>
    where
        F: FnOnce(&mut Request) -> StoreResult<()> + Send,
    {
        let mut tx = self.pool.begin().await?;
        let mut request = Self::lock_document(&mut tx, id).await?;
        change(&mut request)?;

        sqlx::query("UPDATE requests SET data = $1 WHERE id = $2")
            .bind(Json(&request))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(request)
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn list(&self) -> StoreResult<Vec<Request>> {
        let rows: Vec<Json<Request>> =
            sqlx::query_scalar("SELECT data FROM requests ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|Json(request)| request).collect())
    }

    async fn get(&self, id: &str) -> StoreResult<Request> {
        let row: Option<Json<Request>> = sqlx::query_scalar("SELECT data FROM requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|Json(request)| request)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, request: Request, created_by: &str) -> StoreResult<Request> {
        let existing: Vec<String> = if request.id.trim().is_empty() {
            sqlx::query_scalar("SELECT id FROM requests")
                .fetch_all(&self.pool)
                .await?
        } else {
            Vec::new()
        };
        let now = Utc::now();
        let request = prepare_new(request, created_by, existing.iter().map(String::as_str), now)?;

        // A generated ID can still race another creator; the primary key decides
        let inserted = sqlx::query(
            "INSERT INTO requests (id, data, created_at) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&request.id)
        .bind(Json(&request))
        .bind(now)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "request {} already exists",
                request.id
            )));
        }
        tracing::info!(id = %request.id, "request created");
        Ok(request)
    }

    async fn add_submission(&self, id: &str, submission: Submission) -> StoreResult<Request> {
        let department = submission.department.clone();
        let updated = self
            .modify(id, |request| apply_submission(request, submission, Utc::now()))
            .await?;
        tracing::info!(id, department = %department, "submission added");
        Ok(updated)
    }

    async fn update_status(&self, id: &str, status: RequestStatus) -> StoreResult<Request> {
        self.modify(id, |request| {
            request.status = status;
            Ok(())
        })
        .await
    }

    async fn update(&self, id: &str, patch: Map<String, Value>) -> StoreResult<Request> {
        self.modify(id, |request| {
            *request = apply_patch(request, patch)?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let deleted = sqlx::query("DELETE FROM requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        tracing::info!(id, "request deleted");
        Ok(())
    }
}
