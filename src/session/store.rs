use super::types::{PendingConfirmation, SessionRecord, WorkflowKind};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

/// Async snapshot persistence contract. One record per session id;
/// `save` overwrites.
pub trait SessionStore: Send + Sync {
    fn save<'a>(
        &'a self,
        record: &'a SessionRecord,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn load<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SessionRecord>>> + Send + 'a>>;

    /// Session ids, most recently updated first.
    fn list_sessions<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>>;

    fn delete<'a>(&'a self, id: &'a str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;
}

/// SQLite-backed session store using sqlx async pool.
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

const SESSION_SCHEMA_META_TABLE: &str = "
CREATE TABLE IF NOT EXISTS session_schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";
const SESSION_SCHEMA_VERSION_KEY: &str = "session_schema_version";
const SESSION_SCHEMA_VERSION: u32 = 1;

async fn ensure_session_schema_version(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SESSION_SCHEMA_META_TABLE)
        .execute(pool)
        .await
        .context("create session_schema_meta table")?;

    let stored_version: Option<(String,)> =
        sqlx::query_as("SELECT value FROM session_schema_meta WHERE key = $1")
            .bind(SESSION_SCHEMA_VERSION_KEY)
            .fetch_optional(pool)
            .await
            .context("load session schema version")?;

    if let Some((value,)) = stored_version {
        let parsed = value
            .parse::<u32>()
            .with_context(|| format!("invalid session schema version value: {value}"))?;
        anyhow::ensure!(
            parsed == SESSION_SCHEMA_VERSION,
            "incompatible session schema version: stored={parsed}, expected={SESSION_SCHEMA_VERSION}. \
remove the session DB and restart."
        );
        return Ok(());
    }

    let unversioned: (i64,) = sqlx::query_as(
        "SELECT COUNT(*)
         FROM sqlite_master
         WHERE type = 'table'
           AND name = 'workflow_sessions'",
    )
    .fetch_one(pool)
    .await
    .context("detect unversioned session tables")?;

    if unversioned.0 > 0 {
        anyhow::bail!(
            "session database has tables but no schema version metadata. \
remove the session DB and restart."
        );
    }

    sqlx::query("INSERT INTO session_schema_meta (key, value) VALUES ($1, $2)")
        .bind(SESSION_SCHEMA_VERSION_KEY)
        .bind(SESSION_SCHEMA_VERSION.to_string())
        .execute(pool)
        .await
        .context("persist session schema version")?;

    Ok(())
}

impl SqliteSessionStore {
    /// Create a new store with an existing pool and run migrations.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        ensure_session_schema_version(&pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS workflow_sessions (
                 id TEXT PRIMARY KEY,
                 kind TEXT NOT NULL,
                 state TEXT NOT NULL,
                 pending TEXT,
                 continuation TEXT,
                 created_at TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .context("create workflow_sessions table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_workflow_sessions_updated
                 ON workflow_sessions(updated_at)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create session directory {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("open session database {}", path.display()))?;
        tracing::debug!(path = %path.display(), "session database opened");
        Self::new(pool).await
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Fixed-width UTC so text ordering matches time ordering.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid session timestamp: {raw}"))?
        .with_timezone(&Utc))
}

fn map_session_row(row: &SqliteRow) -> Result<SessionRecord> {
    let kind_raw: String = row.try_get("kind")?;
    let state_raw: String = row.try_get("state")?;
    let pending_raw: Option<String> = row.try_get("pending")?;
    let continuation_raw: Option<String> = row.try_get("continuation")?;
    let created_raw: String = row.try_get("created_at")?;
    let updated_raw: String = row.try_get("updated_at")?;

    let kind = kind_raw
        .parse::<WorkflowKind>()
        .with_context(|| format!("unknown workflow kind: {kind_raw}"))?;
    let pending = pending_raw
        .map(|value| serde_json::from_str::<PendingConfirmation>(&value))
        .transpose()
        .context("deserialize pending confirmation")?;
    let continuation = continuation_raw
        .map(|value| serde_json::from_str::<serde_json::Value>(&value))
        .transpose()
        .context("deserialize continuation")?;

    Ok(SessionRecord {
        id: row.try_get("id")?,
        kind,
        state: serde_json::from_str(&state_raw).context("deserialize session state")?,
        pending,
        continuation,
        created_at: parse_timestamp(&created_raw)?,
        updated_at: parse_timestamp(&updated_raw)?,
    })
}

impl SessionStore for SqliteSessionStore {
    fn save<'a>(
        &'a self,
        record: &'a SessionRecord,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let state = serde_json::to_string(&record.state)?;
            let pending = record
                .pending
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let continuation = record
                .continuation
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            sqlx::query(
                "INSERT INTO workflow_sessions
                     (id, kind, state, pending, continuation, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT(id) DO UPDATE SET
                     kind = excluded.kind,
                     state = excluded.state,
                     pending = excluded.pending,
                     continuation = excluded.continuation,
                     updated_at = excluded.updated_at",
            )
            .bind(&record.id)
            .bind(record.kind.to_string())
            .bind(state)
            .bind(pending)
            .bind(continuation)
            .bind(format_timestamp(record.created_at))
            .bind(format_timestamp(record.updated_at))
            .execute(&self.pool)
            .await
            .with_context(|| format!("save session {}", record.id))?;
            Ok(())
        })
    }

    fn load<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SessionRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, kind, state, pending, continuation, created_at, updated_at
                 FROM workflow_sessions
                 WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("query session by id")?;

            row.map(|r| map_session_row(&r)).transpose()
        })
    }

    fn list_sessions<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>> {
        Box::pin(async move {
            let rows: Vec<(String,)> = sqlx::query_as(
                "SELECT id FROM workflow_sessions ORDER BY updated_at DESC, id ASC",
            )
            .fetch_all(&self.pool)
            .await
            .context("list sessions")?;
            Ok(rows.into_iter().map(|(id,)| id).collect())
        })
    }

    fn delete<'a>(&'a self, id: &'a str) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM workflow_sessions WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        })
    }
}
