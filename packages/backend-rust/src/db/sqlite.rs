use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use prepmate_algo::{MasteryState, RetentionState, TopicSnapshot};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::db::schema::{split_sql_statements, LEARNER_SCHEMA_SQL, SCHEMA_VERSION};
use crate::db::{StoreError, Versioned};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str, busy_timeout: Duration) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Init(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout);

        if let Some(parent) = sqlite_file_path(url).as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Init(format!("{}: {e}", parent.display())))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if it is missing.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn get_mastery(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<Versioned<MasteryState>>, StoreError> {
        let row: Option<(String, i64)> = sqlx::query_as(
            r#"SELECT "state", "version" FROM "topic_mastery" WHERE "user_id" = ? AND "topic_id" = ?"#,
        )
        .bind(user_id)
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(state, version)| decode_versioned(topic_id, &state, version))
            .transpose()
    }

    pub async fn put_mastery(
        &self,
        user_id: &str,
        topic_id: &str,
        state: &MasteryState,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError> {
        let payload = serde_json::to_string(state)?;
        let updated_at = state.last_updated.to_rfc3339();

        let result = match expected_version {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO "topic_mastery" (
                        "user_id", "topic_id", "mastery_probability", "confidence_score",
                        "attempt_count", "success_count", "improvement_trend", "state",
                        "version", "updated_at"
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
                    ON CONFLICT ("user_id", "topic_id") DO NOTHING
                    "#,
                )
                .bind(user_id)
                .bind(topic_id)
                .bind(state.mastery_probability)
                .bind(state.confidence_score)
                .bind(state.attempt_count as i64)
                .bind(state.success_count as i64)
                .bind(state.improvement_trend.as_str())
                .bind(&payload)
                .bind(&updated_at)
                .execute(&self.pool)
                .await?
            }
            Some(version) => {
                sqlx::query(
                    r#"
                    UPDATE "topic_mastery" SET
                        "mastery_probability" = ?,
                        "confidence_score" = ?,
                        "attempt_count" = ?,
                        "success_count" = ?,
                        "improvement_trend" = ?,
                        "state" = ?,
                        "version" = "version" + 1,
                        "updated_at" = ?
                    WHERE "user_id" = ? AND "topic_id" = ? AND "version" = ?
                    "#,
                )
                .bind(state.mastery_probability)
                .bind(state.confidence_score)
                .bind(state.attempt_count as i64)
                .bind(state.success_count as i64)
                .bind(state.improvement_trend.as_str())
                .bind(&payload)
                .bind(&updated_at)
                .bind(user_id)
                .bind(topic_id)
                .bind(version)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(conflict(user_id, topic_id));
        }
        Ok(expected_version.unwrap_or(0) + 1)
    }

    pub async fn list_mastery(&self, user_id: &str) -> Result<Vec<(String, MasteryState)>, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"SELECT "topic_id", "state" FROM "topic_mastery" WHERE "user_id" = ? ORDER BY "topic_id""#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        decode_rows(rows)
    }

    pub async fn get_retention(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<Versioned<RetentionState>>, StoreError> {
        let row: Option<(String, i64)> = sqlx::query_as(
            r#"SELECT "state", "version" FROM "revision_schedule" WHERE "user_id" = ? AND "topic_id" = ?"#,
        )
        .bind(user_id)
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(state, version)| decode_versioned(topic_id, &state, version))
            .transpose()
    }

    pub async fn put_retention(
        &self,
        user_id: &str,
        topic_id: &str,
        state: &RetentionState,
        expected_version: Option<i64>,
    ) -> Result<i64, StoreError> {
        let payload = serde_json::to_string(state)?;
        let next_revision = state.next_revision_date.to_rfc3339();
        let updated_at = state.last_revision_date.to_rfc3339();

        let result = match expected_version {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO "revision_schedule" (
                        "user_id", "topic_id", "retention_probability", "stability_days",
                        "next_revision_date", "urgency_level", "state", "version", "updated_at"
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?)
                    ON CONFLICT ("user_id", "topic_id") DO NOTHING
                    "#,
                )
                .bind(user_id)
                .bind(topic_id)
                .bind(state.retention_probability)
                .bind(state.stability_days)
                .bind(&next_revision)
                .bind(state.urgency_level.as_str())
                .bind(&payload)
                .bind(&updated_at)
                .execute(&self.pool)
                .await?
            }
            Some(version) => {
                sqlx::query(
                    r#"
                    UPDATE "revision_schedule" SET
                        "retention_probability" = ?,
                        "stability_days" = ?,
                        "next_revision_date" = ?,
                        "urgency_level" = ?,
                        "state" = ?,
                        "version" = "version" + 1,
                        "updated_at" = ?
                    WHERE "user_id" = ? AND "topic_id" = ? AND "version" = ?
                    "#,
                )
                .bind(state.retention_probability)
                .bind(state.stability_days)
                .bind(&next_revision)
                .bind(state.urgency_level.as_str())
                .bind(&payload)
                .bind(&updated_at)
                .bind(user_id)
                .bind(topic_id)
                .bind(version)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(conflict(user_id, topic_id));
        }
        Ok(expected_version.unwrap_or(0) + 1)
    }

    pub async fn list_retention(&self, user_id: &str) -> Result<Vec<(String, RetentionState)>, StoreError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"SELECT "topic_id", "state" FROM "revision_schedule" WHERE "user_id" = ? ORDER BY "topic_id""#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        decode_rows(rows)
    }

    pub async fn user_snapshot(&self, user_id: &str) -> Result<Vec<TopicSnapshot>, StoreError> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT m."topic_id", m."state", r."state"
            FROM "topic_mastery" m
            LEFT JOIN "revision_schedule" r
                ON r."user_id" = m."user_id" AND r."topic_id" = m."topic_id"
            WHERE m."user_id" = ?
            ORDER BY m."topic_id"
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(topic_id, mastery, retention)| {
                let mastery = decode(&topic_id, &mastery)?;
                let retention = retention.map(|r| decode(&topic_id, &r)).transpose()?;
                Ok(TopicSnapshot::new(topic_id, mastery, retention))
            })
            .collect()
    }
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    let version: Option<String> =
        sqlx::query_scalar(r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#)
            .fetch_optional(pool)
            .await
            .unwrap_or(None);

    if version.as_deref() == Some(SCHEMA_VERSION) {
        return Ok(());
    }

    for stmt in split_sql_statements(LEARNER_SCHEMA_SQL) {
        sqlx::query(&stmt).execute(pool).await?;
    }

    sqlx::query(r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#)
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    tracing::info!(schema_version = SCHEMA_VERSION, "learner schema ready");
    Ok(())
}

/// On-disk path of a sqlite URL, `None` for in-memory databases.
fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}

fn conflict(user_id: &str, topic_id: &str) -> StoreError {
    StoreError::Conflict {
        user_id: user_id.to_string(),
        topic_id: topic_id.to_string(),
    }
}

fn decode<T: DeserializeOwned>(topic_id: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(format!("{topic_id}: {e}")))
}

fn decode_versioned<T: DeserializeOwned>(
    topic_id: &str,
    raw: &str,
    version: i64,
) -> Result<Versioned<T>, StoreError> {
    Ok(Versioned {
        value: decode(topic_id, raw)?,
        version,
    })
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<(String, String)>) -> Result<Vec<(String, T)>, StoreError> {
    rows.into_iter()
        .map(|(topic_id, raw)| {
            let value = decode(&topic_id, &raw)?;
            Ok((topic_id, value))
        })
        .collect()
}
