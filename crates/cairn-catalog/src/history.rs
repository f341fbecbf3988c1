//! Job run history: one row per completed (or failed) job or schedule
//! invocation, independent of the entities/entries it touched.

use sqlx::SqlitePool;

use crate::id::{IndexId, Kind};
use crate::Error;

pub async fn record(
    db: &SqlitePool,
    job_uuid: &str,
    schedule_uuid: Option<&str>,
    kind: &str,
    created: i64,
    duration: i64,
    error_message: Option<&str>,
) -> Result<IndexId, Error> {
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO history (job_uuid, schedule_uuid, type, created, duration, error_message)
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(job_uuid)
    .bind(schedule_uuid)
    .bind(kind)
    .bind(created)
    .bind(duration)
    .bind(error_message)
    .fetch_one(db)
    .await?;
    Ok(IndexId::new(Kind::History, row.0))
}

#[derive(Debug, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct HistoryEntry {
    pub history_id: i64,
    pub job_uuid: String,
    pub schedule_uuid: Option<String>,
    pub kind: String,
    pub created: i64,
    pub duration: i64,
    pub error_message: Option<String>,
}

pub async fn list_for_job(db: &SqlitePool, job_uuid: &str) -> Result<Vec<HistoryEntry>, Error> {
    Ok(sqlx::query_as::<_, HistoryEntry>(
        "SELECT id AS history_id, job_uuid, schedule_uuid, type AS kind, created, duration,
                error_message
         FROM history WHERE job_uuid = ? ORDER BY created DESC",
    )
    .bind(job_uuid)
    .fetch_all(db)
    .await?)
}
