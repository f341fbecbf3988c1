//! Operations on the `uuids` table: the root of the job/archive namespace.

use sqlx::SqlitePool;

use crate::id::{IndexId, Kind};
use crate::model::UuidInfo;
use crate::Error;

pub async fn find_or_create(db: &SqlitePool, job_uuid: &str) -> Result<IndexId, Error> {
    if let Some(row) = sqlx::query_as::<_, (i64,)>("SELECT id FROM uuids WHERE job_uuid = ?")
        .bind(job_uuid)
        .fetch_optional(db)
        .await?
    {
        return Ok(IndexId::new(Kind::Uuid, row.0));
    }
    let row: (i64,) = sqlx::query_as("INSERT INTO uuids (job_uuid) VALUES (?) RETURNING id")
        .bind(job_uuid)
        .fetch_one(db)
        .await?;
    Ok(IndexId::new(Kind::Uuid, row.0))
}

pub async fn info(db: &SqlitePool, id: IndexId) -> Result<UuidInfo, Error> {
    if id.kind != Kind::Uuid {
        return Err(Error::InvalidState(id, "not a uuid id"));
    }
    sqlx::query_as::<_, UuidInfo>(
        "SELECT id AS uuid_id, job_uuid, total_entity_count, total_storage_count,
                total_entry_count, total_entry_size,
                total_entry_count_newest, total_entry_size_newest
         FROM uuids WHERE id = ?",
    )
    .bind(id.row_id)
    .fetch_optional(db)
    .await?
    .ok_or(Error::NotFound(id))
}

/// Deletes the uuid if no entity references it anymore. Returns whether
/// it was deleted.
pub async fn prune_if_empty(db: &SqlitePool, id: IndexId) -> Result<bool, Error> {
    if id.kind != Kind::Uuid {
        return Err(Error::InvalidState(id, "not a uuid id"));
    }
    let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entities WHERE uuid_id = ?")
        .bind(id.row_id)
        .fetch_one(db)
        .await?;
    if remaining.0 > 0 {
        return Ok(false);
    }
    let result = sqlx::query("DELETE FROM uuids WHERE id = ?")
        .bind(id.row_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
