//! Operations on the `entities` table: one entity per archive definition
//! under a uuid, carrying its own rolled-up aggregates.

use sqlx::SqlitePool;

use crate::id::{IndexId, Kind};
use crate::model::EntityInfo;
use crate::Error;

pub async fn create(
    db: &SqlitePool,
    uuid_id: IndexId,
    job_uuid: &str,
    schedule_uuid: Option<&str>,
    archive_type: &str,
    created: i64,
) -> Result<IndexId, Error> {
    if uuid_id.kind != Kind::Uuid {
        return Err(Error::InvalidState(uuid_id, "not a uuid id"));
    }
    let mut tx = db.begin().await?;
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO entities (uuid_id, job_uuid, schedule_uuid, archive_type, created)
         VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(uuid_id.row_id)
    .bind(job_uuid)
    .bind(schedule_uuid)
    .bind(archive_type)
    .bind(created)
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query("UPDATE uuids SET total_entity_count = total_entity_count + 1 WHERE id = ?")
        .bind(uuid_id.row_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(IndexId::new(Kind::Entity, row.0))
}

pub async fn info(db: &SqlitePool, id: IndexId) -> Result<EntityInfo, Error> {
    if id.kind != Kind::Entity {
        return Err(Error::InvalidState(id, "not an entity id"));
    }
    sqlx::query_as::<_, EntityInfo>(
        "SELECT id AS entity_id, uuid_id, job_uuid, schedule_uuid, archive_type, created,
                locked_count, is_default, total_storage_count, total_entry_count, total_entry_size
         FROM entities WHERE id = ?",
    )
    .bind(id.row_id)
    .fetch_optional(db)
    .await?
    .ok_or(Error::NotFound(id))
}

/// Acquires the entity's exclusive lock for the duration of a job, so
/// concurrent jobs against the same entity serialize rather than race on
/// its entry set. Returns `false` if already locked.
pub async fn try_lock(db: &SqlitePool, id: IndexId) -> Result<bool, Error> {
    let result = sqlx::query(
        "UPDATE entities SET locked_count = locked_count + 1 WHERE id = ? AND locked_count = 0",
    )
    .bind(id.row_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn unlock(db: &SqlitePool, id: IndexId) -> Result<(), Error> {
    sqlx::query("UPDATE entities SET locked_count = 0 WHERE id = ?")
        .bind(id.row_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Deletes the entity if no non-deleted storage references it anymore.
/// The default entity (used for storages without a run context) is never
/// pruned even when empty. Returns whether the entity was deleted.
pub async fn prune_if_empty(db: &SqlitePool, id: IndexId) -> Result<bool, Error> {
    if id.kind != Kind::Entity {
        return Err(Error::InvalidState(id, "not an entity id"));
    }
    let row: (i64, i64) = sqlx::query_as(
        "SELECT uuid_id, is_default FROM entities WHERE id = ?",
    )
    .bind(id.row_id)
    .fetch_optional(db)
    .await?
    .ok_or(Error::NotFound(id))?;
    if row.1 != 0 {
        return Ok(false);
    }
    let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM storages WHERE entity_id = ? AND deleted_flag = 0")
        .bind(id.row_id)
        .fetch_one(db)
        .await?;
    if remaining.0 > 0 {
        return Ok(false);
    }

    let mut tx = db.begin().await?;
    sqlx::query("DELETE FROM entities WHERE id = ?")
        .bind(id.row_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE uuids SET total_entity_count = total_entity_count - 1 WHERE id = ?")
        .bind(row.0)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::CatalogPool;
    use crate::uuids;

    #[tokio::test]
    async fn create_bumps_uuid_entity_count() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let uuid_id = uuids::find_or_create(pool.sqlite(), "job-a").await.unwrap();
        let entity_id = create(pool.sqlite(), uuid_id, "job-a", None, "full", 1000).await.unwrap();
        assert_eq!(entity_id.kind, Kind::Entity);
        let uuid_info = uuids::info(pool.sqlite(), uuid_id).await.unwrap();
        assert_eq!(uuid_info.total_entity_count, 1);
    }

    #[tokio::test]
    async fn lock_is_exclusive() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let uuid_id = uuids::find_or_create(pool.sqlite(), "job-a").await.unwrap();
        let entity_id = create(pool.sqlite(), uuid_id, "job-a", None, "full", 1000).await.unwrap();
        assert!(try_lock(pool.sqlite(), entity_id).await.unwrap());
        assert!(!try_lock(pool.sqlite(), entity_id).await.unwrap());
        unlock(pool.sqlite(), entity_id).await.unwrap();
        assert!(try_lock(pool.sqlite(), entity_id).await.unwrap());
    }
}
