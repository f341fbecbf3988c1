//! Operations on the `storages` table: the physical volumes that back an
//! entity's entries.

use sqlx::SqlitePool;

use crate::id::{IndexId, Kind};
use crate::model::{StorageInfo, StorageMode, StorageState};
use crate::Error;

pub async fn create(
    db: &SqlitePool,
    entity_id: IndexId,
    name: &str,
    mode: StorageMode,
    created: i64,
) -> Result<IndexId, Error> {
    if entity_id.kind != Kind::Entity {
        return Err(Error::InvalidState(entity_id, "not an entity id"));
    }
    let mut tx = db.begin().await?;
    let entity_uuid: (i64,) = sqlx::query_as("SELECT uuid_id FROM entities WHERE id = ?")
        .bind(entity_id.row_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound(entity_id))?;
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO storages (entity_id, uuid_id, name, created, state, mode)
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(entity_id.row_id)
    .bind(entity_uuid.0)
    .bind(name)
    .bind(created)
    .bind(StorageState::Create.as_str())
    .bind(mode.as_str())
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query("UPDATE entities SET total_storage_count = total_storage_count + 1 WHERE id = ?")
        .bind(entity_id.row_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(IndexId::new(Kind::Storage, row.0))
}

pub async fn info(db: &SqlitePool, id: IndexId) -> Result<StorageInfo, Error> {
    if id.kind != Kind::Storage {
        return Err(Error::InvalidState(id, "not a storage id"));
    }
    sqlx::query_as::<_, StorageInfo>(
        "SELECT id AS storage_id, entity_id, uuid_id, name, created, size, state, mode, deleted_flag,
                total_entry_count, total_entry_size
         FROM storages WHERE id = ?",
    )
    .bind(id.row_id)
    .fetch_optional(db)
    .await?
    .ok_or(Error::NotFound(id))
}

pub async fn set_state(
    db: &SqlitePool,
    id: IndexId,
    state: StorageState,
    error_message: Option<&str>,
) -> Result<(), Error> {
    if id.kind != Kind::Storage {
        return Err(Error::InvalidState(id, "not a storage id"));
    }
    let result = sqlx::query("UPDATE storages SET state = ?, error_message = ? WHERE id = ?")
        .bind(state.as_str())
        .bind(error_message)
        .bind(id.row_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(id));
    }
    Ok(())
}

/// Marks a storage deleted without purging its rows; purge is a separate
/// maintenance pass since entries may still reference the storage's bytes.
pub async fn mark_deleted(db: &SqlitePool, id: IndexId) -> Result<(), Error> {
    set_state(db, id, StorageState::Deleted, None).await?;
    sqlx::query("UPDATE storages SET deleted_flag = 1 WHERE id = ?")
        .bind(id.row_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Relocates a storage to a retention sweep's `moveTo` destination instead
/// of purging it. The caller moves the bytes; this only updates the
/// catalog's record of where they now live and drops the storage out of
/// future retention sweeps. Entries on it stay intact.
pub async fn relocate(db: &SqlitePool, id: IndexId, destination: &str) -> Result<(), Error> {
    if id.kind != Kind::Storage {
        return Err(Error::InvalidState(id, "not a storage id"));
    }
    let result = sqlx::query("UPDATE storages SET name = ?, state = ?, deleted_flag = 1 WHERE id = ?")
        .bind(destination)
        .bind(StorageState::Moved.as_str())
        .bind(id.row_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(id));
    }
    Ok(())
}

/// Physically removes a storage and the entries that live on it. Unlike
/// [`mark_deleted`] this is irreversible: fragments, detail rows and the
/// storage row itself are gone, and the entity/uuid aggregates above it
/// are rolled back to match.
pub async fn purge_storage(db: &SqlitePool, id: IndexId) -> Result<u64, Error> {
    if id.kind != Kind::Storage {
        return Err(Error::InvalidState(id, "not a storage id"));
    }
    let owner: (i64, Option<i64>) = sqlx::query_as("SELECT entity_id, uuid_id FROM storages WHERE id = ?")
        .bind(id.row_id)
        .fetch_optional(db)
        .await?
        .ok_or(Error::NotFound(id))?;
    let entry_ids: Vec<(i64, i64)> = sqlx::query_as("SELECT id, size FROM entries WHERE storage_id = ?")
        .bind(id.row_id)
        .fetch_all(db)
        .await?;

    let mut tx = db.begin().await?;
    for (entry_id, _) in &entry_ids {
        sqlx::query("DELETE FROM entry_fragments WHERE entry_id = ?")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM directory_entries WHERE entry_id = ?")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM link_entries WHERE entry_id = ?")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM special_entries WHERE entry_id = ?")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM entries_newest WHERE entry_id = ?")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;
    }
    // Fragments of entries that live mainly on other storages but borrow a
    // range from this one also need cleaning up, without touching those
    // entries themselves.
    sqlx::query("DELETE FROM entry_fragments WHERE storage_id = ?")
        .bind(id.row_id)
        .execute(&mut *tx)
        .await?;

    let total_size: i64 = entry_ids.iter().map(|(_, size)| size).sum();
    sqlx::query(
        "UPDATE entities SET total_storage_count = total_storage_count - 1,
                total_entry_count = total_entry_count - ?, total_entry_size = total_entry_size - ?
         WHERE id = ?",
    )
    .bind(entry_ids.len() as i64)
    .bind(total_size)
    .bind(owner.0)
    .execute(&mut *tx)
    .await?;
    if let Some(uuid_row_id) = owner.1 {
        sqlx::query(
            "UPDATE uuids SET total_entry_count = total_entry_count - ?, total_entry_size = total_entry_size - ? WHERE id = ?",
        )
        .bind(entry_ids.len() as i64)
        .bind(total_size)
        .bind(uuid_row_id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM storages WHERE id = ?")
        .bind(id.row_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(entry_ids.len() as u64)
}
