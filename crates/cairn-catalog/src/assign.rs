//! The re-parenting algorithm behind `assign`: moving entries, storages or
//! whole entities to a new parent while keeping every rolled-up aggregate
//! consistent. Each of the five request shapes rewrites foreign keys on the
//! moved rows in one transaction, then recomputes aggregates on every
//! ancestor that gained or lost rows, pruning a parent left with nothing in
//! it.

use sqlx::SqlitePool;

use crate::id::{IndexId, Kind};
use crate::Error;

#[derive(Clone, Debug)]
pub enum AssignRequest {
    /// Re-home a storage's entries onto a different storage (e.g. after a
    /// volume is consolidated), then remove the now-empty source storage.
    EntriesOfStorageToStorage { from: IndexId, to: IndexId },
    /// Re-home all of an entity's storages onto a different entity.
    StoragesOfEntityToEntity { from: IndexId, to: IndexId },
    /// Re-home all of an entity's entries onto a different entity, leaving
    /// storages where they are.
    EntriesOfEntityToEntity { from: IndexId, to: IndexId },
    /// Re-home a single storage onto a different entity, pruning the old
    /// entity if it's left with nothing in it.
    StorageToEntity { storage: IndexId, to: IndexId },
    /// Re-home an entity onto a different uuid (job), optionally rewriting
    /// its `archive_type` in the same transaction.
    EntityToUuid { entity: IndexId, to: IndexId, archive_type: Option<String> },
    /// Merge one entity's storages and entries into another entity, then
    /// prune the now-empty source entity.
    EntityToEntity { from: IndexId, to: IndexId, archive_type: Option<String> },
    /// Re-home every entity, storage and entry of one job onto another job.
    UuidToUuid { from: IndexId, to: IndexId },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssignOutcome {
    pub rows_moved: u64,
}

pub async fn assign_to(db: &SqlitePool, request: AssignRequest) -> Result<AssignOutcome, Error> {
    match request {
        AssignRequest::EntriesOfStorageToStorage { from, to } => {
            entries_of_storage_to_storage(db, from, to).await
        }
        AssignRequest::StoragesOfEntityToEntity { from, to } => {
            storages_of_entity_to_entity(db, from, to).await
        }
        AssignRequest::EntriesOfEntityToEntity { from, to } => {
            entries_of_entity_to_entity(db, from, to).await
        }
        AssignRequest::StorageToEntity { storage, to } => storage_to_entity(db, storage, to).await,
        AssignRequest::EntityToUuid { entity, to, archive_type } => {
            entity_to_uuid(db, entity, to, archive_type.as_deref()).await
        }
        AssignRequest::EntityToEntity { from, to, archive_type } => {
            entity_to_entity(db, from, to, archive_type.as_deref()).await
        }
        AssignRequest::UuidToUuid { from, to } => uuid_to_uuid(db, from, to).await,
    }
}

/// Rejects moving the default entity: every job keeps one entity it falls
/// back to, and reassigning that entity away would leave nothing to fall
/// back to.
fn reject_if_default_entity(entity: IndexId) -> Result<(), Error> {
    if entity.is_default() {
        return Err(Error::InvalidState(entity, "the default entity cannot be reassigned"));
    }
    Ok(())
}

async fn entries_of_storage_to_storage(
    db: &SqlitePool,
    from: IndexId,
    to: IndexId,
) -> Result<AssignOutcome, Error> {
    require_kind(from, Kind::Storage)?;
    require_kind(to, Kind::Storage)?;
    let mut tx = db.begin().await?;
    let to_owner: (i64, i64) = sqlx::query_as("SELECT entity_id, uuid_id FROM storages WHERE id = ?")
        .bind(to.row_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound(to))?;

    // Every entry that references the source storage directly, or through
    // one of its fragment/directory/link/special rows, follows the storage
    // to its new owner.
    let moved = sqlx::query(
        "UPDATE entries SET entity_id = ?, uuid_id = ?, storage_id = CASE WHEN storage_id = ? THEN ? ELSE storage_id END
         WHERE id IN (
             SELECT entry_id FROM entry_fragments WHERE storage_id = ?
             UNION SELECT entry_id FROM directory_entries WHERE storage_id = ?
             UNION SELECT entry_id FROM link_entries WHERE storage_id = ?
             UNION SELECT entry_id FROM special_entries WHERE storage_id = ?
             UNION SELECT id FROM entries WHERE storage_id = ?
         )",
    )
    .bind(to_owner.0)
    .bind(to_owner.1)
    .bind(from.row_id)
    .bind(to.row_id)
    .bind(from.row_id)
    .bind(from.row_id)
    .bind(from.row_id)
    .bind(from.row_id)
    .bind(from.row_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    // `entries_newest` only carries a pointer to the entry row it names; the
    // entity/uuid it belongs to lives on `entries` and was just updated
    // there, so there's nothing further to rewrite on the projection itself.
    sqlx::query("UPDATE entry_fragments SET storage_id = ? WHERE storage_id = ?")
        .bind(to.row_id)
        .bind(from.row_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE directory_entries SET storage_id = ? WHERE storage_id = ?")
        .bind(to.row_id)
        .bind(from.row_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE link_entries SET storage_id = ? WHERE storage_id = ?")
        .bind(to.row_id)
        .bind(from.row_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE special_entries SET storage_id = ? WHERE storage_id = ?")
        .bind(to.row_id)
        .bind(from.row_id)
        .execute(&mut *tx)
        .await?;
    recompute_storage_aggregates(&mut tx, to).await?;
    sqlx::query("DELETE FROM storages WHERE id = ?")
        .bind(from.row_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(AssignOutcome { rows_moved: moved })
}

async fn storages_of_entity_to_entity(
    db: &SqlitePool,
    from: IndexId,
    to: IndexId,
) -> Result<AssignOutcome, Error> {
    require_kind(from, Kind::Entity)?;
    require_kind(to, Kind::Entity)?;
    let mut tx = db.begin().await?;
    let to_uuid: (i64,) = sqlx::query_as("SELECT uuid_id FROM entities WHERE id = ?")
        .bind(to.row_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound(to))?;
    let moved = sqlx::query("UPDATE storages SET entity_id = ?, uuid_id = ? WHERE entity_id = ?")
        .bind(to.row_id)
        .bind(to_uuid.0)
        .bind(from.row_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    recompute_entity_aggregates(&mut tx, from).await?;
    recompute_entity_aggregates(&mut tx, to).await?;
    tx.commit().await?;
    Ok(AssignOutcome { rows_moved: moved })
}

async fn entries_of_entity_to_entity(
    db: &SqlitePool,
    from: IndexId,
    to: IndexId,
) -> Result<AssignOutcome, Error> {
    require_kind(from, Kind::Entity)?;
    require_kind(to, Kind::Entity)?;
    let mut tx = db.begin().await?;
    let to_uuid: (i64,) = sqlx::query_as("SELECT uuid_id FROM entities WHERE id = ?")
        .bind(to.row_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound(to))?;
    let moved = sqlx::query("UPDATE entries SET entity_id = ?, uuid_id = ? WHERE entity_id = ?")
        .bind(to.row_id)
        .bind(to_uuid.0)
        .bind(from.row_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    recompute_entity_aggregates(&mut tx, from).await?;
    recompute_entity_aggregates(&mut tx, to).await?;
    tx.commit().await?;
    Ok(AssignOutcome { rows_moved: moved })
}

async fn storage_to_entity(db: &SqlitePool, storage: IndexId, to: IndexId) -> Result<AssignOutcome, Error> {
    require_kind(storage, Kind::Storage)?;
    require_kind(to, Kind::Entity)?;
    let mut tx = db.begin().await?;
    let prior: (Option<i64>,) = sqlx::query_as("SELECT entity_id FROM storages WHERE id = ?")
        .bind(storage.row_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound(storage))?;
    let to_uuid: (i64,) = sqlx::query_as("SELECT uuid_id FROM entities WHERE id = ?")
        .bind(to.row_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound(to))?;
    sqlx::query("UPDATE storages SET entity_id = ?, uuid_id = ? WHERE id = ?")
        .bind(to.row_id)
        .bind(to_uuid.0)
        .bind(storage.row_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE entries SET entity_id = ?, uuid_id = ? WHERE storage_id = ?")
        .bind(to.row_id)
        .bind(to_uuid.0)
        .bind(storage.row_id)
        .execute(&mut *tx)
        .await?;
    recompute_entity_aggregates(&mut tx, to).await?;
    if let Some(prior_entity) = prior.0 {
        let prior_entity = IndexId::new(Kind::Entity, prior_entity);
        recompute_entity_aggregates(&mut tx, prior_entity).await?;
        prune_entity_if_empty(&mut tx, prior_entity).await?;
    }
    tx.commit().await?;
    Ok(AssignOutcome { rows_moved: 1 })
}

async fn entity_to_uuid(
    db: &SqlitePool,
    entity: IndexId,
    to: IndexId,
    archive_type: Option<&str>,
) -> Result<AssignOutcome, Error> {
    require_kind(entity, Kind::Entity)?;
    require_kind(to, Kind::Uuid)?;
    reject_if_default_entity(entity)?;
    let mut tx = db.begin().await?;
    let row: (i64, i64) = sqlx::query_as("SELECT uuid_id, is_default FROM entities WHERE id = ?")
        .bind(entity.row_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound(entity))?;
    let (prior_uuid, is_default) = row;
    if is_default != 0 {
        return Err(Error::InvalidState(entity, "the default entity cannot be reassigned"));
    }

    if let Some(archive_type) = archive_type {
        sqlx::query("UPDATE entities SET archive_type = ? WHERE id = ?")
            .bind(archive_type)
            .bind(entity.row_id)
            .execute(&mut *tx)
            .await?;
    }

    if prior_uuid == to.row_id {
        tx.commit().await?;
        return Ok(AssignOutcome { rows_moved: 0 });
    }

    sqlx::query("UPDATE entities SET uuid_id = ? WHERE id = ?")
        .bind(to.row_id)
        .bind(entity.row_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE storages SET uuid_id = ? WHERE entity_id = ?")
        .bind(to.row_id)
        .bind(entity.row_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE entries SET uuid_id = ? WHERE entity_id = ?")
        .bind(to.row_id)
        .bind(entity.row_id)
        .execute(&mut *tx)
        .await?;
    recompute_uuid_aggregates(&mut tx, IndexId::new(Kind::Uuid, prior_uuid)).await?;
    recompute_uuid_aggregates(&mut tx, to).await?;
    tx.commit().await?;
    Ok(AssignOutcome { rows_moved: 1 })
}

async fn entity_to_entity(
    db: &SqlitePool,
    from: IndexId,
    to: IndexId,
    archive_type: Option<&str>,
) -> Result<AssignOutcome, Error> {
    require_kind(from, Kind::Entity)?;
    require_kind(to, Kind::Entity)?;
    reject_if_default_entity(from)?;
    let mut tx = db.begin().await?;
    let is_default: (i64,) = sqlx::query_as("SELECT is_default FROM entities WHERE id = ?")
        .bind(from.row_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound(from))?;
    if is_default.0 != 0 {
        return Err(Error::InvalidState(from, "the default entity cannot be reassigned"));
    }

    if let Some(archive_type) = archive_type {
        sqlx::query("UPDATE entities SET archive_type = ? WHERE id = ?")
            .bind(archive_type)
            .bind(to.row_id)
            .execute(&mut *tx)
            .await?;
    }

    if from.row_id == to.row_id {
        tx.commit().await?;
        return Ok(AssignOutcome { rows_moved: 0 });
    }

    let to_uuid: (i64,) = sqlx::query_as("SELECT uuid_id FROM entities WHERE id = ?")
        .bind(to.row_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound(to))?;
    let moved_storages = sqlx::query("UPDATE storages SET entity_id = ?, uuid_id = ? WHERE entity_id = ?")
        .bind(to.row_id)
        .bind(to_uuid.0)
        .bind(from.row_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let moved_entries = sqlx::query("UPDATE entries SET entity_id = ?, uuid_id = ? WHERE entity_id = ?")
        .bind(to.row_id)
        .bind(to_uuid.0)
        .bind(from.row_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    recompute_entity_aggregates(&mut tx, to).await?;
    recompute_entity_aggregates(&mut tx, from).await?;
    prune_entity_if_empty(&mut tx, from).await?;
    tx.commit().await?;
    Ok(AssignOutcome { rows_moved: moved_storages + moved_entries })
}

async fn uuid_to_uuid(db: &SqlitePool, from: IndexId, to: IndexId) -> Result<AssignOutcome, Error> {
    require_kind(from, Kind::Uuid)?;
    require_kind(to, Kind::Uuid)?;
    if from.row_id == to.row_id {
        return Ok(AssignOutcome { rows_moved: 0 });
    }
    let mut tx = db.begin().await?;
    let moved_entities = sqlx::query("UPDATE entities SET uuid_id = ? WHERE uuid_id = ?")
        .bind(to.row_id)
        .bind(from.row_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query("UPDATE storages SET uuid_id = ? WHERE uuid_id = ?")
        .bind(to.row_id)
        .bind(from.row_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE entries SET uuid_id = ? WHERE uuid_id = ?")
        .bind(to.row_id)
        .bind(from.row_id)
        .execute(&mut *tx)
        .await?;
    recompute_uuid_aggregates(&mut tx, from).await?;
    recompute_uuid_aggregates(&mut tx, to).await?;
    tx.commit().await?;
    Ok(AssignOutcome { rows_moved: moved_entities })
}

fn require_kind(id: IndexId, kind: Kind) -> Result<(), Error> {
    if id.kind != kind {
        return Err(Error::InvalidState(id, "wrong row kind for this assign operation"));
    }
    Ok(())
}

/// Deletes `entity` and decrements its uuid's entity count if it's the
/// default entity's ancestor state and has no storages or entries left.
/// The default entity is never pruned even if empty; it's a job's
/// permanent fallback container.
async fn prune_entity_if_empty(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    entity: IndexId,
) -> Result<(), Error> {
    let row: Option<(i64, i64, i64, i64)> = sqlx::query_as(
        "SELECT total_storage_count, total_entry_count, is_default, uuid_id FROM entities WHERE id = ?",
    )
    .bind(entity.row_id)
    .fetch_optional(&mut **tx)
    .await?;
    let Some((storages, entries, is_default, uuid_row_id)) = row else {
        return Ok(());
    };
    if storages != 0 || entries != 0 || is_default != 0 {
        return Ok(());
    }
    sqlx::query("DELETE FROM entities WHERE id = ?")
        .bind(entity.row_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("UPDATE uuids SET total_entity_count = total_entity_count - 1 WHERE id = ?")
        .bind(uuid_row_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// A storage's `totalEntrySize` is the sum of fragment bytes that live on
/// it, not the full size of every entry that touches it: an entry spanning
/// several storages only counts, against each one, the part actually
/// stored there.
async fn recompute_storage_aggregates(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    storage: IndexId,
) -> Result<(), Error> {
    let totals: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(DISTINCT entry_fragments.entry_id), COALESCE(SUM(entry_fragments.size), 0)
         FROM entry_fragments
         JOIN entries ON entries.id = entry_fragments.entry_id
         WHERE entry_fragments.storage_id = ? AND entries.deleted_flag = 0",
    )
    .bind(storage.row_id)
    .fetch_one(&mut **tx)
    .await?;
    sqlx::query("UPDATE storages SET total_entry_count = ?, total_entry_size = ? WHERE id = ?")
        .bind(totals.0)
        .bind(totals.1)
        .bind(storage.row_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn recompute_entity_aggregates(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    entity: IndexId,
) -> Result<(), Error> {
    let entry_totals: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM entries WHERE entity_id = ?",
    )
    .bind(entity.row_id)
    .fetch_one(&mut **tx)
    .await?;
    let storage_count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM storages WHERE entity_id = ?")
            .bind(entity.row_id)
            .fetch_one(&mut **tx)
            .await?;
    sqlx::query(
        "UPDATE entities SET total_entry_count = ?, total_entry_size = ?, total_storage_count = ?
         WHERE id = ?",
    )
    .bind(entry_totals.0)
    .bind(entry_totals.1)
    .bind(storage_count.0)
    .bind(entity.row_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn recompute_uuid_aggregates(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    uuid: IndexId,
) -> Result<(), Error> {
    let entry_totals: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM entries WHERE uuid_id = ?",
    )
    .bind(uuid.row_id)
    .fetch_one(&mut **tx)
    .await?;
    let entity_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entities WHERE uuid_id = ?")
        .bind(uuid.row_id)
        .fetch_one(&mut **tx)
        .await?;
    let storage_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM storages WHERE uuid_id = ?")
        .bind(uuid.row_id)
        .fetch_one(&mut **tx)
        .await?;
    sqlx::query(
        "UPDATE uuids SET total_entry_count = ?, total_entry_size = ?, total_entity_count = ?,
                total_storage_count = ?
         WHERE id = ?",
    )
    .bind(entry_totals.0)
    .bind(entry_totals.1)
    .bind(entity_count.0)
    .bind(storage_count.0)
    .bind(uuid.row_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities;
    use crate::entries::{self, NewEntry};
    use crate::model::EntryType;
    use crate::model::StorageMode;
    use crate::pool::CatalogPool;
    use crate::storages;
    use crate::uuids;

    async fn setup_two_entities(pool: &CatalogPool) -> (IndexId, IndexId, IndexId) {
        let uuid_id = uuids::find_or_create(pool.sqlite(), "job-a").await.unwrap();
        let a = entities::create(pool.sqlite(), uuid_id, "job-a", None, "full", 1000)
            .await
            .unwrap();
        let b = entities::create(pool.sqlite(), uuid_id, "job-a", None, "full", 1000)
            .await
            .unwrap();
        (uuid_id, a, b)
    }

    #[tokio::test]
    async fn moving_entries_between_entities_updates_both_aggregates() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let (uuid_id, a, b) = setup_two_entities(&pool).await;
        entries::add(
            pool.sqlite(),
            NewEntry {
                storage_id: None,
                entity_id: a,
                uuid_id,
                entry_type: EntryType::File,
                name: "/x",
                time_last_changed: 1,
                user_id: 0,
                group_id: 0,
                permission: 0,
                size: 100,
                fragments: &[],
                destination_name: None,
                special_type: None,
            },
        )
        .await
        .unwrap();

        let outcome = assign_to(
            pool.sqlite(),
            AssignRequest::EntriesOfEntityToEntity { from: a, to: b },
        )
        .await
        .unwrap();
        assert_eq!(outcome.rows_moved, 1);

        let info_a = entities::info(pool.sqlite(), a).await.unwrap();
        let info_b = entities::info(pool.sqlite(), b).await.unwrap();
        assert_eq!(info_a.total_entry_count, 0);
        assert_eq!(info_b.total_entry_count, 1);
        assert_eq!(info_b.total_entry_size, 100);
    }

    #[tokio::test]
    async fn moving_storage_to_entity_carries_its_entries_and_prunes_the_emptied_entity() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let (uuid_id, a, b) = setup_two_entities(&pool).await;
        let storage = storages::create(pool.sqlite(), a, "vol-1", StorageMode::Manual, 10)
            .await
            .unwrap();
        entries::add(
            pool.sqlite(),
            NewEntry {
                storage_id: Some(storage),
                entity_id: a,
                uuid_id,
                entry_type: EntryType::File,
                name: "/x",
                time_last_changed: 1,
                user_id: 0,
                group_id: 0,
                permission: 0,
                size: 50,
                fragments: &[entries::NewFragment { storage_id: storage, offset: 0, size: 50 }],
                destination_name: None,
                special_type: None,
            },
        )
        .await
        .unwrap();

        assign_to(pool.sqlite(), AssignRequest::StorageToEntity { storage, to: b })
            .await
            .unwrap();

        let info_b = entities::info(pool.sqlite(), b).await.unwrap();
        assert_eq!(info_b.total_entry_count, 1);
        assert_eq!(info_b.total_entry_size, 50);
        // `a` had nothing else in it, so moving its only storage out
        // should have pruned the now-empty entity row entirely.
        assert!(matches!(entities::info(pool.sqlite(), a).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn entries_of_storage_to_storage_deletes_the_emptied_source_storage() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let (uuid_id, a, _b) = setup_two_entities(&pool).await;
        let from = storages::create(pool.sqlite(), a, "vol-1", StorageMode::Manual, 10)
            .await
            .unwrap();
        let to = storages::create(pool.sqlite(), a, "vol-2", StorageMode::Manual, 10)
            .await
            .unwrap();
        entries::add(
            pool.sqlite(),
            NewEntry {
                storage_id: Some(from),
                entity_id: a,
                uuid_id,
                entry_type: EntryType::File,
                name: "/x",
                time_last_changed: 1,
                user_id: 0,
                group_id: 0,
                permission: 0,
                size: 10,
                fragments: &[entries::NewFragment { storage_id: from, offset: 0, size: 10 }],
                destination_name: None,
                special_type: None,
            },
        )
        .await
        .unwrap();

        assign_to(pool.sqlite(), AssignRequest::EntriesOfStorageToStorage { from, to })
            .await
            .unwrap();

        assert!(matches!(storages::info(pool.sqlite(), from).await, Err(Error::NotFound(_))));
        let to_info = storages::info(pool.sqlite(), to).await.unwrap();
        assert_eq!(to_info.total_entry_count, 1);
    }

    #[tokio::test]
    async fn entity_to_entity_merges_storages_and_entries_then_prunes_source() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let (uuid_id, a, b) = setup_two_entities(&pool).await;
        storages::create(pool.sqlite(), a, "vol-1", StorageMode::Manual, 10)
            .await
            .unwrap();
        entries::add(
            pool.sqlite(),
            NewEntry {
                storage_id: None,
                entity_id: a,
                uuid_id,
                entry_type: EntryType::File,
                name: "/x",
                time_last_changed: 1,
                user_id: 0,
                group_id: 0,
                permission: 0,
                size: 10,
                fragments: &[],
                destination_name: None,
                special_type: None,
            },
        )
        .await
        .unwrap();

        let outcome = assign_to(
            pool.sqlite(),
            AssignRequest::EntityToEntity { from: a, to: b, archive_type: Some("incremental".to_string()) },
        )
        .await
        .unwrap();
        assert_eq!(outcome.rows_moved, 2);

        let info_b = entities::info(pool.sqlite(), b).await.unwrap();
        assert_eq!(info_b.total_storage_count, 1);
        assert_eq!(info_b.total_entry_count, 1);
        assert_eq!(info_b.archive_type, "incremental");
        assert!(matches!(entities::info(pool.sqlite(), a).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn default_entity_cannot_be_reassigned() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let (_, _a, b) = setup_two_entities(&pool).await;
        let result = assign_to(
            pool.sqlite(),
            AssignRequest::EntityToEntity { from: IndexId::default_entity(), to: b, archive_type: None },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidState(_, _))));
    }

    #[tokio::test]
    async fn uuid_to_uuid_moves_every_entity_storage_and_entry() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let (uuid_a, a, _b) = setup_two_entities(&pool).await;
        let uuid_b = uuids::find_or_create(pool.sqlite(), "job-b").await.unwrap();
        entries::add(
            pool.sqlite(),
            NewEntry {
                storage_id: None,
                entity_id: a,
                uuid_id: uuid_a,
                entry_type: EntryType::File,
                name: "/x",
                time_last_changed: 1,
                user_id: 0,
                group_id: 0,
                permission: 0,
                size: 10,
                fragments: &[],
                destination_name: None,
                special_type: None,
            },
        )
        .await
        .unwrap();

        assign_to(pool.sqlite(), AssignRequest::UuidToUuid { from: uuid_a, to: uuid_b })
            .await
            .unwrap();

        let info_b = uuids::info(pool.sqlite(), uuid_b).await.unwrap();
        assert_eq!(info_b.total_entry_count, 1);
        let info_a = uuids::info(pool.sqlite(), uuid_a).await.unwrap();
        assert_eq!(info_a.total_entry_count, 0);
    }

    #[tokio::test]
    async fn wrong_kind_is_rejected() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let (_, a, b) = setup_two_entities(&pool).await;
        let result = assign_to(
            pool.sqlite(),
            AssignRequest::EntriesOfStorageToStorage { from: a, to: b },
        )
        .await;
        assert!(result.is_err());
    }
}
