//! Recomputing rolled-up counters from scratch. Used by maintenance passes
//! to repair aggregates after a crash left them out of sync with the rows
//! they summarize, and by tests that want to assert invariants hold.

use sqlx::SqlitePool;

use crate::id::{IndexId, Kind};
use crate::model::Aggregates;
use crate::Error;

pub async fn recompute_all(db: &SqlitePool) -> Result<(), Error> {
    let uuid_ids: Vec<(i64,)> = sqlx::query_as("SELECT id FROM uuids").fetch_all(db).await?;
    for (id,) in uuid_ids {
        recompute_uuid(db, IndexId::new(Kind::Uuid, id)).await?;
    }
    Ok(())
}

pub async fn recompute_uuid(db: &SqlitePool, uuid_id: IndexId) -> Result<Aggregates, Error> {
    let entity_ids: Vec<(i64,)> = sqlx::query_as("SELECT id FROM entities WHERE uuid_id = ?")
        .bind(uuid_id.row_id)
        .fetch_all(db)
        .await?;
    for (entity_id,) in &entity_ids {
        recompute_entity(db, IndexId::new(Kind::Entity, *entity_id)).await?;
    }

    let totals: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM entries WHERE uuid_id = ? AND deleted_flag = 0",
    )
    .bind(uuid_id.row_id)
    .fetch_one(db)
    .await?;
    let newest_totals: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(e.size), 0)
         FROM entries_newest n JOIN entries e ON e.id = n.entry_id
         WHERE e.uuid_id = ?",
    )
    .bind(uuid_id.row_id)
    .fetch_one(db)
    .await?;
    let storage_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM storages WHERE uuid_id = ?")
        .bind(uuid_id.row_id)
        .fetch_one(db)
        .await?;

    sqlx::query(
        "UPDATE uuids SET total_entity_count = ?, total_storage_count = ?,
                total_entry_count = ?, total_entry_size = ?,
                total_entry_count_newest = ?, total_entry_size_newest = ?
         WHERE id = ?",
    )
    .bind(entity_ids.len() as i64)
    .bind(storage_count.0)
    .bind(totals.0)
    .bind(totals.1)
    .bind(newest_totals.0)
    .bind(newest_totals.1)
    .bind(uuid_id.row_id)
    .execute(db)
    .await?;

    Ok(Aggregates {
        total_entry_count: totals.0,
        total_entry_size: totals.1,
    })
}

pub async fn recompute_entity(db: &SqlitePool, entity_id: IndexId) -> Result<Aggregates, Error> {
    let totals: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(size), 0) FROM entries WHERE entity_id = ? AND deleted_flag = 0",
    )
    .bind(entity_id.row_id)
    .fetch_one(db)
    .await?;
    let newest_totals: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(e.size), 0)
         FROM entries_newest n JOIN entries e ON e.id = n.entry_id
         WHERE e.entity_id = ?",
    )
    .bind(entity_id.row_id)
    .fetch_one(db)
    .await?;
    let storage_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM storages WHERE entity_id = ?")
        .bind(entity_id.row_id)
        .fetch_one(db)
        .await?;

    sqlx::query(
        "UPDATE entities SET total_storage_count = ?, total_entry_count = ?, total_entry_size = ?,
                total_entry_count_newest = ?, total_entry_size_newest = ?
         WHERE id = ?",
    )
    .bind(storage_count.0)
    .bind(totals.0)
    .bind(totals.1)
    .bind(newest_totals.0)
    .bind(newest_totals.1)
    .bind(entity_id.row_id)
    .execute(db)
    .await?;

    Ok(Aggregates {
        total_entry_count: totals.0,
        total_entry_size: totals.1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities;
    use crate::entries::{self, NewEntry};
    use crate::model::EntryType;
    use crate::pool::CatalogPool;
    use crate::uuids;

    #[tokio::test]
    async fn recompute_matches_incremental_totals() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let uuid_id = uuids::find_or_create(pool.sqlite(), "job-a").await.unwrap();
        let entity_id = entities::create(pool.sqlite(), uuid_id, "job-a", None, "full", 1000)
            .await
            .unwrap();
        entries::add(
            pool.sqlite(),
            NewEntry {
                storage_id: None,
                entity_id,
                uuid_id,
                entry_type: EntryType::File,
                name: "/x",
                time_last_changed: 1,
                user_id: 0,
                group_id: 0,
                permission: 0,
                size: 7,
                fragments: &[],
                destination_name: None,
                special_type: None,
            },
        )
        .await
        .unwrap();

        sqlx::query("UPDATE uuids SET total_entry_size = 999 WHERE id = ?")
            .bind(uuid_id.row_id)
            .execute(pool.sqlite())
            .await
            .unwrap();

        let recomputed = recompute_uuid(pool.sqlite(), uuid_id).await.unwrap();
        assert_eq!(recomputed.total_entry_size, 7);
        let info = uuids::info(pool.sqlite(), uuid_id).await.unwrap();
        assert_eq!(info.total_entry_size, 7);
    }
}
