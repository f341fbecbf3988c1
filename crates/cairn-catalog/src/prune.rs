//! Retention: a [`RetentionPolicy`] governs how many *storages* of a given
//! `archiveType` a uuid keeps. Storages that fall out of the policy's
//! window either move to a `moveTo` destination (their entries stay
//! intact, just relocated) or are purged outright (entries, fragments and
//! aggregates removed with them). Either way the uuid/entity tree above
//! them collapses any parent left empty by the sweep.

use sqlx::SqlitePool;

use crate::id::{IndexId, Kind};
use crate::{entities, storages, uuids, Error};

/// Keep every storage regardless of count.
pub const KEEP_ALL: i64 = -1;
/// Keep every storage regardless of age.
pub const AGE_FOREVER: i64 = -1;

#[derive(Clone, Debug)]
pub struct RetentionPolicy {
    /// Only storages of entities with this `archiveType` are swept.
    pub archive_type: String,
    /// Minimum number of storages to retain even if they would otherwise
    /// be aged out.
    pub min_keep: i64,
    /// Maximum number of storages to retain, or [`KEEP_ALL`].
    pub max_keep: i64,
    /// Maximum age in days before a storage becomes eligible for removal,
    /// or [`AGE_FOREVER`].
    pub max_age_days: i64,
    /// Destination URI candidates are relocated to instead of purged, if
    /// set.
    pub move_to: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub moved_storages: u64,
    pub purged_storages: u64,
    pub purged_entries: u64,
    pub pruned_entities: u64,
    pub pruned_uuids: u64,
}

pub async fn prune_with_policy(
    db: &SqlitePool,
    uuid_id: IndexId,
    policy: RetentionPolicy,
    now: i64,
) -> Result<PruneReport, Error> {
    if uuid_id.kind != Kind::Uuid {
        return Err(Error::InvalidState(uuid_id, "not a uuid id"));
    }

    #[derive(sqlx::FromRow)]
    struct StorageRow {
        id: i64,
        entity_id: i64,
        created: i64,
    }
    let rows: Vec<StorageRow> = sqlx::query_as(
        "SELECT s.id, s.entity_id, s.created FROM storages s
         JOIN entities e ON e.id = s.entity_id
         WHERE e.uuid_id = ? AND e.archive_type = ? AND s.deleted_flag = 0
         ORDER BY s.created DESC",
    )
    .bind(uuid_id.row_id)
    .bind(&policy.archive_type)
    .fetch_all(db)
    .await?;

    let max_age_seconds = if policy.max_age_days == AGE_FOREVER {
        None
    } else {
        Some(policy.max_age_days * 86_400)
    };

    let mut candidates = Vec::new();
    for (position, row) in rows.iter().enumerate() {
        let position_in_group = position as i64 + 1;
        if position_in_group <= policy.min_keep {
            continue;
        }
        let exceeds_max_keep = policy.max_keep != KEEP_ALL && position_in_group > policy.max_keep;
        let exceeds_max_age = max_age_seconds.map(|limit| now - row.created > limit).unwrap_or(false);
        if exceeds_max_keep || exceeds_max_age {
            candidates.push(row);
        }
    }

    let mut report = PruneReport::default();
    let mut touched_entities: Vec<i64> = Vec::new();
    for row in candidates {
        let storage_id = IndexId::new(Kind::Storage, row.id);
        match &policy.move_to {
            Some(destination) => {
                storages::relocate(db, storage_id, destination).await?;
                report.moved_storages += 1;
            }
            None => {
                report.purged_entries += storages::purge_storage(db, storage_id).await?;
                report.purged_storages += 1;
            }
        }
        touched_entities.push(row.entity_id);
    }
    touched_entities.sort_unstable();
    touched_entities.dedup();

    for entity_row_id in touched_entities {
        if entities::prune_if_empty(db, IndexId::new(Kind::Entity, entity_row_id)).await? {
            report.pruned_entities += 1;
        }
    }
    if uuids::prune_if_empty(db, uuid_id).await? {
        report.pruned_uuids += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities;
    use crate::entries::{self, NewEntry};
    use crate::model::{EntryType, StorageMode};
    use crate::pool::CatalogPool;
    use crate::uuids;

    async fn daily_storages(pool: &CatalogPool, uuid_id: IndexId, entity_id: IndexId, count: i64) {
        for day in 0..count {
            let storage_id = storages::create(
                pool.sqlite(),
                entity_id,
                &format!("vol-{day}"),
                StorageMode::Auto,
                day * 86_400,
            )
            .await
            .unwrap();
            entries::add(
                pool.sqlite(),
                NewEntry {
                    storage_id: Some(storage_id),
                    entity_id,
                    uuid_id,
                    entry_type: EntryType::File,
                    name: &format!("/etc/hosts.{day}"),
                    time_last_changed: day * 86_400,
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
        }
    }

    #[tokio::test]
    async fn sweep_keeps_min_keep_newest_even_past_max_age() {
        // Ten daily storages, minKeep=3 maxKeep=7 maxAgeDays=5: keep the 5
        // newest (age <= 5 days), drop the 5 oldest; if fewer than 3
        // satisfied the age limit, the 3 newest would be kept regardless.
        let pool = CatalogPool::open_memory().await.unwrap();
        let uuid_id = uuids::find_or_create(pool.sqlite(), "job-a").await.unwrap();
        let entity_id = entities::create(pool.sqlite(), uuid_id, "job-a", None, "full", 1000)
            .await
            .unwrap();
        daily_storages(&pool, uuid_id, entity_id, 10).await;
        let now = 10 * 86_400;

        let report = prune_with_policy(
            pool.sqlite(),
            uuid_id,
            RetentionPolicy {
                archive_type: "full".to_string(),
                min_keep: 3,
                max_keep: 7,
                max_age_days: 5,
                move_to: None,
            },
            now,
        )
        .await
        .unwrap();
        assert_eq!(report.purged_storages, 5);
        assert_eq!(report.purged_entries, 5);

        let uuid_info = uuids::info(pool.sqlite(), uuid_id).await.unwrap();
        assert_eq!(uuid_info.total_entry_count, 5);
    }

    #[tokio::test]
    async fn different_archive_types_are_swept_independently() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let uuid_id = uuids::find_or_create(pool.sqlite(), "job-a").await.unwrap();
        let full_entity = entities::create(pool.sqlite(), uuid_id, "job-a", None, "full", 1000)
            .await
            .unwrap();
        let incr_entity = entities::create(pool.sqlite(), uuid_id, "job-a", None, "incremental", 1000)
            .await
            .unwrap();
        daily_storages(&pool, uuid_id, full_entity, 3).await;
        daily_storages(&pool, uuid_id, incr_entity, 3).await;

        let report = prune_with_policy(
            pool.sqlite(),
            uuid_id,
            RetentionPolicy {
                archive_type: "full".to_string(),
                min_keep: 1,
                max_keep: 1,
                max_age_days: AGE_FOREVER,
                move_to: None,
            },
            100,
        )
        .await
        .unwrap();
        assert_eq!(report.purged_storages, 2);

        let incr_info = entities::info(pool.sqlite(), incr_entity).await.unwrap();
        assert_eq!(incr_info.total_storage_count, 3);
    }

    #[tokio::test]
    async fn move_to_relocates_instead_of_purging() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let uuid_id = uuids::find_or_create(pool.sqlite(), "job-a").await.unwrap();
        let entity_id = entities::create(pool.sqlite(), uuid_id, "job-a", None, "full", 1000)
            .await
            .unwrap();
        daily_storages(&pool, uuid_id, entity_id, 3).await;

        let report = prune_with_policy(
            pool.sqlite(),
            uuid_id,
            RetentionPolicy {
                archive_type: "full".to_string(),
                min_keep: 1,
                max_keep: 1,
                max_age_days: AGE_FOREVER,
                move_to: Some("file:/mnt/cold".to_string()),
            },
            100,
        )
        .await
        .unwrap();
        assert_eq!(report.moved_storages, 2);
        assert_eq!(report.purged_storages, 0);

        // Entries on moved storages are untouched.
        let uuid_info = uuids::info(pool.sqlite(), uuid_id).await.unwrap();
        assert_eq!(uuid_info.total_entry_count, 3);
    }

    #[tokio::test]
    async fn sweep_prunes_entity_and_uuid_left_empty() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let uuid_id = uuids::find_or_create(pool.sqlite(), "job-a").await.unwrap();
        let entity_id = entities::create(pool.sqlite(), uuid_id, "job-a", None, "full", 1000)
            .await
            .unwrap();
        daily_storages(&pool, uuid_id, entity_id, 1).await;

        let report = prune_with_policy(
            pool.sqlite(),
            uuid_id,
            RetentionPolicy {
                archive_type: "full".to_string(),
                min_keep: 0,
                max_keep: 0,
                max_age_days: AGE_FOREVER,
                move_to: None,
            },
            100,
        )
        .await
        .unwrap();
        assert_eq!(report.purged_storages, 1);
        assert_eq!(report.pruned_entities, 1);
        assert_eq!(report.pruned_uuids, 1);

        assert!(matches!(entities::info(pool.sqlite(), entity_id).await, Err(Error::NotFound(_))));
        assert!(matches!(uuids::info(pool.sqlite(), uuid_id).await, Err(Error::NotFound(_))));
    }
}
