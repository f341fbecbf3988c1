//! Operations on the `entries` table, its `entries_newest` per-(name,type)
//! projection, and the four entry-kind detail tables (`entry_fragments`,
//! `directory_entries`, `link_entries`, `special_entries`) that carry the
//! storage location(s) for an entry's content.

use sqlx::SqlitePool;

use crate::id::{IndexId, Kind};
use crate::model::{EntryInfo, EntryType};
use crate::Error;

/// One contiguous range of an entry's bytes living on a storage. Only
/// `file`/`image`/`hardlink` entries carry fragments; an entry with no
/// content (an empty file) carries none.
#[derive(Clone, Copy, Debug)]
pub struct NewFragment {
    pub storage_id: IndexId,
    pub offset: i64,
    pub size: i64,
}

/// Fields needed to record a new entry; borrowed, since the caller already
/// owns the strings from the archive pipeline.
pub struct NewEntry<'a> {
    pub storage_id: Option<IndexId>,
    pub entity_id: IndexId,
    pub uuid_id: IndexId,
    pub entry_type: EntryType,
    pub name: &'a str,
    pub time_last_changed: i64,
    pub user_id: i64,
    pub group_id: i64,
    pub permission: i64,
    pub size: i64,
    /// Content ranges, for `file`/`image`/`hardlink` entries.
    pub fragments: &'a [NewFragment],
    /// Symlink target, for `link` entries.
    pub destination_name: Option<&'a str>,
    /// Device/fifo/socket discriminator, for `special` entries.
    pub special_type: Option<&'a str>,
}

pub async fn add(db: &SqlitePool, entry: NewEntry<'_>) -> Result<IndexId, Error> {
    if entry.entity_id.kind != Kind::Entity || entry.uuid_id.kind != Kind::Uuid {
        return Err(Error::InvalidState(entry.entity_id, "entries require an entity and uuid id"));
    }
    let storage_row_id = match entry.storage_id {
        Some(id) if id.kind == Kind::Storage => Some(id.row_id),
        Some(id) => return Err(Error::InvalidState(id, "not a storage id")),
        None => None,
    };
    for fragment in entry.fragments {
        if fragment.storage_id.kind != Kind::Storage {
            return Err(Error::InvalidState(fragment.storage_id, "not a storage id"));
        }
    }

    let mut tx = db.begin().await?;
    let row: (i64,) = sqlx::query_as(
        "INSERT INTO entries
            (storage_id, entity_id, uuid_id, type, name, time_last_changed,
             user_id, group_id, permission, size)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(storage_row_id)
    .bind(entry.entity_id.row_id)
    .bind(entry.uuid_id.row_id)
    .bind(entry.entry_type.as_str())
    .bind(entry.name)
    .bind(entry.time_last_changed)
    .bind(entry.user_id)
    .bind(entry.group_id)
    .bind(entry.permission)
    .bind(entry.size)
    .fetch_one(&mut *tx)
    .await?;
    let entry_id = row.0;

    match entry.entry_type {
        EntryType::File | EntryType::Image | EntryType::Hardlink => {
            for fragment in entry.fragments {
                sqlx::query(
                    "INSERT INTO entry_fragments (entry_id, storage_id, offset, size) VALUES (?, ?, ?, ?)",
                )
                .bind(entry_id)
                .bind(fragment.storage_id.row_id)
                .bind(fragment.offset)
                .bind(fragment.size)
                .execute(&mut *tx)
                .await?;
            }
        }
        EntryType::Directory => {
            sqlx::query("INSERT INTO directory_entries (entry_id, storage_id) VALUES (?, ?)")
                .bind(entry_id)
                .bind(storage_row_id)
                .execute(&mut *tx)
                .await?;
        }
        EntryType::Link => {
            sqlx::query(
                "INSERT INTO link_entries (entry_id, storage_id, destination_name) VALUES (?, ?, ?)",
            )
            .bind(entry_id)
            .bind(storage_row_id)
            .bind(entry.destination_name)
            .execute(&mut *tx)
            .await?;
        }
        EntryType::Special => {
            sqlx::query(
                "INSERT INTO special_entries (entry_id, storage_id, special_type) VALUES (?, ?, ?)",
            )
            .bind(entry_id)
            .bind(storage_row_id)
            .bind(entry.special_type)
            .execute(&mut *tx)
            .await?;
        }
    }

    // Replace whatever entry previously held the (name, type) slot: this
    // new entry is now the newest version of that path.
    sqlx::query(
        "DELETE FROM entries_newest WHERE name = ? AND type = ?",
    )
    .bind(entry.name)
    .bind(entry.entry_type.as_str())
    .execute(&mut *tx)
    .await?;
    sqlx::query("INSERT INTO entries_newest (entry_id, name, type) VALUES (?, ?, ?)")
        .bind(entry_id)
        .bind(entry.name)
        .bind(entry.entry_type.as_str())
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE entities SET total_entry_count = total_entry_count + 1, total_entry_size = total_entry_size + ? WHERE id = ?")
        .bind(entry.size)
        .bind(entry.entity_id.row_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE uuids SET total_entry_count = total_entry_count + 1, total_entry_size = total_entry_size + ? WHERE id = ?")
        .bind(entry.size)
        .bind(entry.uuid_id.row_id)
        .execute(&mut *tx)
        .await?;

    // A storage's totalEntrySize sums fragment bytes, not whole-entry size:
    // an entry spanning several storages only counts toward each storage
    // the part of it that actually lives there.
    let mut per_storage: Vec<(i64, i64)> = Vec::new();
    for fragment in entry.fragments {
        match per_storage.iter_mut().find(|(id, _)| *id == fragment.storage_id.row_id) {
            Some((_, size)) => *size += fragment.size,
            None => per_storage.push((fragment.storage_id.row_id, fragment.size)),
        }
    }
    for (storage_row_id, size) in per_storage {
        sqlx::query("UPDATE storages SET total_entry_count = total_entry_count + 1, total_entry_size = total_entry_size + ? WHERE id = ?")
            .bind(size)
            .bind(storage_row_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(IndexId::new(Kind::Entry, entry_id))
}

pub async fn info(db: &SqlitePool, id: IndexId) -> Result<EntryInfo, Error> {
    if id.kind != Kind::Entry {
        return Err(Error::InvalidState(id, "not an entry id"));
    }
    sqlx::query_as::<_, EntryInfo>(
        "SELECT id AS entry_id, storage_id, entity_id, uuid_id, type AS entry_type, name,
                time_last_changed, size
         FROM entries WHERE id = ?",
    )
    .bind(id.row_id)
    .fetch_optional(db)
    .await?
    .ok_or(Error::NotFound(id))
}

pub async fn is_newest(db: &SqlitePool, id: IndexId) -> Result<bool, Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT entry_id FROM entries_newest WHERE entry_id = ?")
        .bind(id.row_id)
        .fetch_optional(db)
        .await?;
    Ok(row.is_some())
}

pub async fn mark_deleted(db: &SqlitePool, id: IndexId) -> Result<(), Error> {
    let result = sqlx::query("UPDATE entries SET deleted_flag = 1 WHERE id = ?")
        .bind(id.row_id)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(id));
    }
    sqlx::query("DELETE FROM entries_newest WHERE entry_id = ?")
        .bind(id.row_id)
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities;
    use crate::pool::CatalogPool;
    use crate::storages;
    use crate::uuids;

    async fn setup(pool: &CatalogPool) -> (IndexId, IndexId) {
        let uuid_id = uuids::find_or_create(pool.sqlite(), "job-a").await.unwrap();
        let entity_id = entities::create(pool.sqlite(), uuid_id, "job-a", None, "full", 1000)
            .await
            .unwrap();
        (uuid_id, entity_id)
    }

    fn plain_entry<'a>(uuid_id: IndexId, entity_id: IndexId, name: &'a str, size: i64) -> NewEntry<'a> {
        NewEntry {
            storage_id: None,
            entity_id,
            uuid_id,
            entry_type: EntryType::File,
            name,
            time_last_changed: 1234,
            user_id: 0,
            group_id: 0,
            permission: 0o644,
            size,
            fragments: &[],
            destination_name: None,
            special_type: None,
        }
    }

    #[tokio::test]
    async fn add_updates_aggregates_and_newest_projection() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let (uuid_id, entity_id) = setup(&pool).await;
        let entry_id = add(pool.sqlite(), plain_entry(uuid_id, entity_id, "/etc/hosts", 42))
            .await
            .unwrap();
        assert!(is_newest(pool.sqlite(), entry_id).await.unwrap());

        let entity_info = entities::info(pool.sqlite(), entity_id).await.unwrap();
        assert_eq!(entity_info.total_entry_count, 1);
        assert_eq!(entity_info.total_entry_size, 42);
    }

    #[tokio::test]
    async fn second_version_supersedes_first_in_newest_projection() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let (uuid_id, entity_id) = setup(&pool).await;
        let first = add(pool.sqlite(), plain_entry(uuid_id, entity_id, "/etc/hosts", 10))
            .await
            .unwrap();
        let second = add(pool.sqlite(), plain_entry(uuid_id, entity_id, "/etc/hosts", 20))
            .await
            .unwrap();
        assert!(!is_newest(pool.sqlite(), first).await.unwrap());
        assert!(is_newest(pool.sqlite(), second).await.unwrap());
    }

    #[tokio::test]
    async fn file_entry_fragments_roll_up_onto_their_storage() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let (uuid_id, entity_id) = setup(&pool).await;
        let storage_a = storages::create(pool.sqlite(), entity_id, "vol-a", crate::model::StorageMode::Auto, 10)
            .await
            .unwrap();
        let storage_b = storages::create(pool.sqlite(), entity_id, "vol-b", crate::model::StorageMode::Auto, 10)
            .await
            .unwrap();

        add(
            pool.sqlite(),
            NewEntry {
                storage_id: Some(storage_a),
                entity_id,
                uuid_id,
                entry_type: EntryType::File,
                name: "/big.bin",
                time_last_changed: 1,
                user_id: 0,
                group_id: 0,
                permission: 0,
                size: 150,
                fragments: &[
                    NewFragment { storage_id: storage_a, offset: 0, size: 100 },
                    NewFragment { storage_id: storage_b, offset: 100, size: 50 },
                ],
                destination_name: None,
                special_type: None,
            },
        )
        .await
        .unwrap();

        let info_a = storages::info(pool.sqlite(), storage_a).await.unwrap();
        let info_b = storages::info(pool.sqlite(), storage_b).await.unwrap();
        assert_eq!(info_a.total_entry_size, 100);
        assert_eq!(info_b.total_entry_size, 50);
    }

    #[tokio::test]
    async fn link_entry_records_its_destination_name() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let (uuid_id, entity_id) = setup(&pool).await;
        let entry_id = add(
            pool.sqlite(),
            NewEntry {
                storage_id: None,
                entity_id,
                uuid_id,
                entry_type: EntryType::Link,
                name: "/etc/current",
                time_last_changed: 1,
                user_id: 0,
                group_id: 0,
                permission: 0,
                size: 0,
                fragments: &[],
                destination_name: Some("/etc/release-1.2"),
                special_type: None,
            },
        )
        .await
        .unwrap();

        let row: (String,) = sqlx::query_as("SELECT destination_name FROM link_entries WHERE entry_id = ?")
            .bind(entry_id.row_id)
            .fetch_one(pool.sqlite())
            .await
            .unwrap();
        assert_eq!(row.0, "/etc/release-1.2");
    }

    #[tokio::test]
    async fn directory_entry_gets_a_directory_entries_row() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let (uuid_id, entity_id) = setup(&pool).await;
        let entry_id = add(
            pool.sqlite(),
            NewEntry {
                storage_id: None,
                entity_id,
                uuid_id,
                entry_type: EntryType::Directory,
                name: "/etc",
                time_last_changed: 1,
                user_id: 0,
                group_id: 0,
                permission: 0,
                size: 0,
                fragments: &[],
                destination_name: None,
                special_type: None,
            },
        )
        .await
        .unwrap();

        let row: (i64,) = sqlx::query_as("SELECT entry_id FROM directory_entries WHERE entry_id = ?")
            .bind(entry_id.row_id)
            .fetch_one(pool.sqlite())
            .await
            .unwrap();
        assert_eq!(row.0, entry_id.row_id);
    }
}
