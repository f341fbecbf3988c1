//! Listing entries with filters, free-text name matching, and cursor-style
//! pagination, rather than loading a whole uuid's history into memory.

use sqlx::SqlitePool;

use crate::id::{IndexId, Kind};
use crate::model::EntryInfo;
use crate::Error;

#[derive(Clone, Debug, Default)]
pub struct EntryFilter {
    pub uuid_id: Option<IndexId>,
    pub entity_id: Option<IndexId>,
    pub name_contains: Option<String>,
    pub newest_only: bool,
    pub include_deleted: bool,
    pub offset: i64,
    pub limit: i64,
}

impl EntryFilter {
    pub fn new() -> Self {
        EntryFilter {
            limit: 1000,
            ..Default::default()
        }
    }
}

pub async fn list_entries(db: &SqlitePool, filter: EntryFilter) -> Result<Vec<EntryInfo>, Error> {
    let mut sql = String::from(
        "SELECT e.id AS entry_id, e.storage_id, e.entity_id, e.uuid_id, e.type AS entry_type,
                e.name, e.time_last_changed, e.size
         FROM entries e",
    );
    if filter.newest_only {
        sql.push_str(" JOIN entries_newest n ON n.entry_id = e.id");
    }
    sql.push_str(" WHERE 1 = 1");
    if !filter.include_deleted {
        sql.push_str(" AND e.deleted_flag = 0");
    }
    if filter.uuid_id.is_some() {
        sql.push_str(" AND e.uuid_id = ?");
    }
    if filter.entity_id.is_some() {
        sql.push_str(" AND e.entity_id = ?");
    }
    if filter.name_contains.is_some() {
        sql.push_str(" AND e.name LIKE ?");
    }
    sql.push_str(" ORDER BY e.name, e.time_last_changed DESC LIMIT ? OFFSET ?");

    let mut query = sqlx::query_as::<_, EntryInfo>(&sql);
    if let Some(uuid_id) = filter.uuid_id {
        require_kind(uuid_id, Kind::Uuid)?;
        query = query.bind(uuid_id.row_id);
    }
    if let Some(entity_id) = filter.entity_id {
        require_kind(entity_id, Kind::Entity)?;
        query = query.bind(entity_id.row_id);
    }
    if let Some(needle) = &filter.name_contains {
        query = query.bind(format!("%{}%", like_escape(needle)));
    }
    query = query.bind(filter.limit).bind(filter.offset);

    Ok(query.fetch_all(db).await?)
}

fn require_kind(id: IndexId, kind: Kind) -> Result<(), Error> {
    if id.kind != kind {
        return Err(Error::InvalidState(id, "wrong row kind for this filter"));
    }
    Ok(())
}

fn like_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
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
    async fn filters_by_name_substring() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let uuid_id = uuids::find_or_create(pool.sqlite(), "job-a").await.unwrap();
        let entity_id = entities::create(pool.sqlite(), uuid_id, "job-a", None, "full", 1000)
            .await
            .unwrap();
        for name in ["/etc/hosts", "/etc/passwd", "/var/log/syslog"] {
            entries::add(
                pool.sqlite(),
                NewEntry {
                    storage_id: None,
                    entity_id,
                    uuid_id,
                    entry_type: EntryType::File,
                    name,
                    time_last_changed: 1,
                    user_id: 0,
                    group_id: 0,
                    permission: 0,
                    size: 1,
                    fragments: &[],
                    destination_name: None,
                    special_type: None,
                },
            )
            .await
            .unwrap();
        }

        let mut filter = EntryFilter::new();
        filter.name_contains = Some("/etc/".to_string());
        let results = list_entries(pool.sqlite(), filter).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn excludes_deleted_by_default() {
        let pool = CatalogPool::open_memory().await.unwrap();
        let uuid_id = uuids::find_or_create(pool.sqlite(), "job-a").await.unwrap();
        let entity_id = entities::create(pool.sqlite(), uuid_id, "job-a", None, "full", 1000)
            .await
            .unwrap();
        let entry_id = entries::add(
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
                size: 1,
                fragments: &[],
                destination_name: None,
                special_type: None,
            },
        )
        .await
        .unwrap();
        entries::mark_deleted(pool.sqlite(), entry_id).await.unwrap();

        let results = list_entries(pool.sqlite(), EntryFilter::new()).await.unwrap();
        assert!(results.is_empty());
    }
}
