//! The index catalog: a relational record of uuids, entities, storages and
//! entries, with cascading aggregates and a soft-delete/purge lifecycle.
//!
//! Catalog operations are async (the underlying store is `sqlx`), and are
//! expected to be driven from OS-thread job workers through a small
//! embedded runtime rather than from an application-wide tokio runtime.

pub mod aggregates;
pub mod assign;
pub mod entities;
pub mod entries;
pub mod history;
pub mod id;
pub mod model;
pub mod pool;
pub mod prune;
pub mod query;
pub mod storages;
pub mod uuids;

pub use id::{IndexId, Kind};
pub use pool::CatalogPool;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("catalog row not found: {0}")]
    NotFound(IndexId),
    #[error("invalid state transition on {0}: {1}")]
    InvalidState(IndexId, &'static str),
    #[error(transparent)]
    Pool(#[from] pool::Error),
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Handle to an open catalog. Cheap to clone; `sqlx::SqlitePool` is
/// internally reference-counted.
#[derive(Clone)]
pub struct Catalog {
    pool: std::sync::Arc<CatalogPool>,
}

impl Catalog {
    pub async fn open(uri: &str) -> Result<Self, Error> {
        Ok(Catalog {
            pool: std::sync::Arc::new(CatalogPool::open(uri).await?),
        })
    }

    pub async fn open_memory() -> Result<Self, Error> {
        Ok(Catalog {
            pool: std::sync::Arc::new(CatalogPool::open_memory().await?),
        })
    }

    fn db(&self) -> &sqlx::SqlitePool {
        self.pool.sqlite()
    }

    /// Narrow escape hatch for maintenance code (scheduler retention
    /// passes, CLI verify/repair commands) that needs to drive catalog
    /// submodules directly instead of through `Catalog`'s own methods.
    pub fn raw_pool(&self) -> &sqlx::SqlitePool {
        self.pool.sqlite()
    }

    pub async fn find_or_create_uuid(&self, job_uuid: &str) -> Result<IndexId, Error> {
        uuids::find_or_create(self.db(), job_uuid).await
    }

    pub async fn uuid_info(&self, id: IndexId) -> Result<model::UuidInfo, Error> {
        uuids::info(self.db(), id).await
    }

    pub async fn create_entity(
        &self,
        uuid_id: IndexId,
        job_uuid: &str,
        schedule_uuid: Option<&str>,
        archive_type: &str,
        created: i64,
    ) -> Result<IndexId, Error> {
        entities::create(self.db(), uuid_id, job_uuid, schedule_uuid, archive_type, created).await
    }

    pub async fn entity_info(&self, id: IndexId) -> Result<model::EntityInfo, Error> {
        entities::info(self.db(), id).await
    }

    pub async fn create_storage(
        &self,
        entity_id: IndexId,
        name: &str,
        mode: model::StorageMode,
        created: i64,
    ) -> Result<IndexId, Error> {
        storages::create(self.db(), entity_id, name, mode, created).await
    }

    pub async fn set_storage_state(
        &self,
        id: IndexId,
        state: model::StorageState,
        error_message: Option<&str>,
    ) -> Result<(), Error> {
        storages::set_state(self.db(), id, state, error_message).await
    }

    pub async fn add_entry(&self, entry: entries::NewEntry<'_>) -> Result<IndexId, Error> {
        entries::add(self.db(), entry).await
    }

    pub async fn assign(&self, request: assign::AssignRequest) -> Result<assign::AssignOutcome, Error> {
        assign::assign_to(self.db(), request).await
    }

    pub async fn prune_storages(
        &self,
        uuid_id: IndexId,
        policy: prune::RetentionPolicy,
        now: i64,
    ) -> Result<prune::PruneReport, Error> {
        prune::prune_with_policy(self.db(), uuid_id, policy, now).await
    }

    pub async fn purge_storage(&self, id: IndexId) -> Result<u64, Error> {
        storages::purge_storage(self.db(), id).await
    }

    pub async fn record_history(
        &self,
        job_uuid: &str,
        schedule_uuid: Option<&str>,
        kind: &str,
        created: i64,
        duration: i64,
        error_message: Option<&str>,
    ) -> Result<IndexId, Error> {
        history::record(self.db(), job_uuid, schedule_uuid, kind, created, duration, error_message).await
    }

    pub async fn list_entries(&self, filter: query::EntryFilter) -> Result<Vec<model::EntryInfo>, Error> {
        query::list_entries(self.db(), filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_and_creates_uuid() {
        let catalog = Catalog::open_memory().await.unwrap();
        let id = catalog.find_or_create_uuid("job-1").await.unwrap();
        assert_eq!(id.kind, Kind::Uuid);
        let again = catalog.find_or_create_uuid("job-1").await.unwrap();
        assert_eq!(id, again);
    }
}
