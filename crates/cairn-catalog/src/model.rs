//! Row types for the catalog tables in the data model.

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StorageState {
    Create,
    Update,
    Ok,
    Error,
    ErrorTransient,
    Deleted,
    /// Relocated to a `moveTo` destination by a retention sweep instead of
    /// purged; its entries remain valid, just no longer reachable at `name`.
    Moved,
}

impl StorageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageState::Create => "create",
            StorageState::Update => "update",
            StorageState::Ok => "ok",
            StorageState::Error => "error",
            StorageState::ErrorTransient => "error-transient",
            StorageState::Deleted => "deleted",
            StorageState::Moved => "moved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "create" => StorageState::Create,
            "update" => StorageState::Update,
            "ok" => StorageState::Ok,
            "error" => StorageState::Error,
            "error-transient" => StorageState::ErrorTransient,
            "deleted" => StorageState::Deleted,
            "moved" => StorageState::Moved,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StorageMode {
    Manual,
    Auto,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Manual => "manual",
            StorageMode::Auto => "auto",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EntryType {
    File,
    Image,
    Directory,
    Link,
    Hardlink,
    Special,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::File => "file",
            EntryType::Image => "image",
            EntryType::Directory => "directory",
            EntryType::Link => "link",
            EntryType::Hardlink => "hardlink",
            EntryType::Special => "special",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "file" => EntryType::File,
            "image" => EntryType::Image,
            "directory" => EntryType::Directory,
            "link" => EntryType::Link,
            "hardlink" => EntryType::Hardlink,
            "special" => EntryType::Special,
            _ => return None,
        })
    }
}

/// Aggregate counters kept on `uuids`/`entities`/`storages` rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Aggregates {
    pub total_entry_count: i64,
    pub total_entry_size: i64,
}

#[derive(Clone, Debug, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct UuidInfo {
    pub uuid_id: i64,
    pub job_uuid: String,
    pub total_entity_count: i64,
    pub total_storage_count: i64,
    pub total_entry_count: i64,
    pub total_entry_size: i64,
    pub total_entry_count_newest: i64,
    pub total_entry_size_newest: i64,
}

#[derive(Clone, Debug, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct EntityInfo {
    pub entity_id: i64,
    pub uuid_id: i64,
    pub job_uuid: String,
    pub schedule_uuid: Option<String>,
    pub archive_type: String,
    pub created: i64,
    pub locked_count: i64,
    pub is_default: bool,
    pub total_storage_count: i64,
    pub total_entry_count: i64,
    pub total_entry_size: i64,
}

#[derive(Clone, Debug, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct StorageInfo {
    pub storage_id: i64,
    pub entity_id: Option<i64>,
    pub uuid_id: Option<i64>,
    pub name: String,
    pub created: i64,
    pub size: i64,
    pub state: String,
    pub mode: String,
    pub deleted_flag: bool,
    pub total_entry_count: i64,
    pub total_entry_size: i64,
}

#[derive(Clone, Debug, sqlx::FromRow, serde::Serialize, serde::Deserialize)]
pub struct EntryInfo {
    pub entry_id: i64,
    pub storage_id: Option<i64>,
    pub entity_id: i64,
    pub uuid_id: i64,
    pub entry_type: String,
    pub name: String,
    pub time_last_changed: i64,
    pub size: i64,
}
