//! Entry metadata carried alongside compressed/encrypted entry bytes in a
//! `FHD0` chunk.

use cairn_catalog::model::EntryType;
use cairn_crypto::hash::Hash;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct EntryMetadata {
    pub name: String,
    pub entry_type: EntryTypeWire,
    pub time_last_changed: i64,
    pub user_id: i64,
    pub group_id: i64,
    pub permission: i64,
    pub original_size: u64,
    pub content_hash: Hash,
    pub compress_algorithm: String,
    pub crypt_algorithm: String,
    pub is_delta: bool,
}

/// Serializable mirror of `cairn_catalog::model::EntryType`; the catalog
/// type itself isn't `Serialize`, so the archive format carries its own
/// copy and converts at the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EntryTypeWire {
    File,
    Image,
    Directory,
    Link,
    Hardlink,
    Special,
}

impl From<EntryType> for EntryTypeWire {
    fn from(value: EntryType) -> Self {
        match value {
            EntryType::File => EntryTypeWire::File,
            EntryType::Image => EntryTypeWire::Image,
            EntryType::Directory => EntryTypeWire::Directory,
            EntryType::Link => EntryTypeWire::Link,
            EntryType::Hardlink => EntryTypeWire::Hardlink,
            EntryType::Special => EntryTypeWire::Special,
        }
    }
}

impl From<EntryTypeWire> for EntryType {
    fn from(value: EntryTypeWire) -> Self {
        match value {
            EntryTypeWire::File => EntryType::File,
            EntryTypeWire::Image => EntryType::Image,
            EntryTypeWire::Directory => EntryType::Directory,
            EntryTypeWire::Link => EntryType::Link,
            EntryTypeWire::Hardlink => EntryType::Hardlink,
            EntryTypeWire::Special => EntryType::Special,
        }
    }
}

pub fn tag_for(entry_type: EntryTypeWire) -> [u8; 4] {
    match entry_type {
        EntryTypeWire::File => crate::format::TAG_FILE,
        EntryTypeWire::Image => crate::format::TAG_IMAGE,
        EntryTypeWire::Directory => crate::format::TAG_DIRECTORY,
        EntryTypeWire::Link => crate::format::TAG_LINK,
        EntryTypeWire::Hardlink => crate::format::TAG_HARDLINK,
        EntryTypeWire::Special => crate::format::TAG_SPECIAL,
    }
}
