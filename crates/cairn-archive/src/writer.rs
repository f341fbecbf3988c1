//! Drives a full archive-create job: walks a list of already-selected
//! source entries, runs each through the pipeline, frames the result into
//! an archive header plus one chunk group per entry, and records the
//! catalog rows for what it wrote.

use cairn_catalog::entries::{NewEntry, NewFragment};
use cairn_catalog::model::EntryType;
use cairn_catalog::{Catalog, IndexId};
use cairn_storage::Storage;

use crate::format::{Chunk, TAG_ARCHIVE_HEADER};
use crate::pipeline::{encode_entry, EncodedEntry, PipelineConfig};
use crate::volume::VolumeWriter;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::Error),
    #[error("volume error: {0}")]
    Volume(#[from] crate::volume::Error),
    #[error("catalog error: {0}")]
    Catalog(#[from] cairn_catalog::Error),
}

/// One entry queued for archiving; the caller (the CLI's walk over the
/// filesystem, filtered through `cairn_util::PatternList`) has already
/// decided this path belongs in the archive.
pub struct SourceEntry<'a> {
    pub name: &'a str,
    pub entry_type: EntryType,
    pub time_last_changed: i64,
    pub user_id: i64,
    pub group_id: i64,
    pub permission: i64,
    pub content: &'a [u8],
    /// Prior version's bytes, if this entry qualifies for delta encoding
    /// against an earlier archive of the same path.
    pub delta_source: Option<&'a [u8]>,
    /// Symlink target, for `link` entries.
    pub destination_name: Option<&'a str>,
}

pub struct ArchiveWriter<O> {
    volumes: VolumeWriter<O>,
    config: PipelineConfig,
    entries_written: u64,
}

impl<O> ArchiveWriter<O>
where
    O: FnMut(&str) -> Result<Box<dyn Storage>, cairn_storage::Error>,
{
    pub fn create(base_name: impl Into<String>, volume_size: u64, config: PipelineConfig, open: O) -> Result<Self, Error> {
        let mut volumes = VolumeWriter::create(base_name, volume_size, open)?;
        volumes.write_chunk(&Chunk::new(TAG_ARCHIVE_HEADER, Vec::new()))?;
        Ok(ArchiveWriter {
            volumes,
            config,
            entries_written: 0,
        })
    }

    /// Resumes an existing archive for `archive-file-mode=append`: the
    /// caller has already truncated the volume set to
    /// [`crate::volume::last_valid_chunk_boundary`] and picks this up from
    /// there instead of writing a fresh header.
    pub fn resume(
        base_name: impl Into<String>,
        volume_size: u64,
        volume_index: u32,
        bytes_in_current_volume: u64,
        config: PipelineConfig,
        open: O,
    ) -> Result<Self, Error> {
        let volumes = VolumeWriter::resume(base_name, volume_size, volume_index, bytes_in_current_volume, open)?;
        Ok(ArchiveWriter {
            volumes,
            config,
            entries_written: 0,
        })
    }

    /// Runs one entry through the pipeline without touching the volume or
    /// the catalog. Pure and CPU-bound, so this is the half of entry
    /// writing safe to run off the main thread across a worker pool; the
    /// other half, [`ArchiveWriter::write_encoded_entry`], stays on the
    /// writer so volume chunks and catalog rows land in the same order the
    /// entries were submitted in.
    pub fn encode(&self, entry: &SourceEntry<'_>) -> Result<EncodedEntry, Error> {
        Ok(encode_entry(
            entry.name,
            entry.entry_type,
            entry.time_last_changed,
            entry.user_id,
            entry.group_id,
            entry.permission,
            entry.content,
            entry.delta_source,
            &self.config,
        )?)
    }

    /// Frames an already-encoded entry into the current volume and records
    /// it in the catalog under `entity_id`.
    pub async fn write_encoded_entry(
        &mut self,
        catalog: &Catalog,
        uuid_id: IndexId,
        entity_id: IndexId,
        storage_id: Option<IndexId>,
        entry: &SourceEntry<'_>,
        encoded: EncodedEntry,
    ) -> Result<IndexId, Error> {
        self.volumes.write_chunk(&encoded.metadata_chunk)?;
        for fragment in &encoded.fragment_chunks {
            self.volumes.write_chunk(fragment)?;
        }
        self.entries_written += 1;

        let fragments: Vec<NewFragment> = match (entry.entry_type, storage_id) {
            (EntryType::File | EntryType::Image | EntryType::Hardlink, Some(storage_id))
                if !entry.content.is_empty() =>
            {
                vec![NewFragment { storage_id, offset: 0, size: entry.content.len() as i64 }]
            }
            _ => Vec::new(),
        };

        let entry_id = catalog
            .add_entry(NewEntry {
                storage_id,
                entity_id,
                uuid_id,
                entry_type: entry.entry_type,
                name: entry.name,
                time_last_changed: entry.time_last_changed,
                user_id: entry.user_id,
                group_id: entry.group_id,
                permission: entry.permission,
                size: entry.content.len() as i64,
                fragments: &fragments,
                destination_name: entry.destination_name,
                special_type: None,
            })
            .await?;
        Ok(entry_id)
    }

    /// Encodes and frames one entry, and records it in the catalog under
    /// `entity_id`. Convenience wrapper over [`encode`](Self::encode) +
    /// [`write_encoded_entry`](Self::write_encoded_entry) for callers that
    /// don't need to parallelize encoding.
    pub async fn write_entry(
        &mut self,
        catalog: &Catalog,
        uuid_id: IndexId,
        entity_id: IndexId,
        storage_id: Option<IndexId>,
        entry: SourceEntry<'_>,
    ) -> Result<IndexId, Error> {
        let encoded = self.encode(&entry)?;
        self.write_encoded_entry(catalog, uuid_id, entity_id, storage_id, &entry, encoded).await
    }

    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    pub fn finish(self) -> Result<u32, Error> {
        Ok(self.volumes.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_storage::file::FileStorage;
    use cairn_storage::OpenMode;

    fn temp_open(dir: &std::path::Path) -> impl FnMut(&str) -> Result<Box<dyn Storage>, cairn_storage::Error> + '_ {
        move |name: &str| -> Result<Box<dyn Storage>, cairn_storage::Error> {
            Ok(Box::new(FileStorage::open(&dir.join(name), OpenMode::Write)?))
        }
    }

    #[tokio::test]
    async fn writes_an_entry_and_records_it_in_the_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::open_memory().await.unwrap();
        let uuid_id = catalog.find_or_create_uuid("job-a").await.unwrap();
        let entity_id = catalog.create_entity(uuid_id, "job-a", None, "full", 1000).await.unwrap();

        let mut writer = ArchiveWriter::create(
            "backup.bar",
            1 << 20,
            PipelineConfig::default(),
            temp_open(dir.path()),
        )
        .unwrap();

        let content = b"entry payload bytes".to_vec();
        writer
            .write_entry(
                &catalog,
                uuid_id,
                entity_id,
                None,
                SourceEntry {
                    name: "/etc/hosts",
                    entry_type: EntryType::File,
                    time_last_changed: 1,
                    user_id: 0,
                    group_id: 0,
                    permission: 0o644,
                    content: &content,
                    delta_source: None,
                    destination_name: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(writer.entries_written(), 1);
        writer.finish().unwrap();

        let info = catalog.entity_info(entity_id).await.unwrap();
        assert_eq!(info.total_entry_count, 1);
        assert!(dir.path().join("backup.bar").exists());
    }
}
