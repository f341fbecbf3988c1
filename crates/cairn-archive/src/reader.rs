//! Drives a restore job: reads an archive's chunk stream, groups it back
//! into per-entry metadata/fragment pairs, and decodes entries selected by
//! the caller's restore set.

use crate::entry::EntryMetadata;
use crate::format::{
    Chunk, TAG_ARCHIVE_HEADER, TAG_DIRECTORY, TAG_FILE, TAG_FRAGMENT_HEADER, TAG_HARDLINK, TAG_IMAGE,
    TAG_LINK, TAG_SPECIAL,
};
use crate::pipeline::{decode_entry, PipelineConfig};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::Error),
    #[error("volume error: {0}")]
    Volume(#[from] crate::volume::Error),
    #[error("archive does not start with a header chunk")]
    MissingHeader,
}

fn is_entry_tag(tag: [u8; 4]) -> bool {
    matches!(tag, TAG_FILE | TAG_IMAGE | TAG_DIRECTORY | TAG_LINK | TAG_HARDLINK | TAG_SPECIAL)
}

/// What mode governs a restore when the destination path already exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreEntryMode {
    /// Leave the existing path untouched.
    Skip,
    /// Replace the existing path with the restored entry.
    Overwrite,
    /// Restore under a name decorated with a numeric suffix.
    Rename,
}

pub struct RestoredEntry {
    pub metadata: EntryMetadata,
    pub content: Vec<u8>,
}

/// Reads every entry out of an archive opened across however many volumes
/// it spans (see [`crate::volume::read_chunks_across_volumes`]), decoding
/// each one against `config`.
///
/// `delta_source_for` looks up the prior version's bytes for an entry by
/// name, for entries encoded as a delta.
pub fn restore_all(
    chunks: &[Chunk],
    config: &PipelineConfig,
    delta_source_for: impl Fn(&str) -> Option<Vec<u8>>,
) -> Result<Vec<RestoredEntry>, Error> {
    let mut iter = chunks.iter();
    match iter.next() {
        Some(chunk) if chunk.tag == TAG_ARCHIVE_HEADER => {}
        _ => return Err(Error::MissingHeader),
    }

    let mut restored = Vec::new();
    let mut pending_metadata: Option<&Chunk> = None;
    let mut pending_fragments: Vec<&Chunk> = Vec::new();

    let flush = |metadata: Option<&Chunk>,
                 fragments: &[&Chunk],
                 restored: &mut Vec<RestoredEntry>|
     -> Result<(), Error> {
        let Some(metadata_chunk) = metadata else {
            return Ok(());
        };
        let owned_fragments: Vec<Chunk> = fragments.iter().map(|c| (*c).clone()).collect();
        let parsed: EntryMetadata = serde_json::from_slice(&metadata_chunk.payload).map_err(crate::pipeline::Error::from)?;
        let delta_source = delta_source_for(&parsed.name);
        let (metadata, content) = decode_entry(metadata_chunk, &owned_fragments, config, delta_source.as_deref())?;
        restored.push(RestoredEntry { metadata, content });
        Ok(())
    };

    for chunk in iter {
        if chunk.tag == TAG_FRAGMENT_HEADER {
            flush(pending_metadata, &pending_fragments, &mut restored)?;
            pending_metadata = Some(chunk);
            pending_fragments.clear();
        } else if is_entry_tag(chunk.tag) || chunk.tag == crate::format::TAG_FRAGMENT_DATA {
            pending_fragments.push(chunk);
        }
    }
    flush(pending_metadata, &pending_fragments, &mut restored)?;

    Ok(restored)
}
