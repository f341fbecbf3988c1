//! The chunked archive engine: frames entries into the on-disk format,
//! drives them through the hash/delta/compress/encrypt pipeline, splits the
//! result across volumes, and restores them back out.

pub mod entry;
pub mod format;
pub mod pipeline;
pub mod reader;
pub mod volume;
pub mod writer;

pub use entry::{EntryMetadata, EntryTypeWire};
pub use format::Chunk;
pub use pipeline::{decode_entry, encode_entry, EncodedEntry, PipelineConfig};
pub use reader::{restore_all, RestoreEntryMode, RestoredEntry};
pub use volume::{last_valid_chunk_boundary, read_chunks_across_volumes, volume_name, VolumeWriter};
pub use writer::{ArchiveWriter, SourceEntry};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("format error: {0}")]
    Format(#[from] format::Error),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] pipeline::Error),
    #[error("volume error: {0}")]
    Volume(#[from] volume::Error),
    #[error("writer error: {0}")]
    Writer(#[from] writer::Error),
    #[error("reader error: {0}")]
    Reader(#[from] reader::Error),
    #[error("catalog error: {0}")]
    Catalog(#[from] cairn_catalog::Error),
}
