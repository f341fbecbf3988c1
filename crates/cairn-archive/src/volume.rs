//! Splits a stream of chunks across volumes of bounded size, opening the
//! next volume once the current one would exceed its configured cap.

use cairn_storage::{OpenMode, Storage};

use crate::format::Chunk;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] cairn_storage::Error),
    #[error("format error: {0}")]
    Format(#[from] crate::format::Error),
    #[error("a single chunk of {0} bytes does not fit within the {1} byte volume size")]
    ChunkExceedsVolumeSize(usize, u64),
}

/// Names successive volumes for a base name: `backup.bar`, `backup.bar.2`,
/// `backup.bar.3`, ...
pub fn volume_name(base: &str, index: u32) -> String {
    if index <= 1 {
        base.to_string()
    } else {
        format!("{base}.{index}")
    }
}

pub struct VolumeWriter<O> {
    base_name: String,
    volume_size: u64,
    volume_index: u32,
    bytes_in_current_volume: u64,
    current: Box<dyn Storage>,
    open: O,
}

impl<O> VolumeWriter<O>
where
    O: FnMut(&str) -> Result<Box<dyn Storage>, cairn_storage::Error>,
{
    pub fn create(base_name: impl Into<String>, volume_size: u64, mut open: O) -> Result<Self, Error> {
        let base_name = base_name.into();
        let current = open(&volume_name(&base_name, 1))?;
        Ok(VolumeWriter {
            base_name,
            volume_size,
            volume_index: 1,
            bytes_in_current_volume: 0,
            current,
            open,
        })
    }

    /// Resumes an existing volume set for `archive-file-mode=append`: opens
    /// volume `volume_index` (already truncated by the caller to
    /// [`last_valid_chunk_boundary`]) and keeps writing from there instead
    /// of starting a fresh archive header.
    pub fn resume(
        base_name: impl Into<String>,
        volume_size: u64,
        volume_index: u32,
        bytes_in_current_volume: u64,
        mut open: O,
    ) -> Result<Self, Error> {
        let base_name = base_name.into();
        let current = open(&volume_name(&base_name, volume_index))?;
        Ok(VolumeWriter {
            base_name,
            volume_size,
            volume_index,
            bytes_in_current_volume,
            current,
            open,
        })
    }

    /// Writes `chunk`, rolling to a new volume first if it wouldn't fit.
    /// A single chunk larger than the volume size is rejected outright
    /// rather than silently straddling volumes mid-chunk, since volume
    /// boundaries are always between whole chunks.
    pub fn write_chunk(&mut self, chunk: &Chunk) -> Result<(), Error> {
        let chunk_len = chunk.payload.len() as u64 + 8;
        if chunk_len > self.volume_size {
            return Err(Error::ChunkExceedsVolumeSize(chunk.payload.len(), self.volume_size));
        }
        if self.bytes_in_current_volume + chunk_len > self.volume_size {
            self.roll()?;
        }
        let mut buf = Vec::new();
        chunk.write_to(&mut buf)?;
        self.current.write_all(&buf)?;
        self.bytes_in_current_volume += chunk_len;
        Ok(())
    }

    fn roll(&mut self) -> Result<(), Error> {
        self.current.sync()?;
        self.volume_index += 1;
        self.bytes_in_current_volume = 0;
        self.current = (self.open)(&volume_name(&self.base_name, self.volume_index))?;
        Ok(())
    }

    pub fn volume_count(&self) -> u32 {
        self.volume_index
    }

    pub fn finish(mut self) -> Result<u32, Error> {
        self.current.sync()?;
        Ok(self.volume_index)
    }
}

/// Opens every volume of an archive in order and concatenates their chunk
/// streams, so callers see one continuous sequence regardless of how many
/// physical volumes it spans.
pub fn read_chunks_across_volumes(
    base_name: &str,
    mut open: impl FnMut(&str) -> Result<Box<dyn Storage>, cairn_storage::Error>,
) -> Result<Vec<Chunk>, Error> {
    let mut chunks = Vec::new();
    let mut index = 1;
    loop {
        let name = volume_name(base_name, index);
        let mut storage = match open(&name) {
            Ok(storage) => storage,
            Err(_) if index > 1 => break,
            Err(e) => return Err(e.into()),
        };
        let buf = read_all(storage.as_mut())?;
        let mut cursor = std::io::Cursor::new(buf);
        while let Some(chunk) = Chunk::read_from(&mut cursor)? {
            chunks.push(chunk);
        }
        index += 1;
    }
    Ok(chunks)
}

/// Scans `bytes` for the highest offset that ends a whole chunk. A volume
/// cut off mid-write (power loss, or the tail of an `archive-file-mode=stop`
/// recovery) has a dangling partial chunk past this point; a caller resuming
/// the volume for `archive-file-mode=append` truncates to this offset first.
/// Returns the full length unchanged when every chunk in `bytes` is whole.
pub fn last_valid_chunk_boundary(bytes: &[u8]) -> u64 {
    let mut cursor = std::io::Cursor::new(bytes);
    let mut boundary = 0u64;
    loop {
        let before = cursor.position();
        match Chunk::read_from(&mut cursor) {
            Ok(Some(_)) => boundary = cursor.position(),
            Ok(None) => break,
            Err(_) => {
                boundary = before;
                break;
            }
        }
    }
    boundary
}

fn read_all(storage: &mut dyn Storage) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = storage.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    Ok(out)
}
