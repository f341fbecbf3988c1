//! The chunked binary frame format: a stream of tagged, length-prefixed
//! chunks. Every archive is `BAR0` followed by zero or more entry chunk
//! groups and an optional trailing `SGN0` signature.

use std::io::{self, Read, Write};

pub const TAG_ARCHIVE_HEADER: [u8; 4] = *b"BAR0";
pub const TAG_KEY_ENVELOPE: [u8; 4] = *b"KEY0";
pub const TAG_SIGNATURE: [u8; 4] = *b"SGN0";
pub const TAG_FILE: [u8; 4] = *b"FIL0";
pub const TAG_IMAGE: [u8; 4] = *b"IMG0";
pub const TAG_DIRECTORY: [u8; 4] = *b"DIR0";
pub const TAG_LINK: [u8; 4] = *b"LNK0";
pub const TAG_HARDLINK: [u8; 4] = *b"HLN0";
pub const TAG_SPECIAL: [u8; 4] = *b"SPC0";
pub const TAG_FRAGMENT_HEADER: [u8; 4] = *b"FHD0";
pub const TAG_FRAGMENT_DATA: [u8; 4] = *b"FDA0";
pub const TAG_METADATA: [u8; 4] = *b"META";
pub const TAG_XATTR: [u8; 4] = *b"XATR";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("chunk payload of {0} bytes exceeds the {1} byte frame limit")]
    TooLarge(usize, u32),
    #[error("truncated chunk: expected {expected} bytes, got {got}")]
    Truncated { expected: u32, got: usize },
}

/// A single tagged, length-prefixed chunk: 4-byte tag, 4-byte big-endian
/// payload length, then the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub tag: [u8; 4],
    pub payload: Vec<u8>,
}

impl Chunk {
    pub fn new(tag: [u8; 4], payload: Vec<u8>) -> Self {
        Chunk { tag, payload }
    }

    pub fn write_to(&self, out: &mut impl Write) -> Result<(), Error> {
        let len: u32 = self
            .payload
            .len()
            .try_into()
            .map_err(|_| Error::TooLarge(self.payload.len(), u32::MAX))?;
        out.write_all(&self.tag)?;
        out.write_all(&len.to_be_bytes())?;
        out.write_all(&self.payload)?;
        Ok(())
    }

    /// Reads one chunk, or returns `Ok(None)` at a clean end of stream
    /// (zero bytes read before the tag).
    pub fn read_from(input: &mut impl Read) -> Result<Option<Chunk>, Error> {
        let mut tag = [0u8; 4];
        match read_exact_or_eof(input, &mut tag)? {
            false => return Ok(None),
            true => {}
        }
        let mut len_bytes = [0u8; 4];
        input.read_exact(&mut len_bytes)?;
        let len = u32::from_be_bytes(len_bytes);
        let mut payload = vec![0u8; len as usize];
        input.read_exact(&mut payload)?;
        Ok(Some(Chunk { tag, payload }))
    }
}

/// Like `Read::read_exact`, but returns `Ok(false)` instead of erroring when
/// the stream ends before any byte of `buf` is read, and errors (as a
/// genuine truncation) if it ends partway through.
fn read_exact_or_eof(input: &mut impl Read, buf: &mut [u8]) -> Result<bool, Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..])? {
            0 if filled == 0 => return Ok(false),
            0 => {
                return Err(Error::Truncated {
                    expected: buf.len() as u32,
                    got: filled,
                })
            }
            n => filled += n,
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_round_trips_through_a_buffer() {
        let chunk = Chunk::new(TAG_FILE, b"hello".to_vec());
        let mut buf = Vec::new();
        chunk.write_to(&mut buf).unwrap();

        let mut cursor = io::Cursor::new(buf);
        let read_back = Chunk::read_from(&mut cursor).unwrap().unwrap();
        assert_eq!(read_back, chunk);
        assert!(Chunk::read_from(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn multiple_chunks_stream_in_order() {
        let chunks = vec![
            Chunk::new(TAG_ARCHIVE_HEADER, vec![]),
            Chunk::new(TAG_FILE, b"entry-1".to_vec()),
            Chunk::new(TAG_FRAGMENT_DATA, vec![0u8; 16]),
        ];
        let mut buf = Vec::new();
        for chunk in &chunks {
            chunk.write_to(&mut buf).unwrap();
        }
        let mut cursor = io::Cursor::new(buf);
        for expected in &chunks {
            let got = Chunk::read_from(&mut cursor).unwrap().unwrap();
            assert_eq!(&got, expected);
        }
        assert!(Chunk::read_from(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&TAG_FILE);
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(b"short");
        let mut cursor = io::Cursor::new(buf);
        assert!(Chunk::read_from(&mut cursor).is_err());
    }
}
