//! Byte compression. `zip0..zip9` map to deflate levels 0-9 (via `flate2`),
//! `lz4-0..lz4-16` to `lz4_flex`, `zstd0..zstd19` to `zstd`. `bzip*`,
//! `lzma*`, and `lzo*` are named capabilities with no backing crate in this
//! build; selecting one fails with [`Error::Unavailable`].

use std::io::{Read, Write};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("compression algorithm {0:?} is not available in this build")]
    Unavailable(String),
    #[error("io error during compression: {0}")]
    Io(#[from] std::io::Error),
    #[error("zstd error: {0}")]
    Zstd(String),
    #[error("lz4 error: {0}")]
    Lz4(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CompressAlgorithm {
    None,
    Zip(u8),
    Bzip(u8),
    Lzma(u8),
    Lzo(u8),
    Lz4(u8),
    Zstd(u8),
}

impl CompressAlgorithm {
    /// Parses CLI/config values like `none`, `zip6`, `lz4-9`, `zstd19`.
    pub fn parse(value: &str) -> Result<Self, Error> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("none") {
            return Ok(CompressAlgorithm::None);
        }
        let (prefix, digits) = split_trailing_digits(value);
        let level: u8 = digits.parse().unwrap_or(0);
        match prefix.trim_end_matches('-').to_ascii_lowercase().as_str() {
            "zip" => Ok(CompressAlgorithm::Zip(level)),
            "bzip" => Ok(CompressAlgorithm::Bzip(level)),
            "lzma" => Ok(CompressAlgorithm::Lzma(level)),
            "lzo" => Ok(CompressAlgorithm::Lzo(level)),
            "lz4" => Ok(CompressAlgorithm::Lz4(level)),
            "zstd" => Ok(CompressAlgorithm::Zstd(level)),
            _ => Err(Error::Unavailable(value.to_string())),
        }
    }

    pub fn name(&self) -> String {
        match self {
            CompressAlgorithm::None => "none".to_string(),
            CompressAlgorithm::Zip(l) => format!("zip{l}"),
            CompressAlgorithm::Bzip(l) => format!("bzip{l}"),
            CompressAlgorithm::Lzma(l) => format!("lzma{l}"),
            CompressAlgorithm::Lzo(l) => format!("lzo{l}"),
            CompressAlgorithm::Lz4(l) => format!("lz4-{l}"),
            CompressAlgorithm::Zstd(l) => format!("zstd{l}"),
        }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            CompressAlgorithm::None => Ok(data.to_vec()),
            CompressAlgorithm::Zip(level) => {
                let mut encoder = flate2::write::DeflateEncoder::new(
                    Vec::new(),
                    flate2::Compression::new((*level).min(9) as u32),
                );
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            CompressAlgorithm::Zstd(level) => {
                zstd::encode_all(data, (*level).min(19) as i32)
                    .map_err(|e| Error::Zstd(e.to_string()))
            }
            CompressAlgorithm::Lz4(_) => Ok(lz4_flex::compress_prepend_size(data)),
            CompressAlgorithm::Bzip(_) | CompressAlgorithm::Lzma(_) | CompressAlgorithm::Lzo(_) => {
                Err(Error::Unavailable(self.name()))
            }
        }
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            CompressAlgorithm::None => Ok(data.to_vec()),
            CompressAlgorithm::Zip(_) => {
                let mut decoder = flate2::read::DeflateDecoder::new(data);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out)?;
                Ok(out)
            }
            CompressAlgorithm::Zstd(_) => {
                zstd::decode_all(data).map_err(|e| Error::Zstd(e.to_string()))
            }
            CompressAlgorithm::Lz4(_) => lz4_flex::decompress_size_prepended(data)
                .map_err(|e| Error::Lz4(e.to_string())),
            CompressAlgorithm::Bzip(_) | CompressAlgorithm::Lzma(_) | CompressAlgorithm::Lzo(_) => {
                Err(Error::Unavailable(self.name()))
            }
        }
    }
}

fn split_trailing_digits(value: &str) -> (&str, &str) {
    let split_at = value
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    value.split_at(split_at)
}
