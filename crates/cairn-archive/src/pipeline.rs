//! The per-entry pipeline: hash the content, optionally delta it against a
//! prior version, compress, optionally encrypt, then frame the result into
//! chunks ready for a volume.
//!
//! Entries are buffered in memory here rather than streamed chunk-by-chunk
//! off disk; the archive format and fragment chunking support streaming,
//! but compute-then-frame is simpler and the entry sizes this engine
//! targets (config files, source trees, small images) fit comfortably in
//! memory.

use cairn_catalog::model::EntryType;
use cairn_codec::compress::CompressAlgorithm;
use cairn_codec::crypt::CryptAlgorithm;
use cairn_crypto::hash::{HashAlgorithm, StreamingHasher};
use cairn_crypto::password::Password;
use cairn_util::PatternList;

use crate::entry::{tag_for, EntryMetadata, EntryTypeWire};
use crate::format::{Chunk, TAG_FRAGMENT_DATA, TAG_FRAGMENT_HEADER};

/// Fragment chunks are capped at this size so a volume boundary can fall
/// between fragments of the same entry instead of only between entries.
pub const FRAGMENT_SIZE: usize = 1 << 20;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("codec error: {0}")]
    Codec(#[from] cairn_codec::compress::Error),
    #[error("crypt error: {0}")]
    Crypt(#[from] cairn_codec::crypt::Error),
    #[error("delta error: {0}")]
    Delta(#[from] cairn_codec::delta::Error),
    #[error("metadata serialization error: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("format error: {0}")]
    Format(#[from] crate::format::Error),
    #[error("entry is encrypted and requires a password to decode")]
    MissingPassword,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub compress: CompressAlgorithm,
    pub crypt: CryptAlgorithm,
    pub password: Option<Password>,
    pub delta_block_size: usize,
    /// Paths matching one of these patterns skip the compress step (content
    /// already compressed, e.g. `*.jpg`, `*.zip`); content is still hashed
    /// and optionally encrypted.
    pub compress_exclude: PatternList,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            compress: CompressAlgorithm::Zip(6),
            crypt: CryptAlgorithm::None,
            password: None,
            delta_block_size: 4096,
            compress_exclude: PatternList::new(),
        }
    }
}

#[derive(Debug)]
pub struct EncodedEntry {
    pub metadata_chunk: Chunk,
    pub fragment_chunks: Vec<Chunk>,
}

#[allow(clippy::too_many_arguments)]
pub fn encode_entry(
    name: &str,
    entry_type: EntryType,
    time_last_changed: i64,
    user_id: i64,
    group_id: i64,
    permission: i64,
    content: &[u8],
    delta_source: Option<&[u8]>,
    config: &PipelineConfig,
) -> Result<EncodedEntry, Error> {
    let mut hasher = StreamingHasher::new(HashAlgorithm::Sha256);
    hasher.update(content);
    let content_hash = hasher.finish();

    let (staged, is_delta) = match delta_source {
        Some(source) => {
            let ops = cairn_codec::delta::compute_patch(source, content, config.delta_block_size);
            (serde_json::to_vec(&ops)?, true)
        }
        None => (content.to_vec(), false),
    };

    // Pre-compressed content (images, archives, video) rarely shrinks
    // further and just burns CPU; a matching path skips the compress step
    // but still gets hashed, delta'd and encrypted like any other entry.
    let compress = if config.compress_exclude.matches(name) {
        CompressAlgorithm::None
    } else {
        config.compress
    };
    let compressed = compress.compress(&staged)?;

    let framed = match (config.crypt, &config.password) {
        (CryptAlgorithm::None, _) => compressed,
        (CryptAlgorithm::Symmetric, Some(password)) => {
            let nonce = cairn_crypto::symmetric::random_nonce();
            cairn_codec::crypt::encrypt_symmetric(password, &nonce, &compressed)?
        }
        (CryptAlgorithm::Symmetric, None) => return Err(Error::MissingPassword),
        (CryptAlgorithm::Asymmetric, _) => {
            // Asymmetric encryption needs a public key, not just a
            // password; callers that want it call `cairn_codec::crypt`
            // directly and frame the ciphertext themselves.
            return Err(Error::MissingPassword);
        }
    };

    let entry_type_wire: EntryTypeWire = entry_type.into();
    let metadata = EntryMetadata {
        name: name.to_string(),
        entry_type: entry_type_wire,
        time_last_changed,
        user_id,
        group_id,
        permission,
        original_size: content.len() as u64,
        content_hash,
        compress_algorithm: compress.name(),
        crypt_algorithm: crypt_name(config.crypt),
        is_delta,
    };
    let metadata_chunk = Chunk::new(TAG_FRAGMENT_HEADER, serde_json::to_vec(&metadata)?);

    let tag = tag_for(entry_type_wire);
    let fragment_chunks = framed
        .chunks(FRAGMENT_SIZE)
        .map(|piece| Chunk::new(if piece.len() == framed.len() { tag } else { TAG_FRAGMENT_DATA }, piece.to_vec()))
        .collect();

    Ok(EncodedEntry {
        metadata_chunk,
        fragment_chunks,
    })
}

pub fn decode_entry(
    metadata_chunk: &Chunk,
    fragment_chunks: &[Chunk],
    config: &PipelineConfig,
    delta_source: Option<&[u8]>,
) -> Result<(EntryMetadata, Vec<u8>), Error> {
    let metadata: EntryMetadata = serde_json::from_slice(&metadata_chunk.payload)?;
    let framed: Vec<u8> = fragment_chunks.iter().flat_map(|c| c.payload.iter().copied()).collect();

    let compressed = match (config.crypt, &config.password) {
        (CryptAlgorithm::None, _) => framed,
        (CryptAlgorithm::Symmetric, Some(password)) => {
            cairn_codec::crypt::decrypt_symmetric(password, &framed)?
        }
        (CryptAlgorithm::Symmetric, None) => return Err(Error::MissingPassword),
        (CryptAlgorithm::Asymmetric, _) => return Err(Error::MissingPassword),
    };

    // The algorithm actually used is whatever got recorded at encode time,
    // not the ambient config: a compress-exclude match swaps it to `none`
    // per entry, and old archives may carry a different algorithm than the
    // one `config` currently names.
    let compress = CompressAlgorithm::parse(&metadata.compress_algorithm).unwrap_or(config.compress);
    let staged = compress.decompress(&compressed)?;

    let content = if metadata.is_delta {
        let ops: Vec<cairn_codec::delta::DeltaOp> = serde_json::from_slice(&staged)?;
        let source = delta_source.ok_or(Error::MissingPassword)?;
        cairn_codec::delta::apply_patch(source, &ops)?
    } else {
        staged
    };

    Ok((metadata, content))
}

fn crypt_name(algorithm: CryptAlgorithm) -> String {
    match algorithm {
        CryptAlgorithm::None => "none".to_string(),
        CryptAlgorithm::Symmetric => "symmetric".to_string(),
        CryptAlgorithm::Asymmetric => "asymmetric".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_catalog::model::EntryType;
    use cairn_util::pattern::{Pattern, PatternType};

    #[test]
    fn round_trips_a_plain_entry() {
        let config = PipelineConfig::default();
        let content = b"the quick brown fox jumps over the lazy dog".repeat(100);
        let encoded = encode_entry(
            "/etc/hosts", EntryType::File, 1000, 0, 0, 0o644, &content, None, &config,
        )
        .unwrap();

        let (metadata, decoded) =
            decode_entry(&encoded.metadata_chunk, &encoded.fragment_chunks, &config, None).unwrap();
        assert_eq!(decoded, content);
        assert_eq!(metadata.name, "/etc/hosts");
        assert!(!metadata.is_delta);
    }

    #[test]
    fn round_trips_an_encrypted_entry() {
        let password = Password::new("correct horse battery staple".to_string());
        let config = PipelineConfig {
            compress: CompressAlgorithm::Zip(1),
            crypt: CryptAlgorithm::Symmetric,
            password: Some(password),
            delta_block_size: 4096,
            compress_exclude: PatternList::new(),
        };
        let content = b"secret configuration payload".to_vec();
        let encoded = encode_entry(
            "/etc/secret.conf", EntryType::File, 2000, 0, 0, 0o600, &content, None, &config,
        )
        .unwrap();

        let (_, decoded) =
            decode_entry(&encoded.metadata_chunk, &encoded.fragment_chunks, &config, None).unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn delta_entries_reconstruct_against_their_source() {
        let config = PipelineConfig::default();
        let source = b"version one of the file contents".repeat(50);
        let target = [source.as_slice(), b" with an appended suffix"].concat();

        let encoded = encode_entry(
            "/var/data.bin", EntryType::File, 3000, 0, 0, 0o644, &target, Some(&source), &config,
        )
        .unwrap();
        assert!(!encoded.fragment_chunks.is_empty());

        let (metadata, decoded) = decode_entry(
            &encoded.metadata_chunk,
            &encoded.fragment_chunks,
            &config,
            Some(&source),
        )
        .unwrap();
        assert!(metadata.is_delta);
        assert_eq!(decoded, target);
    }

    #[test]
    fn excluded_paths_skip_compression_but_still_round_trip() {
        let mut compress_exclude = PatternList::new();
        compress_exclude.push(Pattern::parse("glob:*.jpg", PatternType::Glob).unwrap());
        let config = PipelineConfig { compress_exclude, ..PipelineConfig::default() };

        let content = b"not actually jpeg bytes but pretend".repeat(10);
        let encoded = encode_entry(
            "/photos/beach.jpg", EntryType::File, 1000, 0, 0, 0o644, &content, None, &config,
        )
        .unwrap();

        let (metadata, decoded) =
            decode_entry(&encoded.metadata_chunk, &encoded.fragment_chunks, &config, None).unwrap();
        assert_eq!(metadata.compress_algorithm, "none");
        assert_eq!(decoded, content);
    }
}
