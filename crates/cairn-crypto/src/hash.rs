//! Content hashing. `HashAlgorithm::None` produces an empty hash, matching
//! the "empty when algorithm = none" invariant in the data model.

use sha2::Digest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum HashAlgorithm {
    None,
    Sha256,
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::None => f.write_str("none"),
            HashAlgorithm::Sha256 => f.write_str("sha256"),
        }
    }
}

/// `{algorithm, bytes}`; `bytes` is empty when `algorithm == None`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Hash {
    pub algorithm: HashAlgorithm,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

impl Hash {
    pub fn empty() -> Self {
        Hash {
            algorithm: HashAlgorithm::None,
            bytes: Vec::new(),
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// Streaming SHA-256 hasher used by the archive write pipeline.
pub struct StreamingHasher {
    algorithm: HashAlgorithm,
    inner: Option<sha2::Sha256>,
}

impl StreamingHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let inner = match algorithm {
            HashAlgorithm::None => None,
            HashAlgorithm::Sha256 => Some(sha2::Sha256::new()),
        };
        StreamingHasher { algorithm, inner }
    }

    pub fn update(&mut self, data: &[u8]) {
        if let Some(h) = self.inner.as_mut() {
            h.update(data);
        }
    }

    pub fn finish(self) -> Hash {
        match self.inner {
            Some(h) => Hash {
                algorithm: self.algorithm,
                bytes: h.finalize().to_vec(),
            },
            None => Hash::empty(),
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
