//! `Key` and `Certificate`: payloads that may come from a file path or be
//! embedded inline (typically base64 on the wire), held in zeroizing memory.

use zeroize::Zeroizing;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SecretSource {
    None,
    File,
    Inline,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot read key/certificate file {0:?}: {1}")]
    Io(std::path::PathBuf, std::io::Error),
    #[error("invalid base64 envelope: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// `{source, bytes}`; `bytes` live in zeroizing memory.
pub struct Key {
    pub source: SecretSource,
    bytes: Zeroizing<Vec<u8>>,
}

impl Key {
    pub fn none() -> Self {
        Key {
            source: SecretSource::None,
            bytes: Zeroizing::new(Vec::new()),
        }
    }

    pub fn from_inline_base64(b64: &str) -> Result<Self, Error> {
        use base64::Engine;
        let bytes = base64::engine::general_purpose::STANDARD.decode(b64)?;
        Ok(Key {
            source: SecretSource::Inline,
            bytes: Zeroizing::new(bytes),
        })
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, Error> {
        let bytes =
            std::fs::read(path).map_err(|e| Error::Io(path.to_path_buf(), e))?;
        Ok(Key {
            source: SecretSource::File,
            bytes: Zeroizing::new(bytes),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// `{source, optional file path, bytes}`.
pub struct Certificate {
    pub source: SecretSource,
    pub path: Option<std::path::PathBuf>,
    bytes: Zeroizing<Vec<u8>>,
}

impl Certificate {
    pub fn none() -> Self {
        Certificate {
            source: SecretSource::None,
            path: None,
            bytes: Zeroizing::new(Vec::new()),
        }
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, Error> {
        let bytes =
            std::fs::read(path).map_err(|e| Error::Io(path.to_path_buf(), e))?;
        Ok(Certificate {
            source: SecretSource::File,
            path: Some(path.to_path_buf()),
            bytes: Zeroizing::new(bytes),
        })
    }

    pub fn from_inline(bytes: Vec<u8>) -> Self {
        Certificate {
            source: SecretSource::Inline,
            path: None,
            bytes: Zeroizing::new(bytes),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_key_is_empty() {
        let k = Key::none();
        assert_eq!(k.source, SecretSource::None);
        assert!(k.is_empty());
    }

    #[test]
    fn inline_base64_roundtrip() {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"secret-key-bytes");
        let k = Key::from_inline_base64(&encoded).unwrap();
        assert_eq!(k.as_bytes(), b"secret-key-bytes");
        assert_eq!(k.source, SecretSource::Inline);
    }

    #[test]
    fn file_backed_certificate() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("cairn-cert-test-{}.pem", std::process::id()));
        std::fs::write(&path, b"cert-bytes").unwrap();
        let cert = Certificate::from_file(&path).unwrap();
        assert_eq!(cert.as_bytes(), b"cert-bytes");
        assert_eq!(cert.path.as_deref(), Some(path.as_path()));
        std::fs::remove_file(&path).ok();
    }
}
