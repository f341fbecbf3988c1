//! Parses the `scheme://...` storage location strings accepted by the
//! archiver's `--archive-name`/server option: `file:`, `webdav:`, `ftp:`,
//! `sftp:`, and `device:` for optical media.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unrecognized storage scheme in {0:?}")]
    UnknownScheme(String),
    #[error("invalid url {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageUri {
    File(PathBuf),
    WebDav(url::Url),
    Ftp(url::Url),
    Sftp(url::Url),
    Optical(String),
}

impl StorageUri {
    pub fn parse(value: &str) -> Result<Self, Error> {
        if let Some(rest) = value.strip_prefix("webdav:") {
            let url = normalize_and_parse("https", rest)?;
            return Ok(StorageUri::WebDav(url));
        }
        if let Some(rest) = value.strip_prefix("ftp:") {
            let url = normalize_and_parse("ftp", rest)?;
            return Ok(StorageUri::Ftp(url));
        }
        if let Some(rest) = value.strip_prefix("sftp:") {
            let url = normalize_and_parse("sftp", rest)?;
            return Ok(StorageUri::Sftp(url));
        }
        if let Some(rest) = value.strip_prefix("device:") {
            return Ok(StorageUri::Optical(rest.to_string()));
        }
        if let Some(rest) = value.strip_prefix("file:") {
            return Ok(StorageUri::File(PathBuf::from(rest)));
        }
        if value.contains("://") {
            return Err(Error::UnknownScheme(value.to_string()));
        }
        Ok(StorageUri::File(PathBuf::from(value)))
    }
}

fn normalize_and_parse(scheme: &str, rest: &str) -> Result<url::Url, Error> {
    let full = if rest.starts_with("//") {
        format!("{scheme}:{rest}")
    } else {
        format!("{scheme}://{rest}")
    };
    url::Url::parse(&full).map_err(|e| Error::InvalidUrl(full, e))
}
