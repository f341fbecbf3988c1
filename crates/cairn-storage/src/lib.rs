//! A uniform open/read/write/seek/close transport over the archiver's
//! storage back-ends: local files, WebDAV, and (as named capabilities not
//! backed by a crate in this build) FTP, SFTP, and optical media.

pub mod device;
pub mod file;
pub mod uri;
pub mod webdav;

use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot open {0:?}: {1}")]
    CannotOpen(String, io::Error),
    #[error("io error on {0:?}: {1}")]
    Io(String, io::Error),
    #[error("http error on {0:?}: {1}")]
    Http(String, reqwest::Error),
    #[error("{0} transport is not available in this build")]
    Unavailable(&'static str),
    #[error("seek past end of writable storage")]
    SeekPastEnd,
    #[error("storage is full")]
    StorageFull,
}

/// Open mode for a storage handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    Append,
}

/// Uniform transport contract implemented by each storage back-end. All
/// operations are blocking, matching the archive engine's OS-thread worker
/// model (see the thread runtime crate) rather than an async runtime.
pub trait Storage: Send {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;
    fn write_all(&mut self, buf: &[u8]) -> Result<(), Error>;
    fn seek(&mut self, offset: u64) -> Result<(), Error>;
    fn tell(&mut self) -> Result<u64, Error>;
    fn size(&mut self) -> Result<u64, Error>;
    fn sync(&mut self) -> Result<(), Error>;
    fn close(self: Box<Self>) -> Result<(), Error>;
}

/// Opens `location` (a `uri::StorageUri`) in `mode`, dispatching to the
/// matching transport.
pub fn open(location: &uri::StorageUri, mode: OpenMode) -> Result<Box<dyn Storage>, Error> {
    match location {
        uri::StorageUri::File(path) => Ok(Box::new(file::FileStorage::open(path, mode)?)),
        uri::StorageUri::WebDav(url) => Ok(Box::new(webdav::WebDavStorage::open(url.clone(), mode)?)),
        uri::StorageUri::Ftp(_) => Err(Error::Unavailable("ftp")),
        uri::StorageUri::Sftp(_) => Err(Error::Unavailable("sftp")),
        uri::StorageUri::Optical(_) => Err(Error::Unavailable("optical media")),
    }
}
