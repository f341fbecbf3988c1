//! The local filesystem transport. All other transports are judged against
//! this one's semantics: `seek` is absolute, `write_all` appends at the
//! current position, `sync` flushes to the OS.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::{Error, OpenMode, Storage};

pub struct FileStorage {
    path: PathBuf,
    file: File,
}

impl FileStorage {
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self, Error> {
        let file = match mode {
            OpenMode::Read => OpenOptions::new().read(true).open(path),
            OpenMode::Write => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path),
            OpenMode::Append => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .append(true)
                .open(path),
        }
        .map_err(|e| Error::CannotOpen(path.display().to_string(), e))?;
        Ok(FileStorage {
            path: path.to_path_buf(),
            file,
        })
    }

    fn label(&self) -> String {
        self.path.display().to_string()
    }
}

impl Storage for FileStorage {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.file
            .read(buf)
            .map_err(|e| Error::Io(self.label(), e))
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.file
            .write_all(buf)
            .map_err(|e| Error::Io(self.label(), e))
    }

    fn seek(&mut self, offset: u64) -> Result<(), Error> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map(|_| ())
            .map_err(|e| Error::Io(self.label(), e))
    }

    fn tell(&mut self) -> Result<u64, Error> {
        self.file
            .stream_position()
            .map_err(|e| Error::Io(self.label(), e))
    }

    fn size(&mut self) -> Result<u64, Error> {
        self.file
            .metadata()
            .map(|m| m.len())
            .map_err(|e| Error::Io(self.label(), e))
    }

    fn sync(&mut self) -> Result<(), Error> {
        self.file
            .sync_all()
            .map_err(|e| Error::Io(self.label(), e))
    }

    fn close(self: Box<Self>) -> Result<(), Error> {
        // `File` flushes and closes its descriptor on drop.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.bar");

        {
            let mut storage = FileStorage::open(&path, OpenMode::Write).unwrap();
            storage.write_all(b"BAR0hello").unwrap();
            storage.sync().unwrap();
        }

        let mut storage = FileStorage::open(&path, OpenMode::Read).unwrap();
        assert_eq!(storage.size().unwrap(), 9);
        let mut buf = [0u8; 9];
        let n = storage.read(&mut buf).unwrap();
        assert_eq!(n, 9);
        assert_eq!(&buf, b"BAR0hello");
    }

    #[test]
    fn seek_then_read_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.bar");
        {
            let mut storage = FileStorage::open(&path, OpenMode::Write).unwrap();
            storage.write_all(b"0123456789").unwrap();
        }
        let mut storage = FileStorage::open(&path, OpenMode::Read).unwrap();
        storage.seek(5).unwrap();
        assert_eq!(storage.tell().unwrap(), 5);
        let mut buf = [0u8; 5];
        storage.read(&mut buf).unwrap();
        assert_eq!(&buf, b"56789");
    }

    #[test]
    fn cannot_open_missing_file_for_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.bar");
        assert!(FileStorage::open(&path, OpenMode::Read).is_err());
    }
}
