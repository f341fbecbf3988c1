//! A WebDAV transport over `reqwest::blocking`. Reads fetch the whole
//! object with `GET` and buffer it locally (archive volumes are bounded by
//! `archive-part-size`, so this is a reasonable size to hold in memory);
//! writes buffer locally and are flushed with a single `PUT` on `sync`/
//! `close`, matching how the archive engine already batches writes within
//! one volume.
//!
//! A flaky link or a server momentarily returning 5xx is the expected
//! failure mode for a remote transport, not a reason to fail the whole
//! archive run, so GET/PUT calls retry with bounded exponential backoff
//! before surfacing an error.

use std::io::Cursor;
use std::time::Duration;

use exponential_backoff::Backoff;

use crate::{Error, OpenMode, Storage};

const RETRY_ATTEMPTS: u32 = 5;
const RETRY_MIN: Duration = Duration::from_millis(100);
const RETRY_MAX: Duration = Duration::from_secs(5);

/// Retries `op` on transport errors with exponential backoff; gives up
/// and returns the last error once the backoff is exhausted.
fn with_retry<T>(mut op: impl FnMut() -> Result<T, Error>) -> Result<T, Error> {
    let backoff = Backoff::new(RETRY_ATTEMPTS, RETRY_MIN, RETRY_MAX);
    let mut last_err = None;
    for wait in &backoff {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_err = Some(err);
                std::thread::sleep(wait);
            }
        }
    }
    Err(last_err.expect("Backoff::new always yields at least one attempt"))
}

pub struct WebDavStorage {
    url: url::Url,
    client: reqwest::blocking::Client,
    mode: OpenMode,
    buffer: Cursor<Vec<u8>>,
    dirty: bool,
}

impl WebDavStorage {
    pub fn open(url: url::Url, mode: OpenMode) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::new();
        let buffer = match mode {
            OpenMode::Read => {
                let bytes = with_retry(|| Self::get(&client, &url))?;
                Cursor::new(bytes)
            }
            OpenMode::Write => Cursor::new(Vec::new()),
            OpenMode::Append => {
                // A missing object on first append is expected, not
                // transient, so this GET is best-effort and never retried.
                let existing = client
                    .get(url.clone())
                    .send()
                    .ok()
                    .and_then(|r| r.bytes().ok())
                    .map(|b| b.to_vec())
                    .unwrap_or_default();
                let mut cursor = Cursor::new(existing);
                cursor.set_position(cursor.get_ref().len() as u64);
                cursor
            }
        };
        Ok(WebDavStorage {
            url,
            client,
            mode,
            buffer,
            dirty: false,
        })
    }

    fn get(client: &reqwest::blocking::Client, url: &url::Url) -> Result<Vec<u8>, Error> {
        let response = client.get(url.clone()).send().map_err(|e| Error::Http(url.to_string(), e))?;
        let bytes = response.bytes().map_err(|e| Error::Http(url.to_string(), e))?;
        Ok(bytes.to_vec())
    }

    fn flush_to_remote(&mut self) -> Result<(), Error> {
        if !self.dirty {
            return Ok(());
        }
        let body = self.buffer.get_ref().clone();
        with_retry(|| {
            self.client
                .put(self.url.clone())
                .body(body.clone())
                .send()
                .map_err(|e| Error::Http(self.url.to_string(), e))
                .map(|_| ())
        })?;
        self.dirty = false;
        Ok(())
    }
}

impl Storage for WebDavStorage {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        use std::io::Read;
        self.buffer
            .read(buf)
            .map_err(|e| Error::Io(self.url.to_string(), e))
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Error> {
        use std::io::Write;
        if self.mode == OpenMode::Read {
            return Err(Error::Io(
                self.url.to_string(),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "storage opened read-only"),
            ));
        }
        self.buffer
            .write_all(buf)
            .map_err(|e| Error::Io(self.url.to_string(), e))?;
        self.dirty = true;
        Ok(())
    }

    fn seek(&mut self, offset: u64) -> Result<(), Error> {
        self.buffer.set_position(offset);
        Ok(())
    }

    fn tell(&mut self) -> Result<u64, Error> {
        Ok(self.buffer.position())
    }

    fn size(&mut self) -> Result<u64, Error> {
        Ok(self.buffer.get_ref().len() as u64)
    }

    fn sync(&mut self) -> Result<(), Error> {
        self.flush_to_remote()
    }

    fn close(mut self: Box<Self>) -> Result<(), Error> {
        self.flush_to_remote()
    }
}
