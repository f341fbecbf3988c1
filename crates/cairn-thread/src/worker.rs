//! Named OS worker threads with a cooperative quit flag. Workers are not
//! killed; they are asked to stop and are expected to check
//! [`QuitFlag::should_quit`] at safe points and unwind on their own.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::registry::{Registry, ThreadStatus};

/// Number of logical CPUs available to this process, the default size of
/// a [`crate::pool::WorkerPool`] before a `max-threads` override.
pub fn number_of_cores() -> usize {
    num_cpus::get()
}

/// Cooperatively yields the rest of this thread's time slice.
pub fn yield_now() {
    std::thread::yield_now();
}

/// Blocks the calling thread for `milliseconds`.
pub fn delay(milliseconds: u64) {
    std::thread::sleep(std::time::Duration::from_millis(milliseconds));
}

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(u64);

impl ThreadId {
    pub(crate) fn next() -> ThreadId {
        ThreadId(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared flag a worker polls to learn it should wind down. Cloning shares
/// the same underlying flag.
#[derive(Clone, Debug)]
pub struct QuitFlag(Arc<AtomicBool>);

impl QuitFlag {
    fn new() -> Self {
        QuitFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn should_quit(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn request_quit(&self) {
        self.0.store(true, Ordering::Release);
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to spawn worker thread {0:?}: {1}")]
    Spawn(String, std::io::Error),
    #[error("worker thread {0} panicked")]
    Panicked(ThreadId),
}

/// A spawned worker. Dropping it does not join or request quit; call
/// [`Worker::stop`] explicitly.
pub struct Worker<T> {
    pub id: ThreadId,
    pub name: String,
    quit: QuitFlag,
    handle: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> Worker<T> {
    /// Spawns `name` as an OS thread running `body`, which receives its own
    /// `ThreadId` and a `QuitFlag` it should check at safe points.
    ///
    /// Spawn is synchronous: it does not return until the new thread has
    /// recorded its identity in `registry` and signalled that it has
    /// started, so a caller that immediately looks the thread up in the
    /// registry is guaranteed to find it there.
    pub fn spawn<F>(name: impl Into<String>, registry: &Arc<Registry>, body: F) -> Result<Worker<T>, Error>
    where
        F: FnOnce(ThreadId, QuitFlag) -> T + Send + 'static,
    {
        let name = name.into();
        let id = ThreadId::next();
        let quit = QuitFlag::new();
        let quit_for_body = quit.clone();
        let registry = registry.clone();
        let (ready_tx, ready_rx) = sync_channel::<()>(0);
        let thread_name = name.clone();
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                registry.publish(
                    id,
                    ThreadStatus {
                        thread_name,
                        operation: "idle".to_string(),
                        entries_processed: 0,
                    },
                );
                let _ = ready_tx.send(());
                let result = body(id, quit_for_body);
                registry.remove(id);
                result
            })
            .map_err(|e| Error::Spawn(name.clone(), e))?;
        ready_rx.recv().map_err(|_| Error::Panicked(id))?;
        Ok(Worker {
            id,
            name,
            quit,
            handle: Some(handle),
        })
    }

    pub fn request_quit(&self) {
        self.quit.request_quit();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map(JoinHandle::is_finished).unwrap_or(true)
    }

    /// Requests quit and blocks until the thread exits.
    pub fn stop(mut self) -> Result<T, Error> {
        self.quit.request_quit();
        self.join()
    }

    pub fn join(&mut self) -> Result<T, Error> {
        let handle = self.handle.take().expect("worker already joined");
        handle.join().map_err(|_| Error::Panicked(self.id))
    }
}
