//! Stack-dump diagnostics.
//!
//! `SIGQUIT` historically triggered a dump from inside the signal handler
//! itself. That is not async-signal-safe once the dump needs to lock a
//! registry or format text, so here the handler only flips an atomic flag;
//! a dedicated debug thread polls the flag and does the actual dump work
//! off-signal. Any previously installed handler for the same signal is
//! recorded and invoked after ours runs, so this composes with a debugger
//! or runtime that already hooked the signal.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::registry::Registry;
use crate::worker::{delay, ThreadId, Worker};

static DUMP_REQUESTED: AtomicBool = AtomicBool::new(false);
static PREVIOUS_HANDLER: AtomicUsize = AtomicUsize::new(0);

extern "C" fn on_dump_signal(signum: libc::c_int) {
    DUMP_REQUESTED.store(true, Ordering::SeqCst);
    let previous = PREVIOUS_HANDLER.load(Ordering::SeqCst);
    if previous != 0 && previous != libc::SIG_DFL as usize && previous != libc::SIG_IGN as usize {
        let handler: extern "C" fn(libc::c_int) = unsafe { std::mem::transmute(previous) };
        handler(signum);
    }
}

/// Installs the dump-request handler for `signal` (typically
/// `libc::SIGQUIT`), recording whatever handler was previously installed so
/// it still runs.
///
/// # Safety
/// Must be called before any thread depends on the previous handler's
/// behavior for `signal`; this process-wide registration is not undone.
pub fn install_signal_handler(signal: libc::c_int) {
    let previous = unsafe { libc::signal(signal, on_dump_signal as libc::sighandler_t) };
    PREVIOUS_HANDLER.store(previous as usize, Ordering::SeqCst);
}

pub struct DebugThread {
    worker: Worker<()>,
}

impl DebugThread {
    /// Spawns the dedicated thread that polls for a dump request and, when
    /// one arrives, writes every registered worker's last-published status
    /// to `sink`.
    pub fn spawn(registry: Arc<Registry>, sink: impl Fn(&[(ThreadId, crate::registry::ThreadStatus)]) + Send + 'static) -> Self {
        let snapshot_registry = registry.clone();
        let worker = Worker::spawn("cairn-debug", &registry, move |_id, quit| {
            while !quit.should_quit() {
                if DUMP_REQUESTED.swap(false, Ordering::SeqCst) {
                    sink(&snapshot_registry.snapshot());
                }
                delay(50);
            }
        })
        .expect("debug thread is always spawnable");
        DebugThread { worker }
    }

    pub fn stop(self) {
        let _ = self.worker.stop();
    }
}

/// Test and tooling hook: requests a dump without going through a real
/// signal delivery.
pub fn request_dump() {
    DUMP_REQUESTED.store(true, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ThreadStatus;
    use std::sync::Mutex;

    #[test]
    fn debug_thread_dumps_registered_status_on_request() {
        let registry = Arc::new(Registry::new());
        registry.publish(
            ThreadId::next(),
            ThreadStatus {
                thread_name: "worker-1".into(),
                operation: "hashing".into(),
                entries_processed: 3,
            },
        );

        let captured = Arc::new(Mutex::new(Vec::new()));
        let captured_clone = captured.clone();
        let debug_thread = DebugThread::spawn(registry, move |snapshot| {
            *captured_clone.lock().unwrap() = snapshot.to_vec();
        });

        request_dump();
        std::thread::sleep(Duration::from_millis(200));
        debug_thread.stop();

        // The debug thread registers itself too, so look for the status
        // this test published rather than assuming it's the only one.
        let got = captured.lock().unwrap();
        let worker_status = got.iter().find(|(_, status)| status.thread_name == "worker-1");
        assert_eq!(worker_status.map(|(_, status)| status.entries_processed), Some(3));
    }
}
