//! Named OS worker threads, per-thread diagnostic status, and a
//! channel-polled stack-dump facility.

pub mod diagnostics;
pub mod pool;
pub mod registry;
pub mod worker;

pub use diagnostics::{install_signal_handler, request_dump, DebugThread};
pub use pool::WorkerPool;
pub use registry::{Registry, ThreadStatus};
pub use worker::{delay, number_of_cores, yield_now, Error, QuitFlag, ThreadId, Worker};
