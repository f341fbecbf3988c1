//! A fixed-size pool of worker threads pulling jobs from one shared queue.
//! Each worker owns whatever job it dequeues for that job's lifetime; it
//! never reaches into another worker's in-flight job, so a slow job only
//! ever stalls the worker that picked it up.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::registry::Registry;
use crate::worker::{number_of_cores, yield_now, Error, Worker};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queue {
    jobs: Mutex<VecDeque<Job>>,
    condvar: Condvar,
}

/// How long a worker blocks on the queue's condition variable between
/// cooperative quit checks.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct WorkerPool {
    queue: Arc<Queue>,
    workers: Vec<Worker<()>>,
}

impl WorkerPool {
    /// Spawns a pool of `size` workers, named `"{name}-0"`, `"{name}-1"`,
    /// and so on. `size` of `None` defaults to [`number_of_cores`], the
    /// override point for a `max-threads` setting.
    pub fn new(name: &str, size: Option<usize>, registry: &Arc<Registry>) -> Result<Self, Error> {
        let size = size.unwrap_or_else(number_of_cores).max(1);
        let queue = Arc::new(Queue {
            jobs: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let worker_queue = queue.clone();
            let worker = Worker::spawn(format!("{name}-{index}"), registry, move |_id, quit| {
                run_worker(&worker_queue, &quit);
            })?;
            workers.push(worker);
        }

        Ok(WorkerPool { queue, workers })
    }

    /// Number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queues `job` for whichever worker is next free.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        self.queue.jobs.lock().push_back(Box::new(job));
        self.queue.condvar.notify_one();
    }

    /// Requests quit on every worker and blocks until the queue has
    /// drained and all of them have exited. Jobs still pending when this
    /// is called do not run.
    pub fn join(self) -> Result<(), Error> {
        for worker in &self.workers {
            worker.request_quit();
        }
        self.queue.condvar.notify_all();
        let mut first_error = None;
        for worker in self.workers {
            if let Err(e) = worker.stop() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn run_worker(queue: &Queue, quit: &crate::worker::QuitFlag) {
    loop {
        if quit.should_quit() {
            return;
        }
        let job = queue.jobs.lock().pop_front();
        match job {
            Some(job) => job(),
            None => {
                yield_now();
                let mut jobs = queue.jobs.lock();
                if jobs.is_empty() && !quit.should_quit() {
                    queue.condvar.wait_for(&mut jobs, POLL_INTERVAL);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn runs_every_submitted_job() {
        let registry = Arc::new(Registry::new());
        let pool = WorkerPool::new("cairn-pool-test", Some(2), &registry).unwrap();
        let counter = Arc::new(AtomicU32::new(0));

        for _ in 0..20 {
            let counter = counter.clone();
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        // Give the workers a moment to drain the queue before shutdown;
        // `join` stops the workers rather than waiting for the queue to
        // empty, so a tight race here would undercount.
        std::thread::sleep(Duration::from_millis(200));
        pool.join().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn default_size_matches_number_of_cores() {
        let registry = Arc::new(Registry::new());
        let pool = WorkerPool::new("cairn-pool-default", None, &registry).unwrap();
        assert_eq!(pool.size(), number_of_cores().max(1));
        pool.join().unwrap();
    }

    #[test]
    fn size_floors_at_one_worker() {
        let registry = Arc::new(Registry::new());
        let pool = WorkerPool::new("cairn-pool-zero", Some(0), &registry).unwrap();
        assert_eq!(pool.size(), 1);
        pool.join().unwrap();
    }
}
