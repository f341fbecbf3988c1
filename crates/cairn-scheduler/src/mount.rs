//! Reference-counts mount points shared by concurrent jobs, so a job
//! finishing doesn't unmount a volume another job is still reading.

use std::collections::HashMap;

use parking_lot::Mutex;

#[derive(Default)]
pub struct MountTable {
    counts: Mutex<HashMap<String, usize>>,
}

/// Releases the mount point's reference when dropped.
pub struct MountGuard<'a> {
    table: &'a MountTable,
    path: String,
}

impl Drop for MountGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.path);
    }
}

impl MountTable {
    pub fn new() -> Self {
        MountTable::default()
    }

    /// Acquires a reference on `path`, returning a guard that releases it
    /// on drop. The caller is responsible for actually mounting the volume
    /// the first time its count transitions from zero; `first` tells it
    /// whether that happened.
    pub fn acquire(&self, path: &str) -> (MountGuard<'_>, bool) {
        let mut counts = self.counts.lock();
        let count = counts.entry(path.to_string()).or_insert(0);
        *count += 1;
        let first = *count == 1;
        (
            MountGuard {
                table: self,
                path: path.to_string(),
            },
            first,
        )
    }

    fn release(&self, path: &str) {
        let mut counts = self.counts.lock();
        if let Some(count) = counts.get_mut(path) {
            *count -= 1;
            if *count == 0 {
                counts.remove(path);
            }
        }
    }

    pub fn reference_count(&self, path: &str) -> usize {
        self.counts.lock().get(path).copied().unwrap_or(0)
    }
}
