//! Background snapshot writer.
//!
//! Learners mutate their state in memory and hand a copy of it to the
//! writer, which encodes and saves it on a dedicated thread. Pending writes
//! are keyed by file, so a burst of updates to one learner collapses into a
//! single write of the latest state.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use serde::Serialize;

use crate::error::{LearningError, Result};
use crate::io::save_json;
use crate::sync::{lock_or_recover, wait_or_recover};

type PendingWrite = Box<dyn FnOnce(&Path) -> Result<()> + Send>;

#[derive(Default)]
struct WriterState {
    pending: BTreeMap<PathBuf, PendingWrite>,
    in_flight: bool,
    stopping: bool,
    stopped: bool,
    written: u64,
}

struct Shared {
    state: Mutex<WriterState>,
    work: Condvar,
    idle: Condvar,
}

/// Coalescing background writer for learner snapshots.
pub struct SnapshotWriter {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SnapshotWriter {
    /// Start the writer thread.
    pub fn start() -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(WriterState::default()),
            work: Condvar::new(),
            idle: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("snapshot-writer".into())
            .spawn(move || run_writer(&worker_shared))
            .map_err(|e| LearningError::WorkerSpawn {
                worker: "snapshot writer",
                source: e,
            })?;
        tracing::debug!("Snapshot writer thread started");

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Queue `value` to be written to `path`, replacing any pending write
    /// for the same path.
    ///
    /// Once the writer has stopped, the value is written on the calling
    /// thread instead.
    pub fn submit<T>(&self, path: PathBuf, value: T)
    where
        T: Serialize + Send + 'static,
    {
        let write: PendingWrite = Box::new(move |target| save_json(&value, target));

        let mut state = lock_or_recover(&self.shared.state);
        if state.stopped {
            drop(state);
            if let Err(error) = write(&path) {
                tracing::warn!(error = %error, "Failed to write snapshot {}", path.display());
            }
            return;
        }
        if state.pending.insert(path, write).is_some() {
            tracing::trace!("Coalesced pending snapshot write");
        }
        drop(state);
        self.shared.work.notify_one();
    }

    /// Block until every queued snapshot has been written.
    pub fn flush(&self) {
        let mut state = lock_or_recover(&self.shared.state);
        while (!state.pending.is_empty() || state.in_flight) && !state.stopped {
            state = wait_or_recover(&self.shared.idle, state);
        }
    }

    /// Number of snapshots waiting to be written.
    pub fn pending(&self) -> usize {
        lock_or_recover(&self.shared.state).pending.len()
    }

    /// Number of snapshot writes attempted so far.
    pub fn written(&self) -> u64 {
        lock_or_recover(&self.shared.state).written
    }

    /// Write everything still queued and join the worker thread.
    pub fn shutdown(&self) {
        lock_or_recover(&self.shared.state).stopping = true;
        self.shared.work.notify_all();

        let handle = lock_or_recover(&self.worker).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("Snapshot writer thread panicked");
            } else {
                tracing::debug!("Snapshot writer thread stopped");
            }
        }
    }
}

impl Drop for SnapshotWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for SnapshotWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock_or_recover(&self.shared.state);
        f.debug_struct("SnapshotWriter")
            .field("pending", &state.pending.len())
            .field("written", &state.written)
            .field("stopped", &state.stopped)
            .finish()
    }
}

/// Marks the writer stopped when the worker exits, even by panic, so that
/// `flush` callers never wait forever.
struct StopGuard<'a>(&'a Shared);

impl Drop for StopGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock_or_recover(&self.0.state);
        state.stopped = true;
        state.in_flight = false;
        drop(state);
        self.0.idle.notify_all();
    }
}

fn run_writer(shared: &Shared) {
    let _guard = StopGuard(shared);
    loop {
        let batch = {
            let mut state = lock_or_recover(&shared.state);
            while state.pending.is_empty() && !state.stopping {
                state = wait_or_recover(&shared.work, state);
            }
            if state.pending.is_empty() {
                return;
            }
            state.in_flight = true;
            std::mem::take(&mut state.pending)
        };

        let count = batch.len() as u64;
        for (path, write) in batch {
            if let Err(error) = write(&path) {
                tracing::warn!(
                    error = %error,
                    "Failed to write snapshot {}",
                    path.display()
                );
            }
        }

        let mut state = lock_or_recover(&shared.state);
        state.in_flight = false;
        state.written += count;
        if state.pending.is_empty() {
            shared.idle.notify_all();
        }
    }
}

/// One learner's snapshot file on a shared writer.
#[derive(Debug, Clone)]
pub struct SnapshotTarget {
    writer: Arc<SnapshotWriter>,
    path: PathBuf,
}

impl SnapshotTarget {
    pub fn new(writer: Arc<SnapshotWriter>, path: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn submit<T>(&self, value: T)
    where
        T: Serialize + Send + 'static,
    {
        self.writer.submit(self.path.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::load_json;
    use tempfile::tempdir;

    #[test]
    fn test_flush_writes_latest_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counter.json");
        let writer = SnapshotWriter::start().unwrap();

        for value in 0..50u32 {
            writer.submit(path.clone(), value);
        }
        writer.flush();

        assert_eq!(writer.pending(), 0);
        let stored: Option<u32> = load_json(&path).unwrap();
        assert_eq!(stored, Some(49));
        assert!(writer.written() >= 1);
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        let writer = SnapshotWriter::start().unwrap();

        writer.submit(first.clone(), "a".to_string());
        writer.submit(second.clone(), "b".to_string());
        writer.shutdown();

        assert_eq!(load_json::<String>(&first).unwrap().as_deref(), Some("a"));
        assert_eq!(load_json::<String>(&second).unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_submit_after_shutdown_writes_inline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("late.json");
        let writer = SnapshotWriter::start().unwrap();
        writer.shutdown();

        writer.submit(path.clone(), 7u8);
        assert_eq!(load_json::<u8>(&path).unwrap(), Some(7));
    }
}
