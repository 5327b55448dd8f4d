//! Per-path exclusive locks for the load → mutate → save cycle.
//!
//! Each normalized document path maps to its own mutex, so edits of one file are serialized
//! while edits of different files never contend. Acquisition waits up to a timeout instead of
//! failing immediately; a queued edit should not be dropped just because another one is in
//! flight.
//!
//! The in-process mutex only orders threads sharing one [`LockTable`]. Holding it, the lease
//! then takes an OS advisory lock on a sidecar file next to the document
//! (`.<file name>.sheetpilot-lock`), which also excludes other stores and other processes.
//! The document itself cannot carry the lock because every save renames a new file over it.
//! Sidecar files are left in place after release.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fs2::FileExt;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

use crate::error::{Result, StoreError};

type Slot = Arc<Mutex<()>>;

/// Pause between attempts on a sidecar lock held elsewhere.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
pub(crate) struct LockTable {
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

/// Scoped ownership of one document path. The lock is released on drop, on every exit path.
pub struct PathLease {
    table: Arc<LockTable>,
    path: PathBuf,
    // Released before `guard`.
    file: Option<File>,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl std::fmt::Debug for PathLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathLease").field("path", &self.path).finish()
    }
}

impl PathLease {
    /// The normalized path this lease covers.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PathLease {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(err) = FileExt::unlock(&file) {
                log::debug!("unlock sidecar for {}: {err}", self.path.display());
            }
        }
        let mut slots = self.table.slots.lock();
        self.guard.take();
        // Only the table still references the slot: nobody holds or waits for it.
        if slots
            .get(&self.path)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.path);
        }
    }
}

/// Key under which a document path is locked.
///
/// Existing files are canonicalized so `./a.xlsx` and `dir/../a.xlsx` share a lock; paths
/// that do not exist yet fall back to their absolute form.
pub(crate) fn lock_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Sidecar file that carries the cross-process lock for the document at `key`.
pub(crate) fn sidecar_path(key: &Path) -> PathBuf {
    let name = key
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!(".{name}.sheetpilot-lock");
    match key.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Poll the sidecar's exclusive lock until it is granted or `deadline` passes.
fn lock_sidecar(key: &Path, deadline: Instant) -> Result<Option<File>> {
    let sidecar = sidecar_path(key);
    if let Some(parent) = sidecar.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&sidecar)?;

    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(Some(file)),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                std::thread::sleep(POLL_INTERVAL.min(deadline - now));
            }
            Err(err) => return Err(err.into()),
        }
    }
}

impl LockTable {
    pub(crate) fn acquire(self: &Arc<Self>, path: &Path, timeout: Duration) -> Result<PathLease> {
        let deadline = Instant::now() + timeout;
        let key = lock_key(path);
        let slot = {
            let mut slots = self.slots.lock();
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let guard = slot.try_lock_arc_for(timeout);
        drop(slot);

        // Dropping a lease that holds neither lock still prunes the slot.
        let mut lease = PathLease {
            table: Arc::clone(self),
            path: key,
            file: None,
            guard,
        };
        if lease.guard.is_some() {
            lease.file = lock_sidecar(&lease.path, deadline)?;
        }

        if lease.file.is_some() {
            return Ok(lease);
        }
        log::warn!(
            "lock wait for {} expired after {timeout:?}",
            lease.path.display()
        );
        Err(StoreError::LockTimeout {
            path: lease.path.clone(),
            waited: timeout,
        })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn same_path_waits_then_times_out() {
        let table = Arc::new(LockTable::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");

        let _held = table.acquire(&path, Duration::from_millis(50)).unwrap();
        let started = Instant::now();
        let err = table
            .acquire(&path, Duration::from_millis(100))
            .unwrap_err();

        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(matches!(err, StoreError::LockTimeout { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn different_paths_do_not_contend() {
        let table = Arc::new(LockTable::default());
        let dir = tempfile::tempdir().unwrap();

        let _a = table
            .acquire(&dir.path().join("a.xlsx"), Duration::from_millis(10))
            .unwrap();
        let _b = table
            .acquire(&dir.path().join("b.xlsx"), Duration::from_millis(10))
            .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn waiter_acquires_after_release() {
        let table = Arc::new(LockTable::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");

        let held = table.acquire(&path, Duration::from_secs(1)).unwrap();
        let (tx, rx) = mpsc::channel();
        let waiter = {
            let table = Arc::clone(&table);
            let path = path.clone();
            thread::spawn(move || {
                tx.send(()).unwrap();
                table.acquire(&path, Duration::from_secs(5)).map(|_| ())
            })
        };

        rx.recv().unwrap();
        thread::sleep(Duration::from_millis(50));
        drop(held);
        waiter.join().unwrap().unwrap();
    }

    #[test]
    fn released_slots_are_pruned() {
        let table = Arc::new(LockTable::default());
        let dir = tempfile::tempdir().unwrap();

        let lease = table
            .acquire(&dir.path().join("a.xlsx"), Duration::from_millis(10))
            .unwrap();
        assert_eq!(table.len(), 1);
        drop(lease);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn separate_tables_exclude_each_other() {
        let first = Arc::new(LockTable::default());
        let second = Arc::new(LockTable::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");

        let held = first.acquire(&path, Duration::from_millis(50)).unwrap();
        let err = second
            .acquire(&path, Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, StoreError::LockTimeout { .. }));
        assert_eq!(second.len(), 0);

        drop(held);
        second.acquire(&path, Duration::from_millis(100)).unwrap();
    }

    #[test]
    fn sidecar_held_by_another_handle_blocks() {
        let table = Arc::new(LockTable::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        let sidecar = sidecar_path(&lock_key(&path));
        assert_eq!(
            sidecar.file_name().unwrap().to_str(),
            Some(".book.xlsx.sheetpilot-lock")
        );

        let other = File::create(&sidecar).unwrap();
        other.lock_exclusive().unwrap();
        assert!(table.acquire(&path, Duration::from_millis(50)).is_err());

        FileExt::unlock(&other).unwrap();
        let lease = table.acquire(&path, Duration::from_millis(50)).unwrap();
        assert!(other.try_lock_exclusive().is_err());
        drop(lease);
        other.try_lock_exclusive().unwrap();
    }

    #[test]
    fn equivalent_spellings_share_a_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        std::fs::write(&path, b"x").unwrap();
        let dotted = dir.path().join(".").join("book.xlsx");
        assert_eq!(lock_key(&path), lock_key(&dotted));
    }
}
