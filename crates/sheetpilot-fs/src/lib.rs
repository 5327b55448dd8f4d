//! Filesystem helpers for replacing workbook files without exposing partial writes.
//!
//! Every save goes through the same sequence:
//! - serialize into a temp file created in the destination directory (same filesystem)
//! - flush + `sync_all`
//! - rename over the destination with replace semantics
//!
//! A concurrent reader therefore sees either the previous document or the new one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtomicWriteError<E: std::error::Error + 'static> {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("write error: {0}")]
    Writer(#[source] E),
}

/// Directory that will hold the temp file for `path`.
///
/// `Path::parent` returns `Some("")` for bare names like `book.xlsx`; treat that as `.`.
pub fn parent_dir_or_dot(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Atomically replace `dest` with whatever `write_fn` writes into the temp file.
///
/// The destination is left untouched when `write_fn` fails, and the temp file is removed.
pub fn atomic_write<T, E>(
    dest: impl AsRef<Path>,
    write_fn: impl FnOnce(&mut File) -> Result<T, E>,
) -> Result<T, AtomicWriteError<E>>
where
    E: std::error::Error + 'static,
{
    let dest = dest.as_ref();
    let dir = parent_dir_or_dot(dest);
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    let out = write_fn(tmp.as_file_mut()).map_err(AtomicWriteError::Writer)?;

    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;

    // `persist` renames with replace semantics on every platform tempfile supports.
    tmp.persist(dest).map_err(|err| AtomicWriteError::Io(err.error))?;

    // The file is already in place; a failed directory sync is not a failed write.
    let _ = sync_parent_dir(dest);

    Ok(out)
}

/// Atomically write a complete byte buffer to `dest`.
pub fn atomic_write_bytes(dest: impl AsRef<Path>, bytes: &[u8]) -> io::Result<()> {
    atomic_write(dest, |file| file.write_all(bytes)).map_err(|err| match err {
        AtomicWriteError::Io(err) => err,
        AtomicWriteError::Writer(err) => err,
    })
}

fn sync_parent_dir(path: &Path) -> io::Result<()> {
    // Opening a directory as a file works on most Unix platforms; elsewhere this is best-effort.
    let dir = File::open(parent_dir_or_dot(path))?;
    dir.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .expect("read_dir")
            .map(|e| e.expect("dir entry").path())
            .filter(|p| p.is_file())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn replaces_existing_document() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let dest = tmp.path().join("book.xlsx");
        fs::write(&dest, b"old").expect("seed file");

        atomic_write_bytes(&dest, b"new contents").expect("atomic write");

        assert_eq!(fs::read(&dest).expect("read dest"), b"new contents");
        assert_eq!(files_in(tmp.path()), vec![dest]);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let dest = tmp.path().join("uploads").join("user_7").join("book.xlsx");

        atomic_write_bytes(&dest, b"bytes").expect("atomic write");
        assert_eq!(fs::read(&dest).expect("read dest"), b"bytes");
    }

    #[test]
    fn writer_failure_keeps_original_and_cleans_temp_file() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let dest = tmp.path().join("book.xlsx");
        fs::write(&dest, b"sentinel").expect("seed file");

        let err = atomic_write(&dest, |file| {
            file.write_all(b"partial").expect("write partial");
            Err::<(), _>(io::Error::new(io::ErrorKind::Other, "serializer exploded"))
        })
        .expect_err("writer error should propagate");

        assert!(matches!(err, AtomicWriteError::Writer(_)));
        assert_eq!(fs::read(&dest).expect("read dest"), b"sentinel");
        assert_eq!(files_in(tmp.path()), vec![dest]);
    }

    #[test]
    fn bare_file_name_uses_current_directory() {
        assert_eq!(parent_dir_or_dot(Path::new("book.xlsx")), Path::new("."));
        assert_eq!(
            parent_dir_or_dot(Path::new("data/book.xlsx")),
            Path::new("data")
        );
    }
}
