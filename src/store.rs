//! The persistent `<target>.stash` record.
//!
//! A stash holds raw hunk text, concatenated in order, exactly as the hunk
//! parser would read it back. New hunks always land in front of hunks that
//! were already stashed; surviving hunks never change relative order.
//!
//! Before the store is truncated or replaced, its old content is copied to
//! `<target>.stash~`. Nothing ever reads that file back; it is only an audit
//! trail.

use crate::diff::{HunkList, ParseError};
use error_set::error_set;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Suffix appended to the target file name to locate its stash.
pub const STORE_SUFFIX: &str = ".stash";
/// Appended after [`STORE_SUFFIX`] to name the backup.
pub const BACKUP_MARKER: &str = "~";

error_set! {
    /// Errors from reading or writing a stash store
    StoreError := {
        #[display("could not open stash: {path}: {message}")]
        Open { path: String, message: String },
        #[display("could not read stash: {path}: {message}")]
        Read { path: String, message: String },
        #[display("could not write to: {path}: {message}")]
        Write { path: String, message: String },
        #[display("could not write stash backup: {path}: {message}")]
        Backup { path: String, message: String },
        #[display("could not replace stash: {path}: {message}")]
        Replace { path: String, message: String },
        ParseError(ParseError),
    }
}

/// Location of the stash (and its backup) belonging to one target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StashStore {
    path: PathBuf,
    backup_path: PathBuf,
}

impl StashStore {
    /// The store for `target`: `<target>.stash`, backup `<target>.stash~`.
    pub fn for_target(target: &Path) -> Self {
        let path = with_suffix(target, STORE_SUFFIX);
        let backup_path = with_suffix(&path, BACKUP_MARKER);
        Self { path, backup_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Parse the current content into hunks.
    ///
    /// # Errors
    ///
    /// [`StoreError::Open`] if the store does not exist or cannot be opened.
    pub fn read_hunks(&self) -> Result<HunkList, StoreError> {
        let file = File::open(&self.path).map_err(|e| self.open_error(e))?;
        Ok(HunkList::parse(
            BufReader::new(file),
            &self.path.display().to_string(),
        )?)
    }

    /// Open for read/write, creating an empty store if absent.
    ///
    /// Returns the handle and whether the store already existed.
    pub fn open_for_append_or_create(&self) -> Result<(StoreHandle, bool), StoreError> {
        match OpenOptions::new().read(true).write(true).open(&self.path) {
            Ok(file) => Ok((self.handle(file), true)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "there is no existing stash");
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&self.path)
                    .map_err(|e| self.open_error(e))?;
                Ok((self.handle(file), false))
            }
            Err(e) => Err(self.open_error(e)),
        }
    }

    /// Put `new_hunks` in front of whatever the store already holds.
    ///
    /// Any previous content is backed up first. The store is replaced in a
    /// single rename, so readers see either the old or the new content.
    pub fn prepend<'a, I>(&self, new_hunks: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let previous = self.backup_existing()?.unwrap_or_default();
        let mut chunks: Vec<&[u8]> = Vec::new();
        for hunk in new_hunks {
            chunks.push(hunk);
        }
        chunks.push(&previous);
        self.rewrite_atomically(chunks)
    }

    /// Replace the store with exactly `hunks`, in order.
    ///
    /// Content is staged in a temp file beside the store and renamed over
    /// it; there is no partially written state visible at `path`.
    pub fn rewrite_atomically<'a, I>(&self, hunks: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::Builder::new()
            .prefix(".stash.")
            .tempfile_in(dir)
            .map_err(|e| self.replace_error(e))?;

        let mut count = 0;
        for hunk in hunks {
            staged.write_all(hunk).map_err(|e| self.replace_error(e))?;
            count += 1;
        }
        // the staged file starts out private; keep the store's existing mode
        if let Ok(metadata) = fs::metadata(&self.path) {
            staged
                .as_file()
                .set_permissions(metadata.permissions())
                .map_err(|e| self.replace_error(e))?;
        }
        staged
            .as_file()
            .sync_all()
            .map_err(|e| self.replace_error(e))?;
        staged
            .persist(&self.path)
            .map_err(|e| self.replace_error(e.error))?;

        tracing::debug!(path = %self.path.display(), chunks = count, "stash rewritten");
        Ok(())
    }

    /// Copy the current content to the backup file, if there is a store.
    ///
    /// Returns the content that was backed up.
    pub fn backup_existing(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(content) => {
                write_backup(&self.backup_path, &content)?;
                Ok(Some(content))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read {
                path: self.path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn handle(&self, file: File) -> StoreHandle {
        StoreHandle {
            path: self.path.clone(),
            file,
        }
    }

    fn open_error(&self, e: io::Error) -> StoreError {
        StoreError::Open {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }

    fn replace_error(&self, e: io::Error) -> StoreError {
        StoreError::Replace {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}

/// An open stash, used by interactive save to grow it hunk by hunk.
#[derive(Debug)]
pub struct StoreHandle {
    path: PathBuf,
    file: File,
}

impl StoreHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy the current content into `backup`, then truncate the store.
    ///
    /// Must run before anything is appended in the same session. Returns the
    /// content that was there, for [`StoreHandle::restore_tail`].
    pub fn snapshot_to(&mut self, backup: &Path) -> Result<Vec<u8>, StoreError> {
        let mut previous = Vec::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_end(&mut previous))
            .map_err(|e| StoreError::Read {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        write_backup(backup, &previous)?;

        self.file
            .set_len(0)
            .and_then(|_| self.file.seek(SeekFrom::Start(0)))
            .map_err(|e| self.write_error(e))?;
        tracing::debug!(
            path = %self.path.display(),
            backup = %backup.display(),
            bytes = previous.len(),
            "stash backed up and cleared"
        );
        Ok(previous)
    }

    /// Append one hunk at the end and flush it to disk.
    pub fn append(&mut self, hunk: &[u8]) -> Result<(), StoreError> {
        tracing::trace!(path = %self.path.display(), bytes = hunk.len(), "append");
        self.file
            .seek(SeekFrom::End(0))
            .and_then(|_| self.file.write_all(hunk))
            .and_then(|_| self.file.sync_data())
            .map_err(|e| self.write_error(e))
    }

    /// Put back the content captured by [`StoreHandle::snapshot_to`], after
    /// everything appended since.
    pub fn restore_tail(&mut self, previous: &[u8]) -> Result<(), StoreError> {
        self.append(previous)
    }

    fn write_error(&self, e: io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}

fn write_backup(backup: &Path, content: &[u8]) -> Result<(), StoreError> {
    fs::write(backup, content).map_err(|e| StoreError::Backup {
        path: backup.display().to_string(),
        message: e.to_string(),
    })
}

/// `path` with `suffix` glued onto its final component
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
