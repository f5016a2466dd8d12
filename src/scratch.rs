use error_set::error_set;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

error_set! {
    /// Errors from creating or writing scratch files
    ScratchError := {
        #[display("could not make tmpdir: {path}: {message}")]
        CreateDir { path: String, message: String },
        #[display("could not create temp file [{label}] in {path}: {message}")]
        Create { label: String, path: String, message: String },
        #[display("could not write to temp file [{label}] {path}: {message}")]
        Write { label: String, path: String, message: String },
        #[display("could not read temp file [{label}] {path}: {message}")]
        Read { label: String, path: String, message: String },
    }
}

/// Directory holding one operation's scratch files.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Use `path`, creating it (and parents) if needed.
    pub fn create(path: &Path) -> Result<Self, ScratchError> {
        fs::create_dir_all(path).map_err(|e| ScratchError::CreateDir {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(tmpdir = %path.display(), "scratch directory ready");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh `stash.XXXXXX.txt` file, unlinked when dropped.
    pub fn file(&self, label: &str) -> Result<ScratchFile, ScratchError> {
        let file = tempfile::Builder::new()
            .prefix("stash.")
            .suffix(".txt")
            .tempfile_in(&self.path)
            .map_err(|e| ScratchError::Create {
                label: label.to_string(),
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!(label, path = %file.path().display(), "temp file");
        Ok(ScratchFile {
            label: label.to_string(),
            file,
        })
    }
}

/// A short-lived working file: staged hunks, captured tool output, diffs.
///
/// The file is removed when this value is dropped, on success and error
/// paths alike.
#[derive(Debug)]
pub struct ScratchFile {
    label: String,
    file: NamedTempFile,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn as_file(&self) -> &File {
        self.file.as_file()
    }

    /// Replace the whole content with `bytes` and flush.
    pub fn overwrite(&mut self, bytes: &[u8]) -> Result<(), ScratchError> {
        tracing::trace!(label = %self.label, len = bytes.len(), "overwriting temp file");
        let result = write_from_start(self.file.as_file_mut(), bytes);
        result.map_err(|e| self.write_error(e))
    }

    /// Truncate to empty.
    pub fn clear(&mut self) -> Result<(), ScratchError> {
        self.overwrite(&[])
    }

    /// A second handle on the same file, for handing to a child process.
    pub fn try_clone_handle(&self) -> Result<File, ScratchError> {
        self.file.as_file().try_clone().map_err(|e| self.write_error(e))
    }

    /// The whole content, read from the start.
    pub fn read_all(&mut self) -> Result<Vec<u8>, ScratchError> {
        let mut content = Vec::new();
        let result = read_from_start(self.file.as_file_mut(), &mut content);
        result.map_err(|e| ScratchError::Read {
            label: self.label.clone(),
            path: self.file.path().display().to_string(),
            message: e.to_string(),
        })?;
        Ok(content)
    }

    fn write_error(&self, e: io::Error) -> ScratchError {
        ScratchError::Write {
            label: self.label.clone(),
            path: self.file.path().display().to_string(),
            message: e.to_string(),
        }
    }
}

fn write_from_start(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.set_len(0)?;
    file.write_all(bytes)?;
    file.flush()
}

fn read_from_start(file: &mut File, content: &mut Vec<u8>) -> io::Result<usize> {
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(content)
}
