use crate::config::Verbosity;
use crate::diff::Hunk;
use crate::scratch::{ScratchDir, ScratchError, ScratchFile};
use error_set::error_set;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

error_set! {
    /// Errors from applying a single hunk to the working file
    ApplyError := {
        #[display("could not run {tool}: {message}")]
        Spawn { tool: String, message: String },
        #[display("could not patch: {target}\n{diagnostics}")]
        Rejected { target: String, diagnostics: String },
        ScratchError(ScratchError),
    }
}

/// Which way to apply a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Apply the change as it was generated (pop)
    Forward,
    /// Undo the change (save, drop)
    Reverse,
}

/// Something that applies a hunk file to a target file in place.
pub trait PatchTool {
    /// Apply the hunk stored at `hunk_file` to `target`.
    ///
    /// Anything the tool prints goes to `diagnostics`. Returns `Ok(false)` if
    /// the tool ran but rejected the hunk.
    fn apply(
        &self,
        target: &Path,
        hunk_file: &Path,
        direction: Direction,
        diagnostics: File,
    ) -> io::Result<bool>;

    /// Name used in log and error messages.
    fn name(&self) -> String;
}

/// Applies hunks one at a time to one target file.
///
/// Owns two scratch files for the whole session: the staged hunk (rewritten
/// for every hunk) and the captured tool output. Both disappear with the
/// applier.
pub struct HunkApplier<'a, P: PatchTool> {
    tool: &'a P,
    target: PathBuf,
    hunk_file: ScratchFile,
    errors: ScratchFile,
    verbosity: Verbosity,
}

impl<'a, P: PatchTool> HunkApplier<'a, P> {
    pub fn new(
        tool: &'a P,
        target: &Path,
        scratch: &ScratchDir,
        verbosity: Verbosity,
    ) -> Result<Self, ScratchError> {
        Ok(Self {
            tool,
            target: target.to_path_buf(),
            hunk_file: scratch.file("hunk")?,
            errors: scratch.file("errors")?,
            verbosity,
        })
    }

    /// Stage `hunk` and run the patch tool on it.
    ///
    /// # Errors
    ///
    /// [`ApplyError::Rejected`] carries whatever the tool printed when it
    /// exits nonzero. On success that output is only logged when the
    /// verbosity is above info.
    pub fn apply(&mut self, hunk: &Hunk, direction: Direction) -> Result<(), ApplyError> {
        self.hunk_file.overwrite(hunk.as_bytes())?;
        self.errors.clear()?;

        tracing::info!(
            target_file = %self.target.display(),
            hunk = hunk.position().get(),
            ?direction,
            "patching"
        );
        tracing::debug!(
            tool = %self.tool.name(),
            hunk_file = %self.hunk_file.path().display(),
            errors = %self.errors.path().display(),
            "running patch tool"
        );

        let succeeded = self
            .tool
            .apply(
                &self.target,
                self.hunk_file.path(),
                direction,
                self.errors.try_clone_handle()?,
            )
            .map_err(|e| ApplyError::Spawn {
                tool: self.tool.name(),
                message: e.to_string(),
            })?;

        let diagnostics = String::from_utf8_lossy(&self.errors.read_all()?).into_owned();

        if !succeeded {
            tracing::warn!("patch returned an error");
            return Err(ApplyError::Rejected {
                target: self.target.display().to_string(),
                diagnostics,
            });
        }

        if self.verbosity.shows_tool_output() && !diagnostics.trim().is_empty() {
            tracing::info!("{}", diagnostics.trim_end());
        }
        tracing::info!(target_file = %self.target.display(), "patched");
        Ok(())
    }
}
