use error_set::error_set;
use std::path::{Path, PathBuf};

pub mod config;
pub mod diff;
pub mod patch;
pub mod prompt;
pub mod scratch;
pub mod selection;
pub mod session;
pub mod store;
pub mod tools;

pub use config::{Settings, Verbosity};
pub use diff::{DiffTool, Hunk, HunkList, ParseError};
pub use patch::{ApplyError, PatchTool};
pub use prompt::{Operator, Prompt, PromptError};
pub use scratch::ScratchError;
pub use selection::{Selection, SelectionError};
pub use session::{PopReport, SaveReport, SessionError};
pub use store::{StashStore, StoreError};
pub use tools::CommandLine;

use patch::HunkApplier;
use scratch::ScratchDir;

error_set! {
    /// Top-level error for stash operations
    StashError := {
        #[display("could not resolve {path}: {message}")]
        Path { path: String, message: String },
        SelectionError(SelectionError),
        ParseError(ParseError),
        ScratchError(ScratchError),
        StoreError(StoreError),
        SessionError(SessionError),
    } || ToolError

    /// Errors from configuring or running the external tools
    ToolError := {
        #[display("{flag}: empty command")]
        EmptyCommand { flag: String },
        #[display("could not write output: {message}")]
        Output { message: String },
        #[display("could not run {tool}: {message}")]
        DiffFailed { tool: String, message: String },
        #[display("could not diff: {target}")]
        DiffExit { target: String },
    }
}

/// Moves hunks between a file and its stash.
///
/// Generic over the diff and patch tools so sessions can be driven without
/// spawning anything.
pub struct Stasher<D, P> {
    settings: Settings,
    diff: D,
    patch: P,
}

impl<D: DiffTool, P: PatchTool> Stasher<D, P> {
    pub fn new(settings: Settings, diff: D, patch: P) -> Self {
        Self {
            settings,
            diff,
            patch,
        }
    }

    /// Move uncommitted hunks of `target` into its stash.
    ///
    /// With a selection, the named hunks are stashed without asking. Without
    /// one, `operator` decides for every hunk.
    ///
    /// # Examples
    /// ```no_run
    /// # use hunk_stash::{Prompt, Selection, Settings, Stasher, Verbosity};
    /// # use hunk_stash::tools::{ExternalDiff, ExternalPatch};
    /// # use std::path::Path;
    /// let stasher = Stasher::new(
    ///     Settings::from_env(Verbosity::Info),
    ///     ExternalDiff::default(),
    ///     ExternalPatch::default(),
    /// );
    /// let mut prompt = Prompt::new(std::io::stdin().lock(), std::io::stdout());
    /// let selection = Selection::parse("1,3").unwrap();
    /// stasher.save(Path::new("src/main.c"), Some(&selection), &mut prompt).unwrap();
    /// ```
    pub fn save<O: Operator>(
        &self,
        target: &Path,
        selection: Option<&Selection>,
        operator: &mut O,
    ) -> Result<SaveReport, StashError> {
        let target = resolve(target)?;
        let store = StashStore::for_target(&target);
        let scratch = ScratchDir::create(&self.settings.scratch_dir)?;

        let hunks = self.current_hunks(&target, &scratch)?;
        if hunks.is_empty() {
            tracing::info!("no changes in {}", target.display());
            return Ok(SaveReport::default());
        }
        tracing::info!("found {} hunk{}", hunks.len(), session::save::plural(hunks.len()));

        let mut applier = HunkApplier::new(&self.patch, &target, &scratch, self.settings.verbosity)?;
        let report = match selection {
            Some(selection) => session::save::run_batch(&hunks, selection, &store, &mut applier)?,
            None => session::save::run_interactive(&hunks, &store, &mut applier, operator)?,
        };
        Ok(report)
    }

    /// Move stashed hunks of `target` back into the file.
    ///
    /// # Examples
    /// ```no_run
    /// # use hunk_stash::{Prompt, Selection, Settings, Stasher, Verbosity};
    /// # use hunk_stash::tools::{ExternalDiff, ExternalPatch};
    /// # use std::path::Path;
    /// let stasher = Stasher::new(
    ///     Settings::from_env(Verbosity::Info),
    ///     ExternalDiff::default(),
    ///     ExternalPatch::default(),
    /// );
    /// let mut prompt = Prompt::new(std::io::stdin().lock(), std::io::stdout());
    /// stasher.pop(Path::new("src/main.c"), Some(&Selection::All), &mut prompt).unwrap();
    /// ```
    pub fn pop<O: Operator>(
        &self,
        target: &Path,
        selection: Option<&Selection>,
        operator: &mut O,
    ) -> Result<PopReport, StashError> {
        let target = resolve(target)?;
        let store = StashStore::for_target(&target);

        let hunks = store.read_hunks()?;
        if hunks.is_empty() {
            tracing::info!("no hunks!");
            return Ok(PopReport::default());
        }
        tracing::info!(
            "found {} stashed hunk{}",
            hunks.len(),
            session::save::plural(hunks.len())
        );

        let scratch = ScratchDir::create(&self.settings.scratch_dir)?;
        let mut applier = HunkApplier::new(&self.patch, &target, &scratch, self.settings.verbosity)?;
        let report = match selection {
            Some(selection) => session::pop::run_batch(hunks, selection, &store, &mut applier)?,
            None => session::pop::run_interactive(hunks, &store, &mut applier, operator)?,
        };
        Ok(report)
    }

    /// The hunks currently stashed for `target`; empty if there is no stash.
    pub fn list(&self, target: &Path) -> Result<HunkList, StashError> {
        let store = StashStore::for_target(&resolve(target)?);
        if !store.exists() {
            tracing::debug!(path = %store.path().display(), "no stash");
            return Ok(HunkList::default());
        }
        Ok(store.read_hunks()?)
    }

    /// Run the diff tool into a scratch file and split its output into hunks.
    fn current_hunks(&self, target: &Path, scratch: &ScratchDir) -> Result<HunkList, StashError> {
        let mut diff_file = scratch.file("diff")?;
        let succeeded = self
            .diff
            .write_diff(target, diff_file.as_file())
            .map_err(|e| ToolError::DiffFailed {
                tool: self.diff.name(),
                message: e.to_string(),
            })?;
        if !succeeded {
            return Err(ToolError::DiffExit {
                target: target.display().to_string(),
            }
            .into());
        }

        let content = diff_file.read_all()?;
        tracing::debug!(bytes = content.len(), "diff captured");
        Ok(HunkList::parse(
            content.as_slice(),
            &diff_file.path().display().to_string(),
        )?)
    }
}

fn resolve(target: &Path) -> Result<PathBuf, StashError> {
    std::path::absolute(target).map_err(|e| StashError::Path {
        path: target.display().to_string(),
        message: e.to_string(),
    })
}
