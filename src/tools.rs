//! Command-backed diff and patch tools.

use crate::diff::DiffTool;
use crate::patch::{Direction, PatchTool};
use std::fs::File;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// Default diff generator.
pub const DEFAULT_DIFF_COMMAND: &str = "git diff --no-ext-diff --no-color";
/// Default patch applier.
pub const DEFAULT_PATCH_COMMAND: &str = "patch";

/// A program plus leading arguments, split from a command line on whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Returns `None` for a blank command line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs `<command> <target>` with stdout captured to the diff file.
///
/// The command runs from the target's directory so repository-aware tools
/// (`git diff`, `svn diff`) find their working copy.
#[derive(Debug, Clone)]
pub struct ExternalDiff {
    command: CommandLine,
}

impl ExternalDiff {
    pub fn new(command: CommandLine) -> Self {
        Self { command }
    }
}

impl Default for ExternalDiff {
    fn default() -> Self {
        Self::new(CommandLine {
            program: "git".to_string(),
            args: ["diff", "--no-ext-diff", "--no-color"]
                .map(str::to_string)
                .to_vec(),
        })
    }
}

impl DiffTool for ExternalDiff {
    fn write_diff(&self, target: &Path, out: &File) -> io::Result<bool> {
        let mut command = self.command.command();
        if let Some(dir) = target.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }
        command
            .arg(target)
            .stdin(Stdio::null())
            .stdout(out.try_clone()?)
            .stderr(Stdio::inherit());
        tracing::debug!(command = %self.command, target = %target.display(), "running diff");

        let status = command.status()?;
        tracing::debug!(%status, "diff finished");
        Ok(status.success())
    }

    fn name(&self) -> String {
        self.command.to_string()
    }
}

/// Runs `<command> [-R] -i <hunk file> <target>`, all output to diagnostics.
#[derive(Debug, Clone)]
pub struct ExternalPatch {
    command: CommandLine,
}

impl ExternalPatch {
    pub fn new(command: CommandLine) -> Self {
        Self { command }
    }
}

impl Default for ExternalPatch {
    fn default() -> Self {
        Self::new(CommandLine {
            program: DEFAULT_PATCH_COMMAND.to_string(),
            args: Vec::new(),
        })
    }
}

impl PatchTool for ExternalPatch {
    fn apply(
        &self,
        target: &Path,
        hunk_file: &Path,
        direction: Direction,
        diagnostics: File,
    ) -> io::Result<bool> {
        let mut command = self.command.command();
        if direction == Direction::Reverse {
            command.arg("-R");
        }
        command
            .arg("-i")
            .arg(hunk_file)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(diagnostics.try_clone()?)
            .stderr(diagnostics);
        tracing::debug!(command = ?command, "running patch");

        let status = command.status()?;
        tracing::debug!(%status, "exit code");
        Ok(status.success())
    }

    fn name(&self) -> String {
        self.command.to_string()
    }
}
