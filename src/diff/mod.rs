pub mod hunk;
pub mod list;

pub use hunk::{Hunk, HunkHeader, LineRange};
pub use list::{HunkList, MAX_LINE, ParseError};

use std::fs::File;
use std::io;
use std::path::Path;

/// Something that can produce a unified diff of a file's uncommitted change.
pub trait DiffTool {
    /// Write the diff of `target` into `out`.
    ///
    /// Returns `Ok(false)` if the tool ran but reported failure.
    fn write_diff(&self, target: &Path, out: &File) -> io::Result<bool>;

    /// Name used in log and error messages.
    fn name(&self) -> String;
}
