//! The save and pop state machines.
//!
//! Each session walks a [`HunkList`](crate::diff::HunkList) and, per hunk,
//! decides (from a [`Selection`](crate::selection::Selection) or from the
//! operator) whether it moves between the working file and the stash.

pub mod pop;
pub mod save;

pub use pop::PopReport;
pub use save::SaveReport;

use crate::patch::ApplyError;
use crate::prompt::PromptError;
use crate::scratch::ScratchError;
use crate::store::StoreError;
use error_set::error_set;

error_set! {
    /// Errors that end a save or pop session
    SessionError := {
        StoreError(StoreError),
        ApplyError(ApplyError),
        PromptError(PromptError),
        ScratchError(ScratchError),
    }
}
