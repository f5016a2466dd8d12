use super::SessionError;
use super::save::plural;
use crate::diff::HunkList;
use crate::patch::{Direction, HunkApplier, PatchTool};
use crate::prompt::{Operator, PopChoice};
use crate::selection::Selection;
use crate::store::StashStore;

/// What a pop session did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopReport {
    /// Hunks in the stash when the session started
    pub found: usize,
    /// Hunks applied back to the working file and removed from the stash
    pub popped: usize,
    /// Hunks removed from the stash without being applied
    pub dropped: usize,
    /// Hunks left in the stash
    pub remaining: usize,
}

impl PopReport {
    fn modified(&self) -> bool {
        self.popped + self.dropped > 0
    }
}

/// Apply every selected hunk to the working file, then drop them from the
/// stash.
///
/// If any hunk fails to apply, the stash is not rewritten at all.
pub fn run_batch<P: PatchTool>(
    mut hunks: HunkList,
    selection: &Selection,
    store: &StashStore,
    applier: &mut HunkApplier<'_, P>,
) -> Result<PopReport, SessionError> {
    let mut report = PopReport {
        found: hunks.len(),
        ..PopReport::default()
    };

    for hunk in hunks.iter().filter(|h| selection.contains(h.position())) {
        applier.apply(hunk, Direction::Forward)?;
        report.popped += 1;
    }
    hunks.retain(|h| !selection.contains(h.position()));
    report.remaining = hunks.len();

    persist(&hunks, store, &report)?;
    Ok(report)
}

/// Ask the operator about each stashed hunk.
///
/// The cursor is a live index into the shrinking list; the position shown to
/// the operator is the hunk's original place in the stash. Whatever was
/// popped or dropped before a failure is still removed from the stash.
pub fn run_interactive<P: PatchTool, O: Operator>(
    mut hunks: HunkList,
    store: &StashStore,
    applier: &mut HunkApplier<'_, P>,
    operator: &mut O,
) -> Result<PopReport, SessionError> {
    let mut report = PopReport {
        found: hunks.len(),
        ..PopReport::default()
    };

    let outcome = decide_each(&mut hunks, applier, operator, &mut report);
    report.remaining = hunks.len();
    if hunks.is_empty() {
        tracing::info!("no more hunks.");
    }

    persist(&hunks, store, &report)?;
    outcome.map(|()| report)
}

fn decide_each<P: PatchTool, O: Operator>(
    hunks: &mut HunkList,
    applier: &mut HunkApplier<'_, P>,
    operator: &mut O,
    report: &mut PopReport,
) -> Result<(), SessionError> {
    let mut cursor = 0;
    while let Some(hunk) = hunks.get(cursor) {
        match operator.choose::<PopChoice>(hunk)? {
            PopChoice::Pop => {
                applier.apply(hunk, Direction::Forward)?;
                hunks.remove(cursor);
                report.popped += 1;
            }
            PopChoice::Drop => {
                tracing::debug!(hunk = hunk.position().get(), "dropping from stash");
                hunks.remove(cursor);
                report.dropped += 1;
            }
            PopChoice::Skip => {
                cursor += 1;
                continue;
            }
            PopChoice::Quit => break,
        }
        // after a removal, stay in range if the tail was removed
        cursor = cursor.min(hunks.len().saturating_sub(1));
    }
    Ok(())
}

fn persist(hunks: &HunkList, store: &StashStore, report: &PopReport) -> Result<(), SessionError> {
    if !report.modified() {
        tracing::debug!("stash unchanged");
        return Ok(());
    }
    tracing::info!(
        "overwriting {} with {} hunk{}.",
        store.path().display(),
        hunks.len(),
        plural(hunks.len())
    );
    store.backup_existing()?;
    store.rewrite_atomically(hunks.iter().map(|hunk| hunk.as_bytes()))?;
    Ok(())
}
