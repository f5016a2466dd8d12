use super::SessionError;
use crate::diff::{Hunk, HunkList};
use crate::patch::{Direction, HunkApplier, PatchTool};
use crate::prompt::{Operator, SaveChoice};
use crate::selection::Selection;
use crate::store::{StashStore, StoreHandle};

/// What a save session did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Hunks in the fresh diff
    pub found: usize,
    /// Hunks added to the stash and reversed out of the working file
    pub saved: usize,
    /// Hunks reversed out of the working file without being kept
    pub dropped: usize,
}

/// Stash every hunk the selection names, in diff order.
///
/// The selected hunks are written in front of the existing stash in one
/// atomic rewrite, then reversed out of the working file one by one. A
/// reverse failure stops the session; hunks already stashed stay stashed.
pub fn run_batch<P: PatchTool>(
    hunks: &HunkList,
    selection: &Selection,
    store: &StashStore,
    applier: &mut HunkApplier<'_, P>,
) -> Result<SaveReport, SessionError> {
    let mut report = SaveReport {
        found: hunks.len(),
        ..SaveReport::default()
    };

    let selected: Vec<&Hunk> = hunks
        .iter()
        .filter(|hunk| selection.contains(hunk.position()))
        .collect();
    if selected.is_empty() {
        tracing::info!("no hunks matched the selection");
        return Ok(report);
    }

    store.prepend(selected.iter().map(|hunk| hunk.as_bytes()))?;
    tracing::debug!(count = selected.len(), path = %store.path().display(), "stashed");

    for hunk in selected {
        applier.apply(hunk, Direction::Reverse)?;
        report.saved += 1;
    }
    Ok(report)
}

/// Ask the operator about each hunk in turn.
///
/// An existing stash is copied to the backup and emptied before the first
/// decision; each saved hunk is appended (and flushed) as soon as it is
/// chosen, and the old content is put back after the new hunks once the loop
/// ends, whether it ended cleanly or not.
pub fn run_interactive<P: PatchTool, O: Operator>(
    hunks: &HunkList,
    store: &StashStore,
    applier: &mut HunkApplier<'_, P>,
    operator: &mut O,
) -> Result<SaveReport, SessionError> {
    let (mut handle, existed) = store.open_for_append_or_create()?;
    let previous = if existed {
        Some(handle.snapshot_to(store.backup_path())?)
    } else {
        None
    };

    let mut report = SaveReport {
        found: hunks.len(),
        ..SaveReport::default()
    };
    let outcome = decide_each(hunks, &mut handle, applier, operator, &mut report);

    if let Some(previous) = previous {
        handle.restore_tail(&previous)?;
    }

    tracing::info!(
        "saved {} hunk{} to {}",
        report.saved,
        plural(report.saved),
        handle.path().display()
    );
    outcome.map(|()| report)
}

fn decide_each<P: PatchTool, O: Operator>(
    hunks: &HunkList,
    handle: &mut StoreHandle,
    applier: &mut HunkApplier<'_, P>,
    operator: &mut O,
    report: &mut SaveReport,
) -> Result<(), SessionError> {
    let mut cursor = 0;
    while let Some(hunk) = hunks.get(cursor) {
        match operator.choose::<SaveChoice>(hunk)? {
            SaveChoice::Save => {
                handle.append(hunk.as_bytes())?;
                applier.apply(hunk, Direction::Reverse)?;
                report.saved += 1;
                cursor += 1;
            }
            SaveChoice::Drop => {
                applier.apply(hunk, Direction::Reverse)?;
                report.dropped += 1;
                cursor += 1;
            }
            SaveChoice::Skip => cursor += 1,
            SaveChoice::Quit => break,
        }
    }
    Ok(())
}

pub(crate) fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Verbosity;
    use crate::patch::ApplyError;
    use crate::patch::fake::RecordingPatch;
    use crate::prompt::Prompt;
    use crate::scratch::ScratchDir;
    use similar_asserts::assert_eq;
    use std::fs;
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::TempDir;

    const A: &str = "@@ -1 +1 @@\n-a\n+A\n";
    const B: &str = "@@ -5 +5 @@\n-b\n+B\n";
    const C: &str = "@@ -9 +9 @@\n-c\n+C\n";
    const D: &str = "@@ -13 +13 @@\n-d\n+D\n";
    const E: &str = "@@ -17 +17 @@\n-e\n+E\n";

    struct Setup {
        dir: TempDir,
        store: StashStore,
        scratch: ScratchDir,
    }

    impl Setup {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = StashStore::for_target(&dir.path().join("notes.txt"));
            let scratch = ScratchDir::create(&dir.path().join("tmp")).unwrap();
            Self {
                dir,
                store,
                scratch,
            }
        }

        fn with_stash(self, content: &str) -> Self {
            fs::write(self.store.path(), content).unwrap();
            self
        }

        fn applier<'a>(&self, tool: &'a RecordingPatch) -> HunkApplier<'a, RecordingPatch> {
            HunkApplier::new(tool, Path::new("notes.txt"), &self.scratch, Verbosity::Info)
                .unwrap()
        }

        fn stash(&self) -> String {
            fs::read_to_string(self.store.path()).unwrap()
        }

        fn scratch_is_empty(&self) -> bool {
            fs::read_dir(self.dir.path().join("tmp")).unwrap().count() == 0
        }
    }

    fn diff(hunks: &[&str]) -> HunkList {
        HunkList::parse_bytes(hunks.concat().as_bytes()).unwrap()
    }

    fn operator(keys: &str) -> Prompt<Cursor<Vec<u8>>, Vec<u8>> {
        Prompt::new(Cursor::new(keys.as_bytes().to_vec()), Vec::new())
    }

    fn applied(tool: &RecordingPatch) -> Vec<String> {
        tool.calls()
            .into_iter()
            .map(|call| {
                assert_eq!(call.direction, Direction::Reverse);
                String::from_utf8(call.hunk).unwrap()
            })
            .collect()
    }

    #[test]
    fn batch_puts_new_hunks_before_old() {
        let setup = Setup::new().with_stash(&[A, B].concat());
        let tool = RecordingPatch::default();
        let hunks = diff(&[C, D]);

        let report = run_batch(
            &hunks,
            &Selection::All,
            &setup.store,
            &mut setup.applier(&tool),
        )
        .unwrap();

        assert_eq!(setup.stash(), [C, D, A, B].concat());
        assert_eq!(report.saved, 2);
        assert_eq!(applied(&tool), vec![C.to_string(), D.to_string()]);
    }

    #[test]
    fn batch_leaves_unselected_hunks_alone() {
        let setup = Setup::new();
        let tool = RecordingPatch::default();
        let hunks = diff(&[A, B, C]);

        let report = run_batch(
            &hunks,
            &Selection::parse("1,3").unwrap(),
            &setup.store,
            &mut setup.applier(&tool),
        )
        .unwrap();

        assert_eq!(setup.stash(), [A, C].concat());
        assert_eq!(applied(&tool), vec![A.to_string(), C.to_string()]);
        assert_eq!(
            report,
            SaveReport {
                found: 3,
                saved: 2,
                dropped: 0
            }
        );
    }

    #[test]
    fn batch_order_follows_diff_not_selection() {
        let setup = Setup::new();
        let tool = RecordingPatch::default();

        run_batch(
            &diff(&[A, B, C]),
            &Selection::parse("3,1").unwrap(),
            &setup.store,
            &mut setup.applier(&tool),
        )
        .unwrap();

        assert_eq!(setup.stash(), [A, C].concat());
    }

    #[test]
    fn batch_with_no_match_touches_nothing() {
        let setup = Setup::new();
        let tool = RecordingPatch::default();

        let report = run_batch(
            &diff(&[A]),
            &Selection::parse("4").unwrap(),
            &setup.store,
            &mut setup.applier(&tool),
        )
        .unwrap();

        assert_eq!(report.saved, 0);
        assert!(!setup.store.exists());
        assert!(tool.calls().is_empty());
    }

    #[test]
    fn batch_reverse_failure_keeps_stashed_hunks() {
        let setup = Setup::new();
        let tool = RecordingPatch::failing_on(2);

        let result = run_batch(
            &diff(&[A, B, C]),
            &Selection::All,
            &setup.store,
            &mut setup.applier(&tool),
        );

        assert!(matches!(
            result,
            Err(SessionError::ApplyError(ApplyError::Rejected { .. }))
        ));
        assert_eq!(setup.stash(), [A, B, C].concat());
        assert_eq!(tool.calls().len(), 2);
    }

    #[test]
    fn interactive_save_drop_skip() {
        let setup = Setup::new();
        let tool = RecordingPatch::default();
        let mut operator = operator("s\nd\nk\ns\n");

        let report = run_interactive(
            &diff(&[A, B, C, D]),
            &setup.store,
            &mut setup.applier(&tool),
            &mut operator,
        )
        .unwrap();

        assert_eq!(setup.stash(), [A, D].concat());
        assert_eq!(
            applied(&tool),
            vec![A.to_string(), B.to_string(), D.to_string()]
        );
        assert_eq!(
            report,
            SaveReport {
                found: 4,
                saved: 2,
                dropped: 1
            }
        );
        assert!(!setup.store.backup_path().exists());
    }

    #[test]
    fn interactive_new_hunks_precede_old_and_backup_is_taken() {
        let setup = Setup::new().with_stash(&[A, B].concat());
        let tool = RecordingPatch::default();
        let mut operator = operator("s\nk\ns\n");

        run_interactive(
            &diff(&[C, D, E]),
            &setup.store,
            &mut setup.applier(&tool),
            &mut operator,
        )
        .unwrap();

        assert_eq!(setup.stash(), [C, E, A, B].concat());
        assert_eq!(
            fs::read_to_string(setup.store.backup_path()).unwrap(),
            [A, B].concat()
        );
    }

    #[test]
    fn interactive_quit_stops_early() {
        let setup = Setup::new().with_stash(A);
        let tool = RecordingPatch::default();
        let mut operator = operator("s\nq\ns\n");

        let report = run_interactive(
            &diff(&[C, D]),
            &setup.store,
            &mut setup.applier(&tool),
            &mut operator,
        )
        .unwrap();

        assert_eq!(report.saved, 1);
        assert_eq!(setup.stash(), [C, A].concat());
    }

    #[test]
    fn interactive_unknown_key_changes_nothing() {
        let setup = Setup::new();
        let tool = RecordingPatch::default();
        let mut operator = operator("z\ns\n");

        let report = run_interactive(
            &diff(&[C]),
            &setup.store,
            &mut setup.applier(&tool),
            &mut operator,
        )
        .unwrap();

        assert_eq!(report.saved, 1);
        assert_eq!(tool.calls().len(), 1);
    }

    #[test]
    fn interactive_failure_still_restores_old_stash() {
        let setup = Setup::new().with_stash(A);
        let tool = RecordingPatch::failing_on(2);
        let mut operator = operator("s\nd\ns\n");

        let result = {
            let mut applier = setup.applier(&tool);
            run_interactive(
                &diff(&[C, D, E]),
                &setup.store,
                &mut applier,
                &mut operator,
            )
        };

        assert!(result.is_err());
        // C was committed before the failing drop of D; E was never reached
        assert_eq!(setup.stash(), [C, A].concat());
        assert_eq!(tool.calls().len(), 2);
        assert!(setup.scratch_is_empty());
    }

    #[test]
    fn interactive_failed_save_keeps_hunk_stashed() {
        let setup = Setup::new();
        let tool = RecordingPatch::failing_on(1);
        let mut operator = operator("s\n");

        let result = run_interactive(
            &diff(&[C]),
            &setup.store,
            &mut setup.applier(&tool),
            &mut operator,
        );

        assert!(result.is_err());
        assert_eq!(setup.stash(), C.to_string());
    }
}
