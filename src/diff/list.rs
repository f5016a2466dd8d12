use super::hunk::{HEADER_MARKER, Hunk};
use error_set::error_set;
use std::io::BufRead;
use std::num::NonZeroUsize;

/// Lines of this many bytes or more, terminator included, are rejected.
pub const MAX_LINE: usize = 1024;

error_set! {
    /// Errors from splitting a diff stream into hunks
    ParseError := {
        #[display("line {line} is too long! limit: {limit}")]
        LineTooLong { line: usize, limit: usize },
        #[display("read error in {source_name}: {message}")]
        Read { source_name: String, message: String },
    }
}

/// Ordered hunks from one parse of one diff stream.
///
/// Each hunk keeps the position it was given at parse time. Removing hunks
/// shifts the live indices used for cursor movement, but never the positions
/// used for selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HunkList {
    hunks: Vec<Hunk>,
}

impl HunkList {
    /// Split a unified diff into hunks.
    ///
    /// Lines before the first `@@` header (`Index:`, `===`, `---`, `+++`,
    /// `diff --git`, ...) are skipped. A stream with no header yields an empty
    /// list. `source_name` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::LineTooLong`] naming the 1-based line number if
    /// any line reaches [`MAX_LINE`] bytes, and [`ParseError::Read`] if the
    /// reader fails.
    pub fn parse<R: BufRead>(mut reader: R, source_name: &str) -> Result<Self, ParseError> {
        tracing::debug!(source = source_name, "parsing diff");

        let mut hunks = Vec::new();
        let mut current: Option<Vec<u8>> = None;
        let mut line = Vec::with_capacity(MAX_LINE);
        let mut number = 0;

        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| ParseError::Read {
                    source_name: source_name.to_string(),
                    message: e.to_string(),
                })?;
            if read == 0 {
                break;
            }
            number += 1;
            if line.len() >= MAX_LINE {
                return Err(ParseError::LineTooLong {
                    line: number,
                    limit: MAX_LINE,
                });
            }

            if line.starts_with(HEADER_MARKER) {
                if let Some(text) = current.take() {
                    hunks.push(text);
                }
                current = Some(line.clone());
            } else if let Some(text) = current.as_mut() {
                text.extend_from_slice(&line);
            }
        }

        if let Some(text) = current {
            hunks.push(text);
        }

        Ok(Self::from_texts(hunks))
    }

    /// Parse an in-memory diff.
    pub fn parse_bytes(diff: &[u8]) -> Result<Self, ParseError> {
        Self::parse(diff, "<memory>")
    }

    fn from_texts(texts: Vec<Vec<u8>>) -> Self {
        let hunks = texts
            .into_iter()
            .zip(1..)
            .filter_map(|(text, n)| NonZeroUsize::new(n).map(|position| Hunk::new(position, text)))
            .collect();
        Self { hunks }
    }

    pub fn len(&self) -> usize {
        self.hunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Hunk at live index `index` (not its parse position).
    pub fn get(&self, index: usize) -> Option<&Hunk> {
        self.hunks.get(index)
    }

    /// Remove the hunk at live index `index`; later hunks shift down by one.
    pub fn remove(&mut self, index: usize) -> Option<Hunk> {
        (index < self.hunks.len()).then(|| self.hunks.remove(index))
    }

    /// Keep only hunks matching `keep`, preserving relative order.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Hunk) -> bool,
    {
        self.hunks.retain(keep);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hunk> {
        self.hunks.iter()
    }

    /// One line per hunk: its position and header ranges.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for hunk in &self.hunks {
            match hunk.header() {
                Some(header) => out.push_str(&format!("{}: {header}\n", hunk.position())),
                None => out.push_str(&format!("{}: (no header)\n", hunk.position())),
            }
        }
        out
    }

    /// Concatenated hunk text, as it would be written to a stash.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.hunks.iter().flat_map(|h| h.as_bytes()).copied().collect()
    }
}

impl<'a> IntoIterator for &'a HunkList {
    type Item = &'a Hunk;
    type IntoIter = std::slice::Iter<'a, Hunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.hunks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const GIT_DIFF: &str = "diff --git a/gtk.nix b/gtk.nix
index 2ce966d..93d8dbc 100644
--- a/gtk.nix
+++ b/gtk.nix
@@ -1,4 +1,4 @@
 {
-    gtk.theme.name = \"Adwaita\";
+    # Theme managed by Stylix
 }
@@ -20,3 +20,4 @@ line 19
 a
 b
+    gtk.cursorTheme.size = 24;
 c
";

    #[test]
    fn splits_at_headers_and_skips_metadata() {
        let list = HunkList::parse_bytes(GIT_DIFF.as_bytes()).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(
            list.get(0).unwrap().to_string(),
            "@@ -1,4 +1,4 @@\n {\n-    gtk.theme.name = \"Adwaita\";\n+    # Theme managed by Stylix\n }\n"
        );
        assert_eq!(
            list.get(1).unwrap().to_string(),
            "@@ -20,3 +20,4 @@ line 19\n a\n b\n+    gtk.cursorTheme.size = 24;\n c\n"
        );
    }

    #[test]
    fn svn_style_metadata_is_skipped() {
        let diff = "Index: notes.txt
===================================================================
--- notes.txt\t(revision 12)
+++ notes.txt\t(working copy)
@@ -1 +1 @@
-old
+new
";
        let list = HunkList::parse_bytes(diff.as_bytes()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(
            list.get(0).unwrap().as_bytes(),
            "@@ -1 +1 @@\n-old\n+new\n".as_bytes()
        );
    }

    #[test]
    fn positions_are_one_based_in_stream_order() {
        let list = HunkList::parse_bytes(GIT_DIFF.as_bytes()).unwrap();
        let positions: Vec<usize> = list.iter().map(|h| h.position().get()).collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn no_header_means_no_hunks() {
        assert!(HunkList::parse_bytes(b"").unwrap().is_empty());
        let metadata_only = "diff --git a/x b/x\nold mode 100644\nnew mode 100755\n";
        assert!(HunkList::parse_bytes(metadata_only.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn hunk_lines_that_look_like_metadata_are_kept() {
        let diff = "@@ -3,2 +3,2 @@\n---- rule\n+++ plus\n";
        let list = HunkList::parse_bytes(diff.as_bytes()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap().as_bytes(), diff.as_bytes());
    }

    #[test]
    fn final_line_without_newline_is_kept_verbatim() {
        let diff = "@@ -1 +1 @@\n-a\n+b\n\\ No newline at end of file";
        let list = HunkList::parse_bytes(diff.as_bytes()).unwrap();
        assert_eq!(list.get(0).unwrap().as_bytes(), diff.as_bytes());
    }

    #[test]
    fn crlf_terminators_are_preserved() {
        let diff = "@@ -1 +1 @@\r\n-a\r\n+b\r\n";
        let list = HunkList::parse_bytes(diff.as_bytes()).unwrap();
        assert_eq!(list.to_bytes(), diff.as_bytes().to_vec());
    }

    #[test]
    fn overlong_line_reports_its_number() {
        let long = format!("+{}\n", "x".repeat(MAX_LINE));
        let diff = format!("--- a\n+++ b\n@@ -1 +1 @@\n-a\n{long}");
        let result = HunkList::parse_bytes(diff.as_bytes());
        assert!(matches!(
            result,
            Err(ParseError::LineTooLong { line: 5, limit: MAX_LINE })
        ));
    }

    #[test]
    fn line_just_under_the_limit_is_accepted() {
        let line = format!("+{}\n", "x".repeat(MAX_LINE - 3));
        assert_eq!(line.len(), MAX_LINE - 1);
        let diff = format!("@@ -0,0 +1 @@\n{line}");
        assert_eq!(HunkList::parse_bytes(diff.as_bytes()).unwrap().len(), 1);
    }

    #[test]
    fn line_at_the_limit_is_rejected() {
        let line = format!("+{}\n", "x".repeat(MAX_LINE - 2));
        assert_eq!(line.len(), MAX_LINE);
        let diff = format!("@@ -0,0 +1 @@\n{line}");
        assert!(matches!(
            HunkList::parse_bytes(diff.as_bytes()),
            Err(ParseError::LineTooLong { line: 2, limit: MAX_LINE })
        ));
    }

    #[test]
    fn summary_lists_positions_and_ranges() {
        let list = HunkList::parse_bytes(GIT_DIFF.as_bytes()).unwrap();
        insta::assert_snapshot!(list.summary(), @r"
        1: -1,4 +1,4
        2: -20,3 +20,4
        ");
    }

    #[test]
    fn remove_keeps_original_positions() {
        let mut list = HunkList::parse_bytes(
            b"@@ -1 +1 @@\n-a\n+A\n@@ -5 +5 @@\n-b\n+B\n@@ -9 +9 @@\n-c\n+C\n",
        )
        .unwrap();
        let removed = list.remove(1).unwrap();
        assert_eq!(removed.position().get(), 2);
        assert_eq!(list.get(1).unwrap().position().get(), 3);
        assert!(list.remove(5).is_none());
    }

    #[test]
    fn non_utf8_bytes_survive() {
        let diff = b"@@ -1 +1 @@\n-\xff\xfe\n+ok\n";
        let list = HunkList::parse_bytes(diff).unwrap();
        assert_eq!(list.to_bytes(), diff.to_vec());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Generate one content line (no newline, not a header)
    fn arb_body_line() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec![' ', '+', '-']),
            prop::collection::vec(prop::char::range(' ', '~'), 0..40),
        )
            .prop_map(|(prefix, chars)| {
                let mut line = String::from(prefix);
                line.extend(chars);
                line.push('\n');
                line
            })
    }

    /// Generate a standalone hunk with a header and 1..6 body lines
    fn arb_hunk_text() -> impl Strategy<Value = String> {
        (
            1..500u32,
            1..20u32,
            prop::collection::vec(arb_body_line(), 1..6),
        )
            .prop_map(|(start, len, body)| {
                let mut text = format!("@@ -{start},{len} +{start},{len} @@\n");
                text.extend(body);
                text
            })
    }

    proptest! {
        /// Concatenating N hunks and parsing yields the same N hunks, byte for byte
        #[test]
        fn concatenated_hunks_roundtrip(hunks in prop::collection::vec(arb_hunk_text(), 0..8)) {
            let joined: String = hunks.concat();
            let list = HunkList::parse_bytes(joined.as_bytes()).unwrap();

            prop_assert_eq!(list.len(), hunks.len());
            for (parsed, original) in list.iter().zip(&hunks) {
                prop_assert_eq!(parsed.as_bytes(), original.as_bytes());
            }
            prop_assert_eq!(list.to_bytes(), joined.into_bytes());
        }
    }
}
