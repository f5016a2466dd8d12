use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, u32},
    combinator::opt,
    sequence::preceded,
};
use std::fmt;
use std::num::NonZeroUsize;

/// Marker that opens every hunk header line.
pub const HEADER_MARKER: &[u8] = b"@@";

/// One hunk of a unified diff, kept byte-for-byte as it appeared.
///
/// The text starts at the `@@` header and runs up to (not including) the next
/// header or the end of the stream. Line terminators are preserved so the
/// text can be handed back to `patch` unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    position: NonZeroUsize,
    text: Vec<u8>,
}

impl Hunk {
    pub fn new(position: NonZeroUsize, text: Vec<u8>) -> Self {
        Self { position, text }
    }

    /// 1-based position assigned when the stream was parsed. Never renumbered.
    pub fn position(&self) -> NonZeroUsize {
        self.position
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.text
    }

    /// Line ranges from the `@@` header, if the header is well formed.
    ///
    /// Hunks are stored verbatim whether or not this parses; the summary is
    /// only used for display.
    pub fn header(&self) -> Option<HunkHeader> {
        let line = self.text.split(|&b| b == b'\n').next()?;
        let line = std::str::from_utf8(line).ok()?;
        parse_header(line).ok().map(|(_, header)| header)
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.text))
    }
}

/// A `start[,len]` range from one side of a hunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: u32,
    pub len: u32,
}

/// The old and new ranges of `@@ -a,b +c,d @@`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    pub old: LineRange,
    pub new: LineRange,
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "-{},{} +{},{}",
            self.old.start, self.old.len, self.new.start, self.new.len
        )
    }
}

/// Parse a range like "136,0" or "137" (length defaults to 1)
fn line_range(input: &str) -> IResult<&str, LineRange> {
    (u32, opt(preceded(char(','), u32)))
        .map(|(start, len)| LineRange {
            start,
            len: len.unwrap_or(1),
        })
        .parse(input)
}

/// Parse a hunk header line; trailing section context after `@@` is ignored
fn parse_header(input: &str) -> IResult<&str, HunkHeader> {
    (
        tag("@@ -"),
        line_range,
        tag(" +"),
        line_range,
        tag(" @@"),
    )
        .map(|(_, old, _, new, _)| HunkHeader { old, new })
        .parse(input)
}
