//! Parsing for hunk selection syntax into a membership predicate.
//!
//! A selection names the hunks an operation should affect by their 1-based
//! position in the parsed diff (or stash).
//!
//! # Syntax
//!
//! - `@` - every hunk
//! - `N` - the hunk at position N
//! - `N,M,...` - a comma-separated list of positions
//!
//! Ranges are not supported and are rejected rather than ignored.
//!
//! # Examples
//!
//! ```
//! use hunk_stash::selection::Selection;
//! use std::num::NonZeroUsize;
//!
//! let all = Selection::parse("@").unwrap();
//! assert!(all.contains(NonZeroUsize::new(42).unwrap()));
//!
//! let some = Selection::parse("1,3").unwrap();
//! assert!(some.contains(NonZeroUsize::new(3).unwrap()));
//! assert!(!some.contains(NonZeroUsize::new(2).unwrap()));
//!
//! assert!(Selection::parse("2,x").is_err());
//! ```

use error_set::error_set;
use std::num::NonZeroUsize;

/// Token selecting every hunk.
pub const WILDCARD: &str = "@";

error_set! {
    /// Errors from parsing hunk selection syntax
    SelectionError := {
        /// Nothing was given between the commas
        #[display("No hunk positions provided")]
        Empty,
        /// Token is not a positive base-10 integer
        #[display("bad integer in hunk spec: '{token}'")]
        InvalidPosition { token: String },
        /// Token looks like a range, which is not supported
        #[display("hunk ranges are not supported: '{token}'")]
        RangeUnsupported { token: String },
    }
}

/// The set of hunk positions an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every position
    All,
    /// Exactly these positions, in the order given
    Positions(Vec<NonZeroUsize>),
}

impl Selection {
    /// Parse a selection string.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError`] if any token is not a positive integer,
    /// looks like a range, or if the string holds no tokens at all. A single
    /// bad token rejects the whole selection.
    pub fn parse(input: &str) -> Result<Self, SelectionError> {
        let tokens: Vec<&str> = input.split(',').map(str::trim).collect();
        if tokens.iter().all(|token| token.is_empty()) {
            return Err(SelectionError::Empty);
        }

        let mut positions = Vec::with_capacity(tokens.len());
        let mut wildcard = false;
        for token in tokens {
            if token == WILDCARD {
                wildcard = true;
            } else {
                positions.push(parse_position(token)?);
            }
        }

        if wildcard {
            Ok(Selection::All)
        } else {
            Ok(Selection::Positions(positions))
        }
    }

    /// Whether the hunk at `position` (original parse position) is selected.
    pub fn contains(&self, position: NonZeroUsize) -> bool {
        match self {
            Selection::All => true,
            Selection::Positions(positions) => {
                tracing::trace!(position = position.get(), ?positions, "selection lookup");
                positions.contains(&position)
            }
        }
    }
}

/// Parse a single position token
fn parse_position(token: &str) -> Result<NonZeroUsize, SelectionError> {
    if looks_like_range(token) {
        return Err(SelectionError::RangeUnsupported {
            token: token.to_string(),
        });
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SelectionError::InvalidPosition {
            token: token.to_string(),
        });
    }
    token
        .parse::<NonZeroUsize>()
        .map_err(|_| SelectionError::InvalidPosition {
            token: token.to_string(),
        })
}

/// `N..M` or `N-M` with digits on both sides
fn looks_like_range(token: &str) -> bool {
    let split = token.split_once("..").or_else(|| token.split_once('-'));
    match split {
        Some((start, end)) => {
            !start.is_empty()
                && !end.is_empty()
                && start.bytes().all(|b| b.is_ascii_digit())
                && end.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}
