//! Per-hunk questions put to the operator.

use crate::diff::Hunk;
use crossterm::style::Stylize;
use error_set::error_set;
use std::io::{BufRead, Write};

error_set! {
    /// Errors talking to the operator
    PromptError := {
        #[display("could not read choice: {message}")]
        Read { message: String },
        #[display("could not write prompt: {message}")]
        Write { message: String },
    }
}

/// A set of single-key answers for one kind of session.
pub trait Choice: Sized + Copy {
    /// Menu line shown after each hunk
    const MENU: &'static str;
    /// Answer used when input runs out
    const ON_EOF: Self;

    fn from_key(key: char) -> Option<Self>;
}

/// Answers during a save session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveChoice {
    Save,
    Drop,
    Skip,
    Quit,
}

impl Choice for SaveChoice {
    const MENU: &'static str = "[s]ave [d]rop s[k]ip [q]uit: ";
    const ON_EOF: Self = SaveChoice::Quit;

    fn from_key(key: char) -> Option<Self> {
        match key {
            's' => Some(SaveChoice::Save),
            'd' => Some(SaveChoice::Drop),
            'k' => Some(SaveChoice::Skip),
            'q' => Some(SaveChoice::Quit),
            _ => None,
        }
    }
}

/// Answers during a pop session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopChoice {
    Pop,
    Drop,
    Skip,
    Quit,
}

impl Choice for PopChoice {
    const MENU: &'static str = "[p]op [d]rop s[k]ip [q]uit: ";
    const ON_EOF: Self = PopChoice::Quit;

    fn from_key(key: char) -> Option<Self> {
        match key {
            'p' => Some(PopChoice::Pop),
            'd' => Some(PopChoice::Drop),
            'k' => Some(PopChoice::Skip),
            'q' => Some(PopChoice::Quit),
            _ => None,
        }
    }
}

/// Whoever decides what happens to each hunk.
pub trait Operator {
    fn choose<C: Choice>(&mut self, hunk: &Hunk) -> Result<C, PromptError>;
}

/// Line-oriented prompt: shows the hunk, reads one line, uses its first key.
///
/// An unrecognised key changes nothing; the operator is told so and asked
/// again. End of input counts as quit.
pub struct Prompt<R, W> {
    input: R,
    output: W,
    color: bool,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            color: false,
        }
    }

    /// Highlight labels with ANSI colors.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn label(&self, text: &str) -> String {
        if self.color {
            text.blue().to_string()
        } else {
            text.to_string()
        }
    }

    fn show_hunk(&mut self, hunk: &Hunk) -> std::io::Result<()> {
        let label = self.label("hunk");
        let summary = hunk
            .header()
            .map(|header| format!(" ({header})"))
            .unwrap_or_default();
        writeln!(
            self.output,
            "{label} {}{summary}{}",
            hunk.position(),
            self.label(":")
        )?;
        writeln!(self.output, "{hunk}")
    }

    fn ask(&mut self, menu: &str) -> Result<Option<String>, PromptError> {
        let menu = self.label(menu);
        write!(self.output, "{menu}")
            .and_then(|_| self.output.flush())
            .map_err(|e| PromptError::Write {
                message: e.to_string(),
            })?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| PromptError::Read {
                message: e.to_string(),
            })?;
        Ok((read > 0).then_some(line))
    }
}

impl<R: BufRead, W: Write> Operator for Prompt<R, W> {
    fn choose<C: Choice>(&mut self, hunk: &Hunk) -> Result<C, PromptError> {
        self.show_hunk(hunk).map_err(|e| PromptError::Write {
            message: e.to_string(),
        })?;

        loop {
            let Some(line) = self.ask(C::MENU)? else {
                writeln!(self.output).map_err(|e| PromptError::Write {
                    message: e.to_string(),
                })?;
                return Ok(C::ON_EOF);
            };
            let key = line.trim().chars().next();
            if let Some(choice) = key.and_then(C::from_key) {
                return Ok(choice);
            }
            tracing::debug!(?key, "unrecognized choice");
            writeln!(
                self.output,
                "unrecognized choice {:?}, hunk unchanged",
                key.map(String::from).unwrap_or_default()
            )
            .map_err(|e| PromptError::Write {
                message: e.to_string(),
            })?;
        }
    }
}
