//! ANSI escape handling for streamed tool output

use anyhow::Result;
use regex::Regex;
use std::borrow::Cow;

/// Colour and erase-line sequences emitted by terraform
const ANSI_ESCAPE_RE: &str = r"\x1b\[[0-9;]*[A-Za-z]";

/// Removes ANSI escape sequences from lines of output
pub struct AnsiStripper {
    re: Regex,
}

impl AnsiStripper {
    pub fn new() -> Result<Self> {
        Ok(Self {
            re: Regex::new(ANSI_ESCAPE_RE)?,
        })
    }

    pub fn strip<'a>(&self, line: &'a str) -> Cow<'a, str> {
        self.re.replace_all(line, "")
    }
}
