//! Code packaging for the unit of work.
//!
//! The caller hands over the function's name and its source text (inline or
//! from a file on disk) up front; the constructor normalizes the text so the
//! executor template can embed it as top-level statements.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Immutable description of the unit of work: a named function definition
/// that takes the in-container output path as its sole argument and writes
/// its result there.
///
/// Normalization happens once at construction:
/// - leading blank lines are dropped,
/// - the indentation of the first line is stripped from every line, so a
///   function defined inside another function comes out at column 0,
/// - leading decorator lines (`@...`) are removed; the `def` line is kept
///   because the executor invokes the function by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    name: String,
    source_body: String,
}

impl FunctionSpec {
    /// Package a function from inline source text.
    pub fn new(name: impl Into<String>, source: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            source_body: normalize(source)?,
        })
    }

    /// Package a function from a source file on disk.
    ///
    /// An unreadable path is fatal to the invocation and surfaces as
    /// [`Error::SourceUnavailable`].
    pub fn from_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::SourceUnavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::new(name, &source)
    }

    /// Identifier used for invocation and default image tagging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// De-indented source text with any decorator lines removed.
    pub fn source_body(&self) -> &str {
        &self.source_body
    }
}

fn normalize(source: &str) -> Result<String> {
    if source.trim().is_empty() {
        return Err(Error::SourceUnavailable(
            "function source is empty".to_string(),
        ));
    }

    let lines: Vec<&str> = source
        .lines()
        .skip_while(|line| line.trim().is_empty())
        .collect();

    // Indentation detection is driven by the first line: count its leading
    // whitespace and strip that much from every line.
    let indentation = leading_whitespace(lines[0]);

    let mut body_lines: Vec<&str> = lines
        .iter()
        .map(|line| {
            let strip = indentation.min(leading_whitespace(line));
            &line[strip..]
        })
        .collect();

    // Decorator lines wrap the definition; the definition itself stays.
    while body_lines.first().is_some_and(|line| line.starts_with('@')) {
        body_lines.remove(0);
    }

    if body_lines.iter().all(|line| line.trim().is_empty()) {
        return Err(Error::SourceUnavailable(
            "function source contains only decorator lines".to_string(),
        ));
    }

    let mut body = body_lines.join("\n");
    body.push('\n');
    Ok(body)
}

fn leading_whitespace(line: &str) -> usize {
    line.len() - line.trim_start().len()
}
