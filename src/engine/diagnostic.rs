//! Engine status documents and remapped diagnostics.

use std::fmt;

use serde::Deserialize;

use crate::error::{Result, SassError};
use crate::import::Origin;

const BACKTRACE_MARKER: &str = "\nBacktrace:\n";

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "Error"),
        }
    }
}

/// Error or warning as reported by a downstream engine, in terms of the
/// text it was given.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineMessage {
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub column: usize,
    pub message: String,
    /// Frames split off `message`; never present in the JSON itself.
    #[serde(skip)]
    pub backtrace: Vec<String>,
}

impl EngineMessage {
    pub fn new(file: impl Into<String>, line: usize, message: &str) -> Self {
        let (message, backtrace) = split_backtrace(message);
        Self {
            status: 1,
            file: file.into(),
            line,
            column: 0,
            message,
            backtrace,
        }
    }

    /// Parse an engine status document.
    ///
    /// ```json
    /// {"status": 1, "file": "stdin", "line": 3, "column": 20,
    ///  "message": "boom\nBacktrace:\n\tstdin:3"}
    /// ```
    pub fn from_json(json: &[u8]) -> Result<Self> {
        let mut parsed: EngineMessage = serde_json::from_slice(json).map_err(|e| SassError::Engine {
            message: format!("invalid engine status document: {}", e),
            file: String::new(),
            line: 0,
            backtrace: Vec::new(),
        })?;
        let (message, backtrace) = split_backtrace(&parsed.message);
        parsed.message = message;
        parsed.backtrace = backtrace;
        Ok(parsed)
    }
}

/// Split `"msg\nBacktrace:\n\tf1\n\tf2"` into the message and its frames.
fn split_backtrace(message: &str) -> (String, Vec<String>) {
    match message.split_once(BACKTRACE_MARKER) {
        Some((head, frames)) => (
            head.to_string(),
            frames
                .split('\n')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        None => (message.to_string(), Vec::new()),
    }
}

/// An engine message attributed to an original `file:line`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub origin: Origin,
    pub message: String,
    pub backtrace: Vec<String>,
}

impl Diagnostic {
    pub fn warning(origin: Origin, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            origin,
            message: message.into(),
            backtrace: Vec::new(),
        }
    }

    pub fn error(origin: Origin, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            origin,
            message: message.into(),
            backtrace: Vec::new(),
        }
    }

    pub fn with_backtrace(mut self, backtrace: Vec<String>) -> Self {
        self.backtrace = backtrace;
        self
    }

    /// Block comment form appended to compiled CSS.
    pub fn to_comment(&self) -> String {
        format!(
            "/* {} {} {} */",
            self.severity,
            self.origin,
            self.message.replace("*/", "* /")
        )
    }

    pub fn into_error(self) -> SassError {
        SassError::Engine {
            message: self.message,
            file: self.origin.file,
            line: self.origin.line,
            backtrace: self.backtrace,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}: {}", self.origin, self.severity, self.message)?;
        if !self.backtrace.is_empty() {
            write!(f, "\nBacktrace:")?;
            for frame in &self.backtrace {
                write!(f, "\n\t{}", frame)?;
            }
        }
        Ok(())
    }
}
