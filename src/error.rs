use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for spritesass operations
#[derive(Error, Diagnostic, Debug)]
pub enum SassError {
    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(spritesass::io))]
    Io { path: PathBuf, message: String },

    #[error("{file}:{line}:{column}: {message} (pos {position})")]
    #[diagnostic(code(spritesass::lex))]
    Lex {
        message: String,
        position: usize,
        file: String,
        line: u32,
        column: u32,
    },

    #[error("{file}:{line}: expected {expected}, found `{found}` (pos {position})")]
    #[diagnostic(code(spritesass::syntax))]
    Syntax {
        expected: String,
        found: String,
        position: usize,
        file: String,
        line: usize,
    },

    #[error("Could not import: {name} (from {importer})\nTried:\n{}", format_candidates(.candidates))]
    #[diagnostic(
        code(spritesass::import),
        help("add the directory containing the partial to include_paths")
    )]
    ImportNotFound {
        name: String,
        importer: String,
        candidates: Vec<PathBuf>,
    },

    #[error("Failed to decode image {path}: {message}")]
    #[diagnostic(code(spritesass::image::decode))]
    ImageDecode { path: PathBuf, message: String },

    #[error("Failed to export sprite sheet {path}: {message}")]
    #[diagnostic(code(spritesass::image::export))]
    ImageExport { path: PathBuf, message: String },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    #[diagnostic(code(spritesass::glob))]
    Glob { pattern: String, message: String },

    #[error("Sprite error: {message}")]
    #[diagnostic(code(spritesass::sprite))]
    Sprite {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Error > {file}:{line}\n{message}{}", format_backtrace(.backtrace))]
    #[diagnostic(code(spritesass::engine))]
    Engine {
        message: String,
        file: String,
        line: usize,
        backtrace: Vec<String>,
    },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(spritesass::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl SassError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        SassError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

fn format_candidates(candidates: &[PathBuf]) -> String {
    candidates
        .iter()
        .map(|c| format!("  {}", c.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_backtrace(frames: &[String]) -> String {
    if frames.is_empty() {
        return String::new();
    }
    let mut out = String::from("\nBacktrace:");
    for frame in frames {
        out.push_str("\n\t");
        out.push_str(frame);
    }
    out
}

pub type Result<T> = std::result::Result<T, SassError>;
