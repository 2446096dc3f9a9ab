//! spritesass - Sass preprocessor with sprite sheet generation
//!
//! Resolves `@import`s, rewrites `sprite-map(...)` declarations into literal
//! map data backed by generated sprite sheets, and hands the result to a
//! downstream stylesheet engine through a named helper function registry.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod functions;
pub mod host;
pub mod import;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod sprite;

pub use config::{Options, Paths, MANIFEST_NAME};
pub use engine::{Compiled, Compiler, Diagnostic, EngineMessage, EngineOutput, FunctionHost, Severity, StyleEngine};
pub use error::{Result, SassError};
pub use functions::{FunctionRegistry, HelperContext, Value};
pub use host::{BuildHost, Preprocessed};
pub use import::{CachePolicy, DependencyGraph, FileCache, Origin, ProvenanceTable};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{ParseState, Parser, Replacement};
pub use sprite::{Layout, SpriteSheet};
