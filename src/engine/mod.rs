//! Downstream engine boundary and the compile driver.
//!
//! A [`StyleEngine`] does the full stylesheet evaluation of preprocessed
//! text. It calls back into helpers through [`FunctionHost`] and reports
//! errors and warnings against the text it was given; [`Compiler`] maps
//! those positions back to the original files.

mod diagnostic;

pub use diagnostic::{Diagnostic, EngineMessage, Severity};

use std::path::Path;

use crate::error::Result;
use crate::functions::{FunctionRegistry, HelperContext, Value};
use crate::host::{BuildHost, Preprocessed};
use crate::import::{Origin, ProvenanceTable};
use crate::lexer::STDIN_LABEL;
use crate::parser::ParseState;

/// Helpers an engine may call while evaluating.
pub trait FunctionHost {
    /// Signatures to register with the engine, e.g. `sprite-width($map, $name)`.
    fn signatures(&self) -> Vec<String>;

    fn call(&mut self, name: &str, args: &[Value]) -> Value;
}

/// Successful engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    pub css: String,
    pub warnings: Vec<EngineMessage>,
}

/// A full stylesheet compiler.
pub trait StyleEngine {
    fn compile(&self, source: &str, functions: &mut dyn FunctionHost) -> std::result::Result<EngineOutput, EngineMessage>;
}

/// [`FunctionHost`] over a registry and one compile's helper state.
pub struct Bridge<'a> {
    registry: &'a FunctionRegistry,
    context: &'a mut HelperContext,
}

impl<'a> Bridge<'a> {
    pub fn new(registry: &'a FunctionRegistry, context: &'a mut HelperContext) -> Self {
        Self { registry, context }
    }
}

impl FunctionHost for Bridge<'_> {
    fn signatures(&self) -> Vec<String> {
        self.registry.signatures()
    }

    fn call(&mut self, name: &str, args: &[Value]) -> Value {
        let value = self.registry.call(self.context, name, args);
        if let Value::Error(message) = &value {
            log::debug!("{}: {}", name, message);
        }
        value
    }
}

/// Compiled stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    /// Engine output with warnings echoed as trailing comments.
    pub css: String,
    pub warnings: Vec<Diagnostic>,
}

/// Preprocess, then hand off to an engine.
pub struct Compiler<'h, E> {
    host: &'h BuildHost,
    registry: FunctionRegistry,
    engine: E,
}

impl<'h, E: StyleEngine> Compiler<'h, E> {
    /// Compiler with the built-in helpers.
    pub fn new(host: &'h BuildHost, engine: E) -> Self {
        Self::with_registry(host, engine, FunctionRegistry::with_builtins())
    }

    pub fn with_registry(host: &'h BuildHost, engine: E, registry: FunctionRegistry) -> Self {
        Self { host, registry, engine }
    }

    pub fn registry_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.registry
    }

    pub fn compile_file(&self, path: &Path) -> Result<Compiled> {
        let preprocessed = self.host.preprocess_file(path)?;
        self.run(preprocessed)
    }

    pub fn compile(&self, source: &str, dir: &Path) -> Result<Compiled> {
        let preprocessed = self.host.preprocess(source, dir)?;
        self.run(preprocessed)
    }

    fn run(&self, preprocessed: Preprocessed) -> Result<Compiled> {
        let Preprocessed {
            output,
            state,
            main_file,
            paths,
            prefix_lines,
        } = preprocessed;
        let ParseState { sprites, provenance, .. } = state;
        let remap = Remap {
            main_file: &main_file,
            provenance: &provenance,
            prefix_lines,
        };

        let mut context = HelperContext::with_sprites(paths, sprites);
        let mut bridge = Bridge::new(&self.registry, &mut context);

        let result = match self.engine.compile(&output, &mut bridge) {
            Ok(result) => result,
            Err(message) => return Err(remap.diagnostic(Severity::Error, message).into_error()),
        };

        let warnings: Vec<Diagnostic> = result
            .warnings
            .into_iter()
            .map(|message| remap.diagnostic(Severity::Warning, message))
            .collect();

        let mut css = result.css;
        for warning in &warnings {
            log::warn!("{}: {}", warning.origin, warning.message);
            if !css.is_empty() && !css.ends_with('\n') {
                css.push('\n');
            }
            css.push_str(&warning.to_comment());
            css.push('\n');
        }

        Ok(Compiled { css, warnings })
    }
}

/// Maps engine positions in the preprocessed text to original files.
struct Remap<'a> {
    main_file: &'a str,
    provenance: &'a ProvenanceTable,
    prefix_lines: usize,
}

impl Remap<'_> {
    fn is_ours(&self, file: &str) -> bool {
        file.is_empty() || file == self.main_file || file == STDIN_LABEL
    }

    fn origin(&self, file: &str, line: usize) -> Origin {
        if self.is_ours(file) && line > self.prefix_lines {
            if let Some(origin) = self.provenance.locate_line(line - self.prefix_lines) {
                return origin;
            }
        }
        let file = if file.is_empty() { self.main_file } else { file };
        Origin::new(file, line)
    }

    /// Rewrite a `file:N[, rest]` backtrace frame.
    fn frame(&self, frame: &str) -> String {
        let (location, rest) = match frame.split_once(',') {
            Some((location, rest)) => (location, Some(rest)),
            None => (frame, None),
        };
        let Some((file, line)) = location.rsplit_once(':') else {
            return frame.to_string();
        };
        let Ok(line) = line.trim().parse::<usize>() else {
            return frame.to_string();
        };
        let origin = self.origin(file, line);
        match rest {
            Some(rest) => format!("{},{}", origin, rest),
            None => origin.to_string(),
        }
    }

    fn diagnostic(&self, severity: Severity, message: EngineMessage) -> Diagnostic {
        let origin = self.origin(&message.file, message.line);
        let backtrace = message.backtrace.iter().map(|f| self.frame(f)).collect();
        let diagnostic = match severity {
            Severity::Error => Diagnostic::error(origin, message.message),
            Severity::Warning => Diagnostic::warning(origin, message.message),
        };
        diagnostic.with_backtrace(backtrace)
    }
}
