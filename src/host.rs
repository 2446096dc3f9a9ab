//! Build host: the long-lived owner of shared compile state.
//!
//! A [`BuildHost`] owns the options, the import file cache and the dependency
//! graph. It is `Sync`; concurrent compiles share the cache and graph and
//! each compile keeps its own parse state.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::config::{Options, Paths};
use crate::error::{Result, SassError};
use crate::import::{DependencyGraph, FileCache, ImportResolver, Origin};
use crate::lexer::{tokenize_file, STDIN_LABEL};
use crate::parser::{apply, ParseState, Parser};

/// Result of preprocessing one stylesheet.
#[derive(Debug)]
pub struct Preprocessed {
    /// Rewritten text, starting with the `$rel` declaration.
    pub output: String,
    pub state: ParseState,
    /// Label of the compiled file (`stdin` for in-memory sources).
    pub main_file: String,
    pub paths: Paths,
    /// Lines added in front of the expanded source.
    pub prefix_lines: usize,
}

impl Preprocessed {
    /// Original location of a 1-based line of [`Preprocessed::output`].
    pub fn locate_line(&self, line: usize) -> Option<Origin> {
        if line <= self.prefix_lines {
            return None;
        }
        self.state.provenance.locate_line(line - self.prefix_lines)
    }
}

/// Shared state for any number of compiles.
#[derive(Debug)]
pub struct BuildHost {
    options: Options,
    cache: FileCache,
    graph: Mutex<DependencyGraph>,
}

impl BuildHost {
    pub fn new(options: Options) -> Self {
        let cache = FileCache::with_policy(options.cache_policy());
        Self {
            options,
            cache,
            graph: Mutex::new(DependencyGraph::new()),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    /// Record that `owner` imports `imported`.
    pub fn record_import(&self, owner: &Path, imported: &Path) {
        self.graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add_dependency(owner, imported);
    }

    /// Run `f` with the dependency graph locked.
    pub fn with_graph<R>(&self, f: impl FnOnce(&DependencyGraph) -> R) -> R {
        let graph = self.graph.lock().unwrap_or_else(PoisonError::into_inner);
        f(&graph)
    }

    /// Files that import `path`, directly or transitively.
    pub fn affected_by(&self, path: &Path) -> Vec<PathBuf> {
        self.with_graph(|graph| graph.affected_by(path))
    }

    /// Forget the cached contents of `path`.
    ///
    /// Returns the files whose output may change as a result.
    pub fn invalidate(&self, path: &Path) -> Vec<PathBuf> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.cache.invalidate(&key) {
            log::debug!("invalidated {}", key.display());
        }
        self.affected_by(&key)
    }

    /// Preprocess a stylesheet on disk.
    pub fn preprocess_file(&self, path: &Path) -> Result<Preprocessed> {
        let source = fs::read_to_string(path).map_err(|e| SassError::io(path, e))?;
        let canonical = fs::canonicalize(path).map_err(|e| SassError::io(path, e))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        self.graph
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear_dependencies(&canonical);

        let label = path.display().to_string();
        self.run(&source, &dir, &label, &canonical, true)
    }

    /// Preprocess an in-memory stylesheet whose imports resolve against `dir`.
    pub fn preprocess(&self, source: &str, dir: &Path) -> Result<Preprocessed> {
        let owner = dir.join(STDIN_LABEL);
        self.run(source, dir, STDIN_LABEL, &owner, false)
    }

    fn run(&self, source: &str, dir: &Path, label: &str, owner: &Path, seen: bool) -> Result<Preprocessed> {
        let paths = Paths::resolve(&self.options, dir);

        let mut resolver = ImportResolver::new(self);
        if seen {
            resolver.mark_seen(owner);
        }
        let expansion = resolver.expand(dir, label, owner, source)?;

        // Second pass: positions in the expanded text.
        let tokens = tokenize_file(&expansion.text, label)?;
        log::debug!(
            "{}: {} bytes, {} tokens after import expansion",
            label,
            expansion.text.len(),
            tokens.len()
        );

        let (state, replacements) = Parser::new(&expansion.text, &tokens, &paths, expansion.provenance).parse()?;
        let body = apply(&expansion.text, &replacements);
        let output = format!("$rel: \"{}\";\n{}", paths.rel(), body);

        Ok(Preprocessed {
            output,
            state,
            main_file: label.to_string(),
            paths,
            prefix_lines: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::CachePolicy;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn assert_sync<T: Sync + Send>() {}

    #[test]
    fn test_host_is_sync() {
        assert_sync::<BuildHost>();
    }

    #[test]
    fn test_passthrough_adds_rel_only() {
        let dir = tempdir().unwrap();
        let host = BuildHost::new(Options::default());
        let source = "p {\n  color: red;\n}\n";

        let result = host.preprocess(source, dir.path()).unwrap();
        assert_eq!(result.output, format!("$rel: \".\";\n{}", source));
        assert_eq!(result.main_file, "stdin");
    }

    #[test]
    fn test_rel_points_at_static_dir() {
        let dir = tempdir().unwrap();
        let options = Options {
            build_dir: Some(dir.path().join("build")),
            static_dir: Some(dir.path().to_path_buf()),
            ..Options::default()
        };
        let host = BuildHost::new(options);
        let result = host.preprocess("", dir.path()).unwrap();
        assert_eq!(result.output, "$rel: \"..\";\n");
    }

    #[test]
    fn test_preprocess_file_with_partial() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("_var.scss"), "$a: 1px;\n$b: 2px;\n").unwrap();
        let main = dir.path().join("main.scss");
        fs::write(&main, "// header\n@import \"var\";\np { width: $b; }\n").unwrap();

        let host = BuildHost::new(Options::default());
        let result = host.preprocess_file(&main).unwrap();

        assert_eq!(
            result.output,
            "$rel: \".\";\n// header\n$a: 1px;\n$b: 2px;\n\np { width: $b; }\n"
        );
        assert_eq!(result.state.vars.get("b").map(String::as_str), Some("2px"));

        let partial = dir.path().join("_var.scss").display().to_string();
        // Output line 4 is `$b: 2px;`.
        assert_eq!(result.locate_line(4), Some(Origin::new(partial, 2)));
        // Output line 6 is `p { ... }`, line 3 of main.scss.
        assert_eq!(result.locate_line(6), Some(Origin::new(main.display().to_string(), 3)));
        assert_eq!(result.locate_line(1), None);
    }

    #[test]
    fn test_main_file_import_of_itself_is_skipped() {
        let dir = tempdir().unwrap();
        let main = dir.path().join("main.scss");
        fs::write(&main, "@import \"main\";\n$a: 1;\n").unwrap();

        let host = BuildHost::new(Options::default());
        let result = host.preprocess_file(&main).unwrap();
        assert_eq!(result.output.matches("$a: 1;").count(), 1);
    }

    #[test]
    fn test_cache_shared_between_compiles() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("_var.scss"), "$a: 1;").unwrap();
        let host = BuildHost::new(Options::default());

        host.preprocess("@import \"var\";", dir.path()).unwrap();
        host.preprocess("@import \"var\";", dir.path()).unwrap();
        assert_eq!(host.cache().len(), 1);
        assert_eq!(host.cache().hits(), 1);
    }

    #[test]
    fn test_invalidate_rereads_and_reports_dependents() {
        let dir = tempdir().unwrap();
        let partial = dir.path().join("_var.scss");
        fs::write(&partial, "$a: 1;").unwrap();
        let main = dir.path().join("main.scss");
        fs::write(&main, "@import \"var\";").unwrap();

        let host = BuildHost::new(Options::default());
        host.preprocess_file(&main).unwrap();
        fs::write(&partial, "$a: 2;").unwrap();

        let affected = host.invalidate(&partial);
        assert_eq!(affected, vec![fs::canonicalize(&main).unwrap()]);
        assert!(host.preprocess_file(&main).unwrap().output.contains("$a: 2;"));
    }

    #[test]
    fn test_concurrent_compiles() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("_var.scss"), "$a: 1;\n").unwrap();
        let options = Options {
            cache_max_entries: Some(4),
            ..Options::default()
        };
        let host = BuildHost::new(options);
        assert_eq!(host.cache().policy(), CachePolicy::Bounded { max_entries: 4 });

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let result = host.preprocess("@import \"var\";\np { x: $a; }", dir.path()).unwrap();
                    assert!(result.output.contains("$a: 1;"));
                });
            }
        });
        assert_eq!(host.cache().len(), 1);
    }

    #[test]
    fn test_errors_abort_without_output() {
        let dir = tempdir().unwrap();
        let host = BuildHost::new(Options::default());
        let err = host.preprocess("span {}\n@import \"fail\";\n", dir.path()).unwrap_err();
        assert!(matches!(err, SassError::ImportNotFound { .. }));
    }
}
