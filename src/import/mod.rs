//! `@import` expansion.
//!
//! Imports are resolved depth-first: an imported file has all of its own
//! imports spliced in before it is spliced into the importer. Every token
//! from the nested expansion is moved forward by the byte offset of the
//! import site, and the provenance table gains one segment for the nested
//! content plus one for the importer's text that resumes after it.

mod cache;
mod graph;
mod provenance;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, SassError};
use crate::host::BuildHost;
use crate::lexer::{count_newlines, offset_to_location, tokenize_file, unquote, Token, TokenKind};

pub use cache::{CachePolicy, FileCache};
pub use graph::DependencyGraph;
pub use provenance::{Origin, ProvenanceTable};

/// Fully expanded source with positions valid in `text`.
#[derive(Debug, Clone)]
pub struct Expansion {
    pub text: String,
    /// Tokens rebased onto `text`, ending with `Eof`.
    pub tokens: Vec<Token>,
    pub provenance: ProvenanceTable,
}

/// How one import name was satisfied.
#[derive(Debug)]
enum Resolved {
    Found {
        path: PathBuf,
        canonical: PathBuf,
        contents: Arc<str>,
    },
    AlreadyImported,
    Ignored,
}

/// One name inside an `@import` statement.
#[derive(Debug)]
struct ImportName {
    name: String,
    /// Source text as written (`"a"`, `url(x.css)`).
    written: String,
    plain_css: bool,
}

/// Output buffer that keeps its line count and token list in step.
#[derive(Default)]
struct Output {
    text: String,
    tokens: Vec<Token>,
    lines: usize,
}

impl Output {
    /// Keep a source token whose text has not been copied yet.
    ///
    /// Source between `copied` and the token is copied verbatim later, so the
    /// token lands at the current length plus that gap.
    fn push_pending(&mut self, token: &Token, copied: usize) {
        let mut token = token.clone();
        token.pos = self.text.len() + (token.pos - copied);
        self.tokens.push(token);
    }

    fn push_str(&mut self, text: &str) {
        self.lines += count_newlines(text);
        self.text.push_str(text);
    }

    /// Append generated text and its tokens.
    fn push_generated(&mut self, text: &str) -> Result<()> {
        let offset = self.text.len();
        for token in tokenize_file(text, "generated")? {
            if token.kind != TokenKind::Eof {
                self.tokens.push(token.rebased(offset));
            }
        }
        self.push_str(text);
        Ok(())
    }
}

/// Per-compile import state.
///
/// The `seen` set makes a file that is reachable twice (directly, through
/// two include paths or through a cycle) contribute its content once.
pub struct ImportResolver<'h> {
    host: &'h BuildHost,
    seen: HashSet<PathBuf>,
}

impl<'h> ImportResolver<'h> {
    pub fn new(host: &'h BuildHost) -> Self {
        Self {
            host,
            seen: HashSet::new(),
        }
    }

    /// Treat `path` as already imported (the main file of a compile).
    pub fn mark_seen(&mut self, path: impl Into<PathBuf>) {
        self.seen.insert(path.into());
    }

    /// Expand every import in `source`.
    ///
    /// `dir` is the directory relative imports resolve against, `label` the
    /// name diagnostics use for `source`, and `owner` the dependency-graph key
    /// of the importing file.
    pub fn expand(&mut self, dir: &Path, label: &str, owner: &Path, source: &str) -> Result<Expansion> {
        let tokens = tokenize_file(source, label)?;
        let mut out = Output::default();
        let mut provenance = ProvenanceTable::new(label);
        let mut copied = 0;
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Import => {}
                _ => {
                    out.push_pending(token, copied);
                    i += 1;
                    continue;
                }
            }

            let (names, semicolon) = import_names(&tokens, i, source, label)?;
            if names.iter().all(|n| n.plain_css) {
                // Plain CSS import: leave the statement for the engine.
                for token in &tokens[i..=semicolon] {
                    out.push_pending(token, copied);
                }
                i = semicolon + 1;
                continue;
            }

            out.push_str(&source[copied..token.pos]);
            // Set while the last spliced file left its final line unterminated.
            let mut open_line = false;
            for import in &names {
                if import.plain_css {
                    out.push_generated(&format!("@import {};", import.written))?;
                    continue;
                }
                match self.resolve(dir, &import.name, label, owner)? {
                    Resolved::Found {
                        path,
                        canonical,
                        contents,
                    } => {
                        let nested_dir = path.parent().unwrap_or(dir).to_path_buf();
                        let nested_label = path.display().to_string();
                        let nested = self.expand(&nested_dir, &nested_label, &canonical, &contents)?;
                        if nested.text.is_empty() {
                            continue;
                        }

                        let offset = out.text.len();
                        out.tokens.extend(
                            nested
                                .tokens
                                .iter()
                                .filter(|t| t.kind != TokenKind::Eof)
                                .map(|t| t.rebased(offset)),
                        );
                        provenance.splice(out.lines, nested.provenance);
                        out.push_str(&nested.text);
                        open_line = !nested.text.ends_with('\n');
                    }
                    Resolved::AlreadyImported => {}
                    Resolved::Ignored => {
                        log::warn!("ignoring unresolved import \"{}\" in {}", import.name, label);
                        out.push_generated(&format!("/* @import \"{}\" (stripped) */", import.name))?;
                    }
                }
            }

            let end = &tokens[semicolon];
            let resume_line = offset_to_location(source, end.pos).line as usize;
            if open_line {
                // The rest of the import line shares the partial's last line.
                provenance.mark(out.lines + 1, Origin::new(label, resume_line + 1));
            } else {
                provenance.mark(out.lines, Origin::new(label, resume_line));
            }
            copied = end.end();
            i = semicolon + 1;
        }

        out.push_str(&source[copied..]);
        let eof = out.text.len();
        out.tokens.push(Token::new(TokenKind::Eof, "", eof));

        Ok(Expansion {
            text: out.text,
            tokens: out.tokens,
            provenance,
        })
    }

    fn resolve(&mut self, dir: &Path, name: &str, importer: &str, owner: &Path) -> Result<Resolved> {
        let host = self.host;
        let options = host.options();
        let mut candidates = candidate_paths(dir, &options.include_paths, name);

        let Some(found) = candidates.iter().position(|c| c.is_file()) else {
            if is_ignored(name, &options.ignored_imports) {
                return Ok(Resolved::Ignored);
            }
            return Err(SassError::ImportNotFound {
                name: name.to_string(),
                importer: importer.to_string(),
                candidates,
            });
        };
        let path = candidates.swap_remove(found);

        let canonical = fs::canonicalize(&path).map_err(|e| SassError::io(&path, e))?;
        if !self.seen.insert(canonical.clone()) {
            log::debug!("{} already imported, skipping", canonical.display());
            return Ok(Resolved::AlreadyImported);
        }

        host.record_import(owner, &canonical);
        let contents = host.cache().load(&canonical)?;
        Ok(Resolved::Found {
            path,
            canonical,
            contents,
        })
    }
}

/// Parse the names of the `@import` at `tokens[start]`.
///
/// Returns the names and the index of the terminating `;`.
fn import_names(tokens: &[Token], start: usize, source: &str, label: &str) -> Result<(Vec<ImportName>, usize)> {
    let mut names = Vec::new();
    let mut i = start + 1;

    loop {
        while tokens[i].kind == TokenKind::Comment {
            i += 1;
        }
        let token = &tokens[i];
        match token.kind {
            TokenKind::Str | TokenKind::Ident => {
                let name = if token.kind == TokenKind::Str {
                    token.unquoted()
                } else {
                    token.text.as_str()
                };
                names.push(ImportName {
                    name: name.to_string(),
                    written: token.text.clone(),
                    plain_css: is_plain_css(name),
                });
                i += 1;
            }
            TokenKind::Function if token.text.eq_ignore_ascii_case("url") => {
                let close = tokens[i..]
                    .iter()
                    .position(|t| matches!(t.kind, TokenKind::RParen | TokenKind::Semicolon | TokenKind::Eof))
                    .map(|n| i + n)
                    .filter(|&n| tokens[n].kind == TokenKind::RParen)
                    .ok_or_else(|| syntax_error(")", &tokens[tokens.len() - 1], source, label))?;
                names.push(ImportName {
                    name: unquote(tokens.get(i + 2).map_or("", |t| t.text.as_str())).to_string(),
                    written: source[token.pos..tokens[close].end()].to_string(),
                    plain_css: true,
                });
                i = close + 1;
            }
            _ => return Err(syntax_error("import name", token, source, label)),
        }

        while tokens[i].kind == TokenKind::Comment {
            i += 1;
        }
        match tokens[i].kind {
            TokenKind::Comma => i += 1,
            TokenKind::Semicolon => return Ok((names, i)),
            _ => return Err(syntax_error(";", &tokens[i], source, label)),
        }
    }
}

fn syntax_error(expected: &str, found: &Token, source: &str, label: &str) -> SassError {
    SassError::Syntax {
        expected: expected.to_string(),
        found: found.to_string(),
        position: found.pos,
        file: label.to_string(),
        line: offset_to_location(source, found.pos).line as usize,
    }
}

/// Paths tried for `name`, in order, without repeats.
///
/// For each base directory (the importer's, then every include path) the
/// partial `_name.scss` is tried before `name.scss`.
pub fn candidate_paths(dir: &Path, include_paths: &[PathBuf], name: &str) -> Vec<PathBuf> {
    let relative = Path::new(name);
    let parent = relative.parent().unwrap_or(Path::new(""));
    let file = relative.file_name().and_then(|f| f.to_str()).unwrap_or(name);
    let stem = file.strip_suffix(".scss").unwrap_or(file);

    let mut candidates: Vec<PathBuf> = Vec::new();
    for base in std::iter::once(dir).chain(include_paths.iter().map(PathBuf::as_path)) {
        let base = if parent.as_os_str().is_empty() {
            base.to_path_buf()
        } else {
            base.join(parent)
        };
        for file_name in [format!("_{stem}.scss"), format!("{stem}.scss")] {
            let candidate = base.join(file_name);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

/// Imports the downstream engine handles itself.
pub fn is_plain_css(name: &str) -> bool {
    name.ends_with(".css")
        || name.starts_with("http://")
        || name.starts_with("https://")
        || name.starts_with("//")
}

/// Whether an unresolvable `name` belongs to a known third-party library.
pub fn is_ignored(name: &str, ignored: &[String]) -> bool {
    ignored.iter().any(|entry| {
        name == entry
            || name
                .strip_prefix(entry.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    })
}
