//! Directive parser and rewriter.
//!
//! Walks the token stream of the fully expanded source once, left to right,
//! with an explicit cursor. Two statement shapes are recognized:
//!
//! - `$name: value;` stores `value` verbatim under `name`.
//! - `$name: sprite-map(...);` builds a sprite sheet and schedules a
//!   replacement of the call with the rendered map literal.
//!
//! Everything else is skipped and survives byte-for-byte, since the output
//! is produced by applying byte-range replacements to the input text.
//!
//! # Usage
//!
//! ```ignore
//! use spritesass::parser::{apply, Parser};
//!
//! let (state, replacements) = Parser::new(&text, &tokens, &paths, provenance).parse()?;
//! let output = apply(&text, &replacements);
//! ```

mod delimiter;
mod rewrite;

use std::collections::{BTreeMap, HashMap};

use crate::config::Paths;
use crate::error::{Result, SassError};
use crate::import::{Origin, ProvenanceTable};
use crate::lexer::{unquote, Token, TokenKind, STDIN_LABEL};
use crate::sprite::{Layout, SpriteSheet};

pub use delimiter::{match_delimiter, Match, Unbalanced};
pub use rewrite::{apply, Replacement};

/// Name of the sprite construction directive.
pub const SPRITE_MAP: &str = "sprite-map";

/// Everything learned from one compile.
#[derive(Debug, Default)]
pub struct ParseState {
    /// Variable name (without `$`) → value text.
    pub vars: HashMap<String, String>,
    /// Variable name (without `$`) → sheet built for it.
    pub sprites: BTreeMap<String, SpriteSheet>,
    pub provenance: ProvenanceTable,
}

impl ParseState {
    /// Original `file:line` of a 0-based line in the expanded text.
    pub fn locate(&self, flat_line: usize) -> Option<Origin> {
        self.provenance.locate(flat_line)
    }
}

/// One argument of a `sprite-map(...)` call.
#[derive(Debug)]
enum SpriteArg<'t> {
    Glob(String),
    Keyword { name: &'t str, value: &'t [Token] },
    Ignored,
}

/// Single-pass directive parser over an immutable token buffer.
pub struct Parser<'a> {
    text: &'a str,
    tokens: &'a [Token],
    paths: &'a Paths,
    cursor: usize,
    state: ParseState,
    replacements: Vec<Replacement>,
}

impl<'a> Parser<'a> {
    /// `tokens` must be the tokens of `text`, ending with `Eof`.
    pub fn new(text: &'a str, tokens: &'a [Token], paths: &'a Paths, provenance: ProvenanceTable) -> Self {
        Self {
            text,
            tokens,
            paths,
            cursor: 0,
            state: ParseState {
                provenance,
                ..ParseState::default()
            },
            replacements: Vec::new(),
        }
    }

    /// Run the statement loop.
    pub fn parse(mut self) -> Result<(ParseState, Vec<Replacement>)> {
        let tokens = self.tokens;
        let mut at_start = true;

        while let Some(token) = tokens.get(self.cursor) {
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Comment => self.cursor += 1,
                TokenKind::Variable if at_start => {
                    self.declaration()?;
                    at_start = true;
                }
                TokenKind::LParen | TokenKind::InterpStart => {
                    self.cursor = self.matched(self.cursor)?.end;
                    at_start = false;
                }
                TokenKind::RParen => return Err(self.syntax_error("matching (", token)),
                TokenKind::Semicolon | TokenKind::LBrace | TokenKind::RBrace => {
                    self.cursor += 1;
                    at_start = true;
                }
                _ => {
                    self.cursor += 1;
                    at_start = false;
                }
            }
        }

        Ok((self.state, self.replacements))
    }

    /// `$name: ...` at the cursor.
    fn declaration(&mut self) -> Result<()> {
        let name = self.tokens[self.cursor].variable_name().to_string();
        let colon = self.skip_comments(self.cursor + 1);
        let separator = &self.tokens[colon];
        if separator.kind != TokenKind::Colon {
            return Err(self.syntax_error(":", separator));
        }

        let value_start = self.skip_comments(colon + 1);
        let first = &self.tokens[value_start];
        if first.kind == TokenKind::Function && first.text == SPRITE_MAP {
            return self.sprite_map(&name, value_start);
        }

        let value_end = self.value_end(value_start)?;
        let value = if value_end > value_start {
            let start = self.tokens[value_start].pos;
            let end = self.tokens[value_end - 1].end();
            self.text[start..end].trim()
        } else {
            ""
        };
        if !value.is_empty() && value != "()" {
            self.state.vars.insert(name, value.to_string());
        }

        self.cursor = match self.tokens[value_end].kind {
            TokenKind::Semicolon => value_end + 1,
            _ => value_end,
        };
        Ok(())
    }

    /// Index of the `;`, block-closing `}` or `Eof` ending a value.
    fn value_end(&self, start: usize) -> Result<usize> {
        let mut i = start;
        loop {
            let token = &self.tokens[i];
            match token.kind {
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => return Ok(i),
                TokenKind::LParen | TokenKind::InterpStart => i = self.matched(i)?.end,
                TokenKind::RParen => return Err(self.syntax_error("matching (", token)),
                _ => i += 1,
            }
        }
    }

    /// `sprite-map(...)` at `call`, bound to `$name`.
    fn sprite_map(&mut self, name: &str, call: usize) -> Result<()> {
        let open = call + 1;
        let matched = self.matched(open)?;
        if let Some(nested) = matched.first_nested {
            return Err(self.syntax_error("a literal or variable argument", &self.tokens[nested]));
        }

        let mut globs = Vec::new();
        let mut layout = Layout::default();
        for arg in self.split_args(open + 1, matched.close)? {
            match arg {
                SpriteArg::Glob(glob) => globs.push(glob),
                SpriteArg::Keyword { name: "layout", value } => {
                    let text: String = value
                        .iter()
                        .filter(|t| t.kind != TokenKind::Comment)
                        .map(|t| t.text.as_str())
                        .collect();
                    layout = Layout::parse(unquote(&text)).ok_or_else(|| match value.first() {
                        Some(token) => self.syntax_error("horizontal or vertical", token),
                        None => self.syntax_error("horizontal or vertical", &self.tokens[matched.close]),
                    })?;
                }
                SpriteArg::Keyword { name: keyword, .. } => {
                    log::debug!("sprite-map for ${}: ignoring ${}", name, keyword);
                }
                SpriteArg::Ignored => {}
            }
        }

        let mut sheet = SpriteSheet::from_globs(self.paths, &globs, layout)?;
        sheet.export()?;

        // Flags such as `!default` go with the call.
        let terminator = self.value_end(matched.end)?;
        let end = match self.tokens[terminator].kind {
            TokenKind::Semicolon => terminator + 1,
            _ => terminator,
        };
        self.replacements.push(Replacement::new(
            self.tokens[call].pos,
            self.tokens[end - 1].end(),
            sheet.render_map(name),
        ));
        self.state.sprites.insert(name.to_string(), sheet);
        self.cursor = end;
        Ok(())
    }

    /// Split the tokens between `start` and `close` on top-level commas.
    fn split_args(&self, start: usize, close: usize) -> Result<Vec<SpriteArg<'a>>> {
        let mut args = Vec::new();
        let mut from = start;
        for i in start..=close {
            if i == close || self.tokens[i].kind == TokenKind::Comma {
                args.push(self.sprite_arg(from, i)?);
                from = i + 1;
            }
        }
        Ok(args)
    }

    fn sprite_arg(&self, from: usize, to: usize) -> Result<SpriteArg<'a>> {
        let tokens: &'a [Token] = self.tokens;
        let significant: Vec<usize> = (from..to)
            .filter(|&i| tokens[i].kind != TokenKind::Comment)
            .collect();

        let arg = match significant.as_slice() {
            [] => SpriteArg::Ignored,
            [keyword, colon, ..]
                if tokens[*keyword].kind == TokenKind::Variable && tokens[*colon].kind == TokenKind::Colon =>
            {
                SpriteArg::Keyword {
                    name: tokens[*keyword].variable_name(),
                    value: &tokens[colon + 1..to],
                }
            }
            [only] => {
                let token = &tokens[*only];
                match token.kind {
                    TokenKind::Str => SpriteArg::Glob(self.interpolate(token.unquoted(), token)?),
                    TokenKind::Ident if is_number(&token.text) => SpriteArg::Ignored,
                    TokenKind::Ident => SpriteArg::Glob(token.text.clone()),
                    TokenKind::Variable => {
                        let value = self.resolve_variable(token)?;
                        SpriteArg::Glob(self.interpolate(unquote(&value), token)?)
                    }
                    _ => return Err(self.syntax_error("glob", token)),
                }
            }
            [first, ..] => return Err(self.syntax_error("glob", &tokens[*first])),
        };
        Ok(arg)
    }

    fn resolve_variable(&self, token: &Token) -> Result<String> {
        let value = self.state.vars.get(token.variable_name()).ok_or_else(|| {
            let origin = self.origin(token.pos);
            SassError::Sprite {
                message: format!("undefined variable {} at {}", token.text, origin),
                help: Some("declare the variable before the sprite-map call".to_string()),
            }
        })?;
        Ok(strip_flags(value).to_string())
    }

    /// Substitute `#{$var}` inside a glob string.
    fn interpolate(&self, text: &str, at: &Token) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find("#{") {
            out.push_str(&rest[..open]);
            let inner = &rest[open + 2..];
            let Some(close) = inner.find('}') else {
                return Err(self.syntax_error("}", at));
            };
            let expr = inner[..close].trim();
            let Some(var) = expr.strip_prefix('$') else {
                return Err(self.syntax_error("a variable inside #{}", at));
            };
            let value = self.state.vars.get(var).ok_or_else(|| SassError::Sprite {
                message: format!("undefined variable ${} at {}", var, self.origin(at.pos)),
                help: None,
            })?;
            out.push_str(unquote(strip_flags(value)));
            rest = &inner[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn matched(&self, open: usize) -> Result<Match> {
        match_delimiter(self.tokens, open).map_err(|err| {
            let found = &self.tokens[err.at];
            self.syntax_error(&err.expected.to_string(), found)
        })
    }

    fn skip_comments(&self, mut i: usize) -> usize {
        while self.tokens[i].kind == TokenKind::Comment {
            i += 1;
        }
        i
    }

    fn origin(&self, pos: usize) -> Origin {
        self.state
            .provenance
            .locate_offset(self.text, pos)
            .unwrap_or_else(|| Origin::new(STDIN_LABEL, 1))
    }

    fn syntax_error(&self, expected: &str, found: &Token) -> SassError {
        let origin = self.origin(found.pos);
        SassError::Syntax {
            expected: expected.to_string(),
            found: found.to_string(),
            position: found.pos,
            file: origin.file,
            line: origin.line,
        }
    }
}

/// Drop trailing `!default` / `!global` flags from a stored value.
fn strip_flags(value: &str) -> &str {
    let mut value = value.trim_end();
    for flag in ["!default", "!global"] {
        if let Some(stripped) = value.strip_suffix(flag) {
            value = stripped.trim_end();
        }
    }
    value
}

fn is_number(text: &str) -> bool {
    let digits = text.trim_start_matches(['-', '+']);
    digits.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && digits.chars().any(|c| c.is_ascii_digit())
}
