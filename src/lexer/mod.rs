//! Tokenizer for the extended Sass dialect.
//!
//! The lexer only recognizes the structure the preprocessor needs: variables,
//! function calls, nesting punctuation, strings, imports and comments. Every
//! other byte sequence is an [`TokenKind::Ident`]; whitespace is skipped, so
//! callers rewrite the source by byte range rather than re-serializing tokens.
//!
//! # Usage
//!
//! ```ignore
//! use spritesass::lexer::Lexer;
//!
//! for token in Lexer::with_file(source, "main.scss") {
//!     let token = token?;
//!     println!("{} {:?} @{}", token.kind, token.text, token.pos);
//! }
//! ```

pub mod span;
mod token;

use std::iter::FusedIterator;

use crate::error::{Result, SassError};

pub use span::{count_newlines, offset_to_location, Location};
pub use token::{unquote, Token, TokenKind};

/// Label used for sources that do not come from a file.
pub const STDIN_LABEL: &str = "stdin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    Block,
    Interp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UrlState {
    Idle,
    /// `url` was emitted; the next token is its `(`.
    SawFunction,
    /// `url(` was emitted; an unquoted argument is read raw.
    SawParen,
}

/// Lazy, single-use token stream over one buffer.
///
/// Yields `Eof` exactly once, then `None`. After an error it yields nothing
/// further.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    file: String,
    pos: usize,
    braces: Vec<(Brace, usize)>,
    url: UrlState,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_file(source, STDIN_LABEL)
    }

    /// Create a lexer whose errors are attributed to `file`.
    pub fn with_file(source: &'a str, file: impl Into<String>) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            file: file.into(),
            pos: 0,
            braces: Vec::new(),
            url: UrlState::Idle,
            done: false,
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn error(&self, message: &str, position: usize) -> SassError {
        let location = offset_to_location(self.source, position);
        SassError::Lex {
            message: message.to_string(),
            position,
            file: self.file.clone(),
            line: location.line,
            column: location.column,
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, &self.source[start..self.pos], start)
    }

    fn skip_whitespace(&mut self) {
        while self.peek(0).is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        if self.url == UrlState::SawParen {
            self.url = UrlState::Idle;
            if let Some(token) = self.raw_url() {
                return Ok(token);
            }
        }

        let start = self.pos;
        let Some(byte) = self.peek(0) else {
            return self.finish();
        };

        let kind = match byte {
            b'/' if self.peek(1) == Some(b'/') => return Ok(self.line_comment(start)),
            b'/' if self.peek(1) == Some(b'*') => return self.block_comment(start),
            b'"' | b'\'' => return self.string(start, byte),
            b'$' => return Ok(self.prefixed(start, TokenKind::Variable)),
            b'@' => return Ok(self.prefixed(start, TokenKind::AtRule)),
            b'#' if self.peek(1) == Some(b'{') => {
                self.pos += 2;
                self.braces.push((Brace::Interp, start));
                return Ok(self.token(TokenKind::InterpStart, start));
            }
            b'{' => {
                self.braces.push((Brace::Block, start));
                TokenKind::LBrace
            }
            b'}' => {
                self.braces.pop();
                TokenKind::RBrace
            }
            b'(' => {
                if self.url == UrlState::SawFunction {
                    self.url = UrlState::SawParen;
                }
                TokenKind::LParen
            }
            b')' => TokenKind::RParen,
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            _ => return Ok(self.word(start)),
        };

        self.pos += 1;
        if kind != TokenKind::LParen {
            self.url = UrlState::Idle;
        }
        Ok(self.token(kind, start))
    }

    fn finish(&mut self) -> Result<Token> {
        if let Some(&(_, open)) = self.braces.iter().rev().find(|(b, _)| *b == Brace::Interp) {
            return Err(self.error("unterminated interpolation", open));
        }
        Ok(Token::new(TokenKind::Eof, "", self.source.len()))
    }

    fn line_comment(&mut self, start: usize) -> Token {
        while self.peek(0).is_some_and(|b| b != b'\n') {
            self.pos += 1;
        }
        self.token(TokenKind::Comment, start)
    }

    fn block_comment(&mut self, start: usize) -> Result<Token> {
        self.pos += 2;
        loop {
            match self.peek(0) {
                None => return Err(self.error("unterminated comment", start)),
                Some(b'*') if self.peek(1) == Some(b'/') => {
                    self.pos += 2;
                    return Ok(self.token(TokenKind::Comment, start));
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn string(&mut self, start: usize, quote: u8) -> Result<Token> {
        self.pos += 1;
        loop {
            match self.peek(0) {
                None => return Err(self.error("unterminated string", start)),
                Some(b'\\') => self.pos = (self.pos + 2).min(self.bytes.len()),
                Some(b'#') if self.peek(1) == Some(b'{') => self.skip_interpolation()?,
                Some(b) if b == quote => {
                    self.pos += 1;
                    return Ok(self.token(TokenKind::Str, start));
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skip a `#{...}` block embedded in a string.
    fn skip_interpolation(&mut self) -> Result<()> {
        let open = self.pos;
        self.pos += 2;
        let mut depth = 1;
        while depth > 0 {
            match self.peek(0) {
                None => return Err(self.error("unterminated interpolation", open)),
                Some(b'{') => depth += 1,
                Some(b'}') => depth -= 1,
                Some(_) => {}
            }
            self.pos += 1;
        }
        Ok(())
    }

    /// `$name` or `@name`. A bare sigil lexes as an identifier.
    fn prefixed(&mut self, start: usize, kind: TokenKind) -> Token {
        self.pos += 1;
        while self.peek(0).is_some_and(is_name_byte) {
            self.pos += 1;
        }
        self.url = UrlState::Idle;
        if self.pos == start + 1 {
            return self.token(TokenKind::Ident, start);
        }
        let kind = match (kind, &self.source[start + 1..self.pos]) {
            (TokenKind::AtRule, "import") => TokenKind::Import,
            (TokenKind::AtRule, "include") => TokenKind::Include,
            (kind, _) => kind,
        };
        self.token(kind, start)
    }

    fn word(&mut self, start: usize) -> Token {
        while let Some(b) = self.peek(0) {
            let comment = b == b'/' && matches!(self.peek(1), Some(b'/') | Some(b'*'));
            let interp = b == b'#' && self.peek(1) == Some(b'{');
            if !is_word_byte(b) || comment || interp {
                break;
            }
            self.pos += 1;
        }

        let kind = if self.peek(0) == Some(b'(') {
            TokenKind::Function
        } else {
            TokenKind::Ident
        };
        self.url = if kind == TokenKind::Function
            && self.source[start..self.pos].eq_ignore_ascii_case("url")
        {
            UrlState::SawFunction
        } else {
            UrlState::Idle
        };
        self.token(kind, start)
    }

    /// Read an unquoted `url(...)` argument as a single identifier.
    fn raw_url(&mut self) -> Option<Token> {
        match self.peek(0) {
            None | Some(b'"') | Some(b'\'') | Some(b')') | Some(b'$') => return None,
            Some(b'#') if self.peek(1) == Some(b'{') => return None,
            _ => {}
        }
        let start = self.pos;
        while self.peek(0).is_some_and(|b| b != b')') {
            self.pos += 1;
        }
        while self.pos > start && self.bytes[self.pos - 1].is_ascii_whitespace() {
            self.pos -= 1;
        }
        Some(self.token(TokenKind::Ident, start))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) if token.kind == TokenKind::Eof => self.done = true,
            Err(_) => self.done = true,
            Ok(_) => {}
        }
        Some(result)
    }
}

impl FusedIterator for Lexer<'_> {}

/// Tokenize a whole buffer, ending with an `Eof` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).collect()
}

/// Tokenize a whole buffer, attributing errors to `file`.
pub fn tokenize_file(source: &str, file: &str) -> Result<Vec<Token>> {
    Lexer::with_file(source, file).collect()
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b >= 0x80
}

fn is_word_byte(b: u8) -> bool {
    !b.is_ascii_whitespace()
        && !matches!(
            b,
            b'(' | b')' | b'{' | b'}' | b';' | b':' | b',' | b'\'' | b'"' | b'$' | b'@'
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_variable_declaration() {
        let tokens = tokenize("$sprites: sprite-map(\"img/*.png\");").unwrap();
        let summary: Vec<_> = tokens.iter().map(|t| (t.kind, t.text.as_str(), t.pos)).collect();

        assert_eq!(
            summary,
            vec![
                (TokenKind::Variable, "$sprites", 0),
                (TokenKind::Colon, ":", 8),
                (TokenKind::Function, "sprite-map", 10),
                (TokenKind::LParen, "(", 20),
                (TokenKind::Str, "\"img/*.png\"", 21),
                (TokenKind::RParen, ")", 32),
                (TokenKind::Semicolon, ";", 33),
                (TokenKind::Eof, "", 34),
            ]
        );
    }

    #[test]
    fn test_import_and_include_keywords() {
        assert_eq!(
            kinds("@import \"var\";\n@include foo;\n@mixin bar {}"),
            vec![
                TokenKind::Import,
                TokenKind::Str,
                TokenKind::Semicolon,
                TokenKind::Include,
                TokenKind::Ident,
                TokenKind::Semicolon,
                TokenKind::AtRule,
                TokenKind::Ident,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        let tokens = tokenize("a // line\n/* block\n */ b").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(tokens[1].text, "// line");
        assert_eq!(tokens[2].kind, TokenKind::Comment);
        assert_eq!(tokens[2].text, "/* block\n */");
        assert_eq!(tokens[3].text, "b");
    }

    #[test]
    fn test_interpolation_tokens() {
        assert_eq!(
            kinds("p.#{$name} { }"),
            vec![
                TokenKind::Ident,
                TokenKind::InterpStart,
                TokenKind::Variable,
                TokenKind::RBrace,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_with_interpolation_is_one_token() {
        let tokens = tokenize("\"#{$dir}/*.png\"").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].text, "\"#{$dir}/*.png\"");
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let tokens = tokenize(r#"'it\'s'"#).unwrap();
        assert_eq!(tokens[0].text, r#"'it\'s'"#);
    }

    #[test]
    fn test_unquoted_url_is_raw() {
        let tokens = tokenize("background: url(http://x.com/a.png );").unwrap();
        let url = &tokens[3];
        assert_eq!(url.kind, TokenKind::Ident);
        assert_eq!(url.text, "http://x.com/a.png");
        assert_eq!(tokens[4].kind, TokenKind::RParen);
    }

    #[test]
    fn test_unterminated_string_error() {
        let err = tokenize("a {\n  b: \"oops;\n}").unwrap_err();
        match err {
            SassError::Lex { position, line, column, .. } => {
                assert_eq!(position, 9);
                assert_eq!(line, 2);
                assert_eq!(column, 6);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_interpolation_error() {
        let err = tokenize("p.#{$name { }").unwrap_err();
        assert!(matches!(err, SassError::Lex { position: 2, .. }));

        let err = tokenize("\"#{$a\"").unwrap_err();
        assert!(matches!(err, SassError::Lex { position: 1, .. }));
    }

    #[test]
    fn test_lexer_is_fused_after_eof() {
        let mut lexer = Lexer::new("a");
        assert!(lexer.next().is_some());
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Eof);
        assert!(lexer.next().is_none());
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_error_carries_file_label() {
        let err = tokenize_file("/* open", "_var.scss").unwrap_err();
        assert!(err.to_string().starts_with("_var.scss:1:1"));
    }

    #[test]
    fn test_bare_sigils() {
        assert_eq!(kinds("$ @"), vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]);
    }
}
