//! Token definitions.

use std::fmt;

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Variable reference or declaration name (`$name`).
    Variable,
    /// Identifier immediately followed by `(` (`sprite-map`, `url`, ...).
    Function,
    /// Any other bare word: numbers, selectors, property names, unquoted paths.
    Ident,
    /// Quoted literal. The text keeps its quotes.
    Str,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}` closing a block or an interpolation.
    RBrace,
    /// `#{`
    InterpStart,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `@import`
    Import,
    /// `@include`
    Include,
    /// Any other at-rule (`@mixin`, `@if`, `@function`, ...).
    AtRule,
    /// `// ...` or `/* ... */`
    Comment,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Whether the token opens a nested region closed by [`TokenKind::closer`].
    pub fn is_open(self) -> bool {
        matches!(self, TokenKind::LParen | TokenKind::InterpStart)
    }

    /// The kind that closes this opening kind.
    pub fn closer(self) -> Option<TokenKind> {
        match self {
            TokenKind::LParen => Some(TokenKind::RParen),
            TokenKind::InterpStart => Some(TokenKind::RBrace),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Variable => "variable",
            TokenKind::Function => "function",
            TokenKind::Ident => "identifier",
            TokenKind::Str => "string",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::InterpStart => "#{",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Import => "@import",
            TokenKind::Include => "@include",
            TokenKind::AtRule => "at-rule",
            TokenKind::Comment => "comment",
            TokenKind::Eof => "end of input",
        };
        f.write_str(name)
    }
}

/// A single token with its kind, literal text and byte position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character in the buffer that was lexed.
    pub pos: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }

    /// Byte offset just past the token.
    pub fn end(&self) -> usize {
        self.pos + self.text.len()
    }

    /// Copy of the token moved forward by `offset` bytes.
    pub fn rebased(&self, offset: usize) -> Token {
        Token {
            kind: self.kind,
            text: self.text.clone(),
            pos: self.pos + offset,
        }
    }

    /// The text with surrounding quotes removed, for `Str` tokens.
    pub fn unquoted(&self) -> &str {
        unquote(&self.text)
    }

    /// Variable name without the leading `$`.
    pub fn variable_name(&self) -> &str {
        self.text.strip_prefix('$').unwrap_or(&self.text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("EOF"),
            _ => f.write_str(&self.text),
        }
    }
}

/// Strip one pair of matching single or double quotes.
pub fn unquote(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &text[1..text.len() - 1];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"img/*.png\""), "img/*.png");
        assert_eq!(unquote("'a'"), "a");
        assert_eq!(unquote("\"a'"), "\"a'");
        assert_eq!(unquote("bare"), "bare");
        assert_eq!(unquote("\""), "\"");
    }

    #[test]
    fn test_token_end_and_rebase() {
        let token = Token::new(TokenKind::Variable, "$sprites", 4);
        assert_eq!(token.end(), 12);
        assert_eq!(token.variable_name(), "sprites");

        let moved = token.rebased(10);
        assert_eq!(moved.pos, 14);
        assert_eq!(moved.text, "$sprites");
    }
}
