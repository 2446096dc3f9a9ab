//! Nested delimiter matching.
//!
//! `(` and `#{` are both "open" tokens. Matching starts at an open token and
//! returns the index just past its close, plus the index of the first open
//! token nested inside it (a sub-expression that would have to be evaluated
//! before the enclosing call).

use crate::lexer::{Token, TokenKind};

/// A matched delimiter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Index of the closing token.
    pub close: usize,
    /// Index just past the closing token.
    pub end: usize,
    /// First open token below the top level.
    pub first_nested: Option<usize>,
}

/// Where matching failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unbalanced {
    /// Index of the offending token (a wrong close, or `Eof`).
    pub at: usize,
    /// The close that was needed there.
    pub expected: TokenKind,
}

/// Match the open token at `tokens[open]`.
///
/// # Panics
///
/// Debug builds assert that `tokens[open]` is an open token.
pub fn match_delimiter(tokens: &[Token], open: usize) -> Result<Match, Unbalanced> {
    debug_assert!(tokens[open].kind.is_open());

    let mut expected: Vec<TokenKind> = Vec::new();
    let mut first_nested = None;

    for (i, token) in tokens.iter().enumerate().skip(open) {
        if let Some(closer) = token.kind.closer() {
            if !expected.is_empty() && first_nested.is_none() {
                first_nested = Some(i);
            }
            expected.push(closer);
            continue;
        }

        match token.kind {
            TokenKind::RParen | TokenKind::RBrace => {
                let Some(&want) = expected.last() else {
                    break;
                };
                if token.kind != want {
                    return Err(Unbalanced { at: i, expected: want });
                }
                expected.pop();
                if expected.is_empty() {
                    return Ok(Match {
                        close: i,
                        end: i + 1,
                        first_nested,
                    });
                }
            }
            TokenKind::Eof => {
                return Err(Unbalanced {
                    at: i,
                    expected: expected.last().copied().unwrap_or(TokenKind::RParen),
                })
            }
            _ => {}
        }
    }

    let at = tokens.len().saturating_sub(1);
    Err(Unbalanced {
        at,
        expected: expected.last().copied().unwrap_or(TokenKind::RParen),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn test_flat_parens() {
        let tokens = tokenize("f(a, b) c").unwrap();
        let m = match_delimiter(&tokens, 1).unwrap();
        assert_eq!(m.close, 5);
        assert_eq!(m.end, 6);
        assert_eq!(m.first_nested, None);
    }

    #[test]
    fn test_nested_call_position() {
        // f ( a , g ( b ) )
        let tokens = tokenize("f(a, g(b))").unwrap();
        let m = match_delimiter(&tokens, 1).unwrap();
        assert_eq!(m.close, 8);
        assert_eq!(m.first_nested, Some(5));
    }

    #[test]
    fn test_interpolation_counts_as_open() {
        // f ( #{ $x } )
        let tokens = tokenize("f(#{$x})").unwrap();
        let m = match_delimiter(&tokens, 1).unwrap();
        assert_eq!(m.first_nested, Some(2));
        assert_eq!(m.close, 5);

        let m = match_delimiter(&tokens, 2).unwrap();
        assert_eq!(m.close, 4);
        assert_eq!(m.first_nested, None);
    }

    #[test]
    fn test_mismatched_close() {
        let tokens = tokenize("(#{a)}").unwrap();
        let err = match_delimiter(&tokens, 0).unwrap_err();
        assert_eq!(err, Unbalanced { at: 3, expected: TokenKind::RBrace });
    }

    #[test]
    fn test_unclosed() {
        let tokens = tokenize("(a, (b)").unwrap();
        let err = match_delimiter(&tokens, 0).unwrap_err();
        assert_eq!(err.expected, TokenKind::RParen);
        assert_eq!(tokens[err.at].kind, TokenKind::Eof);
    }
}
