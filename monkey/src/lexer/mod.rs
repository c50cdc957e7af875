//! Lexer implementation using logos

mod token;

pub use token::Token;

use crate::ast::Span;
use crate::error::ParseError;
use logos::Logos;

/// Tokenize source code
///
/// Returns the token stream terminated by a single [`Token::Eof`], or the
/// first lexical error. Unterminated string literals and out-of-range
/// integer literals are errors rather than silent truncation.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        match result {
            Ok(Token::Eof) => {
                tokens.push((Token::Eof, span));
                return Ok(tokens);
            }
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                let slice = lexer.slice();
                let message = if slice.starts_with('"') {
                    "unterminated string literal".to_string()
                } else if slice.bytes().all(|b| b.is_ascii_digit()) {
                    format!("integer literal out of range: {slice}")
                } else {
                    format!("unexpected character: {slice:?}")
                };
                return Err(ParseError::new(message, span));
            }
        }
    }

    let end = source.len();
    tokens.push((Token::Eof, Span::new(end, end)));
    Ok(tokens)
}
