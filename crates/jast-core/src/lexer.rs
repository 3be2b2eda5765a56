//! JSON lexer: turns source text into a stream of [`Token`]s.
//!
//! The lexer is a pull-based iterator. Each call to `next` skips whitespace
//! and dispatches on the first significant character:
//!
//! - `{ } [ ] , :` are emitted immediately
//! - `"` enters the string body; escapes are decoded as they are read
//! - `-` or a digit enters the number body, which greedily takes
//!   digits, signs, `.`, `e` and `E` (grammar checks happen in the parser)
//! - anything else is a literal run that must spell `null`, `true` or `false`
//!
//! A failure produces one `TokenKind::Error` token and ends the stream; no
//! token ever follows an error token.

use std::iter::Peekable;
use std::str::Chars;

use crate::token::{LexErrorKind, Position, Token, TokenKind};

/// Pull-based tokenizer over a string slice.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    row: usize,
    col: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            row: 0,
            col: 0,
            finished: false,
        }
    }

    /// Position of the next unread character.
    pub fn current_position(&self) -> Position {
        Position::new(self.row, self.col)
    }

    /// Stop producing tokens. Further calls to `next` return `None`.
    pub fn stop(&mut self) {
        self.finished = true;
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Consume one character, keeping row/column in step.
    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        match c {
            '\n' => {
                self.row += 1;
                self.col = 0;
            }
            '\r' => self.col = 0,
            _ => self.col += 1,
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(' ' | '\t' | '\n' | '\r') = self.peek() {
            self.bump();
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let start = self.current_position();
        let c = self.peek()?;

        if let Some(token) = Token::punctuation(c, start) {
            self.bump();
            return Some(token);
        }
        let token = match c {
            '"' => self.read_string(start),
            '-' | '0'..='9' => self.read_number(start),
            _ => self.read_literal(start),
        };
        Some(token)
    }

    /// String body. `raw` mirrors the consumed source so an error token can
    /// carry the partial buffer.
    fn read_string(&mut self, start: Position) -> Token {
        let mut raw = String::new();
        let mut decoded = String::new();
        if let Some(quote) = self.bump() {
            raw.push(quote);
        }

        loop {
            let Some(c) = self.bump() else {
                return lex_error(LexErrorKind::UnterminatedString, raw, start);
            };
            raw.push(c);
            match c {
                '"' => return Token::with_text(TokenKind::String, decoded, start),
                '\\' => match self.read_escape(&mut raw) {
                    Ok(ch) => decoded.push(ch),
                    Err(kind) => return lex_error(kind, raw, start),
                },
                _ => decoded.push(c),
            }
        }
    }

    /// Decode the escape following a backslash.
    fn read_escape(&mut self, raw: &mut String) -> Result<char, LexErrorKind> {
        let c = self.bump().ok_or(LexErrorKind::UnterminatedString)?;
        raw.push(c);
        match c {
            '"' => Ok('"'),
            '\\' => Ok('\\'),
            '/' => Ok('/'),
            'b' => Ok('\u{08}'),
            'f' => Ok('\u{0C}'),
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            'u' => self.read_unicode_escape(raw),
            _ => Err(LexErrorKind::InvalidEscape),
        }
    }

    /// `\uXXXX`, combining a UTF-16 surrogate pair when the first unit is a
    /// high surrogate.
    fn read_unicode_escape(&mut self, raw: &mut String) -> Result<char, LexErrorKind> {
        let unit = self.read_hex4(raw)?;
        let code = match unit {
            0xD800..=0xDBFF => {
                for expected in ['\\', 'u'] {
                    if self.peek() != Some(expected) {
                        return Err(LexErrorKind::InvalidEscape);
                    }
                    if let Some(c) = self.bump() {
                        raw.push(c);
                    }
                }
                let low = self.read_hex4(raw)?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(LexErrorKind::InvalidEscape);
                }
                0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
            }
            0xDC00..=0xDFFF => return Err(LexErrorKind::InvalidEscape),
            _ => unit,
        };
        char::from_u32(code).ok_or(LexErrorKind::InvalidEscape)
    }

    fn read_hex4(&mut self, raw: &mut String) -> Result<u32, LexErrorKind> {
        let mut value = 0;
        for _ in 0..4 {
            let digit = match self.peek() {
                Some(c) => c.to_digit(16).ok_or(LexErrorKind::InvalidEscape)?,
                None => return Err(LexErrorKind::UnterminatedString),
            };
            if let Some(c) = self.bump() {
                raw.push(c);
            }
            value = (value << 4) | digit;
        }
        Ok(value)
    }

    fn read_number(&mut self, start: Position) -> Token {
        let mut text = String::new();
        while let Some(c @ ('0'..='9' | '-' | '+' | '.' | 'e' | 'E')) = self.peek() {
            text.push(c);
            self.bump();
        }
        Token::with_text(TokenKind::Number, text, start)
    }

    /// Literal body: consume up to the next delimiter and match it exactly.
    fn read_literal(&mut self, start: Position) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
        match text.as_str() {
            "null" => Token::new(TokenKind::Null, start),
            "true" => Token::new(TokenKind::True, start),
            "false" => Token::new(TokenKind::False, start),
            _ => lex_error(LexErrorKind::UnknownLiteral, text, start),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        match &token {
            Some(t) if t.is_error() => self.finished = true,
            None => self.finished = true,
            _ => {}
        }
        token
    }
}

/// Tokenize `input` with the synchronous lexer.
pub fn lex(input: &str) -> Lexer<'_> {
    Lexer::new(input)
}

fn lex_error(kind: LexErrorKind, text: String, start: Position) -> Token {
    Token::with_text(TokenKind::Error(kind), text, start)
}

fn is_delimiter(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\n' | '\r' | '{' | '}' | '[' | ']' | ',' | ':' | '"'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).map(|t| t.kind).collect()
    }

    #[test]
    fn bump_tracks_rows_and_columns() {
        let mut lexer = Lexer::new("a\r\nbc");
        lexer.bump();
        assert_eq!(lexer.current_position(), Position::new(0, 1));
        lexer.bump();
        assert_eq!(lexer.current_position(), Position::new(0, 0));
        lexer.bump();
        assert_eq!(lexer.current_position(), Position::new(1, 0));
        lexer.bump();
        assert_eq!(lexer.current_position(), Position::new(1, 1));
    }

    #[test]
    fn current_position_follows_the_stream() {
        let mut lexer = lex("[1,\n  2]");
        let by_ref = &mut lexer;
        assert_eq!(by_ref.next().map(|t| t.position), Some(Position::new(0, 0)));
        assert_eq!(by_ref.current_position(), Position::new(0, 1));
        by_ref.next();
        by_ref.next();
        let two = by_ref.next().unwrap();
        assert_eq!(two.text, "2");
        assert_eq!(two.position, Position::new(1, 2));
        assert_eq!(by_ref.current_position(), Position::new(1, 3));
    }

    #[test]
    fn columns_count_code_points() {
        let tokens: Vec<Token> = lex(r#"["é€", 1]"#).collect();
        assert_eq!(tokens[2].kind, TokenKind::Comma);
        assert_eq!(tokens[2].position, Position::new(0, 5));
    }

    #[test]
    fn number_body_is_greedy_and_unvalidated() {
        let tokens: Vec<Token> = lex("1.2.3e+-").collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].text, "1.2.3e+-");
    }

    #[test]
    fn stop_ends_the_stream() {
        let mut lexer = lex("[1, 2, 3]");
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::ArrayOpen));
        lexer.stop();
        assert!(lexer.next().is_none());
    }

    #[test]
    fn nothing_follows_an_error_token() {
        assert_eq!(
            kinds("[nope, 1]"),
            vec![
                TokenKind::ArrayOpen,
                TokenKind::Error(LexErrorKind::UnknownLiteral)
            ]
        );
    }
}
