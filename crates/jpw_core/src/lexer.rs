//! Lexer for path and filter expressions

use crate::error::{ErrorKind, ParseError};
use crate::scan::{self, PositionedChar, Scanned, StringSpan};
use tracing::trace;

/// Punctuation the grammar knows about
pub const SYMBOLS: &[char] = &[
    '.', '[', ']', '(', ')', '?', '@', '*', ',', ':', '!', '=', '<', '>', '&', '|', '-',
];

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Single supported punctuation character
    Symbol(char),
    /// Unsigned number, integer or decimal
    Number(f64),
    /// `true` or `false`
    Bool(bool),
    /// Bare identifier
    Property(String),
    /// Quoted string, quotes stripped and escapes resolved
    StringLiteral(String),
    Whitespace(char),
}

/// Token with its source range (char offsets, `end` inclusive)
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn symbol(&self) -> Option<char> {
        match self.kind {
            TokenKind::Symbol(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_symbol(&self, c: char) -> bool {
        self.symbol() == Some(c)
    }

    pub fn is_whitespace(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace(_))
    }

    /// Short rendering for error messages
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Symbol(c) => format!("'{c}'"),
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Bool(b) => format!("'{b}'"),
            TokenKind::Property(name) => format!("'{name}'"),
            TokenKind::StringLiteral(s) => format!("string '{s}'"),
            TokenKind::Whitespace(_) => "whitespace".to_string(),
        }
    }
}

/// Tokenize raw text
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let scanned = scan::scan(input)?;
    let tokens = Lexer::new(&scanned).tokenize()?;
    trace!(tokens = tokens.len(), "tokenized input");
    Ok(tokens)
}

/// Lexer over pre-scanned characters
pub struct Lexer<'a> {
    chars: &'a [PositionedChar],
    strings: &'a [StringSpan],
    index: usize,
    next_string: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(scanned: &'a Scanned) -> Self {
        Self {
            chars: &scanned.chars,
            strings: &scanned.strings,
            index: 0,
            next_string: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        let Some(&current) = self.chars.get(self.index) else {
            return Ok(None);
        };

        if let Some(span) = self.strings.get(self.next_string)
            && span.open == self.index
        {
            return Ok(Some(self.read_string()));
        }

        if current.escaped {
            return Err(ParseError::new(
                ErrorKind::UnrecognizedCharacter,
                current.position,
                format!("escaped character '{}' outside of a string", current.ch),
            ));
        }

        if current.ch.is_whitespace() {
            self.index += 1;
            return Ok(Some(Token {
                kind: TokenKind::Whitespace(current.ch),
                start: current.position,
                end: current.position,
            }));
        }

        if let Some(token) = self.read_number() {
            return Ok(Some(token));
        }

        if SYMBOLS.contains(&current.ch) {
            self.index += 1;
            return Ok(Some(Token {
                kind: TokenKind::Symbol(current.ch),
                start: current.position,
                end: current.position,
            }));
        }

        if is_ident_start(current.ch) {
            return Ok(Some(self.read_ident_or_keyword()));
        }

        if current.ch.is_ascii_punctuation() {
            return Err(ParseError::new(
                ErrorKind::UnrecognizedSymbol,
                current.position,
                format!("unrecognized symbol '{}'", current.ch),
            ));
        }

        Err(ParseError::new(
            ErrorKind::UnrecognizedCharacter,
            current.position,
            format!("unrecognized character sequence starting with '{}'", current.ch),
        ))
    }

    fn read_string(&mut self) -> Token {
        let span = &self.strings[self.next_string];
        let token = Token {
            kind: TokenKind::StringLiteral(span.value.clone()),
            start: self.chars[span.open].position,
            end: self.chars[span.close].position,
        };
        self.index = span.close + 1;
        self.next_string += 1;
        token
    }

    /// Digits with at most one `.`, which must be followed by a digit.
    /// A lone `.` is left for the symbol branch.
    fn read_number(&mut self) -> Option<Token> {
        let mut text = String::new();
        let mut seen_dot = false;
        let mut index = self.index;

        while let Some(c) = self.chars.get(index) {
            if c.ch.is_ascii_digit() {
                text.push(c.ch);
            } else if c.ch == '.'
                && !seen_dot
                && self
                    .chars
                    .get(index + 1)
                    .is_some_and(|next| next.ch.is_ascii_digit())
            {
                seen_dot = true;
                text.push('.');
            } else {
                break;
            }
            index += 1;
        }

        if text.is_empty() {
            return None;
        }

        let value: f64 = text.parse().ok()?;
        let token = Token {
            kind: TokenKind::Number(value),
            start: self.chars[self.index].position,
            end: self.chars[index - 1].position,
        };
        self.index = index;
        Some(token)
    }

    fn read_ident_or_keyword(&mut self) -> Token {
        let start = self.chars[self.index].position;
        let mut ident = String::new();
        let mut end = start;

        while let Some(c) = self.chars.get(self.index) {
            if c.escaped || !is_ident_char(c.ch) {
                break;
            }
            ident.push(c.ch);
            end = c.position;
            self.index += 1;
        }

        let kind = match ident.as_str() {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            _ => TokenKind::Property(ident),
        };

        Token { kind, start, end }
    }
}

/// Letters, `_` and `$` may start an identifier
pub fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

/// Identifier continuation: start characters plus digits
pub fn is_ident_char(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}
