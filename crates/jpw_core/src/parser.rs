//! Parser for path queries

use crate::accessor::{self, AccessorPart, Part};
use crate::ast::{Filter, JsonPath, PathElement};
use crate::error::{Error, ErrorKind, ParseError};
use crate::filter;
use crate::lexer::{self, Token, TokenKind};
use crate::options::Options;
use tracing::trace;

/// What the previous element allows next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    /// After a single `.`
    Separator,
    /// After `..`
    Descent,
    /// After a name, `*` or a bracket
    Item,
}

/// Parser for path queries
pub struct Parser<'a> {
    /// Raw input, kept for filter source text
    chars: Vec<char>,
    /// Lexer tokens without whitespace
    tokens: Vec<Token>,
    index: usize,
    options: &'a Options,
}

impl<'a> Parser<'a> {
    pub fn new(input: &str, tokens: Vec<Token>, options: &'a Options) -> Self {
        Self {
            chars: input.chars().collect(),
            tokens: tokens.into_iter().filter(|t| !t.is_whitespace()).collect(),
            index: 0,
            options,
        }
    }

    /// Parse a path query string
    pub fn parse(input: &str) -> Result<JsonPath, Error> {
        Self::parse_with(input, &Options::default())
    }

    pub fn parse_with(input: &str, options: &Options) -> Result<JsonPath, Error> {
        let tokens = lexer::tokenize(input)?;
        let path = Parser::new(input, tokens, options).parse_path()?;
        trace!(elements = path.elements.len(), "parsed path");
        Ok(path)
    }

    fn parse_path(&mut self) -> Result<JsonPath, Error> {
        let mut elements = Vec::new();
        let mut state = State::Start;

        while let Some(token) = self.current().cloned() {
            match &token.kind {
                TokenKind::Symbol('.') => {
                    let descent = self
                        .peek(1)
                        .is_some_and(|next| next.is_symbol('.') && next.start == token.end + 1);
                    match state {
                        State::Start => {
                            return Err(ParseError::unexpected(
                                token.start,
                                "path cannot start with '.'",
                            )
                            .into());
                        }
                        State::Separator | State::Descent => {
                            return Err(ParseError::unexpected(
                                token.start,
                                "two path separators in a row",
                            )
                            .into());
                        }
                        State::Item if descent => {
                            elements.push(PathElement::RecursiveDescent);
                            state = State::Descent;
                            self.advance();
                        }
                        State::Item => state = State::Separator,
                    }
                    self.advance();
                }
                TokenKind::Symbol('[') => {
                    if state == State::Separator {
                        return Err(ParseError::unexpected(
                            token.start,
                            "'[' cannot follow a path separator",
                        )
                        .into());
                    }
                    elements.push(self.parse_bracket()?);
                    state = State::Item;
                }
                TokenKind::Symbol('*') => {
                    self.expect_name_slot(state, &token)?;
                    elements.push(PathElement::Wildcard);
                    state = State::Item;
                    self.advance();
                }
                TokenKind::Property(name) => {
                    self.expect_name_slot(state, &token)?;
                    elements.push(PathElement::Property {
                        name: name.clone(),
                        escaped: false,
                    });
                    state = State::Item;
                    self.advance();
                }
                TokenKind::Bool(b) => {
                    self.expect_name_slot(state, &token)?;
                    elements.push(PathElement::Property {
                        name: b.to_string(),
                        escaped: false,
                    });
                    state = State::Item;
                    self.advance();
                }
                TokenKind::Number(_) => {
                    return Err(ParseError::new(
                        ErrorKind::InvalidPropertyName,
                        token.start,
                        "property name cannot start with a digit",
                    )
                    .into());
                }
                TokenKind::Symbol(']') => {
                    return Err(ParseError::new(
                        ErrorKind::UnbalancedGroup,
                        token.start,
                        "']' has no matching '['",
                    )
                    .into());
                }
                TokenKind::Symbol(_) | TokenKind::StringLiteral(_) | TokenKind::Whitespace(_) => {
                    return Err(ParseError::unexpected(
                        token.start,
                        format!("unexpected {}", token.describe()),
                    )
                    .into());
                }
            }
        }

        match state {
            State::Start => Err(ParseError::unexpected(0, "path is empty").into()),
            State::Separator => {
                let position = self.tokens.last().map(|t| t.start).unwrap_or(0);
                Err(ParseError::unexpected(position, "path cannot end with '.'").into())
            }
            State::Descent | State::Item => Ok(JsonPath::new(elements)),
        }
    }

    /// Names and `*` may not directly follow another element
    fn expect_name_slot(&self, state: State, token: &Token) -> Result<(), ParseError> {
        if state == State::Item {
            return Err(ParseError::unexpected(
                token.start,
                format!("unexpected {}, expected '.' or '['", token.describe()),
            ));
        }
        Ok(())
    }

    /// Parse `[...]` starting at the current `[`
    fn parse_bracket(&mut self) -> Result<PathElement, Error> {
        let open = self.current_position();

        if self.peek(1).is_some_and(|t| t.is_symbol('?')) {
            return self.parse_filter(open);
        }

        let start = self.index + 1;
        let close = self.tokens[start..]
            .iter()
            .position(|t| t.is_symbol(']') || t.is_symbol('['))
            .map(|offset| start + offset);
        let close = match close {
            Some(close) if self.tokens[close].is_symbol(']') => close,
            Some(nested) => {
                return Err(
                    ParseError::unexpected(self.tokens[nested].start, "unexpected '['").into(),
                );
            }
            None => {
                return Err(ParseError::new(
                    ErrorKind::UnbalancedGroup,
                    open,
                    "'[' has no matching ']'",
                )
                .into());
            }
        };

        let content = &self.tokens[start..close];
        let element = match content {
            [
                Token {
                    kind: TokenKind::StringLiteral(name),
                    ..
                },
            ] => PathElement::Property {
                name: name.clone(),
                escaped: true,
            },
            [star] if star.is_symbol('*') => PathElement::Wildcard,
            _ => {
                let parts: Vec<AccessorPart> = content.iter().map(accessor_part).collect();
                PathElement::ArrayAccess(accessor::parse_accessor(&parts, open)?)
            }
        };

        self.index = close + 1;
        Ok(element)
    }

    /// Parse `[?( ... )]`; `open` is the position of the `[`
    fn parse_filter(&mut self, open: usize) -> Result<PathElement, Error> {
        let question = self.index + 1;
        let paren = question + 1;
        // `[`, `?` and `(` form a single opener, no whitespace in between
        let question_start = self.tokens[question].start;
        if question_start != open + 1 {
            return Err(ParseError::unexpected(
                question_start,
                "'?' must directly follow '[' in a filter",
            )
            .into());
        }
        match self.tokens.get(paren) {
            Some(t) if t.is_symbol('(') && t.start == question_start + 1 => {}
            Some(t) if t.is_symbol('(') => {
                return Err(ParseError::unexpected(
                    t.start,
                    "'(' must directly follow '[?' in a filter",
                )
                .into());
            }
            _ => {
                return Err(
                    ParseError::unexpected(question_start, "expected '(' after '[?'").into(),
                );
            }
        }

        let mut depth = 0usize;
        let mut close_paren = None;
        for (offset, token) in self.tokens[paren..].iter().enumerate() {
            if token.is_symbol('(') {
                depth += 1;
            } else if token.is_symbol(')') {
                depth -= 1;
                if depth == 0 {
                    close_paren = Some(paren + offset);
                    break;
                }
            }
        }

        let Some(close_paren) = close_paren else {
            return Err(ParseError::new(
                ErrorKind::UnbalancedGroup,
                open,
                "filter expression opened at '[' has no matching ')'",
            )
            .into());
        };
        if !self
            .tokens
            .get(close_paren + 1)
            .is_some_and(|t| t.is_symbol(']'))
        {
            return Err(ParseError::new(
                ErrorKind::UnbalancedGroup,
                open,
                "filter expression opened at '[' has no matching ']'",
            )
            .into());
        }

        let body_start = self.tokens[paren].start + 1;
        let body_end = self.tokens[close_paren].start;
        let source: String = self.chars[body_start..body_end].iter().collect();
        let expression = filter::compile(
            &self.tokens[paren + 1..close_paren],
            body_start,
            self.options,
        )?;

        self.index = close_paren + 2;
        Ok(PathElement::Filter(Filter { source, expression }))
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.index + offset)
    }

    fn current_position(&self) -> usize {
        self.current()
            .map(|t| t.start)
            .unwrap_or_else(|| self.chars.len())
    }

    fn advance(&mut self) {
        self.index += 1;
    }
}

fn accessor_part(token: &Token) -> AccessorPart {
    let part = match &token.kind {
        TokenKind::Symbol(c) => Part::Symbol(*c),
        TokenKind::Number(n) => Part::Number(*n),
        TokenKind::Property(word) => Part::Word(word.clone()),
        TokenKind::Bool(b) => Part::Word(b.to_string()),
        TokenKind::StringLiteral(s) => Part::Other(format!("'{s}'")),
        TokenKind::Whitespace(c) => Part::Other(c.to_string()),
    };
    AccessorPart::new(part, token.start)
}
