//! Filter expressions: the part of a path inside `[?( ... )]`

pub mod parser;
pub mod tokenizer;
pub mod tokens;

pub use tokens::ExprToken;

use crate::ast::{Filter, FilterExpr};
use crate::error::{Error, ParseError};
use crate::eval;
use crate::lexer::{self, Token};
use crate::options::Options;
use serde_json::Value;
use tracing::trace;

/// Compile the lexer tokens of a filter body. `position` is where the body
/// starts in the original input.
pub fn compile(tokens: &[Token], position: usize, options: &Options) -> Result<FilterExpr, Error> {
    if tokens.iter().all(Token::is_whitespace) {
        return Err(ParseError::unexpected(position, "filter expression is empty").into());
    }

    let classified = tokenizer::tokenize(tokens, options)?;
    trace!(tokens = classified.len(), "classified filter tokens");
    parser::parse(&classified, position, options)
}

impl Filter {
    /// Parse a standalone filter body such as `@.price < 10`
    pub fn parse(source: &str) -> Result<Self, Error> {
        Self::parse_with(source, &Options::default())
    }

    pub fn parse_with(source: &str, options: &Options) -> Result<Self, Error> {
        let tokens = lexer::tokenize(source)?;
        let expression = compile(&tokens, 0, options)?;
        Ok(Self {
            source: source.to_string(),
            expression,
        })
    }

    /// Whether `value` passes this filter
    pub fn matches(&self, value: &Value) -> bool {
        eval::filter_matches(&self.expression, value)
    }
}
