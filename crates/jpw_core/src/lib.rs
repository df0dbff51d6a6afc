//! jpw_core - JSONPath-style query language with filter expressions
//!
//! Queries are pre-scanned, tokenized, parsed into path elements and
//! evaluated against `serde_json` values. Filter expressions inside
//! `[?( ... )]` go through their own tokenizer and tree builder.

mod accessor;
pub mod ast;
pub mod error;
pub mod eval;
pub mod filter;
pub mod lexer;
pub mod methods;
pub mod options;
pub mod parser;
pub mod scan;

pub use ast::{Filter, FilterExpr, JsonPath, PathElement};
pub use error::{Error, ErrorKind, InternalError, ParseError};
pub use options::Options;

use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, warn};

impl JsonPath {
    /// Parse a query with default limits
    pub fn parse(path: &str) -> Result<Self, Error> {
        Self::parse_with(path, &Options::default())
    }

    pub fn parse_with(path: &str, options: &Options) -> Result<Self, Error> {
        match parser::Parser::parse_with(path, options) {
            Ok(parsed) => {
                debug!(path, elements = parsed.elements.len(), "parsed query");
                Ok(parsed)
            }
            Err(e) => {
                debug!(path, error = %e, "rejected query");
                Err(e)
            }
        }
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Evaluate against a document. The parsed path is not modified and may
    /// be reused for any number of documents.
    pub fn query<'a>(&self, json: &'a Value) -> Vec<Cow<'a, Value>> {
        eval::evaluate(self, json)
    }
}

/// Execute a query against a JSON value
///
/// # Arguments
/// * `path` - A query string (e.g., "$.store.book[?(@.price < 10)].title")
/// * `json` - The JSON value to query
///
/// # Returns
/// A vector of matching JSON values, or an error if the query is invalid
///
/// # Example
/// ```
/// use serde_json::json;
/// use jpw_core::query;
///
/// let json = json!({"foo": "bar"});
/// let results = query("$.foo", &json).unwrap();
/// assert_eq!(results, vec![json!("bar")]);
/// ```
pub fn query(path: &str, json: &Value) -> Result<Vec<Value>, Error> {
    let parsed = JsonPath::parse(path)?;
    Ok(parsed.query(json).into_iter().map(Cow::into_owned).collect())
}

/// Outcome of [`validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// The query is malformed; holds the error message
    Invalid(String),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}

/// Check a query without running it.
///
/// Malformed queries are reported as [`Validation::Invalid`]. An
/// [`InternalError`] is returned as `Err` so it cannot be mistaken for a
/// problem with the query.
pub fn validate(path: &str) -> Result<Validation, InternalError> {
    match JsonPath::parse(path) {
        Ok(_) => Ok(Validation::Valid),
        Err(Error::Parse(e)) => Ok(Validation::Invalid(e.to_string())),
        Err(Error::Internal(e)) => {
            warn!(path, error = %e, "internal error while validating query");
            Err(e)
        }
    }
}
