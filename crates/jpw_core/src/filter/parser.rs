//! Builds a filter expression tree from classified tokens.
//!
//! Binding from loosest to tightest: `||`, `&&`, comparisons, then single
//! values (an optional `!`, a parenthesized group or a leaf). Each level
//! splits at the first top-level operator of its kind.

use super::tokens::ExprToken;
use crate::ast::{FilterExpr, LogicalOp};
use crate::error::{Error, InternalError, ParseError};
use crate::options::Options;

/// Parse a fully classified token sequence. `at` is reported when the
/// sequence turns out to be empty.
pub fn parse(tokens: &[ExprToken], at: usize, options: &Options) -> Result<FilterExpr, Error> {
    let parser = FilterParser { options };
    let expr = parser.parse_expression(tokens, at, 0)?;
    Ok(promote(expr))
}

struct FilterParser<'a> {
    options: &'a Options,
}

impl FilterParser<'_> {
    fn parse_expression(
        &self,
        tokens: &[ExprToken],
        at: usize,
        depth: usize,
    ) -> Result<FilterExpr, Error> {
        self.options.check_depth(depth, "filter parsing")?;

        for op in [LogicalOp::Or, LogicalOp::And] {
            let split = find_top_level(tokens, |t| {
                matches!(t, ExprToken::Logical { op: found, .. } if *found == op)
            });
            if let Some(index) = split {
                let position = tokens[index].position();
                let left = self.parse_expression(&tokens[..index], position, depth + 1)?;
                let right = self.parse_expression(&tokens[index + 1..], position, depth + 1)?;
                return Ok(FilterExpr::Logical {
                    op,
                    left: Box::new(promote(left)),
                    right: Box::new(promote(right)),
                });
            }
        }

        let comparison = find_top_level(tokens, |t| matches!(t, ExprToken::Comparison { .. }));
        if let Some(index) = comparison
            && let ExprToken::Comparison { op, position } = &tokens[index]
        {
            let left = self.parse_value(&tokens[..index], *position, depth + 1)?;
            let right = self.parse_value(&tokens[index + 1..], *position, depth + 1)?;
            return Ok(FilterExpr::Comparison {
                op: *op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        self.parse_value(tokens, at, depth + 1)
    }

    fn parse_value(
        &self,
        tokens: &[ExprToken],
        at: usize,
        depth: usize,
    ) -> Result<FilterExpr, Error> {
        self.options.check_depth(depth, "filter parsing")?;

        match tokens {
            [] => Err(ParseError::unexpected(at, "expected an operand").into()),
            [ExprToken::Negation { position }, rest @ ..] => {
                let operand = self.parse_value(rest, position + 1, depth + 1)?;
                Ok(FilterExpr::Negation(Box::new(promote(operand))))
            }
            [
                ExprToken::OpenGroup { id, position, .. },
                inner @ ..,
                ExprToken::CloseGroup { id: close, .. },
            ] if id == close => {
                let inner = self.parse_expression(inner, position + 1, depth + 1)?;
                Ok(FilterExpr::Group(Box::new(inner)))
            }
            [single] => self.parse_leaf(single, depth + 1),
            [_, second, ..] => Err(ParseError::unexpected(
                second.position(),
                format!("unexpected {}, expected an operator", second.describe()),
            )
            .into()),
        }
    }

    fn parse_leaf(&self, token: &ExprToken, depth: usize) -> Result<FilterExpr, Error> {
        self.options.check_depth(depth, "filter parsing")?;

        match token {
            ExprToken::Property { path, .. } => Ok(FilterExpr::Property(path.clone())),
            ExprToken::Constant { value, .. } => Ok(FilterExpr::Constant(value.clone())),
            ExprToken::ArrayAccess {
                target, accessor, ..
            } => Ok(FilterExpr::ArrayAccess {
                target: Box::new(self.parse_leaf(target, depth + 1)?),
                accessor: accessor.clone(),
            }),
            ExprToken::MethodCall {
                target,
                method,
                args,
                position,
                ..
            } => {
                let args = args
                    .iter()
                    .map(|arg| self.parse_expression(arg, *position, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(FilterExpr::MethodCall {
                    target: Box::new(self.parse_leaf(target, depth + 1)?),
                    method: *method,
                    args,
                })
            }
            ExprToken::Primitive(primitive) => Err(InternalError::new(format!(
                "unclassified token {} at position {} reached the filter parser",
                primitive.describe(),
                primitive.start
            ))
            .into()),
            ExprToken::Negation { .. }
            | ExprToken::Comparison { .. }
            | ExprToken::Logical { .. }
            | ExprToken::OpenGroup { .. }
            | ExprToken::CloseGroup { .. } => Err(ParseError::unexpected(
                token.position(),
                format!("unexpected {}, expected an operand", token.describe()),
            )
            .into()),
        }
    }
}

/// Index of the first token outside every group that satisfies `predicate`
fn find_top_level(tokens: &[ExprToken], predicate: impl Fn(&ExprToken) -> bool) -> Option<usize> {
    let mut nesting = 0usize;
    for (index, token) in tokens.iter().enumerate() {
        match token {
            ExprToken::OpenGroup { .. } => nesting += 1,
            ExprToken::CloseGroup { .. } => nesting = nesting.saturating_sub(1),
            _ if nesting == 0 && predicate(token) => return Some(index),
            _ => {}
        }
    }
    None
}

/// Bare values used as conditions become truthiness checks
fn promote(expr: FilterExpr) -> FilterExpr {
    match expr {
        FilterExpr::Property(_) | FilterExpr::ArrayAccess { .. } => {
            FilterExpr::Truthy(Box::new(expr))
        }
        other => other,
    }
}
