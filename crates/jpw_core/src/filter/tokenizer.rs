//! Filter tokenizer: rewrites lexer tokens into classified expression tokens.
//!
//! Each pass takes the previous token sequence and returns a new one. Pass
//! order matters: constants are typed before property chains are collapsed,
//! chains before parentheses are paired, and method calls and accessors are
//! folded before operators, so the operator pass only ever sees the symbols
//! nobody else claimed.

use super::tokens::ExprToken;
use crate::accessor::{self, AccessorPart, Part};
use crate::ast::{ChainTerminal, ComparisonOp, Constant, LogicalOp, Method, PropertyPath};
use crate::error::{Error, ErrorKind, InternalError, ParseError};
use crate::lexer::{Token, TokenKind};
use crate::options::Options;
use std::collections::HashMap;

/// Symbols that can form comparison and logical operators
const OPERATOR_CHARS: &[char] = &['=', '!', '<', '>', '&', '|'];

/// Tokenize the body of a filter expression. Whitespace is dropped.
pub fn tokenize(tokens: &[Token], options: &Options) -> Result<Vec<ExprToken>, Error> {
    let primitives = tokens
        .iter()
        .filter(|t| !t.is_whitespace())
        .cloned()
        .map(ExprToken::Primitive)
        .collect();
    run_passes(primitives, options, 0)
}

fn run_passes(
    tokens: Vec<ExprToken>,
    options: &Options,
    depth: usize,
) -> Result<Vec<ExprToken>, Error> {
    options.check_depth(depth, "filter tokenization")?;

    let tokens = replace_constants(tokens);
    let tokens = collapse_properties(&tokens)?;
    let tokens = pair_groups(&tokens)?;
    let tokens = fold_postfix(tokens, options, depth)?;
    let tokens = replace_negations(&tokens);
    let tokens = fold_negative_numbers(&tokens);
    let tokens = group_operators(&tokens)?;

    ensure_classified(&tokens)?;
    Ok(tokens)
}

fn replace_constants(tokens: Vec<ExprToken>) -> Vec<ExprToken> {
    tokens
        .into_iter()
        .map(|token| match token {
            ExprToken::Primitive(Token {
                kind: TokenKind::StringLiteral(s),
                start,
                ..
            }) => ExprToken::Constant {
                value: Constant::String(s),
                position: start,
            },
            ExprToken::Primitive(Token {
                kind: TokenKind::Number(n),
                start,
                ..
            }) => ExprToken::Constant {
                value: Constant::Number(n),
                position: start,
            },
            ExprToken::Primitive(Token {
                kind: TokenKind::Bool(b),
                start,
                ..
            }) => ExprToken::Constant {
                value: Constant::Bool(b),
                position: start,
            },
            other => other,
        })
        .collect()
}

/// Turn `@` and the chain that follows it into a single property token
fn collapse_properties(tokens: &[ExprToken]) -> Result<Vec<ExprToken>, ParseError> {
    let mut result = Vec::with_capacity(tokens.len());
    let mut index = 0;

    while let Some(token) = tokens.get(index) {
        if !token.is_symbol('@') {
            result.push(token.clone());
            index += 1;
            continue;
        }

        let position = token.position();
        let mut path = PropertyPath::default();
        index += 1;

        loop {
            let rest = &tokens[index..];

            if let [dot, rest_after_dot @ ..] = rest
                && dot.is_symbol('.')
            {
                let Some(next) = rest_after_dot.first() else {
                    return Err(ParseError::unexpected(
                        dot.position(),
                        "expression cannot end with '.'",
                    ));
                };

                if next.is_symbol('.') {
                    if next.position() != dot.position() + 1 {
                        return Err(ParseError::unexpected(
                            next.position(),
                            "two path separators in a row",
                        ));
                    }
                    path.terminal = Some(ChainTerminal::RecursiveDescent);
                    index += 2;
                    break;
                }
                if next.is_symbol('*') {
                    path.terminal = Some(ChainTerminal::Wildcard);
                    index += 2;
                    break;
                }
                if next.is_symbol('[') {
                    return Err(ParseError::unexpected(
                        next.position(),
                        "an escaped property cannot follow a path separator",
                    ));
                }

                let Some(name) = chain_name(next) else {
                    return Err(ParseError::unexpected(
                        next.position(),
                        format!("expected a property name after '.', found {}", next.describe()),
                    ));
                };
                if rest_after_dot.get(1).is_some_and(ExprToken::is_group_open) {
                    // `.name(` starts a method call, not a chain element
                    break;
                }
                path.segments.push(name);
                index += 2;
                continue;
            }

            if let [open, ExprToken::Constant {
                value: Constant::String(name),
                ..
            }, close, ..] = rest
                && open.is_symbol('[')
                && close.is_symbol(']')
            {
                path.segments.push(name.clone());
                index += 3;
                continue;
            }

            break;
        }

        if path.terminal.is_some() && continues_chain(&tokens[index..]) {
            return Err(ParseError::unexpected(
                tokens[index].position(),
                "only the last element of a property chain may be '*' or '..'",
            ));
        }

        result.push(ExprToken::Property { path, position });
    }

    Ok(result)
}

fn chain_name(token: &ExprToken) -> Option<String> {
    match token {
        ExprToken::Primitive(Token {
            kind: TokenKind::Property(name),
            ..
        }) => Some(name.clone()),
        ExprToken::Constant {
            value: Constant::Bool(b),
            ..
        } => Some(b.to_string()),
        _ => None,
    }
}

/// Whether `rest` starts with another chain element rather than a method call
fn continues_chain(rest: &[ExprToken]) -> bool {
    match rest {
        [dot, next, after, ..] if dot.is_symbol('.') && chain_name(next).is_some() => {
            !after.is_group_open()
        }
        [dot, ..] if dot.is_symbol('.') => true,
        [next, ..] => chain_name(next).is_some(),
        _ => false,
    }
}

/// Pair parentheses into group tokens sharing an id
fn pair_groups(tokens: &[ExprToken]) -> Result<Vec<ExprToken>, Error> {
    let mut unclosed = Vec::new();
    for token in tokens {
        if token.is_symbol('(') {
            unclosed.push(token.position());
        } else if token.is_symbol(')') && unclosed.pop().is_none() {
            return Err(ParseError::unexpected(token.position(), "unexpected token ')'").into());
        }
    }
    if let Some(&position) = unclosed.last() {
        return Err(ParseError::new(
            ErrorKind::UnbalancedGroup,
            position,
            "not all parentheses are closed",
        )
        .into());
    }

    let mut next_id = tokens
        .iter()
        .filter_map(|t| match t {
            ExprToken::OpenGroup { id, .. } => Some(id + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    let mut stack = Vec::new();
    let mut result = Vec::with_capacity(tokens.len());

    for token in tokens {
        if token.is_symbol('(') {
            result.push(ExprToken::OpenGroup {
                id: next_id,
                depth: stack.len(),
                position: token.position(),
            });
            stack.push(next_id);
            next_id += 1;
        } else if token.is_symbol(')') {
            let Some(id) = stack.pop() else {
                return Err(InternalError::new(format!(
                    "parenthesis at position {} lost its pair after balancing",
                    token.position()
                ))
                .into());
            };
            result.push(ExprToken::CloseGroup {
                id,
                depth: stack.len(),
                position: token.position(),
            });
        } else {
            result.push(token.clone());
        }
    }

    Ok(result)
}

/// Map of group id to the index of its closing token
fn group_spans(tokens: &[ExprToken]) -> HashMap<usize, usize> {
    tokens
        .iter()
        .enumerate()
        .filter_map(|(index, token)| match token {
            ExprToken::CloseGroup { id, .. } => Some((*id, index)),
            _ => None,
        })
        .collect()
}

/// Fold method calls and array accessors until neither pass changes anything
fn fold_postfix(
    mut tokens: Vec<ExprToken>,
    options: &Options,
    depth: usize,
) -> Result<Vec<ExprToken>, Error> {
    for _ in 0..options.max_passes {
        let (folded, calls) = fold_method_calls(&tokens, options, depth)?;
        let (folded, accessors) = fold_array_accesses(&folded)?;
        tokens = folded;
        if !calls && !accessors {
            return Ok(tokens);
        }
    }

    Err(InternalError::new(format!(
        "method call folding did not settle after {} passes",
        options.max_passes
    ))
    .into())
}

fn fold_method_calls(
    tokens: &[ExprToken],
    options: &Options,
    depth: usize,
) -> Result<(Vec<ExprToken>, bool), Error> {
    let spans = group_spans(tokens);
    let mut result: Vec<ExprToken> = Vec::with_capacity(tokens.len());
    let mut changed = false;
    let mut index = 0;

    while let Some(token) = tokens.get(index) {
        let call = match (result.last(), &tokens[index..]) {
            (
                Some(target),
                [
                    dot,
                    ExprToken::Primitive(Token {
                        kind: TokenKind::Property(name),
                        start,
                        ..
                    }),
                    ExprToken::OpenGroup { id, .. },
                    ..,
                ],
            ) if target.accepts_method() && dot.is_symbol('.') => {
                spans.get(id).map(|&close| (name.clone(), *start, close))
            }
            _ => None,
        };

        let Some((name, name_position, close)) = call else {
            result.push(token.clone());
            index += 1;
            continue;
        };

        let method = Method::from_name(&name).ok_or_else(|| {
            ParseError::new(
                ErrorKind::UnsupportedMethod,
                name_position,
                format!("unsupported method '{name}'"),
            )
        })?;

        let open = index + 2;
        let raw_args = split_arguments(&tokens[open + 1..close])?;
        let arity = method.arity();
        if !arity.contains(&raw_args.len()) {
            let expected = if arity.start() == arity.end() {
                arity.start().to_string()
            } else {
                format!("{} to {}", arity.start(), arity.end())
            };
            return Err(ParseError::new(
                ErrorKind::UnsupportedMethod,
                name_position,
                format!(
                    "method '{name}' takes {expected} arguments, got {}",
                    raw_args.len()
                ),
            )
            .into());
        }

        let args = raw_args
            .into_iter()
            .map(|arg| run_passes(arg.to_vec(), options, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;

        let Some(target) = result.pop() else {
            return Err(InternalError::new("method call lost its target").into());
        };
        result.push(ExprToken::MethodCall {
            position: target.position(),
            target: Box::new(target),
            method,
            name,
            args,
        });
        index = close + 1;
        changed = true;
    }

    Ok((result, changed))
}

/// Split an argument list at top-level commas
fn split_arguments(tokens: &[ExprToken]) -> Result<Vec<&[ExprToken]>, ParseError> {
    let mut args = Vec::new();
    if tokens.is_empty() {
        return Ok(args);
    }

    let mut nesting = 0usize;
    let mut start = 0;
    for (index, token) in tokens.iter().enumerate() {
        match token {
            ExprToken::OpenGroup { .. } => nesting += 1,
            ExprToken::CloseGroup { .. } => nesting = nesting.saturating_sub(1),
            _ if token.is_symbol('[') => nesting += 1,
            _ if token.is_symbol(']') => nesting = nesting.saturating_sub(1),
            _ if token.is_symbol(',') && nesting == 0 => {
                if index == start {
                    return Err(ParseError::unexpected(token.position(), "unexpected token ','"));
                }
                args.push(&tokens[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }

    if start == tokens.len() {
        let comma = tokens[start - 1].position();
        return Err(ParseError::unexpected(comma, "unexpected token ','"));
    }
    args.push(&tokens[start..]);
    Ok(args)
}

fn fold_array_accesses(tokens: &[ExprToken]) -> Result<(Vec<ExprToken>, bool), ParseError> {
    let mut result: Vec<ExprToken> = Vec::with_capacity(tokens.len());
    let mut changed = false;
    let mut index = 0;

    while let Some(token) = tokens.get(index) {
        if !(token.is_symbol('[') && result.last().is_some_and(ExprToken::accepts_accessor)) {
            result.push(token.clone());
            index += 1;
            continue;
        }

        let open = token.position();
        let close = tokens[index + 1..]
            .iter()
            .position(|t| t.is_symbol(']') || t.is_symbol('['))
            .map(|offset| index + 1 + offset);
        let close = match close {
            Some(close) if tokens[close].is_symbol(']') => close,
            Some(nested) => {
                return Err(ParseError::unexpected(
                    tokens[nested].position(),
                    "unexpected token '['",
                ));
            }
            None => {
                return Err(ParseError::new(
                    ErrorKind::UnbalancedGroup,
                    open,
                    "'[' has no matching ']'",
                ));
            }
        };

        let parts: Vec<AccessorPart> = tokens[index + 1..close]
            .iter()
            .map(accessor_part)
            .collect();
        let accessor = accessor::parse_accessor(&parts, open)?;

        if let Some(target) = result.pop() {
            result.push(ExprToken::ArrayAccess {
                position: target.position(),
                target: Box::new(target),
                accessor,
            });
        }
        index = close + 1;
        changed = true;
    }

    Ok((result, changed))
}

fn accessor_part(token: &ExprToken) -> AccessorPart {
    let part = match token {
        ExprToken::Primitive(Token {
            kind: TokenKind::Symbol(c),
            ..
        }) => Part::Symbol(*c),
        ExprToken::Primitive(Token {
            kind: TokenKind::Property(word),
            ..
        }) => Part::Word(word.clone()),
        ExprToken::Constant {
            value: Constant::Number(n),
            ..
        } => Part::Number(*n),
        other => Part::Other(other.describe()),
    };
    AccessorPart::new(part, token.position())
}

/// `!` not directly followed by `=`
fn replace_negations(tokens: &[ExprToken]) -> Vec<ExprToken> {
    tokens
        .iter()
        .enumerate()
        .map(|(index, token)| {
            let not_equal = tokens
                .get(index + 1)
                .is_some_and(|next| next.is_symbol('=') && next.position() == token.position() + 1);
            if token.is_symbol('!') && !not_equal {
                ExprToken::Negation {
                    position: token.position(),
                }
            } else {
                token.clone()
            }
        })
        .collect()
}

fn fold_negative_numbers(tokens: &[ExprToken]) -> Vec<ExprToken> {
    let mut result = Vec::with_capacity(tokens.len());
    let mut index = 0;

    while let Some(token) = tokens.get(index) {
        if token.is_symbol('-')
            && let Some(ExprToken::Constant {
                value: Constant::Number(n),
                ..
            }) = tokens.get(index + 1)
        {
            result.push(ExprToken::Constant {
                value: Constant::Number(-n),
                position: token.position(),
            });
            index += 2;
            continue;
        }
        result.push(token.clone());
        index += 1;
    }

    result
}

/// Group adjacent operator symbols into comparison and logical operators
fn group_operators(tokens: &[ExprToken]) -> Result<Vec<ExprToken>, ParseError> {
    for token in [tokens.first(), tokens.last()].into_iter().flatten() {
        if let Some(c) = token.symbol() {
            return Err(ParseError::unexpected(
                token.position(),
                format!("expression cannot start or end with '{c}'"),
            ));
        }
    }

    let mut result = Vec::with_capacity(tokens.len());
    let mut index = 0;

    while let Some(token) = tokens.get(index) {
        let Some(first) = token.symbol().filter(|c| OPERATOR_CHARS.contains(c)) else {
            result.push(token.clone());
            index += 1;
            continue;
        };

        let position = token.position();
        let mut symbols = first.to_string();
        let mut end = index + 1;
        loop {
            let adjacent = tokens.get(end).and_then(|next| {
                next.symbol()
                    .filter(|c| OPERATOR_CHARS.contains(c))
                    .filter(|_| next.position() == tokens[end - 1].position() + 1)
            });
            match adjacent {
                Some(c) => {
                    symbols.push(c);
                    end += 1;
                }
                None => break,
            }
        }

        if symbols.chars().count() > 2 {
            return Err(ParseError::new(
                ErrorKind::UnrecognizedSymbol,
                position,
                format!("unrecognized sequence '{symbols}' at position {position}"),
            ));
        }

        let operator = if let Some(op) = ComparisonOp::from_symbols(&symbols) {
            ExprToken::Comparison { op, position }
        } else if let Some(op) = LogicalOp::from_symbols(&symbols) {
            ExprToken::Logical { op, position }
        } else {
            return Err(ParseError::new(
                ErrorKind::UnrecognizedSymbol,
                position,
                format!("unrecognized operator '{symbols}'"),
            ));
        };
        result.push(operator);
        index = end;
    }

    Ok(result)
}

/// Reject any token no pass could classify, including inside calls
fn ensure_classified(tokens: &[ExprToken]) -> Result<(), ParseError> {
    for token in tokens {
        match token {
            ExprToken::Primitive(primitive) => {
                return Err(ParseError::unexpected(
                    primitive.start,
                    format!("unexpected token {}", primitive.describe()),
                ));
            }
            ExprToken::MethodCall { target, args, .. } => {
                ensure_classified(std::slice::from_ref(target.as_ref()))?;
                for arg in args {
                    ensure_classified(arg)?;
                }
            }
            ExprToken::ArrayAccess { target, .. } => {
                ensure_classified(std::slice::from_ref(target.as_ref()))?;
            }
            _ => {}
        }
    }
    Ok(())
}
