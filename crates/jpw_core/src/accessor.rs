//! Array accessor bodies: the text between `[` and `]`

use crate::ast::{ArrayAccessor, Slice};
use crate::error::{ErrorKind, ParseError};
use smallvec::SmallVec;

const VALID_FORMS: &str =
    "expected an index, an index list, a slice 'start:end:step', '*', ':last', ':any' or ':none'";

/// One token of an accessor body, independent of which tokenizer produced it
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Part {
    Symbol(char),
    Number(f64),
    Word(String),
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AccessorPart {
    pub part: Part,
    pub position: usize,
}

impl AccessorPart {
    pub(crate) fn new(part: Part, position: usize) -> Self {
        Self { part, position }
    }

    fn is_symbol(&self, c: char) -> bool {
        self.part == Part::Symbol(c)
    }

    fn render(&self) -> String {
        match &self.part {
            Part::Symbol(c) => c.to_string(),
            Part::Number(n) => n.to_string(),
            Part::Word(w) | Part::Other(w) => w.clone(),
        }
    }
}

/// Parse the body of `[...]`; `open` is the position of the `[`
pub(crate) fn parse_accessor(
    parts: &[AccessorPart],
    open: usize,
) -> Result<ArrayAccessor, ParseError> {
    match parts {
        [] => Err(ParseError::new(
            ErrorKind::InvalidArrayAccess,
            open,
            format!("empty array accessor, {VALID_FORMS}"),
        )),
        [star] if star.is_symbol('*') => Ok(ArrayAccessor::All),
        [colon, word] if colon.is_symbol(':') && matches!(word.part, Part::Word(_)) => {
            match &word.part {
                Part::Word(w) if w == "last" => Ok(ArrayAccessor::Indexes(SmallVec::from_slice(&[-1]))),
                Part::Word(w) if w == "any" => Ok(ArrayAccessor::All),
                Part::Word(w) if w == "none" => Ok(ArrayAccessor::Indexes(SmallVec::new())),
                _ => Err(unexpected_sequence(parts)),
            }
        }
        _ if parts.iter().any(|p| p.is_symbol(':')) => parse_slice(parts),
        _ => parse_indexes(parts),
    }
}

fn parse_slice(parts: &[AccessorPart]) -> Result<ArrayAccessor, ParseError> {
    let bounds: Vec<&[AccessorPart]> = parts.split(|p| p.is_symbol(':')).collect();
    if bounds.len() > 3 {
        return Err(unexpected_sequence(parts));
    }

    let mut values = [None; 3];
    for (slot, bound) in values.iter_mut().zip(&bounds) {
        if !bound.is_empty() {
            *slot = Some(parse_integer(bound).ok_or_else(|| unexpected_sequence(parts))?);
        }
    }

    let [start, end, step] = values;
    if let Some(step) = step
        && step <= 0
    {
        return Err(ParseError::new(
            ErrorKind::InvalidArrayAccess,
            parts[0].position,
            format!("slice step must be greater than zero, got {step}"),
        ));
    }

    Ok(ArrayAccessor::Slice(Slice { start, end, step }))
}

fn parse_indexes(parts: &[AccessorPart]) -> Result<ArrayAccessor, ParseError> {
    let mut indexes = SmallVec::new();
    for item in parts.split(|p| p.is_symbol(',')) {
        indexes.push(parse_integer(item).ok_or_else(|| unexpected_sequence(parts))?);
    }
    Ok(ArrayAccessor::Indexes(indexes))
}

/// `n` or `-n` where `n` is a whole number
fn parse_integer(parts: &[AccessorPart]) -> Option<i64> {
    let (negative, number) = match parts {
        [number] => (false, number),
        [minus, number] if minus.is_symbol('-') => (true, number),
        _ => return None,
    };
    let Part::Number(n) = &number.part else {
        return None;
    };
    if n.is_finite() && n.fract() != 0.0 {
        return None;
    }
    // Saturates, so out-of-range literals clamp instead of failing
    let value = *n as i64;
    Some(if negative { -value } else { value })
}

fn unexpected_sequence(parts: &[AccessorPart]) -> ParseError {
    let text: String = parts.iter().map(AccessorPart::render).collect();
    ParseError::new(
        ErrorKind::InvalidArrayAccess,
        parts.first().map(|p| p.position).unwrap_or(0),
        format!("unexpected sequence '{text}', {VALID_FORMS}"),
    )
}
