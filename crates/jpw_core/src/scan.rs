//! Character pre-scan: escape resolution and string literal extraction

use crate::error::{ErrorKind, ParseError};

/// A character of the input with its original offset.
///
/// `position` is a char offset into the raw input, so it survives escape
/// removal unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionedChar {
    pub ch: char,
    pub position: usize,
    /// Set when the character was preceded by a backslash
    pub escaped: bool,
}

/// A quoted substring of the input.
///
/// `open` and `close` index the quote characters in the classified sequence,
/// `value` holds the de-escaped content without quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringSpan {
    pub quote: char,
    pub open: usize,
    pub close: usize,
    pub value: String,
}

/// Result of the pre-scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanned {
    pub chars: Vec<PositionedChar>,
    pub strings: Vec<StringSpan>,
}

/// Classify and extract string literals in one go
pub fn scan(input: &str) -> Result<Scanned, ParseError> {
    let chars = classify(input)?;
    let strings = extract_strings(&chars)?;
    Ok(Scanned { chars, strings })
}

/// Resolve backslash escapes.
///
/// Only `\\`, `\'` and `\"` are accepted; the backslash is dropped and the
/// following character is marked as escaped.
pub fn classify(input: &str) -> Result<Vec<PositionedChar>, ParseError> {
    let mut result = Vec::with_capacity(input.len());
    let mut chars = input.chars().enumerate();

    while let Some((position, ch)) = chars.next() {
        if ch != '\\' {
            result.push(PositionedChar {
                ch,
                position,
                escaped: false,
            });
            continue;
        }

        match chars.next() {
            Some((escaped_position, escaped @ ('\\' | '\'' | '"'))) => {
                result.push(PositionedChar {
                    ch: escaped,
                    position: escaped_position,
                    escaped: true,
                });
            }
            Some((escaped_position, other)) => {
                return Err(ParseError::new(
                    ErrorKind::InvalidEscape,
                    escaped_position,
                    format!(
                        "character '{other}' cannot be escaped, only '\\', ''' and '\"' can"
                    ),
                ));
            }
            None => {
                return Err(ParseError::new(
                    ErrorKind::InvalidEscape,
                    position,
                    "escape character at end of input",
                ));
            }
        }
    }

    Ok(result)
}

/// Find quoted substrings.
///
/// A string ends at the next unescaped quote of the same kind, so `'a"b'`
/// and `"a'b"` are both single literals.
pub fn extract_strings(chars: &[PositionedChar]) -> Result<Vec<StringSpan>, ParseError> {
    let mut spans = Vec::new();
    let mut index = 0;

    while let Some(current) = chars.get(index) {
        if current.escaped || !is_quote(current.ch) {
            index += 1;
            continue;
        }

        let quote = current.ch;
        let close = chars[index + 1..]
            .iter()
            .position(|c| !c.escaped && c.ch == quote)
            .map(|offset| index + 1 + offset)
            .ok_or_else(|| {
                ParseError::new(
                    ErrorKind::UnterminatedString,
                    current.position,
                    format!("quote {quote} is not closed"),
                )
            })?;

        spans.push(StringSpan {
            quote,
            open: index,
            close,
            value: chars[index + 1..close].iter().map(|c| c.ch).collect(),
        });
        index = close + 1;
    }

    Ok(spans)
}

fn is_quote(ch: char) -> bool {
    ch == '\'' || ch == '"'
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_input_keeps_positions() {
        let chars = classify("a.b").unwrap();
        assert_eq!(chars.len(), 3);
        assert_eq!(chars[2].position, 2);
        assert!(chars.iter().all(|c| !c.escaped));
    }

    #[test]
    fn test_escape_consumes_backslash() {
        let chars = classify(r"'a\'b'").unwrap();
        let text: String = chars.iter().map(|c| c.ch).collect();
        assert_eq!(text, "'a'b'");
        assert!(chars[2].escaped);
        assert_eq!(chars[2].position, 3);
        assert_eq!(chars[3].position, 4);
    }

    #[test]
    fn test_invalid_escape() {
        let err = classify(r"'a\nb'").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidEscape);
        assert_eq!(err.position, 3);
        assert!(err.message.contains("'n'"));
    }

    #[test]
    fn test_dangling_escape() {
        let err = classify("abc\\").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidEscape);
        assert_eq!(err.position, 3);
    }

    #[test]
    fn test_extract_strings() {
        let scanned = scan(r#"['a b']["c\"d"]"#).unwrap();
        assert_eq!(scanned.strings.len(), 2);
        assert_eq!(scanned.strings[0].value, "a b");
        assert_eq!(scanned.strings[0].quote, '\'');
        assert_eq!(scanned.strings[1].value, "c\"d");
    }

    #[test]
    fn test_other_quote_is_literal() {
        let scanned = scan(r#"'say "hi"' "it's""#).unwrap();
        let values: Vec<_> = scanned.strings.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["say \"hi\"", "it's"]);
    }

    #[test]
    fn test_escaped_backslash_before_quote() {
        let scanned = scan(r"'a\\'").unwrap();
        assert_eq!(scanned.strings[0].value, "a\\");
    }

    #[test]
    fn test_unterminated_string() {
        let err = scan("a['b]").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
        assert_eq!(err.position, 2);
        assert!(err.message.contains('\''));
    }

    #[test]
    fn test_empty_string() {
        let scanned = scan("['']").unwrap();
        assert_eq!(scanned.strings[0].value, "");
        assert_eq!(scanned.strings[0].open, 1);
        assert_eq!(scanned.strings[0].close, 2);
    }
}
