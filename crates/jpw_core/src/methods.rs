//! Methods callable inside filter expressions.
//!
//! Every method resolves against the runtime value of its target. A target
//! or argument of the wrong kind yields `null` instead of an error, so a
//! filter fails closed on heterogeneous data.

use crate::ast::Method;
use crate::eval::values_equal;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;

/// Patterns kept per thread; the cache is emptied once it reaches this size
const REGEX_CACHE_LIMIT: usize = 256;

// Compiled patterns are reused across the elements a filter visits.
// Patterns can come from the document, so the cache is bounded.
thread_local! {
    static REGEX_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

/// Get a cached regex or compile and cache a new one.
/// Returns None if the pattern is invalid.
fn get_or_compile_regex(pattern: &str) -> Option<Regex> {
    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(re) = cache.get(pattern) {
            return Some(re.clone());
        }
        match Regex::new(pattern) {
            Ok(re) => {
                if cache.len() >= REGEX_CACHE_LIMIT {
                    cache.clear();
                }
                cache.insert(pattern.to_string(), re.clone());
                Some(re)
            }
            Err(_) => None,
        }
    })
}

/// Call `method` on `target`
pub fn call(method: Method, target: &Value, args: &[Cow<'_, Value>]) -> Value {
    match (method, target) {
        (Method::ToUpper, Value::String(s)) => Value::String(s.to_uppercase()),
        (Method::ToLower, Value::String(s)) => Value::String(s.to_lowercase()),
        (Method::StartsWith, Value::String(s)) => {
            string_test(s, args, |haystack, needle| haystack.starts_with(needle))
        }
        (Method::EndsWith, Value::String(s)) => {
            string_test(s, args, |haystack, needle| haystack.ends_with(needle))
        }
        (Method::Contains, Value::String(s)) => {
            string_test(s, args, |haystack, needle| haystack.contains(needle))
        }
        (Method::Contains, Value::Array(items)) => array_contains(items, args),
        (Method::Matches, Value::String(s)) => matches_pattern(s, args),
        _ => Value::Null,
    }
}

/// `startsWith`, `endsWith` and `contains` on strings: a string argument and
/// an optional bool that turns on case-insensitive comparison
fn string_test(target: &str, args: &[Cow<'_, Value>], test: impl Fn(&str, &str) -> bool) -> Value {
    let Some(Value::String(needle)) = args.first().map(|arg| &**arg) else {
        return Value::Null;
    };
    let Some(ignore_case) = ignore_case(args) else {
        return Value::Null;
    };

    if ignore_case {
        Value::Bool(test(
            target.to_lowercase().as_str(),
            needle.to_lowercase().as_str(),
        ))
    } else {
        Value::Bool(test(target, needle.as_str()))
    }
}

fn array_contains(items: &[Value], args: &[Cow<'_, Value>]) -> Value {
    let Some(needle) = args.first() else {
        return Value::Null;
    };
    let Some(ignore_case) = ignore_case(args) else {
        return Value::Null;
    };

    let found = items.iter().any(|item| match (item, &**needle) {
        (Value::String(a), Value::String(b)) if ignore_case => a.to_lowercase() == b.to_lowercase(),
        (item, needle) => values_equal(item, needle),
    });
    Value::Bool(found)
}

/// The optional second argument; `None` when present but not a bool
fn ignore_case(args: &[Cow<'_, Value>]) -> Option<bool> {
    match args.get(1).map(|arg| &**arg) {
        None => Some(false),
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => None,
    }
}

/// Whole-string regex match; an invalid pattern yields null
fn matches_pattern(target: &str, args: &[Cow<'_, Value>]) -> Value {
    let Some(Value::String(pattern)) = args.first().map(|arg| &**arg) else {
        return Value::Null;
    };
    match get_or_compile_regex(&format!("^(?:{pattern})$")) {
        Some(re) => Value::Bool(re.is_match(target)),
        None => Value::Null,
    }
}
