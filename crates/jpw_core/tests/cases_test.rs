//! Query case table integration tests
//!
//! Runs every case in `tests/cases/cases.json` at the workspace root through
//! the public `query` and `validate` functions.

#![allow(clippy::expect_used)]

use jpw_core::{JsonPath, PathElement, Validation, query, validate};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;

const CASES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/cases/cases.json");

/// A single query case
#[derive(Debug, Deserialize)]
struct QueryCase {
    name: String,
    query: String,
    /// Inline document
    #[serde(default)]
    document: Option<Value>,
    /// Name of a shared document
    #[serde(default)]
    uses: Option<String>,
    #[serde(default)]
    result: Option<Vec<Value>>,
    #[serde(default)]
    invalid: bool,
}

/// A bracketed property name that must read the same under both quotes
#[derive(Debug, Deserialize)]
struct EscapedName {
    name: String,
    value: String,
}

/// The case file structure
#[derive(Debug, Deserialize)]
struct CaseFile {
    documents: HashMap<String, Value>,
    cases: Vec<QueryCase>,
    #[serde(default)]
    escaped_names: Vec<EscapedName>,
}

/// `value` as a quoted literal, escaping backslashes and the quote itself
fn quoted(value: &str, quote: char) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push(quote);
    for ch in value.chars() {
        if ch == '\\' || ch == quote {
            literal.push('\\');
        }
        literal.push(ch);
    }
    literal.push(quote);
    literal
}

fn load_cases() -> CaseFile {
    let content = fs::read_to_string(CASES_PATH).expect("Failed to read case file");
    serde_json::from_str(&content).expect("Failed to parse case file")
}

/// Run a single case and return the failure reason, if any
fn run_case(case: &QueryCase, documents: &HashMap<String, Value>) -> Option<String> {
    let document = match (&case.document, &case.uses) {
        (Some(document), _) => document,
        (None, Some(name)) => match documents.get(name) {
            Some(document) => document,
            None => return Some(format!("Unknown document '{name}'")),
        },
        (None, None) => &Value::Null,
    };

    if case.invalid {
        return match (query(&case.query, document), validate(&case.query)) {
            (Ok(_), _) => Some("Expected parse error but query succeeded".to_string()),
            (Err(e), _) if e.is_internal() => Some(format!("Internal error: {e}")),
            (Err(_), Ok(Validation::Invalid(_))) => None,
            (Err(_), other) => Some(format!("validate disagreed with query: {other:?}")),
        };
    }

    match query(&case.query, document) {
        Ok(results) => {
            let expected = case.result.clone().unwrap_or_default();
            if results == expected {
                None
            } else {
                Some(format!(
                    "Result mismatch:\n  got:      {results:?}\n  expected: {expected:?}"
                ))
            }
        }
        Err(e) => Some(format!("Unexpected error: {e}")),
    }
}

#[test]
fn run_query_cases() {
    let file = load_cases();

    let total = file.cases.len();
    let mut failed_cases: Vec<(String, String)> = vec![];

    for case in &file.cases {
        if let Some(reason) = run_case(case, &file.documents) {
            failed_cases.push((case.name.clone(), reason));
        }
    }

    let failed = failed_cases.len();
    println!("\n========================================");
    println!("Query Case Results");
    println!("========================================");
    println!("Total:  {total}");
    println!("Passed: {}", total - failed);
    println!("Failed: {failed}");
    println!("========================================\n");

    for (name, reason) in &failed_cases {
        println!("\n[FAIL] {name}");
        println!("  {reason}");
    }

    assert_eq!(failed, 0, "{failed} out of {total} query cases failed");
}

/// Test that the case file loads and covers both outcomes
#[test]
fn test_case_file_loads() {
    let file = load_cases();

    assert!(!file.cases.is_empty(), "Case file should contain cases");
    assert!(file.cases.iter().any(|c| c.invalid));
    assert!(file.cases.iter().any(|c| !c.invalid));
    for case in &file.cases {
        assert!(
            case.invalid || case.result.is_some(),
            "case '{}' needs a result",
            case.name
        );
    }
}

/// `["s"]` and `['s']` parse to the same escaped property holding `s`
#[test]
fn test_escaped_names_round_trip() {
    let file = load_cases();
    assert!(!file.escaped_names.is_empty());

    for case in &file.escaped_names {
        let expected = vec![
            PathElement::Property {
                name: "$".to_string(),
                escaped: false,
            },
            PathElement::Property {
                name: case.value.clone(),
                escaped: true,
            },
        ];
        for quote in ['"', '\''] {
            let path = format!("$[{}]", quoted(&case.value, quote));
            let parsed = JsonPath::parse(&path).expect("Failed to parse escaped name");
            assert_eq!(
                parsed.elements(),
                expected.as_slice(),
                "case '{}' with {quote} quotes: {path}",
                case.name
            );
        }
    }
}
