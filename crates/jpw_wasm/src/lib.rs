use jpw_core::{JsonPath, Validation};
use wasm_bindgen::prelude::*;

/// Run a query and return the matches as a pretty-printed JSON array
#[wasm_bindgen]
pub fn query(path: &str, json_str: &str) -> Result<String, String> {
    let json: serde_json::Value =
        serde_json::from_str(json_str).map_err(|e| format!("JSON parse error: {e}"))?;

    let path = JsonPath::parse(path).map_err(|e| e.to_string())?;

    let results = path.query(&json);

    serde_json::to_string_pretty(&results).map_err(|e| format!("Serialization error: {e}"))
}

/// `None` for a valid query, the error message for a malformed one.
/// Internal errors are returned as `Err`.
#[wasm_bindgen]
pub fn validate(path: &str) -> Result<Option<String>, String> {
    match jpw_core::validate(path) {
        Ok(Validation::Valid) => Ok(None),
        Ok(Validation::Invalid(message)) => Ok(Some(message)),
        Err(e) => Err(format!("internal error: {e}")),
    }
}
