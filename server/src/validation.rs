//! Request validation for the todo endpoints.
//!
//! Bodies arrive as raw bytes and are inspected as `serde_json::Value`, so the
//! checks below see the JSON types the client actually sent. HTML form bodies
//! decode to the same shape with every value a string. Everything here runs
//! before the store is touched.

use serde_json::{Map, Value};

use crate::error::ApiError;

pub const TITLE_REQUIRED: &str = "Title is required and must be a non-empty string";
pub const INVALID_ID: &str = "Invalid todo ID";
pub const MALFORMED_BODY: &str = "Malformed JSON body";
pub const MALFORMED_FORM: &str = "Malformed form body";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Validated payload for `POST /api/todos`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub completed: bool,
}

/// Validated payload for `PUT /api/todos/{id}`. `None` means the key was
/// absent from the body and the stored value must be kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl NewTodo {
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ApiError> {
        Ok(Self {
            title: validate_title(fields.get("title"))?,
            completed: fields.get("completed").is_some_and(coerce_completed),
        })
    }
}

impl TodoPatch {
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ApiError> {
        let title = match fields.get("title") {
            Some(value) => Some(validate_title(Some(value))?),
            None => None,
        };
        Ok(Self {
            title,
            completed: fields.get("completed").map(coerce_completed),
        })
    }
}

/// Parses a request body into its top-level fields.
///
/// Form-encoded bodies are picked by `content_type`; anything else is read as
/// JSON. An empty body and a JSON value that is not an object both yield no
/// fields; bytes that do not decode are rejected.
pub fn parse_body(
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<Map<String, Value>, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    if content_type.is_some_and(is_form) {
        return parse_form(bytes);
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Ok(Map::new()),
        Err(_) => Err(ApiError::Validation(MALFORMED_BODY.to_string())),
    }
}

fn is_form(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// A key sent more than once becomes an array of its values.
fn parse_form(bytes: &[u8]) -> Result<Map<String, Value>, ApiError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)
        .map_err(|_| ApiError::Validation(MALFORMED_FORM.to_string()))?;

    let mut fields = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match fields.get_mut(&key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => *existing = Value::Array(vec![existing.take(), value]),
            None => {
                fields.insert(key, value);
            }
        }
    }
    Ok(fields)
}

/// Path ids are strict base-10 integers greater than zero.
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::Validation(INVALID_ID.to_string())),
    }
}

/// Returns the trimmed title, or a validation error if it is missing, not a
/// string, or blank.
pub fn validate_title(value: Option<&Value>) -> Result<String, ApiError> {
    match value.and_then(Value::as_str).map(trim_title) {
        Some(title) if !title.is_empty() => Ok(title.to_string()),
        _ => Err(ApiError::Validation(TITLE_REQUIRED.to_string())),
    }
}

/// Strips whitespace and the byte-order mark from both ends.
fn trim_title(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Only JSON `true` and the string `"true"` count as completed.
pub fn coerce_completed(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text == "true",
        _ => false,
    }
}
