//! TODO item and the request/response envelopes exchanged over HTTP.
//!
//! Request envelopes default every field, so a missing `subject` or `ids`
//! reaches validation as an empty value instead of failing to decode.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A persisted TODO item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoItem {
    pub id: i64,
    pub subject: String,
    pub description: String,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateTodoRequest {
    pub subject: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTodoResponse {
    pub todo: TodoItem,
}

/// Cursor and page size for a read. Both are `0` when absent or unparsable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadTodoRequest {
    pub prev_id: i64,
    pub size: i64,
}

impl ReadTodoRequest {
    /// Builds the request from a raw query string such as `prev_id=3&size=10`.
    ///
    /// Malformed or negative values are coerced to `0`; nothing is rejected.
    pub fn from_query(query: Option<&str>) -> Self {
        let (mut prev_id, mut size) = (None, None);
        for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            // The first occurrence of a repeated key wins.
            let slot = match key.as_ref() {
                "prev_id" => &mut prev_id,
                "size" => &mut size,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(coerce(&value));
            }
        }
        Self { prev_id: prev_id.unwrap_or(0), size: size.unwrap_or(0) }
    }
}

/// Strict decimal parse with no whitespace trimming. Anything
/// unparsable or negative gives `0`.
fn coerce(value: &str) -> i64 {
    value.parse::<i64>().ok().filter(|v| *v >= 0).unwrap_or(0)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadTodoResponse {
    pub todos: Vec<TodoItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTodoRequest {
    pub id: i64,
    pub subject: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTodoResponse {
    pub todo: TodoItem,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteTodoRequest {
    pub ids: Vec<i64>,
}

/// Serializes as `{}`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DeleteTodoResponse {}
