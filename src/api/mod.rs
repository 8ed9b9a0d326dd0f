pub mod gateway;

use crate::db::models::ResultItem;
use crate::lenient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Body of a POST to the message endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MessageRequest {
    pub message: String,
    #[serde(rename = "chatId")]
    pub chat_id: String,
    pub assistant_id: String,
    pub history: Vec<ChatMessage>,
}

/// What the backend meant by a reply, decided once before any rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum BotReply {
    Text(String),
    Results(Vec<ResultItem>),
    /// The search ran but came back with nothing.
    Empty,
    Unrecognized(Value),
}

/// Classify a message endpoint body.
///
/// Recognised shapes, in order of precedence:
/// `{type:"text", message}`, `{type:"results", results}`,
/// `{mode:"json", response}`, `{mode:"text", response}`. Blank text, or
/// a falsy `response` with no results, is [`BotReply::Empty`]; anything
/// else is [`BotReply::Unrecognized`].
pub fn classify(body: &Value) -> BotReply {
    let kind = body.get("type").and_then(Value::as_str);
    let mode = body.get("mode").and_then(Value::as_str);
    let response = body.get("response");

    match (kind, mode) {
        (Some("text"), _) => {
            if let Some(text) = lenient::text(body.get("message")) {
                return BotReply::Text(text);
            }
            if is_blank(body.get("message")) {
                return BotReply::Empty;
            }
        }
        (Some("results"), _) => return items(body.get("results")),
        (_, Some("json")) if response.is_some_and(lenient::is_truthy) => {
            return items(response);
        }
        (_, Some("text")) => {
            if let Some(Value::String(text)) = response {
                return if text.trim().is_empty() {
                    BotReply::Empty
                } else {
                    BotReply::Text(text.clone())
                };
            }
        }
        _ => {}
    }

    if is_empty_reply(body) {
        BotReply::Empty
    } else {
        BotReply::Unrecognized(body.clone())
    }
}

fn items(value: Option<&Value>) -> BotReply {
    match value {
        None | Some(Value::Null) => BotReply::Empty,
        Some(Value::Array(list)) if list.is_empty() => BotReply::Empty,
        Some(Value::Array(list)) => {
            BotReply::Results(list.iter().cloned().map(ResultItem::from_value).collect())
        }
        Some(single @ Value::Object(_)) => BotReply::Results(vec![ResultItem::from_value(single.clone())]),
        Some(other) => BotReply::Unrecognized(other.clone()),
    }
}

/// Whitespace-only strings are shown as "nothing found", never as a blank bubble.
fn is_blank(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if s.trim().is_empty())
}

/// A missing `response` counts as falsy only next to an explicit empty
/// `results`, so a body with neither key stays unrecognized.
fn is_empty_reply(body: &Value) -> bool {
    let results = body.get("results");
    let no_results = match results {
        None | Some(Value::Null) => true,
        Some(Value::Array(list)) => list.is_empty(),
        Some(_) => false,
    };
    match body.get("response") {
        Some(response) => !lenient::is_truthy(response) && no_results,
        None => matches!(results, Some(Value::Array(list)) if list.is_empty()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Request timed out")]
    Timeout,
}

impl ApiError {
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Http(err)
        }
    }
}

impl Serialize for ApiError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
