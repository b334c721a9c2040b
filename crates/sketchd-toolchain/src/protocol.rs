//! NDJSON protocol handling for the toolchain process

use serde::{Deserialize, Serialize};
use serde_json::Value;

use sketchd_core::{RepresentationKind, ToolchainMessage};

/// Strip the optional outer brackets from a toolchain line
pub(crate) fn strip_brackets(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        Some(&trimmed[1..trimmed.len() - 1])
    } else {
        None
    }
}

/// A raw toolchain message before typed parsing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawMessage {
    /// A response to a request we sent
    Response {
        id: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
    /// An unsolicited event
    Event {
        event: String,
        #[serde(default)]
        params: Value,
    },
}

impl RawMessage {
    pub fn parse(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

/// Parse one stdout line from the toolchain.
///
/// Accepts both bracketed (`[{...}]`) and bare JSON lines.
pub fn parse_toolchain_message(line: &str) -> Option<ToolchainMessage> {
    let json = strip_brackets(line).unwrap_or(line);

    match RawMessage::parse(json)? {
        RawMessage::Event { event, params } => Some(parse_event(&event, params)),
        RawMessage::Response { id, result, error } => Some(ToolchainMessage::Response {
            id,
            result,
            error: error.filter(|e| !e.is_null()),
        }),
    }
}

fn parse_event(event: &str, params: Value) -> ToolchainMessage {
    match event {
        "runprogress" => serde_json::from_value(params.clone())
            .map(ToolchainMessage::RunProgress)
            .unwrap_or_else(|_| unknown_event(event, params)),
        "ports" => serde_json::from_value(params.clone())
            .map(ToolchainMessage::Ports)
            .unwrap_or_else(|_| unknown_event(event, params)),
        "log" => serde_json::from_value(params.clone())
            .map(ToolchainMessage::Log)
            .unwrap_or_else(|_| unknown_event(event, params)),
        _ => unknown_event(event, params),
    }
}

fn unknown_event(event: &str, params: Value) -> ToolchainMessage {
    ToolchainMessage::UnknownEvent {
        event: event.to_string(),
        params,
    }
}

/// Numeric request id of a response, if it has one
pub fn response_id(id: &Value) -> Option<u64> {
    id.as_u64()
        .or_else(|| id.as_str().and_then(|s| s.parse().ok()))
}

/// Error text carried by a response or `{error}` result object
pub fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => match map.get("error") {
            Some(inner) => error_text(inner),
            None => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct SketchEntry {
    title: String,
}

/// Extract the titles of one kind from a `sketches` response.
///
/// Expects `{"sketches":{"block":[{"title":..}],"code":[..]}}`; a bare
/// `{"block":..,"code":..}` object is accepted as well.
pub fn parse_sketch_titles(result: &Value, kind: RepresentationKind) -> Vec<String> {
    let root = result.get("sketches").unwrap_or(result);
    let Some(list) = root.get(kind.wire_name()) else {
        return Vec::new();
    };

    match serde_json::from_value::<Vec<SketchEntry>>(list.clone()) {
        Ok(entries) => entries.into_iter().map(|e| e.title).collect(),
        Err(_) => list
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }
}
