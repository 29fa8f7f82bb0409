// ABOUTME: Turns free-form model output into a JSON object
// ABOUTME: Unwraps one code fence, repairs inline braces once on a parse failure, tidies Mermaid fields

use codeinspector_core::{MalformedResponse, Payload};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, warn};

const FENCE: &str = "```";

/// String fields holding Mermaid diagrams.
pub const DIAGRAM_FIELDS: &[&str] = &["flowchart", "call_graph"];

// Opening fence with optional language tag, body, closing fence.
static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A```[A-Za-z0-9_+.\-]*[ \t]*\r?\n(.*?)\r?\n[ \t]*```")
        .expect("fence pattern must compile")
});

// One brace layer around diagram text, e.g. a Mermaid decision `{Is valid?}`.
// Quotes and colons are excluded so JSON objects never match.
static INLINE_DIAGRAM_BRACES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{([^{}":\n]*[^{}":\s][^{}":\n]*)\}"#)
        .expect("brace pattern must compile")
});

/// Successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub payload: Payload,
}

/// Strip one layer of code fence. Text that does not start with a fence is
/// returned trimmed but otherwise untouched.
pub fn unwrap_fence(raw: &str) -> &str {
    let text = raw.trim();
    if !text.starts_with(FENCE) {
        return text;
    }

    if let Some(body) = FENCED_BLOCK.captures(text).and_then(|c| c.get(1)) {
        return body.as_str();
    }

    // No closing fence: drop the first and last lines
    let start = text.find('\n').map(|i| i + 1).unwrap_or(text.len());
    let end = text.rfind('\n').unwrap_or(0);
    if end <= start {
        return "";
    }
    &text[start..end]
}

/// Double every single-layer `{text}` group so it cannot be read as a
/// structural delimiter.
pub fn double_inline_braces(text: &str) -> String {
    INLINE_DIAGRAM_BRACES
        .replace_all(text, |caps: &Captures| ["{{", &caps[1], "}}"].concat())
        .into_owned()
}

/// Remove a fence wrapper and a leading `mermaid` token from a diagram.
pub fn clean_diagram(diagram: &str) -> String {
    let mut diagram = diagram.trim();
    if diagram.is_empty() {
        return String::new();
    }

    let owned;
    if diagram.starts_with(FENCE) {
        let mut lines: Vec<&str> = diagram.lines().collect();
        if lines.first().is_some_and(|l| l.starts_with(FENCE)) {
            lines.remove(0);
        }
        if lines.last().is_some_and(|l| l.trim() == FENCE) {
            lines.pop();
        }
        owned = lines.join("\n");
        diagram = owned.trim();
    }

    let diagram = diagram
        .strip_prefix("mermaid\n")
        .or_else(|| diagram.strip_prefix("mermaid "))
        .unwrap_or(diagram);

    diagram.trim().to_string()
}

/// Extracts and validates structured payloads from raw model text.
#[derive(Debug, Clone)]
pub struct ResponseExtractor {
    diagram_fields: Vec<String>,
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self {
            diagram_fields: DIAGRAM_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl ResponseExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diagram_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            diagram_fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn extract(&self, raw: &str) -> Result<Extraction, MalformedResponse> {
        let body = unwrap_fence(raw);

        let value = match serde_json::from_str::<Value>(body) {
            Ok(value) => value,
            Err(first) => {
                debug!("Initial parse failed ({}), applying brace repair", first);
                let fixed = double_inline_braces(body);
                match serde_json::from_str::<Value>(&fixed) {
                    Ok(value) => value,
                    Err(second) => {
                        warn!("Response is not valid JSON after repair: {}", second);
                        return Err(MalformedResponse::new(
                            format!("invalid JSON after repair: {}", second),
                            raw,
                        ));
                    }
                }
            }
        };

        let mut payload = match value {
            Value::Object(map) => map,
            other => {
                return Err(MalformedResponse::new(
                    format!("expected a JSON object, found {}", json_kind(&other)),
                    raw,
                ))
            }
        };

        for field in &self.diagram_fields {
            if let Some(Value::String(diagram)) = payload.get_mut(field.as_str()) {
                if !diagram.is_empty() {
                    *diagram = clean_diagram(diagram);
                }
            }
        }

        Ok(Extraction { payload })
    }
}

/// Extract with the default diagram fields.
pub fn extract_payload(raw: &str) -> Result<Payload, MalformedResponse> {
    ResponseExtractor::default().extract(raw).map(|e| e.payload)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
