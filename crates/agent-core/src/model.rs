//! Conversation data model exchanged with the language model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Task prompt, nudges, and corrective instructions.
    User,
    /// Raw model responses (text and/or function calls).
    Model,
    /// Function results and feedback screenshots.
    Tool,
}

/// Structured function call issued by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// String argument, if present and actually a string.
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }

    /// Numeric argument, rounded to the nearest integer. Models routinely
    /// send coordinates as floats.
    pub fn arg_i32(&self, key: &str) -> Option<i32> {
        self.args.get(key).and_then(Value::as_f64).map(|v| v.round() as i32)
    }

    pub fn arg_bool(&self, key: &str) -> Option<bool> {
        self.args.get(key).and_then(Value::as_bool)
    }
}

/// One content part inside a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    /// Encoded image payload (screenshots fed back to the model).
    InlineImage { mime: String, data: Vec<u8> },
    FunctionCall(FunctionCall),
    /// Result of a dispatched function call, keyed by the call name.
    FunctionResponse { name: String, values: Map<String, Value> },
}

/// One entry in the conversation history. Immutable once appended; the
/// sequence is append-only except for budget pruning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn new(role: TurnRole, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, vec![Part::Text(text.into())])
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Model, vec![Part::Text(text.into())])
    }

    pub fn tool(parts: Vec<Part>) -> Self {
        Self::new(TurnRole::Tool, parts)
    }

    /// Concatenated text content of the turn.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if let Part::Text(text) = part {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    /// All function calls carried by the turn, in order.
    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_text_joins_text_parts() {
        let turn = Turn::new(
            TurnRole::Model,
            vec![
                Part::Text("first".into()),
                Part::FunctionCall(FunctionCall::new("navigate")),
                Part::Text("second".into()),
            ],
        );
        assert_eq!(turn.text(), "first\nsecond");
        assert_eq!(turn.function_calls().len(), 1);
    }

    #[test]
    fn numeric_args_accept_floats() {
        let call = FunctionCall::new("click_at")
            .with_arg("x", 499.6)
            .with_arg("y", 200);
        assert_eq!(call.arg_i32("x"), Some(500));
        assert_eq!(call.arg_i32("y"), Some(200));
        assert_eq!(call.arg_i32("missing"), None);
    }

    #[test]
    fn turn_role_serializes_snake_case() {
        let json = serde_json::to_string(&TurnRole::Tool).unwrap();
        assert_eq!(json, "\"tool\"");
    }
}
