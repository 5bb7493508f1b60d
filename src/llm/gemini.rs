//! Gemini provider: `generateContent` with function declarations, plus
//! `countTokens` for budget pruning.

use std::time::Duration;

use agent_core::{
    AgentError, FunctionCall, FunctionDecl, LlmProvider, ModelReply, ParamKind, Part, Turn,
    TurnRole,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-computer-use-preview".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, AgentError> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::transport("missing Gemini API key"));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| AgentError::transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, verb: &str) -> String {
        format!(
            "{}/models/{}:{verb}",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, AgentError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| AgentError::transport(format!("gemini request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(AgentError::transport(format!(
                "gemini returned {status}: {text}"
            )));
        }
        response
            .json()
            .await
            .map_err(|err| AgentError::transport(format!("gemini response invalid: {err}")))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(
        &self,
        history: &[Turn],
        system_prompt: &str,
        catalogue: &[FunctionDecl],
    ) -> Result<ModelReply, AgentError> {
        let body = json!({
            "systemInstruction": ContentPayload::text_only(system_prompt),
            "contents": history.iter().map(ContentPayload::from_turn).collect::<Vec<_>>(),
            "tools": [{ "functionDeclarations":
                catalogue.iter().map(declaration_schema).collect::<Vec<_>>() }],
        });

        let payload = self.post(&self.endpoint("generateContent"), &body).await?;
        let response: GenerateContentResponse = serde_json::from_value(payload)
            .map_err(|err| AgentError::transport(format!("gemini response invalid: {err}")))?;

        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .ok_or_else(|| AgentError::transport("gemini response carried no candidates"))?;

        let reply = ModelReply::from_turn(content.into_turn());
        debug!(
            calls = reply.calls.len(),
            has_text = reply.text.is_some(),
            "gemini reply"
        );
        Ok(reply)
    }

    async fn count_tokens(&self, history: &[Turn]) -> Result<u64, AgentError> {
        let body = json!({
            "contents": history.iter().map(ContentPayload::from_turn).collect::<Vec<_>>(),
        });
        let payload = self.post(&self.endpoint("countTokens"), &body).await?;
        let response: CountTokensResponse = serde_json::from_value(payload)
            .map_err(|err| AgentError::transport(format!("gemini response invalid: {err}")))?;
        Ok(response.total_tokens)
    }
}

/// One content entry on the Gemini wire.
#[derive(Debug, Serialize, Deserialize)]
struct ContentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<PartPayload>,
}

impl ContentPayload {
    fn text_only(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![PartPayload {
                text: Some(text.to_string()),
                ..PartPayload::default()
            }],
        }
    }

    fn from_turn(turn: &Turn) -> Self {
        let role = match turn.role {
            // Tool output travels back to Gemini as a user-role content.
            TurnRole::User | TurnRole::Tool => "user",
            TurnRole::Model => "model",
        };
        Self {
            role: Some(role.to_string()),
            parts: turn.parts.iter().map(PartPayload::from_part).collect(),
        }
    }

    fn into_turn(self) -> Turn {
        let role = match self.role.as_deref() {
            Some("model") => TurnRole::Model,
            _ => TurnRole::User,
        };
        let parts = self.parts.into_iter().filter_map(PartPayload::into_part).collect();
        Turn::new(role, parts)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineDataPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCallPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponsePayload>,
}

impl PartPayload {
    fn from_part(part: &Part) -> Self {
        match part {
            Part::Text(text) => Self {
                text: Some(text.clone()),
                ..Self::default()
            },
            Part::InlineImage { mime, data } => Self {
                inline_data: Some(InlineDataPayload {
                    mime_type: mime.clone(),
                    data: BASE64.encode(data),
                }),
                ..Self::default()
            },
            Part::FunctionCall(call) => Self {
                function_call: Some(FunctionCallPayload {
                    name: call.name.clone(),
                    args: call.args.clone(),
                }),
                ..Self::default()
            },
            Part::FunctionResponse { name, values } => Self {
                function_response: Some(FunctionResponsePayload {
                    name: name.clone(),
                    response: values.clone(),
                }),
                ..Self::default()
            },
        }
    }

    fn into_part(self) -> Option<Part> {
        if let Some(text) = self.text {
            return Some(Part::Text(text));
        }
        if let Some(call) = self.function_call {
            return Some(Part::FunctionCall(FunctionCall {
                name: call.name,
                args: call.args,
            }));
        }
        if let Some(data) = self.inline_data {
            let bytes = BASE64.decode(data.data).unwrap_or_default();
            return Some(Part::InlineImage {
                mime: data.mime_type,
                data: bytes,
            });
        }
        None
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCallPayload {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponsePayload {
    name: String,
    response: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ContentPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    total_tokens: u64,
}

/// Translate a catalogue entry into the Gemini function declaration schema.
fn declaration_schema(decl: &FunctionDecl) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in &decl.params {
        let schema = match &param.kind {
            ParamKind::String => json!({ "type": "STRING", "description": param.description }),
            ParamKind::Number => json!({ "type": "NUMBER", "description": param.description }),
            ParamKind::Boolean => json!({ "type": "BOOLEAN", "description": param.description }),
            ParamKind::Enum(values) => json!({
                "type": "STRING",
                "enum": values,
                "description": param.description,
            }),
        };
        properties.insert(param.name.clone(), schema);
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }
    json!({
        "name": decl.name,
        "description": decl.description,
        "parameters": {
            "type": "OBJECT",
            "properties": properties,
            "required": required,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::action_catalogue;

    #[test]
    fn provider_requires_an_api_key() {
        assert!(GeminiProvider::new(GeminiConfig::default()).is_err());
        let ok = GeminiProvider::new(GeminiConfig {
            api_key: "k".to_string(),
            ..GeminiConfig::default()
        });
        assert!(ok.is_ok());
    }

    #[test]
    fn declaration_schema_carries_enums_and_required_fields() {
        let finish = action_catalogue()
            .iter()
            .find(|d| d.name == "finish")
            .unwrap();
        let schema = declaration_schema(finish);
        assert_eq!(schema["parameters"]["properties"]["status"]["enum"][0], "PASS");
        let required: Vec<&str> = schema["parameters"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert!(required.contains(&"summary"));
        assert!(required.contains(&"description"));
    }

    #[test]
    fn turns_serialize_to_the_gemini_wire_shape() {
        let turn = Turn::tool(vec![
            Part::FunctionResponse {
                name: "navigate".to_string(),
                values: Map::new(),
            },
            Part::InlineImage {
                mime: "image/png".to_string(),
                data: vec![1, 2, 3],
            },
            Part::Text("next step".to_string()),
        ]);
        let value = serde_json::to_value(ContentPayload::from_turn(&turn)).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["parts"][0]["functionResponse"]["name"], "navigate");
        assert_eq!(value["parts"][1]["inlineData"]["data"], BASE64.encode([1, 2, 3]));
        assert_eq!(value["parts"][2]["text"], "next step");
    }

    #[test]
    fn model_content_parses_back_into_calls() {
        let raw = json!({
            "role": "model",
            "parts": [
                { "text": "<thought>click it</thought>" },
                { "functionCall": { "name": "click_at", "args": { "x": 10, "y": 20 } } }
            ]
        });
        let content: ContentPayload = serde_json::from_value(raw).unwrap();
        let reply = ModelReply::from_turn(content.into_turn());
        assert_eq!(reply.calls.len(), 1);
        assert_eq!(reply.calls[0].name, "click_at");
        assert!(reply.text.as_deref().unwrap().contains("click it"));
    }
}
