//! OpenAI-compatible chat-completions client
//!
//! Sends one request per resolution with the registry's function definitions
//! as `tools` and reads back the first choice. Works against any provider that
//! speaks the chat-completions wire format (OpenAI, OpenRouter, local proxies).
//!
//! SECURITY NOTE:
//! - The API key is held as a `SecretString` and only exposed to build the
//!   `Authorization` header
//! - The key is never logged or serialized

use super::{IntentOracle, OracleError, OracleReply, OracleRequest};
use crate::config::OracleConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

/// Longest provider error body kept in an `OracleError::Status`
const MAX_ERROR_BODY_CHARS: usize = 500;

pub struct OpenAiOracle {
    client: Client,
    endpoint: Url,
    api_key: SecretString,
}

impl OpenAiOracle {
    /// Create a client for an explicit endpoint
    ///
    /// # Arguments
    /// * `endpoint` - Full chat-completions URL
    /// * `api_key` - Bearer token for the provider
    /// * `timeout` - Per-request timeout enforced by the HTTP client
    pub fn new(endpoint: Url, api_key: SecretString, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// Create a client from configuration, reading the key from the environment
    pub fn from_config(config: &OracleConfig) -> crate::Result<Self> {
        let api_key = config.api_key()?;
        let endpoint = config.completions_url()?;
        Self::new(
            endpoint,
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl IntentOracle for OpenAiOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            tools = request.tools.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&request_body(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        parse_completion(&body)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

fn request_body(request: &OracleRequest) -> Value {
    json!({
        "model": request.model,
        "messages": [
            { "role": "system", "content": request.system_prompt },
            { "role": "user", "content": request.utterance },
        ],
        "tools": request.tools,
    })
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallPayload>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallPayload {
    function: FunctionPayload,
}

#[derive(Debug, Deserialize)]
struct FunctionPayload {
    name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    arguments: String,
}

/// Turn a raw chat-completions body into a reply.
///
/// The first tool call of the first choice wins; without one, non-blank text
/// content is returned as a message.
fn parse_completion(raw: &str) -> Result<OracleReply, OracleError> {
    let response: CompletionResponse = serde_json::from_str(raw)
        .map_err(|e| OracleError::MalformedResponse(format!("invalid completion json: {e}")))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::MalformedResponse("response contained no choices".into()))?;

    let mut calls = choice.message.tool_calls.unwrap_or_default().into_iter();
    if let Some(call) = calls.next() {
        let dropped = calls.count();
        if dropped > 0 {
            tracing::warn!(
                function = %call.function.name,
                dropped,
                "Model returned several function calls; using the first"
            );
        }
        let arguments = parse_arguments(&call.function.arguments)?;
        return Ok(OracleReply::FunctionCall {
            name: call.function.name,
            arguments,
        });
    }

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(OracleReply::Message(text.trim().to_string())),
        _ => Err(OracleError::EmptyReply),
    }
}

fn parse_arguments(raw: &str) -> Result<Value, OracleError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(raw).map_err(|e| {
        OracleError::MalformedResponse(format!("function arguments are not valid json: {e}"))
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}... [truncated]")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_completion_maps_first_tool_call() {
        let payload = r#"{
            "choices": [
                {
                    "message": {
                        "content": null,
                        "tool_calls": [
                            {
                                "id": "call_1",
                                "type": "function",
                                "function": {
                                    "name": "transfer_tokens",
                                    "arguments": "{\"specifiedToken\":\"USD\",\"specifiedAmount\":5,\"transferTo\":\"Alice\"}"
                                }
                            },
                            {
                                "id": "call_2",
                                "type": "function",
                                "function": { "name": "swap_tokens", "arguments": "{}" }
                            }
                        ]
                    }
                }
            ]
        }"#;

        let reply = parse_completion(payload).unwrap();
        match reply {
            OracleReply::FunctionCall { name, arguments } => {
                assert_eq!(name, "transfer_tokens");
                assert_eq!(arguments["specifiedAmount"], 5);
                assert_eq!(arguments["transferTo"], "Alice");
            }
            other => panic!("expected function call, got {other:?}"),
        }
    }

    #[test]
    fn parse_completion_returns_text_message() {
        let payload = r#"{"choices":[{"message":{"content":"  Who should receive the tokens? ","tool_calls":null}}]}"#;
        assert_eq!(
            parse_completion(payload).unwrap(),
            OracleReply::Message("Who should receive the tokens?".to_string())
        );
    }

    #[test]
    fn parse_completion_rejects_empty_reply() {
        let payload = r#"{"choices":[{"message":{"content":""}}]}"#;
        assert!(matches!(
            parse_completion(payload),
            Err(OracleError::EmptyReply)
        ));
    }

    #[test]
    fn parse_completion_rejects_missing_choices() {
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(OracleError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_completion("<html>bad gateway</html>"),
            Err(OracleError::MalformedResponse(_))
        ));
    }

    #[test]
    fn parse_completion_rejects_bad_arguments() {
        let payload = r#"{"choices":[{"message":{"tool_calls":[{"function":{"name":"swap_tokens","arguments":"{not json"}}]}}]}"#;
        assert!(matches!(
            parse_completion(payload),
            Err(OracleError::MalformedResponse(_))
        ));
    }

    #[test]
    fn blank_arguments_become_empty_object() {
        let payload = r#"{"choices":[{"message":{"tool_calls":[{"function":{"name":"transfer_tokens","arguments":""}}]}}]}"#;
        let reply = parse_completion(payload).unwrap();
        assert_eq!(
            reply,
            OracleReply::FunctionCall {
                name: "transfer_tokens".to_string(),
                arguments: json!({}),
            }
        );
    }

    #[test]
    fn request_body_has_system_and_user_messages() {
        let request = OracleRequest {
            model: "gpt-4o".to_string(),
            system_prompt: "rules".to_string(),
            utterance: "send 5 USD to Alice".to_string(),
            tools: vec![json!({"type": "function"})],
        };
        let body = request_body(&request);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "send 5 USD to Alice");
        assert_eq!(body["tools"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn truncate_is_char_safe() {
        let s = "é".repeat(10);
        assert_eq!(truncate(&s, 3), "ééé... [truncated]");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn oracle_builds_with_explicit_endpoint() {
        let endpoint = Url::parse("http://localhost:8080/v1/chat/completions").unwrap();
        let oracle = OpenAiOracle::new(
            endpoint.clone(),
            SecretString::from("sk-test".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(oracle.endpoint(), &endpoint);
        assert_eq!(oracle.name(), "openai");
    }
}
