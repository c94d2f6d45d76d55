//! LLM-backed extraction over an OpenAI-compatible chat-completions API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_model::RawInfrastructure;
use tracing::{debug, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::extractor::Extractor;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are a cloud architect. Extract EXACTLY the infrastructure the user asks for \
and return a JSON object of the form \
{\"providers\": [{\"provider\": \"aws|azure|gcp|openstack\", \"servers\": int, \"databases\": int, \
\"networks\": int, \"load_balancers\": int, \"security_groups\": int, \
\"database_type\": \"mysql|postgresql|mariadb|mongodb\"}]}.\n\
Rules:\n\
- Never add components the user did not ask for.\n\
- If no database is mentioned, databases is 0.\n\
- If no load balancer is mentioned, load_balancers is 0.\n\
- One entry per cloud provider mentioned, in the order they are mentioned.\n\
Examples:\n\
'Je veux un serveur AWS' -> {\"providers\": [{\"provider\": \"aws\", \"servers\": 1, \"databases\": 0, \"load_balancers\": 0}]}\n\
'3 servers with MySQL' -> {\"providers\": [{\"provider\": \"aws\", \"servers\": 3, \"databases\": 1, \"database_type\": \"mysql\"}]}\n\
'Une base de données' -> {\"providers\": [{\"provider\": \"aws\", \"servers\": 0, \"databases\": 1}]}";

/// Extractor that asks a chat model for the structured description.
pub struct LlmExtractor {
    api_key: String,
    model: String,
    endpoint: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl LlmExtractor {
    pub fn new(api_key: String, model: Option<String>, endpoint: Option<String>) -> Self {
        Self {
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            max_retries: 3,
            client: reqwest::Client::new(),
        }
    }

    /// Build from `OPENAI_API_KEY`, `STRATUS_LLM_MODEL` and `STRATUS_LLM_ENDPOINT`.
    pub fn from_env() -> ExtractResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ExtractError::NotConfigured)?;
        let model = std::env::var("STRATUS_LLM_MODEL").ok().filter(|m| !m.is_empty());
        let endpoint = std::env::var("STRATUS_LLM_ENDPOINT").ok().filter(|e| !e.is_empty());
        Ok(Self::new(api_key, model, endpoint))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, description: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: description.to_string(),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
            temperature: 0.0,
        }
    }

    async fn complete(&self, request: &ChatRequest) -> ExtractResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result: ChatResponse = response.json().await?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ExtractError::EmptyResponse)
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn extract(&self, description: &str) -> ExtractResult<RawInfrastructure> {
        let request = self.request_body(description);
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // 2s, 4s, ...
                tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
            }
            match self.complete(&request).await {
                Ok(content) => {
                    debug!("LLM reply from {}: {}", self.model, content);
                    return parse_reply(&content);
                }
                Err(e) if e.is_retryable() => {
                    warn!("LLM attempt {}/{} failed: {}", attempt + 1, self.max_retries, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(ExtractError::EmptyResponse))
    }
}

/// Parse a model reply, tolerating a Markdown code fence around the JSON.
pub fn parse_reply(content: &str) -> ExtractResult<RawInfrastructure> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::EmptyResponse);
    }
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    Ok(serde_json::from_str(json.trim())?)
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_configuration() {
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("STRATUS_LLM_MODEL");
        std::env::remove_var("STRATUS_LLM_ENDPOINT");
        assert!(matches!(LlmExtractor::from_env(), Err(ExtractError::NotConfigured)));

        std::env::set_var("OPENAI_API_KEY", "  ");
        assert!(matches!(LlmExtractor::from_env(), Err(ExtractError::NotConfigured)));

        std::env::set_var("OPENAI_API_KEY", "test-key");
        let extractor = LlmExtractor::from_env().unwrap();
        assert_eq!(extractor.model(), DEFAULT_MODEL);
        assert_eq!(extractor.endpoint(), DEFAULT_ENDPOINT);

        std::env::set_var("STRATUS_LLM_MODEL", "gpt-4.1");
        std::env::set_var("STRATUS_LLM_ENDPOINT", "http://localhost:8080/v1/chat/completions");
        let extractor = LlmExtractor::from_env().unwrap();
        assert_eq!(extractor.model(), "gpt-4.1");
        assert_eq!(extractor.endpoint(), "http://localhost:8080/v1/chat/completions");

        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("STRATUS_LLM_MODEL");
        std::env::remove_var("STRATUS_LLM_ENDPOINT");
    }

    #[test]
    fn test_request_body_asks_for_json() {
        let extractor = LlmExtractor::new("key".to_string(), None, None);
        let body = serde_json::to_value(extractor.request_body("un serveur")).unwrap();

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "un serveur");
    }

    #[test]
    fn test_parse_reply_formats() {
        let flat = parse_reply(r#"{"provider": "gcp", "servers": 2}"#).unwrap();
        assert_eq!(flat.providers.len(), 1);
        assert_eq!(flat.providers[0].servers, Some(2));

        let fenced = parse_reply("```json\n{\"providers\": [{\"provider\": \"aws\"}, {\"provider\": \"azure\"}]}\n```").unwrap();
        assert_eq!(fenced.providers.len(), 2);

        let negative = parse_reply(r#"{"provider": "aws", "servers": -1}"#).unwrap();
        assert_eq!(negative.providers[0].servers, Some(-1));
    }

    #[test]
    fn test_parse_reply_errors() {
        assert!(matches!(parse_reply("   "), Err(ExtractError::EmptyResponse)));
        assert!(matches!(parse_reply("I think you want a server"), Err(ExtractError::Parse(_))));
    }

    #[test]
    fn test_retry_classification() {
        assert!(ExtractError::Api { status: 503, body: String::new() }.is_retryable());
        assert!(ExtractError::Api { status: 429, body: String::new() }.is_retryable());
        assert!(!ExtractError::Api { status: 401, body: String::new() }.is_retryable());
        assert!(!ExtractError::EmptyResponse.is_retryable());
    }
}
