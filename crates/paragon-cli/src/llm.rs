//! OpenAI-compatible chat completions client for the generative model seam.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use paragon_core::error::GenerationError;
use paragon_core::models::config::GenerativeConfig;
use paragon_core::receipt::{GenerationRequest, GenerativeModel};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Talks to `{base_url}/chat/completions`.
pub struct ChatCompletionsClient {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl ChatCompletionsClient {
    pub fn from_config(config: &GenerativeConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        // Local servers (Ollama, llama.cpp) accept requests without a key.
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());

        info!(
            url = %config.base_url,
            model = %config.model,
            authenticated = api_key.is_some(),
            "Using generative model service"
        );

        Ok(Self {
            client,
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.timeout_secs)
        } else {
            GenerationError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl GenerativeModel for ChatCompletionsClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user_text.clone(),
                },
            ],
            temperature: 0.0,
        };

        let mut builder = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerationError::Malformed("no choices in response".to_string()))?;

        debug!(chars = content.len(), "Received model reply");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base() {
        let config = GenerativeConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..GenerativeConfig::default()
        };
        let client = ChatCompletionsClient::from_config(&config).unwrap();
        assert_eq!(client.url, "http://localhost:11434/v1/chat/completions");
        assert_eq!(client.model, "llama3.1");
    }

    #[test]
    fn test_response_envelope() {
        let chat: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"items\":[]}"}}]}"#,
        )
        .unwrap();
        assert_eq!(chat.choices[0].message.content, r#"{"items":[]}"#);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let config = GenerativeConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..GenerativeConfig::default()
        };
        let client = ChatCompletionsClient::from_config(&config).unwrap();
        let request = GenerationRequest {
            system_prompt: "s".to_string(),
            user_text: "u".to_string(),
        };
        let err = client.complete(&request).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Unavailable(_) | GenerationError::Timeout(_)
        ));
    }
}
