//! LLM backend clients.
//!
//! ROXY answers through a local Ollama server. The client supports both a
//! single blocking completion and a token stream for the gateway's SSE
//! path.

use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RagError, Result};

/// A stream of generated tokens.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Trait for LLM completion backends.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier, for `ModelInfo` introspection.
    fn model(&self) -> &str;

    /// Generate a full completion for the prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate a completion as a token stream.
    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream>;
}

/// Client for a local Ollama server.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client against the default local Ollama address.
    pub fn new() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            // Generation can legitimately take a while on local hardware,
            // but it must stay bounded.
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// One NDJSON frame of the Ollama generate API.
#[derive(Debug, Deserialize)]
struct OllamaGenerateFrame {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Generating completion with model: {}", self.model);

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&OllamaGenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::LlmRequest(error_text));
        }

        let frame: OllamaGenerateFrame = response.json().await?;
        if frame.response.is_empty() {
            return Err(RagError::InvalidResponse(
                "empty completion in response".to_string(),
            ));
        }
        Ok(frame.response)
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TokenStream> {
        debug!("Streaming completion with model: {}", self.model);

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&OllamaGenerateRequest {
                model: &self.model,
                prompt,
                stream: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RagError::LlmRequest(error_text));
        }

        let mut bytes = response.bytes_stream();

        // Ollama streams newline-delimited JSON frames; frames can split
        // across chunk boundaries, so buffer until each newline.
        let stream = try_stream! {
            let mut buffer = Vec::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk?;
                buffer.extend_from_slice(&chunk);

                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let frame: OllamaGenerateFrame = serde_json::from_str(line)?;
                    if !frame.response.is_empty() {
                        yield frame.response;
                    }
                    if frame.done {
                        return;
                    }
                }
            }

            // The body may end without a trailing newline; the leftover
            // bytes are still one full frame.
            let line = String::from_utf8_lossy(&buffer);
            let line = line.trim();
            if !line.is_empty() {
                let frame: OllamaGenerateFrame = serde_json::from_str(line)?;
                if !frame.response.is_empty() {
                    yield frame.response;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn generate_parses_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "ROXY is a local assistant.",
                "done": true
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new().with_base_url(server.uri());
        let text = client.generate("what is roxy").await.unwrap();
        assert_eq!(text, "ROXY is a local assistant.");
    }

    #[tokio::test]
    async fn generate_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let client = OllamaClient::new().with_base_url(server.uri());
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, RagError::LlmRequest(_)));
    }

    #[tokio::test]
    async fn stream_yields_tokens_until_done() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"response\":\"RO\",\"done\":false}\n",
            "{\"response\":\"XY\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true}\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = OllamaClient::new().with_base_url(server.uri());
        let mut stream = client.generate_stream("hello").await.unwrap();

        let mut tokens = Vec::new();
        while let Some(token) = stream.next().await {
            tokens.push(token.unwrap());
        }
        assert_eq!(tokens, vec!["RO".to_string(), "XY".to_string()]);
    }

    #[tokio::test]
    async fn stream_keeps_final_frame_without_trailing_newline() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"response\":\"RO\",\"done\":false}\n",
            "{\"response\":\"XY\",\"done\":true}",
        );
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let client = OllamaClient::new().with_base_url(server.uri());
        let mut stream = client.generate_stream("hello").await.unwrap();

        let mut tokens = Vec::new();
        while let Some(token) = stream.next().await {
            tokens.push(token.unwrap());
        }
        assert_eq!(tokens, vec!["RO".to_string(), "XY".to_string()]);
    }
}
