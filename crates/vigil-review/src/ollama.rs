use std::time::Duration;

use serde::{Deserialize, Serialize};
use vigil_core::VigilError;

/// A message in a chat conversation with the model.
///
/// # Examples
///
/// ```
/// use vigil_review::ollama::{ChatMessage, Role};
///
/// let msg = ChatMessage {
///     role: Role::User,
///     content: "Review this file".into(),
/// };
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use vigil_review::ollama::Role;
///
/// let role = Role::System;
/// assert_eq!(serde_json::to_string(&role).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// Client for a local Ollama server.
///
/// Talks to the native Ollama HTTP API: `/api/tags` for the local model
/// listing and `/api/chat` for non-streaming chat completions.
///
/// # Examples
///
/// ```
/// use vigil_review::ollama::OllamaClient;
///
/// let client = OllamaClient::new("http://localhost:11434").unwrap();
/// ```
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a new client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Model`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, VigilError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| VigilError::Model(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// List the names of models available on the server.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Model`] on HTTP errors or an unexpected
    /// response shape.
    pub async fn list_models(&self) -> Result<Vec<String>, VigilError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| VigilError::Model(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(VigilError::Model(format!(
                "model server error {status}: {body_text}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VigilError::Model(format!("failed to parse response: {e}")))?;

        let models = body
            .get("models")
            .and_then(|m| m.as_array())
            .ok_or_else(|| VigilError::Model(format!("unexpected response structure: {body}")))?;

        Ok(models
            .iter()
            .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
            .map(str::to_string)
            .collect())
    }

    /// Verify that `model` exists on the server, by exact name match.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Config`] if the model is not present, or
    /// [`VigilError::Model`] if the listing itself fails.
    pub async fn ensure_model(&self, model: &str) -> Result<(), VigilError> {
        let models = self.list_models().await?;
        if is_available(&models, model) {
            Ok(())
        } else {
            Err(VigilError::Config(format!(
                "couldn't find local model: {model}"
            )))
        }
    }

    /// Send a non-streaming chat request and return the response content.
    ///
    /// `num_ctx` sizes the model's context window for this request.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Model`] on HTTP errors or response parsing
    /// failures.
    pub async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        num_ctx: usize,
    ) -> Result<String, VigilError> {
        let url = format!("{}/api/chat", self.base_url);

        let body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": false,
            "options": { "num_ctx": num_ctx },
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| VigilError::Model(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(VigilError::Model(format!(
                "model server error {status}: {body_text}"
            )));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VigilError::Model(format!("failed to parse response: {e}")))?;

        let content = response_body
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                VigilError::Model(format!("unexpected response structure: {response_body}"))
            })?;

        Ok(content.to_string())
    }
}

// Exact, case-sensitive match against the server's model names.
fn is_available(models: &[String], model: &str) -> bool {
    models.iter().any(|name| name == model)
}
