//! reqwest-backed generative model provider.
//!
//! Speaks the OpenAI-compatible chat-completions wire format, which the
//! hosted gateways used for query rewriting and markdown conversion all
//! accept. File parts (PDF conversion) are serialized in the OpenRouter-style
//! `file_url` form.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{GenerateRequest, GenerativeModel, UserContent};
use crate::types::RagError;

/// Chat-completions client for an OpenAI-compatible endpoint.
#[derive(Clone, Debug)]
pub struct HttpGenerativeModel {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpGenerativeModel {
    pub fn builder() -> HttpGenerativeModelBuilder {
        HttpGenerativeModelBuilder::default()
    }
}

/// Builder for [`HttpGenerativeModel`].
#[derive(Clone, Debug, Default)]
pub struct HttpGenerativeModelBuilder {
    client: Option<Client>,
    endpoint: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
}

impl HttpGenerativeModelBuilder {
    /// Full URL of the chat-completions endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Model identifier sent with every request.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Bearer token for the `Authorization` header.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Custom HTTP client (timeouts, proxies). Defaults to a fresh client.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<HttpGenerativeModel, RagError> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| RagError::Provider("generative endpoint is required".to_string()))?;
        let model = self
            .model
            .ok_or_else(|| RagError::Provider("generative model name is required".to_string()))?;
        Ok(HttpGenerativeModel {
            client: self.client.unwrap_or_default(),
            endpoint,
            model,
            api_key: self.api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

fn user_content_value(parts: &[UserContent]) -> Value {
    // A single text part stays a bare string for maximum endpoint
    // compatibility; anything else becomes a content-part array.
    if let [UserContent::Text(text)] = parts {
        return Value::String(text.clone());
    }
    let parts: Vec<Value> = parts
        .iter()
        .map(|part| match part {
            UserContent::Text(text) => json!({ "type": "text", "text": text }),
            UserContent::FileUrl { url, mime_type } => json!({
                "type": "file_url",
                "file_url": { "url": url, "mime_type": mime_type },
            }),
        })
        .collect();
    Value::Array(parts)
}

#[async_trait]
impl GenerativeModel for HttpGenerativeModel {
    async fn generate(&self, request: GenerateRequest) -> Result<String, RagError> {
        if request.user.is_empty() {
            return Err(RagError::Provider(
                "generate request has no user content".to_string(),
            ));
        }

        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({
            "role": "user",
            "content": user_content_value(&request.user),
        }));

        let body = json!({ "model": self.model, "messages": messages });
        debug!(endpoint = %self.endpoint, model = %self.model, "dispatching generation request");

        let mut http_request = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key);
        }

        let response = http_request
            .send()
            .await
            .map_err(|err| RagError::Provider(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RagError::Provider(format!(
                "generation endpoint returned {status}: {detail}"
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|err| RagError::Provider(format!("malformed completion response: {err}")))?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(RagError::Provider("empty completion".to_string()));
        }
        Ok(text)
    }
}
