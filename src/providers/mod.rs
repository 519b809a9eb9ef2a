//! Generative model capability providers.
//!
//! The pipeline treats the generative model as an opaque remote capability:
//! it receives an optional system instruction plus user content parts and
//! returns text. [`http::HttpGenerativeModel`] talks to an OpenAI-compatible
//! chat-completions endpoint; [`MockGenerativeModel`] scripts responses for
//! deterministic tests.

pub mod http;

pub use http::HttpGenerativeModel;

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::RagError;

/// One part of the user turn sent to a generative model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserContent {
    Text(String),
    /// A remote file passed by reference, used for PDF conversion.
    FileUrl { url: String, mime_type: String },
}

/// A single generation request: optional system instruction plus ordered user
/// content parts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerateRequest {
    pub system: Option<String>,
    pub user: Vec<UserContent>,
}

impl GenerateRequest {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.user.push(UserContent::Text(text.into()));
        self
    }

    #[must_use]
    pub fn with_file_url(mut self, url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        self.user.push(UserContent::FileUrl {
            url: url.into(),
            mime_type: mime_type.into(),
        });
        self
    }
}

/// Opaque generative capability: text in, text out.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<String, RagError>;
}

/// Scripted generative model for tests and demos.
///
/// Responses are consumed front to back; an exhausted script yields a provider
/// error, which is also how persistent upstream failure is simulated.
#[derive(Default)]
pub struct MockGenerativeModel {
    script: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl MockGenerativeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn push_response(&self, text: impl Into<String>) {
        self.script.lock().push_back(Ok(text.into()));
    }

    /// Queues a failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.script.lock().push_back(Err(message.into()));
    }

    /// Number of generate calls observed so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Copies of every request received, in call order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl GenerativeModel for MockGenerativeModel {
    async fn generate(&self, request: GenerateRequest) -> Result<String, RagError> {
        self.requests.lock().push(request);
        match self.script.lock().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(RagError::Provider(message)),
            None => Err(RagError::Provider("mock script exhausted".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_replays_script_in_order() {
        let model = MockGenerativeModel::new();
        model.push_response("first");
        model.push_failure("boom");

        let ok = model.generate(GenerateRequest::new().with_text("q")).await;
        assert_eq!(ok.unwrap(), "first");

        let err = model.generate(GenerateRequest::new().with_text("q")).await;
        assert!(matches!(err, Err(RagError::Provider(message)) if message == "boom"));

        let exhausted = model.generate(GenerateRequest::new().with_text("q")).await;
        assert!(exhausted.is_err());
        assert_eq!(model.call_count(), 3);
    }

    #[test]
    fn request_builder_accumulates_parts() {
        let request = GenerateRequest::new()
            .with_system("sys")
            .with_text("hello")
            .with_file_url("https://example.com/a.pdf", "application/pdf");
        assert_eq!(request.system.as_deref(), Some("sys"));
        assert_eq!(request.user.len(), 2);
    }
}
