//! Chat backend seam between the agent loop and the LLM provider.
//!
//! The loop only needs "send this conversation, get back text and/or tool
//! calls". [`GenaiBackend`] does that against a hosted provider through the
//! `genai` client; tests substitute a scripted backend.

use std::sync::Arc;

use async_trait::async_trait;
use genai::chat::{ChatOptions, ChatRequest, ToolCall};
use genai::resolver::{AuthData, AuthResolver};
use genai::{Client, ModelIden};

use crate::error::{AgentError, InvokeError};

/// One model reply, normalized: optional text plus any requested tool calls.
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the conversation so far and return the model's next turn.
    async fn complete(&self, model: &str, request: &ChatRequest) -> Result<ModelTurn, AgentError>;
}

/// Builds a backend for a given API key. Called again whenever the key
/// changes between requests.
pub trait BackendFactory: Send + Sync {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn ChatBackend>, InvokeError>;
}

/// [`ChatBackend`] backed by a `genai` client holding a fixed API key.
pub struct GenaiBackend {
    client: Client,
    options: ChatOptions,
}

impl GenaiBackend {
    pub fn new(api_key: &str, temperature: f64) -> Self {
        let key = api_key.to_string();
        let auth = AuthResolver::from_resolver_fn(
            move |_model: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_single(key.clone())))
            },
        );
        let client = Client::builder()
            .with_auth_resolver(auth)
            .build()
            .expect("failed to build HTTP client");
        let options = ChatOptions::default().with_temperature(temperature);

        Self { client, options }
    }
}

#[async_trait]
impl ChatBackend for GenaiBackend {
    async fn complete(&self, model: &str, request: &ChatRequest) -> Result<ModelTurn, AgentError> {
        let response = self
            .client
            .exec_chat(model, request.clone(), Some(&self.options))
            .await
            .map_err(|e| AgentError::LlmError(e.to_string()))?;

        let text = response.first_text().map(str::to_string);
        let tool_calls = response.into_tool_calls();

        Ok(ModelTurn { text, tool_calls })
    }
}

/// Production factory: one [`GenaiBackend`] per distinct key.
#[derive(Debug, Clone)]
pub struct GenaiFactory {
    temperature: f64,
}

impl GenaiFactory {
    pub fn new(temperature: f64) -> Self {
        Self { temperature }
    }
}

impl BackendFactory for GenaiFactory {
    fn connect(&self, api_key: &str) -> Result<Arc<dyn ChatBackend>, InvokeError> {
        Ok(Arc::new(GenaiBackend::new(api_key, self.temperature)))
    }
}
