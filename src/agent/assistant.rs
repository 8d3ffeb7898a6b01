//! The note assistant: one prompt in, one reply out.
//!
//! [`NoteAgent::invoke`] validates the prompt, looks the credential up fresh
//! for every call, reuses the chat backend while the key stays the same,
//! drives [`run_agent_loop`] and folds every loop fault into reply text.
//! Only an empty prompt and backend construction failures escape as
//! [`InvokeError`].

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use regex::Regex;

use crate::agent::agent_loop::{LoopContext, run_agent_loop};
use crate::agent::backend::{BackendFactory, ChatBackend, GenaiFactory};
use crate::agent::logging::{LogEntry, Transcript, now_iso};
use crate::agent::system_prompt::build_system_prompt;
use crate::agent::tools::ToolRegistry;
use crate::config::AppConfig;
use crate::error::{AgentError, InvokeError};
use crate::safety::ScratchRoot;

/// Wording that marks a provider fault as a credential problem.
const CREDENTIAL_PATTERN: &str =
    r"(?i)(api[ _-]?key|unauthori[sz]ed|\b401\b|authenticat|credential|invalid[ _-]?auth)";

/// Where the provider API key comes from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Read the named environment variable on every request.
    Env(String),
    /// A fixed key, for tests and local runs.
    Static(String),
}

impl CredentialSource {
    /// Name shown to operators in configuration messages.
    pub fn label(&self) -> &str {
        match self {
            CredentialSource::Env(var) => var,
            CredentialSource::Static(_) => "the configured API key",
        }
    }

    /// Look the key up now. Blank values count as missing.
    pub fn lookup(&self) -> Result<String, AgentError> {
        let value = match self {
            CredentialSource::Env(var) => std::env::var(var).ok(),
            CredentialSource::Static(key) => Some(key.clone()),
        };
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AgentError::MissingCredential {
                var: self.label().to_string(),
            })
    }
}

/// Per-assistant settings, passed in explicitly instead of read from globals.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub max_steps: usize,
    pub credential: CredentialSource,
    pub transcript_dir: Option<PathBuf>,
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_steps: config.max_steps,
            credential: CredentialSource::Env(config.api_key_env.clone()),
            transcript_dir: config.transcript_dir.clone(),
        }
    }
}

struct CachedBackend {
    api_key: String,
    backend: Arc<dyn ChatBackend>,
}

pub struct NoteAgent {
    settings: AgentSettings,
    scratch: ScratchRoot,
    tools: ToolRegistry,
    system_prompt: String,
    factory: Arc<dyn BackendFactory>,
    cached: Mutex<Option<CachedBackend>>,
    credential_wording: Regex,
}

impl NoteAgent {
    /// Build an assistant over an existing scratch root.
    pub fn new(
        settings: AgentSettings,
        scratch: ScratchRoot,
        factory: Arc<dyn BackendFactory>,
    ) -> anyhow::Result<Self> {
        let credential_wording = Regex::new(CREDENTIAL_PATTERN)
            .map_err(|e| anyhow::anyhow!("Failed to compile credential pattern: {}", e))?;
        let tools = ToolRegistry::note_tools();
        let system_prompt = build_system_prompt(scratch.root(), &tools.descriptions());

        Ok(Self {
            settings,
            scratch,
            tools,
            system_prompt,
            factory,
            cached: Mutex::new(None),
            credential_wording,
        })
    }

    /// Build the production assistant: scratch root from config, `genai`
    /// backends.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let scratch = ScratchRoot::new(&config.scratch_root)?;
        Self::new(
            AgentSettings::from_config(config),
            scratch,
            Arc::new(GenaiFactory::new(config.temperature)),
        )
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Answer one prompt.
    ///
    /// # Errors
    ///
    /// [`InvokeError::EmptyPrompt`] for blank prompts (no model call is made)
    /// and [`InvokeError::Setup`] when no backend can be built. Every other
    /// failure comes back as `Ok` text.
    pub async fn invoke(&self, prompt: &str) -> Result<String, InvokeError> {
        if prompt.trim().is_empty() {
            return Err(InvokeError::EmptyPrompt);
        }

        let mut transcript = Transcript::open(self.settings.transcript_dir.as_deref());
        transcript.record(LogEntry::RequestStart {
            timestamp: now_iso(),
            model: self.settings.model.clone(),
            prompt: prompt.to_string(),
        });

        let result = match self.settings.credential.lookup() {
            Ok(api_key) => {
                let backend = match self.backend_for(&api_key) {
                    Ok(backend) => backend,
                    Err(e) => {
                        transcript.record(LogEntry::Error {
                            timestamp: now_iso(),
                            step: 0,
                            message: e.to_string(),
                        });
                        transcript.record(LogEntry::RequestEnd {
                            timestamp: now_iso(),
                            steps: None,
                            outcome: "setup_failed".to_string(),
                        });
                        return Err(e);
                    }
                };
                let ctx = LoopContext {
                    backend: backend.as_ref(),
                    model: &self.settings.model,
                    system_prompt: &self.system_prompt,
                    tools: &self.tools,
                    scratch: &self.scratch,
                    max_steps: self.settings.max_steps,
                };
                run_agent_loop(&ctx, prompt, &mut transcript).await
            }
            Err(e) => Err(e),
        };

        let (reply, steps, outcome) = match result {
            Ok(done) => {
                tracing::info!(
                    steps = done.steps,
                    tool_calls = done.tool_calls,
                    "Agent run completed"
                );
                (done.response, Some(done.steps), "completed")
            }
            Err(e) => {
                tracing::warn!(error = %e, "Agent run failed");
                (self.describe_failure(&e), None, "failed")
            }
        };

        transcript.record(LogEntry::RequestEnd {
            timestamp: now_iso(),
            steps,
            outcome: outcome.to_string(),
        });

        Ok(reply)
    }

    /// Turn a loop fault into text for the end user. Credential problems get
    /// an operator-actionable message instead of the raw provider error.
    pub fn describe_failure(&self, err: &AgentError) -> String {
        let description = err.to_string();
        if self.credential_wording.is_match(&description) {
            format!(
                "Configuration error: the language model API key is missing or was rejected. \
                 Set {} to a valid key and try again.",
                self.settings.credential.label()
            )
        } else {
            format!("Error: {description}")
        }
    }

    /// Return the cached backend for `api_key`, building a new one if the key
    /// changed since the last request.
    fn backend_for(&self, api_key: &str) -> Result<Arc<dyn ChatBackend>, InvokeError> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| InvokeError::Setup("backend cache lock poisoned".to_string()))?;

        if let Some(entry) = cached.as_ref() {
            if entry.api_key == api_key {
                return Ok(entry.backend.clone());
            }
            tracing::info!("API key changed, rebuilding chat backend");
        }

        let backend = self.factory.connect(api_key)?;
        *cached = Some(CachedBackend {
            api_key: api_key.to_string(),
            backend: backend.clone(),
        });
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::backend::ModelTurn;
    use async_trait::async_trait;
    use genai::chat::ChatRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Answers every request with the same outcome.
    struct Fixed(Result<String, String>);

    #[async_trait]
    impl ChatBackend for Fixed {
        async fn complete(&self, _model: &str, _request: &ChatRequest) -> Result<ModelTurn, AgentError> {
            match &self.0 {
                Ok(text) => Ok(ModelTurn {
                    text: Some(text.clone()),
                    tool_calls: Vec::new(),
                }),
                Err(message) => Err(AgentError::LlmError(message.clone())),
            }
        }
    }

    struct CountingFactory {
        connects: AtomicUsize,
        outcome: Result<String, String>,
    }

    impl CountingFactory {
        fn new(outcome: Result<String, String>) -> Arc<Self> {
            Arc::new(Self {
                connects: AtomicUsize::new(0),
                outcome,
            })
        }
    }

    impl BackendFactory for CountingFactory {
        fn connect(&self, _api_key: &str) -> Result<Arc<dyn ChatBackend>, InvokeError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Fixed(self.outcome.clone())))
        }
    }

    struct FailingFactory;

    impl BackendFactory for FailingFactory {
        fn connect(&self, _api_key: &str) -> Result<Arc<dyn ChatBackend>, InvokeError> {
            Err(InvokeError::Setup("no client".to_string()))
        }
    }

    fn settings(credential: CredentialSource) -> AgentSettings {
        AgentSettings {
            model: "test-model".to_string(),
            max_steps: 4,
            credential,
            transcript_dir: None,
        }
    }

    fn make_agent(
        tmp: &TempDir,
        credential: CredentialSource,
        factory: Arc<dyn BackendFactory>,
    ) -> NoteAgent {
        let scratch = ScratchRoot::new(tmp.path()).unwrap();
        NoteAgent::new(settings(credential), scratch, factory).unwrap()
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected_before_lookup() {
        let tmp = TempDir::new().unwrap();
        let factory = CountingFactory::new(Ok("unused".into()));
        let agent = make_agent(&tmp, CredentialSource::Static("k".into()), factory.clone());

        assert!(matches!(agent.invoke("   \n").await, Err(InvokeError::EmptyPrompt)));
        assert!(matches!(agent.invoke("").await, Err(InvokeError::EmptyPrompt)));
        assert_eq!(factory.connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_env_credential_becomes_configuration_message() {
        let tmp = TempDir::new().unwrap();
        let factory = CountingFactory::new(Ok("unused".into()));
        let agent = make_agent(
            &tmp,
            CredentialSource::Env("NOTEKEEPER_TEST_UNSET_KEY_4F2A".into()),
            factory.clone(),
        );

        for _ in 0..2 {
            let reply = agent.invoke("read my notes").await.unwrap();
            assert!(reply.starts_with("Configuration error"), "{reply}");
            assert!(reply.contains("NOTEKEEPER_TEST_UNSET_KEY_4F2A"));
        }
        assert_eq!(factory.connects.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn blank_static_key_counts_as_missing() {
        let source = CredentialSource::Static("  ".into());
        assert!(matches!(
            source.lookup(),
            Err(AgentError::MissingCredential { .. })
        ));
    }

    #[tokio::test]
    async fn backend_is_reused_for_same_key() {
        let tmp = TempDir::new().unwrap();
        let factory = CountingFactory::new(Ok("done".into()));
        let agent = make_agent(&tmp, CredentialSource::Static("k".into()), factory.clone());

        assert_eq!(agent.invoke("one").await.unwrap(), "done");
        assert_eq!(agent.invoke("two").await.unwrap(), "done");
        assert_eq!(factory.connects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn changed_key_rebuilds_backend() {
        let tmp = TempDir::new().unwrap();
        let factory = CountingFactory::new(Ok("done".into()));
        let agent = make_agent(&tmp, CredentialSource::Static("k1".into()), factory.clone());

        agent.backend_for("k1").unwrap();
        agent.backend_for("k1").unwrap();
        assert_eq!(factory.connects.load(Ordering::SeqCst), 1);

        agent.backend_for("k2").unwrap();
        assert_eq!(factory.connects.load(Ordering::SeqCst), 2);

        // Switching back is another change
        agent.backend_for("k1").unwrap();
        assert_eq!(factory.connects.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn provider_auth_error_is_reworded() {
        let tmp = TempDir::new().unwrap();
        let factory = CountingFactory::new(Err(
            "Web call failed: 401 Unauthorized: Incorrect API key provided".into(),
        ));
        let agent = make_agent(&tmp, CredentialSource::Static("bad".into()), factory);

        let reply = agent.invoke("hello").await.unwrap();
        assert!(reply.starts_with("Configuration error"), "{reply}");
        assert!(!reply.contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn other_provider_errors_pass_through_as_text() {
        let tmp = TempDir::new().unwrap();
        let factory = CountingFactory::new(Err("connection reset by peer".into()));
        let agent = make_agent(&tmp, CredentialSource::Static("k".into()), factory);

        let reply = agent.invoke("hello").await.unwrap();
        assert_eq!(reply, "Error: LLM error: connection reset by peer");
    }

    #[test]
    fn step_limit_is_reported_as_text() {
        let tmp = TempDir::new().unwrap();
        let agent = make_agent(
            &tmp,
            CredentialSource::Static("k".into()),
            CountingFactory::new(Ok("x".into())),
        );

        let reply = agent.describe_failure(&AgentError::StepLimit { max_steps: 4 });
        assert_eq!(reply, "Error: Agent stopped after reaching the step limit of 4");
    }

    #[tokio::test]
    async fn setup_failure_escapes() {
        let tmp = TempDir::new().unwrap();
        let agent = make_agent(
            &tmp,
            CredentialSource::Static("k".into()),
            Arc::new(FailingFactory),
        );

        assert!(matches!(agent.invoke("hello").await, Err(InvokeError::Setup(_))));
    }

    #[tokio::test]
    async fn transcript_is_written_when_configured() {
        let tmp = TempDir::new().unwrap();
        let log_dir = tmp.path().join("logs");
        let scratch = ScratchRoot::new(&tmp.path().join("notes")).unwrap();
        let mut s = settings(CredentialSource::Static("k".into()));
        s.transcript_dir = Some(log_dir.clone());
        let agent = NoteAgent::new(s, scratch, CountingFactory::new(Ok("ok".into()))).unwrap();

        agent.invoke("hello").await.unwrap();

        let files: Vec<_> = std::fs::read_dir(&log_dir).unwrap().collect();
        assert_eq!(files.len(), 1);
        let contents = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        assert!(contents.contains("\"request_start\""));
        assert!(contents.contains("\"request_end\""));
        assert!(contents.contains("\"completed\""));
    }

    #[tokio::test]
    async fn unusable_transcript_dir_does_not_fail_the_request() {
        let tmp = TempDir::new().unwrap();
        let not_a_dir = tmp.path().join("transcripts");
        std::fs::write(&not_a_dir, "occupied").unwrap();
        assert!(Transcript::open(Some(&not_a_dir)).path().is_none());

        let scratch = ScratchRoot::new(&tmp.path().join("notes")).unwrap();
        let mut s = settings(CredentialSource::Static("k".into()));
        s.transcript_dir = Some(not_a_dir);
        let factory = CountingFactory::new(Ok("still here".into()));
        let agent = NoteAgent::new(s, scratch, factory).unwrap();

        assert_eq!(agent.invoke("hello").await.unwrap(), "still here");
    }

    #[tokio::test]
    async fn setup_failure_is_closed_in_transcript() {
        let tmp = TempDir::new().unwrap();
        let log_dir = tmp.path().join("logs");
        let scratch = ScratchRoot::new(&tmp.path().join("notes")).unwrap();
        let mut s = settings(CredentialSource::Static("k".into()));
        s.transcript_dir = Some(log_dir.clone());
        let agent = NoteAgent::new(s, scratch, Arc::new(FailingFactory)).unwrap();

        assert!(matches!(agent.invoke("hello").await, Err(InvokeError::Setup(_))));

        let files: Vec<_> = std::fs::read_dir(&log_dir).unwrap().collect();
        assert_eq!(files.len(), 1);
        let contents = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        let kinds: Vec<String> = contents
            .lines()
            .map(|l| {
                let v: serde_json::Value = serde_json::from_str(l).unwrap();
                v["event_type"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(kinds, vec!["request_start", "error", "request_end"]);
        assert!(contents.contains("\"setup_failed\""));
    }
}
