use std::path::PathBuf;

/// Errors related to configuration loading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}

/// Errors related to scratch-root confinement.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("`{raw}` does not name a file")]
    NoFileName { raw: String },

    #[error("`{path}` resolves outside the scratch root `{root}`")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("`{path}` is a symbolic link whose target does not exist")]
    DanglingLink { path: PathBuf },

    #[error("Failed to prepare scratch root `{root}`: {source}")]
    RootUnavailable {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the chat backend or the tool-calling loop.
///
/// None of these reach the HTTP client as a status code; the assistant turns
/// them into response text.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Credential not configured: environment variable {var} is not set")]
    MissingCredential { var: String },

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Agent stopped after reaching the step limit of {max_steps}")]
    StepLimit { max_steps: usize },
}

/// Errors that escape the assistant boundary.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("Failed to set up chat backend: {0}")]
    Setup(String),
}
