use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// The TOML file structure for notekeeper.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub general: Option<GeneralConfig>,
    pub agent: Option<AgentConfig>,
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    pub model: Option<String>,
    pub bind: Option<SocketAddr>,
}

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    pub max_steps: Option<usize>,
    pub temperature: Option<f64>,
    /// Name of the environment variable holding the provider API key.
    pub api_key_env: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub scratch_root: Option<String>,
    pub transcript_dir: Option<String>,
}

/// Fully-resolved runtime configuration. All fields have values.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub bind: SocketAddr,
    pub scratch_root: PathBuf,
    pub max_steps: usize,
    pub temperature: f64,
    pub api_key_env: String,
    /// When set, each request writes a JSONL transcript here.
    pub transcript_dir: Option<PathBuf>,
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default)]
pub struct PartialConfig {
    pub model: Option<String>,
    pub bind: Option<SocketAddr>,
    pub scratch_root: Option<PathBuf>,
    pub max_steps: Option<usize>,
    pub temperature: Option<f64>,
    pub api_key_env: Option<String>,
    pub transcript_dir: Option<PathBuf>,
}

impl ConfigFile {
    pub fn to_partial(self) -> PartialConfig {
        let general = self.general;
        let agent = self.agent;
        let storage = self.storage;

        PartialConfig {
            model: general.as_ref().and_then(|g| g.model.clone()),
            bind: general.as_ref().and_then(|g| g.bind),
            scratch_root: storage
                .as_ref()
                .and_then(|s| s.scratch_root.as_deref())
                .map(PathBuf::from),
            max_steps: agent.as_ref().and_then(|a| a.max_steps),
            temperature: agent.as_ref().and_then(|a| a.temperature),
            api_key_env: agent.as_ref().and_then(|a| a.api_key_env.clone()),
            transcript_dir: storage
                .as_ref()
                .and_then(|s| s.transcript_dir.as_deref())
                .map(PathBuf::from),
        }
    }
}
