use super::schema::{AppConfig, PartialConfig};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_MAX_STEPS: usize = 25;
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_PORT: u16 = 8000;

/// `<system temp dir>/notekeeper`, the writable location serverless hosts hand out.
pub fn default_scratch_root() -> PathBuf {
    std::env::temp_dir().join("notekeeper")
}

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            model: self.model.or(fallback.model),
            bind: self.bind.or(fallback.bind),
            scratch_root: self.scratch_root.or(fallback.scratch_root),
            max_steps: self.max_steps.or(fallback.max_steps),
            temperature: self.temperature.or(fallback.temperature),
            api_key_env: self.api_key_env.or(fallback.api_key_env),
            transcript_dir: self.transcript_dir.or(fallback.transcript_dir),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    pub fn finalize(self) -> AppConfig {
        AppConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            bind: self
                .bind
                .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT))),
            scratch_root: self.scratch_root.unwrap_or_else(default_scratch_root),
            // At least one model call per request.
            max_steps: self.max_steps.unwrap_or(DEFAULT_MAX_STEPS).max(1),
            temperature: self.temperature.unwrap_or(0.0),
            api_key_env: self
                .api_key_env
                .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
            transcript_dir: self.transcript_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_values_win() {
        let cli = PartialConfig {
            model: Some("gpt-4o".into()),
            ..Default::default()
        };
        let file = PartialConfig {
            model: Some("gpt-4".into()),
            max_steps: Some(7),
            ..Default::default()
        };

        let merged = cli.with_fallback(file).finalize();
        assert_eq!(merged.model, "gpt-4o");
        assert_eq!(merged.max_steps, 7);
    }

    #[test]
    fn finalize_fills_defaults() {
        let config = PartialConfig::default().finalize();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.bind.port(), DEFAULT_PORT);
        assert_eq!(config.scratch_root, default_scratch_root());
        assert_eq!(config.temperature, 0.0);
        assert!(config.transcript_dir.is_none());
    }

    #[test]
    fn zero_max_steps_is_raised_to_one() {
        let config = PartialConfig {
            max_steps: Some(0),
            ..Default::default()
        }
        .finalize();
        assert_eq!(config.max_steps, 1);
    }
}
