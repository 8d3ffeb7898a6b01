pub mod merge;
pub mod schema;

pub use schema::*;

use crate::cli::{Cli, Commands};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Load configuration by merging global, local, and CLI sources.
/// Precedence: CLI > local config > global config > defaults.
///
/// Missing config files are handled gracefully (defaults apply). An explicit
/// `--config` path that cannot be read or parsed is an error.
pub fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    // Layer 1: Global config (~/.config/notekeeper/notekeeper.toml or platform equivalent)
    let global = load_global_config();

    // Layer 2: Local config (--config path, or ./notekeeper.toml)
    let local = match &cli.command.agent_args().config {
        Some(path) => load_explicit_config(path)?,
        None => load_toml_file(Path::new("notekeeper.toml")).unwrap_or_default(),
    };

    // Layer 3: CLI args (converted to PartialConfig)
    let cli_partial = cli_to_partial(cli);

    Ok(cli_partial
        .with_fallback(local)
        .with_fallback(global)
        .finalize())
}

/// Load global config from the platform-specific config directory.
/// Returns empty PartialConfig if file not found.
fn load_global_config() -> PartialConfig {
    match global_config_path() {
        Some(p) => load_toml_file(&p).unwrap_or_default(),
        None => {
            tracing::debug!("Could not determine global config directory");
            PartialConfig::default()
        }
    }
}

/// Load a config file the operator named explicitly. Unlike the implicit
/// layers, failures here are surfaced.
fn load_explicit_config(path: &Path) -> Result<PartialConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config_file =
        toml::from_str::<ConfigFile>(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config_file.to_partial())
}

/// Load and parse a TOML config file into a PartialConfig.
/// Returns None on file-not-found; parse errors are logged and skipped.
fn load_toml_file(path: &Path) -> Option<PartialConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
            Ok(config_file) => {
                tracing::info!("Loaded config from {}", path.display());
                Some(config_file.to_partial())
            }
            Err(e) => {
                tracing::warn!("Config parse error in {}: {}", path.display(), e);
                None
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Failed to read config at {}: {}", path.display(), e);
            None
        }
    }
}

/// Resolve the platform-specific global config path.
/// Linux: ~/.config/notekeeper/notekeeper.toml
/// macOS: ~/Library/Application Support/notekeeper/notekeeper.toml
fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "notekeeper")
        .map(|dirs| dirs.config_dir().join("notekeeper.toml"))
}

/// Convert CLI arguments to a PartialConfig for merging.
fn cli_to_partial(cli: &Cli) -> PartialConfig {
    let args = cli.command.agent_args();
    let bind = match &cli.command {
        Commands::Serve { bind, .. } => *bind,
        Commands::Ask { .. } => None,
    };

    PartialConfig {
        model: args.model.clone(),
        bind,
        scratch_root: args.scratch_root.clone(),
        max_steps: args.max_steps,
        ..Default::default()
    }
}
