use std::sync::Arc;

use clap::Parser;

use notekeeper::agent::NoteAgent;
use notekeeper::{cli, config, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Local runs keep the API key in .env; it is still read per request.
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to load .env: {}", e),
    }

    let cli = cli::Cli::parse();
    tracing::info!("Notekeeper starting");

    let config = config::load_config(&cli)?;
    tracing::info!(
        model = %config.model,
        scratch_root = %config.scratch_root.display(),
        max_steps = config.max_steps,
        "Config loaded"
    );

    let agent = NoteAgent::from_config(&config)?;
    if agent.settings().credential.lookup().is_err() {
        tracing::warn!(
            var = %config.api_key_env,
            "API key not set; requests will report a configuration error until it is"
        );
    }

    match cli.command {
        cli::Commands::Serve { .. } => {
            server::serve(Arc::new(agent), config.bind).await?;
        }
        cli::Commands::Ask { prompt, .. } => {
            let reply = agent.invoke(&prompt).await?;
            println!("{reply}");
        }
    }

    Ok(())
}
