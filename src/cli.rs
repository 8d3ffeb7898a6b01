use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "notekeeper", version, about = "Note-taking assistant over HTTP")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTML page and the /agent endpoint
    Serve {
        /// Address to listen on (e.g., "0.0.0.0:8000")
        #[arg(short, long, env = "NOTEKEEPER_BIND")]
        bind: Option<SocketAddr>,

        #[command(flatten)]
        agent: AgentArgs,
    },
    /// Run a single prompt without the HTTP server and print the reply
    Ask {
        /// The instruction for the assistant
        prompt: String,

        #[command(flatten)]
        agent: AgentArgs,
    },
}

/// Options shared by every subcommand that drives the assistant.
#[derive(Args, Debug, Default)]
pub struct AgentArgs {
    /// Chat model name (e.g., "gpt-4", "gpt-4o-mini")
    #[arg(short, long)]
    pub model: Option<String>,

    /// Directory all note files are confined to
    #[arg(short, long, env = "NOTEKEEPER_SCRATCH_ROOT")]
    pub scratch_root: Option<PathBuf>,

    /// Maximum model calls per request
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Path to config file (overrides ./notekeeper.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Commands {
    pub fn agent_args(&self) -> &AgentArgs {
        match self {
            Commands::Serve { agent, .. } => agent,
            Commands::Ask { agent, .. } => agent,
        }
    }
}
