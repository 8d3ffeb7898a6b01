pub mod agent_loop;
pub mod assistant;
pub mod backend;
pub mod logging;
pub mod system_prompt;
pub mod tools;

pub use assistant::{AgentSettings, CredentialSource, NoteAgent};
