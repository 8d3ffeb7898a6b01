use std::sync::Arc;

use crate::agent::NoteAgent;

#[derive(Clone)]
pub struct ServerState {
    agent: Arc<NoteAgent>,
}

impl ServerState {
    pub fn new(agent: Arc<NoteAgent>) -> Self {
        Self { agent }
    }

    pub fn agent(&self) -> &NoteAgent {
        &self.agent
    }
}
