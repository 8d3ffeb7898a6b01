use axum::Json;
use axum::extract::State;
use tracing::{error, info, warn};

use super::super::dto::{AgentRequest, AgentResponse};
use super::super::error::ApiError;
use super::super::state::ServerState;
use crate::error::InvokeError;

pub async fn agent_handler(
    State(state): State<ServerState>,
    Json(payload): Json<AgentRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    info!(prompt_chars = payload.prompt.chars().count(), "Received /agent request");

    match state.agent().invoke(&payload.prompt).await {
        Ok(response) => Ok(Json(AgentResponse { response })),
        Err(InvokeError::EmptyPrompt) => {
            warn!("Rejecting /agent request due to empty prompt");
            Err(InvokeError::EmptyPrompt.into())
        }
        Err(err) => {
            error!(%err, "Error during agent invocation");
            Err(err.into())
        }
    }
}
