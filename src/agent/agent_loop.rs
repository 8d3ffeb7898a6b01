//! Bounded tool-calling loop.
//!
//! Starts from the system prompt and a single user turn, then repeatedly:
//!
//! 1. Asks the backend for the model's next turn
//! 2. Stops with the turn's text if it requested no tools
//! 3. Otherwise dispatches each tool call and appends the results
//!
//! At most `max_steps` model calls are made per run.

use genai::chat::{ChatMessage, ChatRequest, ToolResponse};

use crate::agent::backend::ChatBackend;
use crate::agent::logging::{LogEntry, Transcript, now_iso};
use crate::agent::tools::ToolRegistry;
use crate::error::AgentError;
use crate::safety::ScratchRoot;

/// Everything one loop run needs, borrowed from the caller.
pub struct LoopContext<'a> {
    pub backend: &'a dyn ChatBackend,
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub tools: &'a ToolRegistry,
    pub scratch: &'a ScratchRoot,
    pub max_steps: usize,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// Text of the final model turn (empty if the model sent none).
    pub response: String,
    /// Number of model calls made.
    pub steps: usize,
    /// Number of tool calls dispatched.
    pub tool_calls: usize,
}

/// Field-friendly preview of a long string for log lines.
fn preview(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

/// Run the loop until the model answers without tools or the step ceiling
/// is hit.
pub async fn run_agent_loop(
    ctx: &LoopContext<'_>,
    prompt: &str,
    transcript: &mut Transcript,
) -> Result<LoopOutcome, AgentError> {
    let mut chat_req = ChatRequest::from_system(ctx.system_prompt)
        .with_tools(ctx.tools.genai_tools())
        .append_message(ChatMessage::user(prompt));

    let mut tool_call_count = 0;

    for step in 1..=ctx.max_steps {
        let turn = match ctx.backend.complete(ctx.model, &chat_req).await {
            Ok(turn) => turn,
            Err(e) => {
                transcript.record(LogEntry::Error {
                    timestamp: now_iso(),
                    step,
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        if let Some(ref text) = turn.text {
            transcript.record(LogEntry::AssistantText {
                timestamp: now_iso(),
                step,
                content: text.clone(),
            });
        }

        if turn.tool_calls.is_empty() {
            tracing::debug!(step, tool_calls = tool_call_count, "Model produced final answer");
            return Ok(LoopOutcome {
                response: turn.text.unwrap_or_default(),
                steps: step,
                tool_calls: tool_call_count,
            });
        }

        // Text emitted alongside tool calls is kept in the history so the
        // model sees its own reasoning on the next step.
        if let Some(text) = turn.text {
            chat_req = chat_req.append_message(ChatMessage::assistant(text));
        }
        chat_req = chat_req.append_message(ChatMessage::from(turn.tool_calls.clone()));

        for call in &turn.tool_calls {
            transcript.record(LogEntry::ToolCall {
                timestamp: now_iso(),
                step,
                call_id: call.call_id.clone(),
                fn_name: call.fn_name.clone(),
                fn_arguments: call.fn_arguments.clone(),
            });

            let result = ctx.tools.dispatch(call, ctx.scratch).await;
            tool_call_count += 1;

            tracing::info!(
                step,
                tool = %call.fn_name,
                result = %preview(&result, 120),
                "Tool call dispatched"
            );
            transcript.record(LogEntry::ToolResult {
                timestamp: now_iso(),
                step,
                call_id: call.call_id.clone(),
                fn_name: call.fn_name.clone(),
                result: result.clone(),
            });

            chat_req = chat_req.append_message(ToolResponse::new(call.call_id.clone(), result));
        }
    }

    let err = AgentError::StepLimit {
        max_steps: ctx.max_steps,
    };
    transcript.record(LogEntry::Error {
        timestamp: now_iso(),
        step: ctx.max_steps,
        message: err.to_string(),
    });
    Err(err)
}
