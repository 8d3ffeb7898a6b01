//! Note tool definitions and dispatch for the agent loop.
//!
//! Defines the two note tools (`read_note`, `write_note`) as explicit
//! [`ToolDescriptor`] records and exposes them to the model as
//! [`genai::chat::Tool`] schemas.
//!
//! Tool outcomes are always returned as [`ToolResult`] values rendered to
//! text (never panics or `Err` variants) so the model can observe a missing
//! file or an I/O failure and react in conversation.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use genai::chat::{Tool, ToolCall};
use serde_json::{Value, json};

use crate::safety::ScratchRoot;

/// Outcome of a single tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResult {
    /// Successful result text.
    Ok(String),
    /// The resolved note does not exist.
    NotFound(PathBuf),
    /// Any other failure, already phrased for the model.
    IoFailure(String),
}

impl fmt::Display for ToolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolResult::Ok(text) => f.write_str(text),
            ToolResult::NotFound(path) => {
                write!(f, "Error: File '{}' not found.", path.display())
            }
            ToolResult::IoFailure(description) => f.write_str(description),
        }
    }
}

/// Read a note from the scratch root.
pub async fn read_note(scratch: &ScratchRoot, raw_path: &str) -> ToolResult {
    let path = match scratch.resolve(raw_path) {
        Ok(p) => p,
        Err(e) => return ToolResult::IoFailure(format!("Error reading file: {e}")),
    };
    if let Err(e) = scratch.confine(&path).await {
        return ToolResult::IoFailure(format!("Error reading file: {e}"));
    }

    match tokio::fs::read_to_string(&path).await {
        Ok(content) => ToolResult::Ok(format!(
            "Contents of '{}':\n{}",
            path.display(),
            content
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ToolResult::NotFound(path),
        Err(e) => ToolResult::IoFailure(format!("Error reading file: {e}")),
    }
}

/// Write a note into the scratch root, replacing any previous content.
pub async fn write_note(scratch: &ScratchRoot, raw_path: &str, content: &str) -> ToolResult {
    let path = match scratch.resolve(raw_path) {
        Ok(p) => p,
        Err(e) => return ToolResult::IoFailure(format!("Error writing file: {e}")),
    };
    // Checked before creating directories so a symlinked parent cannot be
    // used to create anything outside the root.
    if let Err(e) = scratch.confine(&path).await {
        return ToolResult::IoFailure(format!("Error writing file: {e}"));
    }

    if let Some(parent) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return ToolResult::IoFailure(format!("Error writing file: {e}"));
        }
    }

    match tokio::fs::write(&path, content).await {
        Ok(()) => ToolResult::Ok(format!(
            "Successfully wrote {} characters to '{}'.",
            content.chars().count(),
            path.display()
        )),
        Err(e) => ToolResult::IoFailure(format!("Error writing file: {e}")),
    }
}

/// Boxed future returned by a tool's invocation function.
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = ToolResult> + Send + 'a>>;

/// Invocation function: scratch root plus the model-supplied JSON arguments.
pub type ToolFn = for<'a> fn(&'a ScratchRoot, &'a Value) -> ToolFuture<'a>;

/// A tool the model may call: name, description, argument schema, and the
/// function that runs it.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: Value,
    pub invoke: ToolFn,
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    /// Convert to the schema form the chat client sends to the provider.
    pub fn to_genai_tool(&self) -> Tool {
        Tool::new(self.name)
            .with_description(self.description)
            .with_schema(self.schema.clone())
    }
}

fn string_arg<'a>(args: &'a Value, tool: &str, key: &str) -> Result<&'a str, ToolResult> {
    args.get(key).and_then(Value::as_str).ok_or_else(|| {
        ToolResult::IoFailure(format!("{tool}: missing or invalid '{key}' argument"))
    })
}

fn invoke_read_note<'a>(scratch: &'a ScratchRoot, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(async move {
        match string_arg(args, "read_note", "filepath") {
            Ok(path) => read_note(scratch, path).await,
            Err(result) => result,
        }
    })
}

fn invoke_write_note<'a>(scratch: &'a ScratchRoot, args: &'a Value) -> ToolFuture<'a> {
    Box::pin(async move {
        let path = match string_arg(args, "write_note", "filepath") {
            Ok(p) => p,
            Err(result) => return result,
        };
        let content = match string_arg(args, "write_note", "content") {
            Ok(c) => c,
            Err(result) => return result,
        };
        write_note(scratch, path, content).await
    })
}

/// The fixed set of tools handed to the agent loop.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// The two note tools.
    pub fn note_tools() -> Self {
        Self {
            descriptors: vec![
                ToolDescriptor {
                    name: "read_note",
                    description: "Read the contents of a text file. Only the file name is \
                                  used; every note lives in the scratch directory.",
                    schema: json!({
                        "type": "object",
                        "properties": {
                            "filepath": {
                                "type": "string",
                                "description": "Name of the note file to read"
                            }
                        },
                        "required": ["filepath"]
                    }),
                    invoke: invoke_read_note,
                },
                ToolDescriptor {
                    name: "write_note",
                    description: "Write content to a text file. This will overwrite the file \
                                  if it exists. Only the file name is used; every note lives in \
                                  the scratch directory.",
                    schema: json!({
                        "type": "object",
                        "properties": {
                            "filepath": {
                                "type": "string",
                                "description": "Name of the note file to write"
                            },
                            "content": {
                                "type": "string",
                                "description": "Full text to store in the file"
                            }
                        },
                        "required": ["filepath", "content"]
                    }),
                    invoke: invoke_write_note,
                },
            ],
        }
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Schemas suitable for [`genai::chat::ChatRequest::with_tools`].
    pub fn genai_tools(&self) -> Vec<Tool> {
        self.descriptors.iter().map(ToolDescriptor::to_genai_tool).collect()
    }

    /// Human-readable listing embedded in the system prompt.
    pub fn descriptions(&self) -> String {
        self.descriptors
            .iter()
            .map(|d| {
                let params = d.schema["properties"]
                    .as_object()
                    .map(|props| props.keys().cloned().collect::<Vec<_>>().join(", "))
                    .unwrap_or_default();
                format!("- {}({}): {}", d.name, params, d.description)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run the tool a model call names and render its outcome as text.
    pub async fn dispatch(&self, call: &ToolCall, scratch: &ScratchRoot) -> String {
        match self.descriptors.iter().find(|d| d.name == call.fn_name) {
            Some(descriptor) => (descriptor.invoke)(scratch, &call.fn_arguments)
                .await
                .to_string(),
            None => format!("Error: Unknown tool: {}", call.fn_name),
        }
    }
}
