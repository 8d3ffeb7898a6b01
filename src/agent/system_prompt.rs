//! System instruction for the note-taking assistant.

use std::path::Path;

/// Build the system prompt: assistant role, the scratch-directory constraint
/// and the tool listing.
///
/// # Arguments
///
/// * `scratch_root` - Directory every note is stored in, shown to the model
/// * `tool_descriptions` - Pre-formatted human-readable tool listing
pub fn build_system_prompt(scratch_root: &Path, tool_descriptions: &str) -> String {
    let root_display = scratch_root.display();

    format!(
        "\
You are a helpful note-taking assistant. You can read and write text files to \
help users manage their notes. Be concise and helpful.

## Available Tools
{tool_descriptions}

## Constraints
- All notes are stored in {root_display}
- A path outside that directory is reduced to its file name
- Writing a note replaces its previous content entirely"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_role_root_and_tools() {
        let tool_desc = "- read_note(filepath): Read a file";
        let result = build_system_prompt(Path::new("/tmp/notekeeper"), tool_desc);

        assert!(result.contains("note-taking assistant"));
        assert!(result.contains("/tmp/notekeeper"));
        assert!(result.contains("read_note(filepath): Read a file"));

        // Role comes before constraints
        let role_pos = result.find("note-taking assistant").unwrap();
        let constraint_pos = result.find("## Constraints").unwrap();
        assert!(role_pos < constraint_pos);
    }
}
