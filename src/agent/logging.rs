//! JSONL transcript logger, one file per `/agent` request.
//!
//! When a transcript directory is configured, every request produces
//! `request-{timestamp}-{id}.jsonl` in it, holding the prompt, each model
//! turn, every tool call with its rendered result and the final outcome.
//!
//! Uses synchronous `std::fs` since writes are small, buffered, and flushed
//! after each event.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Returns the current UTC time as an ISO 8601 string with milliseconds.
pub fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// A structured log entry serialized as a single JSON line.
///
/// Tagged with `event_type` so each line is self-describing.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type")]
pub enum LogEntry {
    #[serde(rename = "request_start")]
    RequestStart {
        timestamp: String,
        model: String,
        prompt: String,
    },

    /// Text the model produced in a turn (intermediate or final).
    #[serde(rename = "assistant_text")]
    AssistantText {
        timestamp: String,
        step: usize,
        content: String,
    },

    #[serde(rename = "tool_call")]
    ToolCall {
        timestamp: String,
        step: usize,
        call_id: String,
        fn_name: String,
        fn_arguments: serde_json::Value,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        timestamp: String,
        step: usize,
        call_id: String,
        fn_name: String,
        result: String,
    },

    #[serde(rename = "error")]
    Error {
        timestamp: String,
        step: usize,
        message: String,
    },

    #[serde(rename = "request_end")]
    RequestEnd {
        timestamp: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        steps: Option<usize>,
        outcome: String,
    },
}

/// Append-only JSONL logger for a single request.
pub struct TranscriptLogger {
    writer: BufWriter<fs::File>,
    log_path: PathBuf,
}

impl TranscriptLogger {
    /// Create a transcript file in `dir`, creating the directory if needed.
    ///
    /// Colons are left out of the timestamp for filesystem safety; the short
    /// id keeps concurrent requests in the same second apart.
    pub fn new_in_dir(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir)?;

        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S");
        let id = Uuid::new_v4().simple().to_string();
        let log_path = dir.join(format!("request-{stamp}-{}.jsonl", &id[..8]));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            log_path,
        })
    }

    /// Serialize a log entry as a single JSON line and flush.
    pub fn log_event(&mut self, event: &LogEntry) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Return the path to the transcript file.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

/// A transcript that may be disabled. Write failures are reported through
/// `tracing` and never interrupt the request.
pub struct Transcript {
    logger: Option<TranscriptLogger>,
}

impl Transcript {
    pub fn disabled() -> Self {
        Self { logger: None }
    }

    /// Open a transcript in `dir` when one is configured.
    pub fn open(dir: Option<&Path>) -> Self {
        let Some(dir) = dir else {
            return Self::disabled();
        };
        match TranscriptLogger::new_in_dir(dir) {
            Ok(logger) => {
                tracing::debug!(path = %logger.log_path().display(), "Transcript opened");
                Self {
                    logger: Some(logger),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to open transcript in {}: {:#}", dir.display(), e);
                Self::disabled()
            }
        }
    }

    pub fn record(&mut self, event: LogEntry) {
        if let Some(logger) = self.logger.as_mut() {
            if let Err(e) = logger.log_event(&event) {
                tracing::warn!(
                    "Failed to write transcript {}: {:#}",
                    logger.log_path().display(),
                    e
                );
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.logger.as_ref().map(TranscriptLogger::log_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        let file = fs::File::open(path).expect("open log");
        std::io::BufReader::new(file)
            .lines()
            .map(|l| serde_json::from_str(&l.expect("read line")).expect("valid JSON"))
            .collect()
    }

    #[test]
    fn creates_named_file_in_dir() {
        let tmp = TempDir::new().expect("tempdir");
        let dir = tmp.path().join("transcripts");
        let logger = TranscriptLogger::new_in_dir(&dir).expect("new_in_dir");

        assert!(logger.log_path().exists());
        assert!(logger.log_path().starts_with(&dir));

        let name = logger.log_path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("request-"), "filename should start with 'request-'");
        assert!(name.ends_with(".jsonl"), "filename should end with '.jsonl'");
    }

    #[test]
    fn events_are_one_json_object_per_line() {
        let tmp = TempDir::new().expect("tempdir");
        let mut logger = TranscriptLogger::new_in_dir(tmp.path()).unwrap();

        logger
            .log_event(&LogEntry::RequestStart {
                timestamp: now_iso(),
                model: "gpt-4".into(),
                prompt: "read notes.txt".into(),
            })
            .unwrap();
        logger
            .log_event(&LogEntry::ToolCall {
                timestamp: now_iso(),
                step: 1,
                call_id: "call_001".into(),
                fn_name: "read_note".into(),
                fn_arguments: serde_json::json!({"filepath": "notes.txt"}),
            })
            .unwrap();
        logger
            .log_event(&LogEntry::RequestEnd {
                timestamp: now_iso(),
                steps: Some(2),
                outcome: "completed".into(),
            })
            .unwrap();

        let lines = read_lines(logger.log_path());
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event_type"], "request_start");
        assert_eq!(lines[0]["prompt"], "read notes.txt");
        assert_eq!(lines[1]["event_type"], "tool_call");
        assert_eq!(lines[1]["fn_arguments"]["filepath"], "notes.txt");
        assert_eq!(lines[2]["event_type"], "request_end");
        assert_eq!(lines[2]["steps"], 2);
    }

    #[test]
    fn disabled_transcript_ignores_events() {
        let mut transcript = Transcript::open(None);
        transcript.record(LogEntry::Error {
            timestamp: now_iso(),
            step: 1,
            message: "boom".into(),
        });
        assert!(transcript.path().is_none());
    }

    #[test]
    fn two_transcripts_in_same_dir_do_not_collide() {
        let tmp = TempDir::new().expect("tempdir");
        let a = Transcript::open(Some(tmp.path()));
        let b = Transcript::open(Some(tmp.path()));
        assert_ne!(a.path().unwrap(), b.path().unwrap());
    }

    #[test]
    fn unusable_dir_disables_transcript() {
        let tmp = TempDir::new().expect("tempdir");
        let file = tmp.path().join("not_a_dir");
        fs::write(&file, "x").unwrap();

        let mut transcript = Transcript::open(Some(&file));
        assert!(transcript.path().is_none());
        transcript.record(LogEntry::RequestEnd {
            timestamp: now_iso(),
            steps: None,
            outcome: "completed".into(),
        });
        assert_eq!(fs::read_to_string(&file).unwrap(), "x");
    }
}
