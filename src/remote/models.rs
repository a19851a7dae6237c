use serde::{Deserialize, Serialize};

use crate::core::domain::{Backend, ExecutionResult, ExecutionStatus};

pub const STATUS_IN_QUEUE: u32 = 1;
pub const STATUS_PROCESSING: u32 = 2;
pub const STATUS_ACCEPTED: u32 = 3;
pub const STATUS_WRONG_ANSWER: u32 = 4;
pub const STATUS_TIME_LIMIT_EXCEEDED: u32 = 5;

#[derive(Debug, Serialize)]
pub struct SubmissionRequest<'a> {
    pub source_code: &'a str,
    pub language_id: u32,
    pub stdin: &'a str,
    pub cpu_time_limit: f64,
    pub memory_limit: u64,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionToken {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusInfo {
    pub id: u32,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionDetails {
    pub status: StatusInfo,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Seconds, as a decimal string.
    #[serde(default)]
    pub time: Option<String>,
    /// Kilobytes.
    #[serde(default)]
    pub memory: Option<u64>,
}

impl SubmissionDetails {
    pub fn is_pending(&self) -> bool {
        matches!(self.status.id, STATUS_IN_QUEUE | STATUS_PROCESSING)
    }
}

pub fn map_status(id: u32) -> ExecutionStatus {
    match id {
        STATUS_ACCEPTED => ExecutionStatus::Passed,
        STATUS_WRONG_ANSWER => ExecutionStatus::Failed,
        STATUS_TIME_LIMIT_EXCEEDED => ExecutionStatus::Timeout,
        _ => ExecutionStatus::Error,
    }
}

impl From<SubmissionDetails> for ExecutionResult {
    fn from(details: SubmissionDetails) -> Self {
        let time_ms = details
            .time
            .as_deref()
            .and_then(|t| t.trim().parse::<f64>().ok())
            .map(|secs| (secs * 1000.0).round() as u64)
            .unwrap_or(0);
        let message = details
            .message
            .filter(|m| !m.trim().is_empty())
            .or(details.status.description)
            .unwrap_or_default();

        Self {
            stdout: details.stdout.unwrap_or_default().trim_end().to_string(),
            stderr: details.stderr.unwrap_or_default().trim_end().to_string(),
            compile_output: details.compile_output.unwrap_or_default().trim_end().to_string(),
            message,
            status: map_status(details.status.id),
            time_ms,
            memory_kb: details.memory.unwrap_or(0),
            backend: Some(Backend::Remote),
        }
    }
}
