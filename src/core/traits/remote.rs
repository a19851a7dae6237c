use tokio_util::sync::CancellationToken;

use crate::core::domain::{ExecutionRequest, ExecutionResult};

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Invalid remote judge configuration: {0}")]
    InvalidConfig(String),
    #[error("Language '{0}' has no remote judge id")]
    UnsupportedLanguage(String),
    #[error("Judge request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Judge responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Judge response could not be decoded: {0}")]
    Decode(String),
    #[error("Judge gave no verdict after {attempts} polls")]
    Exhausted { attempts: u32 },
    #[error("Remote execution cancelled")]
    Cancelled,
}

/// An external judging service. Every failure comes back as a `RemoteError`
/// so the caller can fall back to local execution.
#[mockall::automock]
#[async_trait::async_trait]
pub trait RemoteJudge: std::fmt::Debug + Send + Sync {
    async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, RemoteError>;
}
