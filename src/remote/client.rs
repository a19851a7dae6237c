use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::RemoteConfig;
use crate::constants::{JUDGE0_HOST_HEADER, JUDGE0_KEY_HEADER};
use crate::core::domain::{ExecutionRequest, ExecutionResult};
use crate::core::language::normalize;
use crate::core::traits::remote::{RemoteError, RemoteJudge};
use crate::remote::languages::language_id;
use crate::remote::models::{SubmissionDetails, SubmissionRequest, SubmissionToken};

/// Client for a Judge0-compatible judging service.
#[derive(Clone, Debug)]
pub struct Judge0Client {
    http: reqwest::Client,
    config: RemoteConfig,
}

enum PollState {
    Submitting,
    Polling { token: String, attempt: u32 },
    Done(ExecutionResult),
}

impl Judge0Client {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            JUDGE0_KEY_HEADER,
            HeaderValue::from_str(&config.api_key)
                .map_err(|e| RemoteError::InvalidConfig(format!("api key: {}", e)))?,
        );
        if let Some(host) = &config.api_host {
            headers.insert(
                JUDGE0_HOST_HEADER,
                HeaderValue::from_str(host)
                    .map_err(|e| RemoteError::InvalidConfig(format!("api host: {}", e)))?,
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { http, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    async fn submit(&self, request: &ExecutionRequest, language_id: u32) -> Result<String, RemoteError> {
        let url = format!("{}/submissions?base64_encoded=false&wait=false", self.base_url());
        let body = SubmissionRequest {
            source_code: &request.code,
            language_id,
            stdin: &request.stdin,
            cpu_time_limit: self.config.cpu_time_limit,
            memory_limit: self.config.memory_limit,
        };

        let response = error_for_status(self.http.post(url).json(&body).send().await?).await?;
        let token: SubmissionToken = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;

        Ok(token.token)
    }

    async fn poll(&self, token: &str) -> Result<SubmissionDetails, RemoteError> {
        let url = format!("{}/submissions/{}?base64_encoded=false", self.base_url(), token);

        let response = error_for_status(self.http.get(url).send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl RemoteJudge for Judge0Client {
    #[tracing::instrument(skip(self, request, cancel), fields(language = %request.language))]
    async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, RemoteError> {
        let language_id = language_id(&normalize(Some(&request.language)))
            .ok_or_else(|| RemoteError::UnsupportedLanguage(request.language.clone()))?;
        let deadline = self
            .config
            .poll_window()
            .and_then(|window| Instant::now().checked_add(window))
            .ok_or_else(|| RemoteError::InvalidConfig("poll window overflows".to_string()))?;

        let mut state = PollState::Submitting;
        loop {
            state = match state {
                PollState::Submitting => {
                    let token =
                        bounded(cancel, deadline, 0, self.submit(request, language_id)).await?;
                    tracing::debug!(token = %token, "Submission accepted by judge");
                    PollState::Polling { token, attempt: 0 }
                }
                PollState::Polling { token, attempt } => {
                    let now = Instant::now();
                    if attempt >= self.config.max_poll_attempts || now >= deadline {
                        tracing::warn!(token = %token, attempt, "Judge gave no verdict in time");
                        return Err(RemoteError::Exhausted { attempts: attempt });
                    }

                    let delay = self.config.poll_interval().min(deadline - now);
                    cancellable(cancel, async {
                        tokio::time::sleep(delay).await;
                        Ok(())
                    })
                    .await?;

                    let details = bounded(cancel, deadline, attempt, self.poll(&token)).await?;
                    if details.is_pending() {
                        tracing::trace!(token = %token, attempt, "Submission still pending");
                        PollState::Polling {
                            token,
                            attempt: attempt + 1,
                        }
                    } else {
                        tracing::debug!(token = %token, status = details.status.id, "Judge verdict received");
                        PollState::Done(details.into())
                    }
                }
                PollState::Done(result) => return Ok(result),
            };
        }
    }
}

async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(RemoteError::Cancelled),
        res = fut => res,
    }
}

/// Cancellable, and cut off at the overall deadline however slow the judge answers.
async fn bounded<T, F>(
    cancel: &CancellationToken,
    deadline: Instant,
    attempts: u32,
    fut: F,
) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout_at(deadline, cancellable(cancel, fut)).await {
        Ok(res) => res,
        Err(_) => {
            tracing::warn!(attempts, "Judge request ran past the deadline");
            Err(RemoteError::Exhausted { attempts })
        }
    }
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}
