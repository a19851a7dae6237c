use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::core::{
    domain::{Backend, ExecutionRequest, ExecutionResult},
    traits::{
        executor::Executor,
        remote::{RemoteError, RemoteJudge},
    },
};
use crate::native::registry::RunnerRegistry;

/// Routes each request to the remote judge when one is configured, falling
/// back to the local runners whenever the remote path fails. Callers only see
/// the result; `ExecutionResult::backend` records which path served it.
#[derive(Debug)]
pub struct Dispatcher {
    registry: RunnerRegistry,
    remote: Option<Arc<dyn RemoteJudge>>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: RunnerRegistry,
        remote: Option<Arc<dyn RemoteJudge>>,
        timeout: Duration,
        max_concurrent_runs: usize,
    ) -> Self {
        Self {
            registry,
            remote,
            permits: Arc::new(Semaphore::new(max_concurrent_runs)),
            timeout,
        }
    }

    async fn execute_remote(
        &self,
        remote: &dyn RemoteJudge,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Option<ExecutionResult> {
        match remote.execute(request, cancel).await {
            Ok(result) => Some(result.with_backend(Backend::Remote)),
            Err(RemoteError::Cancelled) => Some(cancelled()),
            Err(e) => {
                tracing::warn!("Remote judge unavailable, falling back to local execution: {}", e);
                None
            }
        }
    }

    async fn execute_local(&self, language: &str, request: &ExecutionRequest) -> ExecutionResult {
        let Some(runner) = self.registry.get(language) else {
            tracing::info!("No local runner for language {:?}", language);
            return unsupported(&request.language);
        };

        // Bounded so a burst of submissions cannot spawn unbounded processes
        let Ok(_permit) = self.permits.acquire().await else {
            return ExecutionResult::error("", "Local execution is shutting down");
        };

        runner
            .execute(&request.code, &request.stdin, self.timeout)
            .await
            .with_backend(Backend::Local)
    }
}

#[async_trait::async_trait]
impl Executor for Dispatcher {
    #[tracing::instrument(skip(self, request, cancel), fields(language = %request.language))]
    async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let language = self.registry.canonical(&request.language);

        let run = async {
            if let Some(remote) = &self.remote {
                if !self.registry.is_always_local(&language) {
                    if let Some(result) = self.execute_remote(remote.as_ref(), request, cancel).await {
                        return result;
                    }
                }
            }
            self.execute_local(&language, request).await
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => cancelled(),
            result = run => result,
        };
        tracing::debug!(backend = ?result.backend, status = ?result.status, "Execution finished");

        result
    }
}

fn unsupported(language: &str) -> ExecutionResult {
    ExecutionResult::error(
        String::new(),
        format!(
            "Language '{}' is not supported for local execution. \
             Configure the remote judge (JUDGE0_API_KEY) to run it.",
            language
        ),
    )
}

fn cancelled() -> ExecutionResult {
    ExecutionResult::error(String::new(), "Execution cancelled")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        domain::ExecutionStatus,
        traits::{remote::MockRemoteJudge, runner::MockRunner},
    };
    use crate::native::registry::HTML;
    use crate::stubs::runner::RunnerStub;

    fn ok(stdout: &str) -> ExecutionResult {
        ExecutionResult::passed(stdout.to_string(), String::new(), 5)
    }

    fn local_only(language: &str, runner: MockRunner) -> Dispatcher {
        let registry = RunnerRegistry::new().register(language, Arc::new(runner));
        Dispatcher::new(registry, None, Duration::from_secs(5), 4)
    }

    fn with_remote(language: &str, runner: MockRunner, remote: MockRemoteJudge) -> Dispatcher {
        let registry = RunnerRegistry::new().register(language, Arc::new(runner));
        Dispatcher::new(registry, Some(Arc::new(remote)), Duration::from_secs(5), 4)
    }

    #[tokio::test]
    async fn test_local_when_remote_not_configured() {
        let mut runner = MockRunner::new();
        runner
            .expect_execute()
            .withf(|code, stdin, timeout| {
                code == "print(input())" && stdin == "7" && *timeout == Duration::from_secs(5)
            })
            .times(1)
            .returning(|_, _, _| ok("7"));

        let dispatcher = local_only("python", runner);
        let result = dispatcher
            .execute(
                &ExecutionRequest::new("print(input())", " Python ", "7"),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.stdout, "7");
        assert_eq!(result.backend, Some(Backend::Local));
    }

    #[tokio::test]
    async fn test_remote_preferred_when_configured() {
        let mut runner = MockRunner::new();
        runner.expect_execute().never();
        let mut remote = MockRemoteJudge::new();
        remote.expect_execute().times(1).returning(|_, _| Ok(ok("remote")));

        let dispatcher = with_remote("python", runner, remote);
        let result = dispatcher
            .execute(&ExecutionRequest::new("", "python", ""), &CancellationToken::new())
            .await;

        assert_eq!(result.stdout, "remote");
        assert_eq!(result.backend, Some(Backend::Remote));
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_local() {
        let mut runner = MockRunner::new();
        runner.expect_execute().times(1).returning(|_, _, _| ok("local"));
        let mut remote = MockRemoteJudge::new();
        remote
            .expect_execute()
            .times(1)
            .returning(|_, _| Err(RemoteError::Exhausted { attempts: 20 }));

        let dispatcher = with_remote("javascript", runner, remote);
        let result = dispatcher
            .execute(&ExecutionRequest::new("", "javascript", ""), &CancellationToken::new())
            .await;

        assert_eq!(result.status, ExecutionStatus::Passed);
        assert_eq!(result.stdout, "local");
        assert_eq!(result.backend, Some(Backend::Local));
    }

    #[tokio::test]
    async fn test_html_never_goes_remote() {
        let mut runner = MockRunner::new();
        runner.expect_execute().times(1).returning(|_, _, _| ok("page"));
        let mut remote = MockRemoteJudge::new();
        remote.expect_execute().never();

        let dispatcher = with_remote(HTML, runner, remote);
        let result = dispatcher
            .execute(&ExecutionRequest::new("<p>page</p>", "HTML", ""), &CancellationToken::new())
            .await;

        assert_eq!(result.stdout, "page");
    }

    #[tokio::test]
    async fn test_unsupported_language_without_remote() {
        let mut runner = MockRunner::new();
        runner.expect_execute().never();

        let dispatcher = local_only("python", runner);
        let result = dispatcher
            .execute(&ExecutionRequest::new("fn main() {}", "rust", ""), &CancellationToken::new())
            .await;

        assert_eq!(result.status, ExecutionStatus::Error);
        assert!(result.message.contains("'rust' is not supported"));
        assert!(result.message.contains("JUDGE0_API_KEY"));
    }

    #[tokio::test]
    async fn test_unsupported_language_when_remote_fails() {
        let runner = MockRunner::new();
        let mut remote = MockRemoteJudge::new();
        remote.expect_execute().times(1).returning(|_, _| {
            Err(RemoteError::Status {
                status: 503,
                body: String::new(),
            })
        });

        let dispatcher = with_remote("python", runner, remote);
        let result = dispatcher
            .execute(&ExecutionRequest::new("", "go", ""), &CancellationToken::new())
            .await;

        assert_eq!(result.status, ExecutionStatus::Error);
        assert!(result.message.contains("not supported"));
    }

    #[tokio::test]
    async fn test_cancellation_stops_local_execution() {
        let registry = RunnerRegistry::new().register(
            "python",
            Arc::new(RunnerStub::new(ok("late"), Duration::from_secs(30))),
        );
        let dispatcher = Dispatcher::new(registry, None, Duration::from_secs(60), 1);

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let start = std::time::Instant::now();
        let result = dispatcher
            .execute(&ExecutionRequest::new("", "python", ""), &cancel)
            .await;

        assert_eq!(result.status, ExecutionStatus::Error);
        assert_eq!(result.message, "Execution cancelled");
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_local_runs_are_admission_controlled() {
        let registry = RunnerRegistry::new().register(
            "python",
            Arc::new(RunnerStub::new(ok("done"), Duration::from_millis(200))),
        );
        let dispatcher = Arc::new(Dispatcher::new(registry, None, Duration::from_secs(5), 1));

        let start = std::time::Instant::now();
        let request = ExecutionRequest::new("", "python", "");
        let cancel = CancellationToken::new();
        let (a, b) = tokio::join!(
            dispatcher.execute(&request, &cancel),
            dispatcher.execute(&request, &cancel),
        );

        assert_eq!(a.stdout, "done");
        assert_eq!(b.stdout, "done");
        assert!(start.elapsed() >= Duration::from_millis(400));
    }
}
