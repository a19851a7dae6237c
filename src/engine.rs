use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::JudgeConfig;
use crate::core::{
    domain::{ExecutionRequest, ExecutionResult, TestCase, TestCaseResult},
    pipeline::{dispatching::Dispatcher, running::TestHarness},
    traits::{
        executor::Executor,
        remote::{RemoteError, RemoteJudge},
    },
};
use crate::grading::{
    assignment::AssignmentGrader,
    lab::LabGrader,
    store::{ScoreLedger, SubmissionStore},
};
use crate::native::registry::RunnerRegistry;
use crate::remote::client::Judge0Client;

/// Public surface of the judge. Cheap to clone; clones share the shutdown signal.
#[derive(Debug, Clone)]
pub struct Engine {
    executor: Arc<dyn Executor>,
    harness: TestHarness,
    shutdown: CancellationToken,
}

impl Engine {
    pub fn new(config: &JudgeConfig) -> Result<Self, RemoteError> {
        let remote = match &config.remote {
            Some(remote) => {
                tracing::info!("Remote judge configured at {}", remote.base_url);
                let client: Arc<dyn RemoteJudge> = Arc::new(Judge0Client::new(remote.clone())?);
                Some(client)
            }
            None => {
                tracing::info!("No remote judge configured, executing locally");
                None
            }
        };

        let registry = RunnerRegistry::from_config(&config.local);
        tracing::debug!("Local languages: {:?}", registry.languages());

        let dispatcher = Dispatcher::new(
            registry,
            remote,
            config.local.timeout(),
            config.local.max_concurrent_runs,
        );

        Ok(Self::with_executor(
            Arc::new(dispatcher),
            config.harness.concurrency,
        ))
    }

    pub fn with_executor(executor: Arc<dyn Executor>, harness_concurrency: usize) -> Self {
        Self {
            harness: TestHarness::new(executor.clone(), harness_concurrency),
            executor,
            shutdown: CancellationToken::new(),
        }
    }

    pub async fn execute_code(&self, code: &str, language: &str, stdin: &str) -> ExecutionResult {
        let request = ExecutionRequest::new(code, language, stdin);
        self.executor
            .execute(&request, &self.shutdown.child_token())
            .await
    }

    pub async fn run_test_cases(
        &self,
        code: &str,
        language: &str,
        test_cases: &[TestCase],
    ) -> Vec<TestCaseResult> {
        self.harness
            .run_test_cases(code, language, test_cases, &self.shutdown.child_token())
            .await
    }

    pub fn assignments(&self, store: Arc<dyn SubmissionStore>) -> AssignmentGrader {
        AssignmentGrader::new(self.harness.clone(), store)
    }

    pub fn labs(&self, store: Arc<dyn SubmissionStore>, ledger: Arc<dyn ScoreLedger>) -> LabGrader {
        LabGrader::new(self.harness.clone(), store, ledger)
    }

    /// Cancels every in-flight execution started through this engine or its clones.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down, cancelling in-flight executions");
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteConfig;
    use crate::core::domain::ExecutionStatus;
    use crate::stubs::runner::RunnerStub;
    use std::time::Duration;

    #[test]
    fn test_new_rejects_unusable_api_key() {
        let config = JudgeConfig {
            remote: Some(RemoteConfig::new("http://localhost:1", "bad\nkey")),
            ..JudgeConfig::default()
        };

        let err = Engine::new(&config).unwrap_err();

        assert!(matches!(err, RemoteError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_unsupported_language_without_remote() {
        let engine = Engine::new(&JudgeConfig::default()).unwrap();

        let result = engine.execute_code("fn main() {}", "rust", "").await;

        assert_eq!(result.status, ExecutionStatus::Error);
        assert!(result.message.contains("not supported"));
    }

    #[tokio::test]
    async fn test_static_html_runs_without_interpreter() {
        let engine = Engine::new(&JudgeConfig::default()).unwrap();

        let result = engine
            .execute_code("<h1>Hello</h1><p>World</p>", "html", "")
            .await;

        assert_eq!(result.status, ExecutionStatus::Passed);
        assert_eq!(result.stdout, "Hello World");
    }

    #[tokio::test]
    async fn test_lab_grading_through_engine() {
        use crate::grading::lab::LabSubmission;
        use crate::grading::store::{InMemoryScoreLedger, InMemorySubmissionStore, SubmissionStatus};

        let engine = Engine::new(&JudgeConfig::default()).unwrap();
        let ledger = Arc::new(InMemoryScoreLedger::new());
        let grader = engine.labs(Arc::new(InMemorySubmissionStore::new()), ledger.clone());

        let outcome = grader
            .submit(
                LabSubmission {
                    user_id: "u1".to_string(),
                    lab_id: "markup".to_string(),
                    code: "<p>Hi</p>".to_string(),
                    language: "html".to_string(),
                    test_cases: vec![TestCase::new("t1", "", "Hi")],
                    reward_points: 5,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.submission.status, SubmissionStatus::Passed);
        assert_eq!(ledger.score("u1"), 5);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_runs() {
        let registry = RunnerRegistry::new().register(
            "python",
            Arc::new(RunnerStub::new(
                ExecutionResult::passed("late".to_string(), String::new(), 1),
                Duration::from_secs(30),
            )),
        );
        let dispatcher = Dispatcher::new(registry, None, Duration::from_secs(60), 4);
        let engine = Engine::with_executor(Arc::new(dispatcher), 2);

        let background = engine.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            background.shutdown();
        });
        let results = engine
            .run_test_cases(
                "print(1)",
                "python",
                &[TestCase::new("t1", "", "late"), TestCase::new("t2", "", "late")],
            )
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.passed));
        assert_eq!(results[0].error.as_deref(), Some("Execution cancelled"));
    }
}
