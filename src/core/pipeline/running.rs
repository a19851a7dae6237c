use std::any::Any;
use std::sync::Arc;

use futures::{StreamExt, stream};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

use crate::core::{
    domain::{ExecutionRequest, TestCase, TestCaseResult},
    traits::executor::Executor,
};

/// Runs a submission against a list of test cases and judges every case.
#[derive(Debug, Clone)]
pub struct TestHarness {
    executor: Arc<dyn Executor>,
    concurrency: usize,
}

impl TestHarness {
    pub fn new(executor: Arc<dyn Executor>, concurrency: usize) -> Self {
        Self {
            executor,
            concurrency: concurrency.max(1),
        }
    }

    /// One result per case, in input order, whatever the concurrency.
    #[tracing::instrument(skip(self, code, test_cases, cancel), fields(cases = test_cases.len()))]
    pub async fn run_test_cases(
        &self,
        code: &str,
        language: &str,
        test_cases: &[TestCase],
        cancel: &CancellationToken,
    ) -> Vec<TestCaseResult> {
        let code: Arc<str> = Arc::from(code);
        let language: Arc<str> = Arc::from(language);

        let results: Vec<TestCaseResult> = stream::iter(test_cases.iter().cloned())
            .map(|test_case| {
                // Dropping the harness future aborts the case, which kills its process
                let handle = AbortOnDropHandle::new(tokio::spawn(run_case(
                    self.executor.clone(),
                    code.clone(),
                    language.clone(),
                    test_case.clone(),
                    cancel.clone(),
                )));
                async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(err) => {
                            let msg = join_error_message(err);
                            tracing::error!("Test case {} crashed: {}", test_case.id, msg);
                            TestCaseResult::crashed(&test_case, msg)
                        }
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let passed = results.iter().filter(|r| r.passed).count();
        tracing::info!("{}/{} test cases passed", passed, results.len());

        results
    }
}

async fn run_case(
    executor: Arc<dyn Executor>,
    code: Arc<str>,
    language: Arc<str>,
    test_case: TestCase,
    cancel: CancellationToken,
) -> TestCaseResult {
    tracing::debug!("Running test case {}", test_case.id);
    let request = ExecutionRequest::new(&code, &language, &test_case.input);
    let result = executor.execute(&request, &cancel).await;

    TestCaseResult::judge(&test_case, &result)
}

fn join_error_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "Test case evaluation was cancelled".to_string();
    }
    panic_message(err.into_panic())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(msg) => msg.to_string(),
            Err(_) => "Test case evaluation panicked".to_string(),
        },
    }
}
