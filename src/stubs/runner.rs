use std::time::Duration;

use crate::core::{domain::ExecutionResult, traits::runner::Runner};

/// Runner that answers with a fixed result after a fixed delay.
#[derive(Debug, Clone)]
pub struct RunnerStub {
    result: ExecutionResult,
    delay: Duration,
}

impl RunnerStub {
    pub fn new(result: ExecutionResult, delay: Duration) -> Self {
        Self { result, delay }
    }
}

#[async_trait::async_trait]
impl Runner for RunnerStub {
    #[tracing::instrument]
    async fn execute(&self, code: &str, stdin: &str, timeout: Duration) -> ExecutionResult {
        tracing::debug!(
            "Start execution: code={:?}, stdin={:?}, timeout={:?}",
            code,
            stdin,
            timeout
        );
        tokio::time::sleep(self.delay).await;
        tracing::debug!("Execution result: {:?}", self.result);

        self.result.clone()
    }
}
