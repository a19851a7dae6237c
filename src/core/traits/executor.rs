use tokio_util::sync::CancellationToken;

use crate::core::domain::{ExecutionRequest, ExecutionResult};

/// Entry point the test harness drives: one request in, one result out.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Executor: std::fmt::Debug + Send + Sync {
    async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> ExecutionResult;
}
