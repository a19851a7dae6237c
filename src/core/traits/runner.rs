use std::time::Duration;

use crate::core::domain::ExecutionResult;

/// Executes source code for one language on the local machine.
///
/// Implementations never fail past this boundary: preparation, spawn and
/// timeout failures are all reported as an error-class `ExecutionResult`.
/// Dropping the returned future must kill whatever it spawned.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Runner: std::fmt::Debug + Send + Sync {
    async fn execute(&self, code: &str, stdin: &str, timeout: Duration) -> ExecutionResult;
}
