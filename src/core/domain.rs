use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: String,
    pub stdin: String,
}

impl ExecutionRequest {
    pub fn new(code: &str, language: &str, stdin: &str) -> Self {
        Self {
            code: code.to_string(),
            language: language.to_string(),
            stdin: stdin.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Passed,
    Failed,
    Error,
    Timeout,
}

impl ExecutionStatus {
    /// Timeouts count as errors for every grading decision.
    pub fn is_error(&self) -> bool {
        matches!(self, ExecutionStatus::Error | ExecutionStatus::Timeout)
    }
}

/// Which path served an execution. Debugging metadata only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Local,
    Remote,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub compile_output: String,
    pub message: String,
    pub status: ExecutionStatus,
    pub time_ms: u64,
    pub memory_kb: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub backend: Option<Backend>,
}

impl ExecutionResult {
    pub fn passed(stdout: String, stderr: String, time_ms: u64) -> Self {
        Self {
            stdout,
            stderr,
            compile_output: String::new(),
            message: String::new(),
            status: ExecutionStatus::Passed,
            time_ms,
            memory_kb: 0,
            backend: None,
        }
    }

    /// An error result that never reached (or never finished) execution.
    pub fn error(stderr: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            compile_output: String::new(),
            message: message.into(),
            status: ExecutionStatus::Error,
            time_ms: 0,
            memory_kb: 0,
            backend: None,
        }
    }

    pub fn with_backend(self, backend: Backend) -> Self {
        Self {
            backend: Some(backend),
            ..self
        }
    }

    /// First non-empty diagnostic, in the order a submitter would want to read them.
    pub fn diagnostic(&self) -> Option<String> {
        [&self.compile_output, &self.stderr, &self.message]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default = "default_points")]
    pub points: u32,
}

fn default_points() -> u32 {
    1
}

impl TestCase {
    pub fn new(id: &str, input: &str, expected_output: &str) -> Self {
        Self {
            id: id.to_string(),
            input: input.to_string(),
            expected_output: expected_output.to_string(),
            is_hidden: false,
            points: default_points(),
        }
    }

    pub fn hidden(self) -> Self {
        Self {
            is_hidden: true,
            ..self
        }
    }

    pub fn with_points(self, points: u32) -> Self {
        Self { points, ..self }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub test_case_id: String,
    pub passed: bool,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub memory_used_kb: u64,
    pub is_hidden: bool,
}

impl TestCaseResult {
    /// Verdict for a case whose execution finished, successfully or not.
    pub fn judge(test_case: &TestCase, result: &ExecutionResult) -> Self {
        let passed = result.status == ExecutionStatus::Passed
            && result.stdout.trim() == test_case.expected_output.trim();
        // A wrong answer is a mismatch, not an execution error
        let error = result.status.is_error().then(|| {
            result
                .diagnostic()
                .unwrap_or_else(|| format!("Execution finished with status {:?}", result.status))
        });

        Self {
            test_case_id: test_case.id.clone(),
            passed,
            input: test_case.input.clone(),
            expected_output: test_case.expected_output.clone(),
            actual_output: result.stdout.clone(),
            error,
            execution_time_ms: result.time_ms,
            memory_used_kb: result.memory_kb,
            is_hidden: test_case.is_hidden,
        }
    }

    /// Verdict for a case whose evaluation blew up before producing a result.
    pub fn crashed(test_case: &TestCase, msg: String) -> Self {
        Self {
            test_case_id: test_case.id.clone(),
            passed: false,
            input: test_case.input.clone(),
            expected_output: test_case.expected_output.clone(),
            actual_output: String::new(),
            error: Some(msg),
            execution_time_ms: 0,
            memory_used_kb: 0,
            is_hidden: test_case.is_hidden,
        }
    }
}
