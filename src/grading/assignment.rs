use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::{
    domain::{TestCase, TestCaseResult},
    pipeline::running::TestHarness,
};
use crate::grading::{
    GradingError,
    redaction::redact,
    store::{Submission, SubmissionKind, SubmissionStatus, SubmissionStore},
};

#[derive(Clone, Debug)]
pub struct AssignmentSubmission {
    pub user_id: String,
    pub assignment_id: String,
    pub code: String,
    pub language: String,
    pub test_cases: Vec<TestCase>,
    pub max_attempts: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// Every case passed (or there was nothing to run); the submission is stored.
    Accepted(Submission),
    /// Nothing stored. The caller gets the counts and a redacted result list.
    Rejected {
        tests_passed: usize,
        tests_total: usize,
        results: Vec<TestCaseResult>,
    },
    AttemptsExhausted { attempts: u32, max_attempts: u32 },
}

/// All-or-nothing gate: only fully passing code is ever persisted.
#[derive(Debug, Clone)]
pub struct AssignmentGrader {
    harness: TestHarness,
    store: Arc<dyn SubmissionStore>,
}

impl AssignmentGrader {
    pub fn new(harness: TestHarness, store: Arc<dyn SubmissionStore>) -> Self {
        Self { harness, store }
    }

    #[tracing::instrument(skip_all, fields(user = %submission.user_id, assignment = %submission.assignment_id))]
    pub async fn submit(
        &self,
        submission: AssignmentSubmission,
        cancel: &CancellationToken,
    ) -> Result<AssignmentOutcome, GradingError> {
        let attempts = self
            .store
            .count_attempts(
                &submission.user_id,
                &submission.assignment_id,
                SubmissionKind::Assignment,
            )
            .await?;

        if let Some(max_attempts) = submission.max_attempts {
            if attempts >= max_attempts {
                tracing::info!("Attempt limit reached ({}/{})", attempts, max_attempts);
                return Ok(AssignmentOutcome::AttemptsExhausted {
                    attempts,
                    max_attempts,
                });
            }
        }

        let results = if submission.test_cases.is_empty() {
            Vec::new()
        } else {
            self.harness
                .run_test_cases(
                    &submission.code,
                    &submission.language,
                    &submission.test_cases,
                    cancel,
                )
                .await
        };

        let tests_total = results.len();
        let tests_passed = results.iter().filter(|r| r.passed).count();
        if tests_passed < tests_total {
            tracing::info!("Rejected: {}/{} test cases passed", tests_passed, tests_total);
            return Ok(AssignmentOutcome::Rejected {
                tests_passed,
                tests_total,
                results: redact(&results),
            });
        }

        let total_points: u32 = submission.test_cases.iter().map(|c| c.points).sum();
        let record = Submission {
            id: Uuid::new_v4(),
            user_id: submission.user_id,
            item_id: submission.assignment_id,
            kind: SubmissionKind::Assignment,
            code: submission.code,
            language: submission.language,
            test_results: redact(&results),
            status: SubmissionStatus::Passed,
            score: total_points,
            total_points,
            percentage: 100,
            attempt_number: attempts + 1,
            submitted_at: Utc::now(),
        };
        self.store.insert(record.clone()).await?;
        tracing::info!("Accepted attempt {}", record.attempt_number);

        Ok(AssignmentOutcome::Accepted(record))
    }
}
