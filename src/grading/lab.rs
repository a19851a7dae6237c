use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::{
    domain::{TestCase, TestCaseResult},
    pipeline::running::TestHarness,
};
use crate::grading::{
    GradingError, percentage,
    redaction::redact,
    store::{ScoreLedger, Submission, SubmissionKind, SubmissionStatus, SubmissionStore},
};

#[derive(Clone, Debug)]
pub struct LabSubmission {
    pub user_id: String,
    pub lab_id: String,
    pub code: String,
    pub language: String,
    pub test_cases: Vec<TestCase>,
    /// Added to the user's running score on their first full pass.
    pub reward_points: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabOutcome {
    pub submission: Submission,
    /// The user's new running score, when this attempt earned the reward.
    pub awarded_total: Option<u64>,
}

/// Partial credit over visible cases. Every attempt is persisted.
#[derive(Debug, Clone)]
pub struct LabGrader {
    harness: TestHarness,
    store: Arc<dyn SubmissionStore>,
    ledger: Arc<dyn ScoreLedger>,
}

impl LabGrader {
    pub fn new(
        harness: TestHarness,
        store: Arc<dyn SubmissionStore>,
        ledger: Arc<dyn ScoreLedger>,
    ) -> Self {
        Self {
            harness,
            store,
            ledger,
        }
    }

    #[tracing::instrument(skip_all, fields(user = %submission.user_id, lab = %submission.lab_id))]
    pub async fn submit(
        &self,
        submission: LabSubmission,
        cancel: &CancellationToken,
    ) -> Result<LabOutcome, GradingError> {
        let attempts = self
            .store
            .count_attempts(&submission.user_id, &submission.lab_id, SubmissionKind::Lab)
            .await?;
        let passed_before = self
            .store
            .has_passed(&submission.user_id, &submission.lab_id, SubmissionKind::Lab)
            .await?;

        let results = self
            .harness
            .run_test_cases(
                &submission.code,
                &submission.language,
                &submission.test_cases,
                cancel,
            )
            .await;
        let score = Score::of(&submission.test_cases, &results);
        tracing::info!(
            "Scored {}/{} ({}%): {:?}",
            score.score,
            score.total_points,
            score.percentage,
            score.status
        );

        let record = Submission {
            id: Uuid::new_v4(),
            user_id: submission.user_id,
            item_id: submission.lab_id,
            kind: SubmissionKind::Lab,
            code: submission.code,
            language: submission.language,
            test_results: redact(&results),
            status: score.status,
            score: score.score,
            total_points: score.total_points,
            percentage: score.percentage,
            attempt_number: attempts + 1,
            submitted_at: Utc::now(),
        };
        self.store.insert(record.clone()).await?;

        let awarded_total = if record.status == SubmissionStatus::Passed && !passed_before {
            let total = self
                .ledger
                .award_points(&record.user_id, submission.reward_points)
                .await?;
            tracing::info!("Awarded {} points, total {}", submission.reward_points, total);
            Some(total)
        } else {
            None
        };

        Ok(LabOutcome {
            submission: record,
            awarded_total,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Score {
    score: u32,
    total_points: u32,
    percentage: u32,
    status: SubmissionStatus,
}

impl Score {
    /// Hidden cases are run but carry no points.
    fn of(test_cases: &[TestCase], results: &[TestCaseResult]) -> Self {
        let visible = test_cases
            .iter()
            .zip(results)
            .filter(|(case, _)| !case.is_hidden);

        let (score, total_points) = visible.fold((0, 0), |(score, total), (case, result)| {
            let earned = if result.passed { case.points } else { 0 };
            (score + earned, total + case.points)
        });
        let percentage = percentage(score, total_points);

        let status = if percentage == 100 {
            SubmissionStatus::Passed
        } else if results.iter().any(|r| r.error.is_some()) {
            SubmissionStatus::Error
        } else {
            SubmissionStatus::Failed
        };

        Self {
            score,
            total_points,
            percentage,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        domain::{ExecutionResult, ExecutionStatus},
        traits::executor::{Executor, MockExecutor},
    };
    use crate::grading::store::{InMemoryScoreLedger, InMemorySubmissionStore, MockScoreLedger};

    fn echo_harness() -> TestHarness {
        let mut executor = MockExecutor::new();
        executor.expect_execute().returning(|request, _| {
            if request.stdin == "crash" {
                return ExecutionResult::error("NameError: x", "Process exited with code 1");
            }
            if request.stdin == "mismatch" {
                return ExecutionResult {
                    status: ExecutionStatus::Failed,
                    message: "Wrong Answer".to_string(),
                    ..ExecutionResult::passed("other".to_string(), String::new(), 1)
                };
            }
            ExecutionResult::passed(request.stdin.clone(), String::new(), 1)
        });
        let executor: Arc<dyn Executor> = Arc::new(executor);
        TestHarness::new(executor, 1)
    }

    fn submission(test_cases: Vec<TestCase>) -> LabSubmission {
        LabSubmission {
            user_id: "u1".to_string(),
            lab_id: "lab-1".to_string(),
            code: "print(input())".to_string(),
            language: "python".to_string(),
            test_cases,
            reward_points: 15,
        }
    }

    fn grader() -> (LabGrader, Arc<InMemorySubmissionStore>, Arc<InMemoryScoreLedger>) {
        let store = Arc::new(InMemorySubmissionStore::new());
        let ledger = Arc::new(InMemoryScoreLedger::new());
        (
            LabGrader::new(echo_harness(), store.clone(), ledger.clone()),
            store,
            ledger,
        )
    }

    #[tokio::test]
    async fn test_partial_credit() {
        let (grader, store, ledger) = grader();
        let cases = vec![
            TestCase::new("t1", "a", "a").with_points(5),
            TestCase::new("t2", "b", "b").with_points(5),
            TestCase::new("t3", "c", "wrong").with_points(10),
        ];

        let outcome = grader
            .submit(submission(cases), &CancellationToken::new())
            .await
            .unwrap();

        let record = &outcome.submission;
        assert_eq!(record.score, 10);
        assert_eq!(record.total_points, 20);
        assert_eq!(record.percentage, 50);
        assert_eq!(record.status, SubmissionStatus::Failed);
        assert_eq!(record.attempt_number, 1);
        assert_eq!(outcome.awarded_total, None);
        assert_eq!(ledger.score("u1"), 0);
        assert_eq!(store.submissions("u1", "lab-1", SubmissionKind::Lab).len(), 1);
    }

    #[tokio::test]
    async fn test_hidden_cases_do_not_count() {
        let (grader, _, _) = grader();
        let cases = vec![
            TestCase::new("t1", "a", "a").with_points(4),
            TestCase::new("t2", "b", "nope").with_points(6).hidden(),
        ];

        let outcome = grader
            .submit(submission(cases), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.submission.score, 4);
        assert_eq!(outcome.submission.total_points, 4);
        assert_eq!(outcome.submission.status, SubmissionStatus::Passed);
        assert_eq!(outcome.submission.test_results[1].actual_output, "(hidden)");
    }

    #[tokio::test]
    async fn test_execution_error_sets_error_status() {
        let (grader, _, _) = grader();
        let cases = vec![
            TestCase::new("t1", "a", "a"),
            TestCase::new("t2", "crash", "crash"),
        ];

        let outcome = grader
            .submit(submission(cases), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.submission.percentage, 50);
        assert_eq!(outcome.submission.status, SubmissionStatus::Error);
    }

    #[tokio::test]
    async fn test_wrong_answer_verdict_is_failed_not_error() {
        let (grader, _, _) = grader();
        let cases = vec![
            TestCase::new("t1", "a", "a"),
            TestCase::new("t2", "mismatch", "mismatch"),
        ];

        let outcome = grader
            .submit(submission(cases), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.submission.percentage, 50);
        assert_eq!(outcome.submission.status, SubmissionStatus::Failed);
        assert_eq!(outcome.submission.test_results[1].error, None);
    }

    #[tokio::test]
    async fn test_no_visible_points_is_zero_percent() {
        let (grader, _, _) = grader();

        let outcome = grader
            .submit(submission(Vec::new()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.submission.percentage, 0);
        assert_eq!(outcome.submission.status, SubmissionStatus::Failed);
    }

    #[tokio::test]
    async fn test_reward_only_on_first_full_pass() {
        let (grader, store, ledger) = grader();
        let cases = vec![TestCase::new("t1", "a", "a").with_points(3)];

        let first = grader
            .submit(submission(cases.clone()), &CancellationToken::new())
            .await
            .unwrap();
        let second = grader
            .submit(submission(cases), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(first.awarded_total, Some(15));
        assert_eq!(second.awarded_total, None);
        assert_eq!(second.submission.attempt_number, 2);
        assert_eq!(ledger.score("u1"), 15);
        assert_eq!(store.submissions("u1", "lab-1", SubmissionKind::Lab).len(), 2);
    }

    #[tokio::test]
    async fn test_ledger_not_touched_on_failure() {
        let store = Arc::new(InMemorySubmissionStore::new());
        let mut ledger = MockScoreLedger::new();
        ledger.expect_award_points().never();
        let grader = LabGrader::new(echo_harness(), store, Arc::new(ledger));

        grader
            .submit(
                submission(vec![TestCase::new("t1", "a", "b")]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
    }
}
