use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::domain::TestCaseResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Assignment,
    Lab,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Passed,
    Failed,
    Error,
}

/// A graded attempt. Immutable once inserted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub user_id: String,
    pub item_id: String,
    pub kind: SubmissionKind,
    pub code: String,
    pub language: String,
    /// Redacted copy; hidden cases never leave the grader unmasked.
    pub test_results: Vec<TestCaseResult>,
    pub status: SubmissionStatus,
    pub score: u32,
    pub total_points: u32,
    pub percentage: u32,
    pub attempt_number: u32,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("Submission {0} already exists")]
    Duplicate(Uuid),
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait SubmissionStore: std::fmt::Debug + Send + Sync {
    async fn count_attempts(
        &self,
        user_id: &str,
        item_id: &str,
        kind: SubmissionKind,
    ) -> Result<u32, StoreError>;

    async fn has_passed(
        &self,
        user_id: &str,
        item_id: &str,
        kind: SubmissionKind,
    ) -> Result<bool, StoreError>;

    async fn insert(&self, submission: Submission) -> Result<(), StoreError>;
}

/// Running per-user score kept by the profile side of the system.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ScoreLedger: std::fmt::Debug + Send + Sync {
    /// Returns the user's new total.
    async fn award_points(&self, user_id: &str, points: u32) -> Result<u64, StoreError>;
}

type SubmissionKey = (String, String, SubmissionKind);

fn key(user_id: &str, item_id: &str, kind: SubmissionKind) -> SubmissionKey {
    (user_id.to_string(), item_id.to_string(), kind)
}

#[derive(Debug, Default)]
pub struct InMemorySubmissionStore {
    submissions: DashMap<SubmissionKey, Vec<Submission>>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self, user_id: &str, item_id: &str, kind: SubmissionKind) -> Vec<Submission> {
        self.submissions
            .get(&key(user_id, item_id, kind))
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn count_attempts(
        &self,
        user_id: &str,
        item_id: &str,
        kind: SubmissionKind,
    ) -> Result<u32, StoreError> {
        Ok(self
            .submissions
            .get(&key(user_id, item_id, kind))
            .map_or(0, |entry| entry.len() as u32))
    }

    async fn has_passed(
        &self,
        user_id: &str,
        item_id: &str,
        kind: SubmissionKind,
    ) -> Result<bool, StoreError> {
        Ok(self
            .submissions
            .get(&key(user_id, item_id, kind))
            .is_some_and(|entry| entry.iter().any(|s| s.status == SubmissionStatus::Passed)))
    }

    async fn insert(&self, submission: Submission) -> Result<(), StoreError> {
        let mut entry = self
            .submissions
            .entry(key(&submission.user_id, &submission.item_id, submission.kind))
            .or_default();
        if entry.iter().any(|s| s.id == submission.id) {
            return Err(StoreError::Duplicate(submission.id));
        }
        tracing::debug!("Storing submission {}", submission.id);
        entry.push(submission);

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryScoreLedger {
    scores: DashMap<String, u64>,
}

impl InMemoryScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self, user_id: &str) -> u64 {
        self.scores.get(user_id).map_or(0, |score| *score)
    }
}

#[async_trait::async_trait]
impl ScoreLedger for InMemoryScoreLedger {
    async fn award_points(&self, user_id: &str, points: u32) -> Result<u64, StoreError> {
        let mut score = self.scores.entry(user_id.to_string()).or_insert(0);
        *score += u64::from(points);

        Ok(*score)
    }
}
