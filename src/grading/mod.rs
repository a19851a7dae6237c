//! Grading policies built on top of the test harness: an all-or-nothing gate
//! for assignments and partial credit for coding labs.
pub mod assignment;
pub mod lab;
pub mod redaction;
pub mod store;

use thiserror::Error;

use crate::grading::store::StoreError;

#[derive(Debug, Error)]
pub enum GradingError {
    #[error("Failed to persist submission: {0}")]
    Store(#[from] StoreError),
}

/// `round(score / total * 100)`, or 0 when nothing is worth points.
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(score) / f64::from(total) * 100.0).round() as u32
}
