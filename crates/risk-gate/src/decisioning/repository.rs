use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{EvaluationId, EvaluationRequest, SubjectId};
use super::outcome::{EvaluationOutcome, Explanation};

/// Stored evaluation: the validated request, its outcome, and when it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub request: EvaluationRequest,
    pub outcome: EvaluationOutcome,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationRecord {
    pub fn evaluation_id(&self) -> &EvaluationId {
        &self.outcome.evaluation_id
    }

    pub fn explanation(&self) -> Explanation {
        Explanation::from_outcome(&self.outcome, self.evaluated_at)
    }
}

/// Append-only evaluation storage. `insert` must refuse an id that already exists.
pub trait EvaluationRepository: Send + Sync {
    fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError>;
    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("evaluation already exists")]
    Conflict,
    #[error("evaluation not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Source of the non-bureau history signal on [0, 1].
///
/// Called on the blocking pool under `timeouts.alternate_data_ms`. A lookup that outlives
/// the deadline is abandoned, not cancelled, so implementations should bound their own I/O.
pub trait AlternateDataProvider: Send + Sync {
    fn history_signal(&self, subject: &SubjectId) -> Result<Option<f64>, AlternateDataError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AlternateDataError {
    #[error("alternate data unavailable: {0}")]
    Unavailable(String),
    #[error("alternate data lookup timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },
}

/// Provider for deployments without an alternate-data feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAlternateData;

impl AlternateDataProvider for NoAlternateData {
    fn history_signal(&self, _subject: &SubjectId) -> Result<Option<f64>, AlternateDataError> {
        Ok(None)
    }
}
