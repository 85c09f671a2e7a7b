//! Voice interview scoring engines.
//!
//! Two independent engines score the same interview: a statistical composite and an explicit
//! rule set. Neither sees the other's output; the consensus module reconciles them afterwards.

mod heuristic;
mod scientific;

use std::collections::BTreeMap;
use std::sync::Arc;

use super::catalog::{self, Question};
use super::config::{DecisionConfig, RiskBands};
use super::consistency::ConsistencyFlag;
use super::domain::{
    EngineKind, EngineScore, InterviewResponse, QuestionCategory, RedFlag, Severity,
};
use super::evasion::EvasionClassification;
use super::signals::DeclaredFinancials;

pub use heuristic::HeuristicEngine;
pub use scientific::ScientificEngine;

/// Everything an engine may read. Owned so it can move onto a blocking worker.
#[derive(Debug, Clone)]
pub struct EngineInput {
    pub responses: Vec<InterviewResponse>,
    pub financials: DeclaredFinancials,
    pub consistency_flags: Vec<ConsistencyFlag>,
    pub evasion: Vec<EvasionClassification>,
    pub config: Arc<DecisionConfig>,
}

impl EngineInput {
    /// Responses paired with their catalog entry; unknown ids are skipped.
    pub(crate) fn scored_responses(
        &self,
    ) -> impl Iterator<Item = (&InterviewResponse, &'static Question)> {
        self.responses.iter().filter_map(|response| {
            catalog::find(&response.question_id).map(|question| (response, question))
        })
    }

    pub(crate) fn evasion_for(&self, question_id: &str) -> Option<&EvasionClassification> {
        self.evasion
            .iter()
            .find(|classification| classification.question_id == question_id)
    }
}

/// Failure of a single engine. The reconciler degrades to the surviving engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("{} engine timed out after {after_ms} ms", .engine.label())]
    Timeout { engine: EngineKind, after_ms: u64 },
    #[error("{} engine failed: {message}", .engine.label())]
    Failed { engine: EngineKind, message: String },
}

impl EngineError {
    pub fn engine(&self) -> EngineKind {
        match self {
            EngineError::Timeout { engine, .. } | EngineError::Failed { engine, .. } => *engine,
        }
    }

    /// Short tag used in logs and in the persisted failure list.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Timeout { .. } => "timeout",
            EngineError::Failed { .. } => "failed",
        }
    }
}

/// A voice scoring engine. Implementations must be pure over their input.
pub trait VoiceEngine: Send + Sync {
    fn kind(&self) -> EngineKind;
    fn score(&self, input: &EngineInput) -> Result<EngineScore, EngineError>;
}

/// Running per-category mean of question subscores.
#[derive(Debug, Default)]
pub(crate) struct CategoryAccumulator {
    totals: BTreeMap<QuestionCategory, (f64, u32)>,
}

impl CategoryAccumulator {
    pub(crate) fn add(&mut self, category: QuestionCategory, subscore: f64) {
        let entry = self.totals.entry(category).or_insert((0.0, 0));
        entry.0 += subscore;
        entry.1 += 1;
    }

    /// Means on the 0-1000 scale.
    pub(crate) fn finish(self) -> BTreeMap<QuestionCategory, f64> {
        self.totals
            .into_iter()
            .map(|(category, (total, count))| {
                (category, (total / f64::from(count) * 1000.0).round())
            })
            .collect()
    }
}

/// Weighted mean of subscores scaled to 0-1000; zero when nothing was scored.
pub(crate) fn weighted_total(weighted: f64, weight: f64) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    (weighted / weight * 1000.0).round().clamp(0.0, 1000.0)
}

/// Opening recommendation keyed off the configured risk bands.
pub(crate) fn band_recommendation(
    score: f64,
    bands: &RiskBands,
    texts: [&'static str; 4],
) -> String {
    let text = if score >= bands.low {
        texts[0]
    } else if score >= bands.medium {
        texts[1]
    } else if score >= bands.high {
        texts[2]
    } else {
        texts[3]
    };
    text.to_string()
}

pub(crate) fn high_flag_note(flags: &[RedFlag]) -> Option<String> {
    let high = flags
        .iter()
        .filter(|flag| flag.severity == Severity::High)
        .count();
    (high > 0).then(|| format!("{high} high-severity indicator(s) detected"))
}
