//! Reconciles the two voice engines into one consolidated voice result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::config::ConsensusBands;
use super::domain::{clamp01, EngineKind, EngineScore, RedFlag, RiskLevel};
use super::engines::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgreementLevel {
    High,
    Medium,
    Low,
}

impl AgreementLevel {
    /// `High` below `high_below`, `Medium` below `medium_below`, `Low` otherwise.
    pub fn from_difference(difference: f64, bands: &ConsensusBands) -> Self {
        if difference < bands.high_below {
            AgreementLevel::High
        } else if difference < bands.medium_below {
            AgreementLevel::Medium
        } else {
            AgreementLevel::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgreementLevel::High => "HIGH",
            AgreementLevel::Medium => "MEDIUM",
            AgreementLevel::Low => "LOW",
        }
    }

    fn reliability_factor(&self) -> f64 {
        match self {
            AgreementLevel::High => 1.0,
            AgreementLevel::Medium => 0.85,
            AgreementLevel::Low => 0.65,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub agreement_level: AgreementLevel,
    /// Absent when fewer than two engines produced a score.
    pub score_difference: Option<f64>,
    pub risk_level_agreement: bool,
    pub scientific_advantages: Vec<String>,
    pub heuristic_advantages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineReliability {
    pub scientific: f64,
    pub heuristic: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFailure {
    pub engine: EngineKind,
    pub kind: String,
    pub message: String,
}

impl From<&EngineError> for EngineFailure {
    fn from(error: &EngineError) -> Self {
        Self {
            engine: error.engine(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedVoiceResult {
    pub consolidated_score: Option<EngineScore>,
    pub scientific_score: Option<EngineScore>,
    pub heuristic_score: Option<EngineScore>,
    pub consensus: ConsensusResult,
    pub engine_reliability: EngineReliability,
    pub partial: bool,
    pub engine_failures: Vec<EngineFailure>,
    pub recommendations: Vec<String>,
}

impl ConsolidatedVoiceResult {
    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.consolidated_score
            .as_ref()
            .map(|score| score.risk_level)
    }

    pub fn total_score(&self) -> Option<f64> {
        self.consolidated_score
            .as_ref()
            .map(|score| score.total_score)
    }

    pub fn red_flags(&self) -> &[RedFlag] {
        self.consolidated_score
            .as_ref()
            .map(|score| score.red_flags.as_slice())
            .unwrap_or(&[])
    }

    /// True only when both engines reported and both landed on CRITICAL.
    pub fn both_critical(&self) -> bool {
        matches!(
            (&self.scientific_score, &self.heuristic_score),
            (Some(scientific), Some(heuristic))
                if scientific.risk_level == RiskLevel::Critical
                    && heuristic.risk_level == RiskLevel::Critical
        )
    }
}

/// Merges both engine outcomes. A failed engine is never replaced by a guessed score: the
/// survivor stands alone, agreement is forced LOW, and the result is marked partial.
pub fn reconcile(
    scientific: Result<EngineScore, EngineError>,
    heuristic: Result<EngineScore, EngineError>,
    bands: &ConsensusBands,
) -> ConsolidatedVoiceResult {
    let mut engine_failures = Vec::new();
    let scientific = scientific
        .map_err(|error| engine_failures.push(EngineFailure::from(&error)))
        .ok();
    let heuristic = heuristic
        .map_err(|error| engine_failures.push(EngineFailure::from(&error)))
        .ok();

    let (consolidated, consensus) = match (&scientific, &heuristic) {
        (Some(sci), Some(heu)) => {
            let difference = (sci.total_score - heu.total_score).abs();
            let consensus = ConsensusResult {
                agreement_level: AgreementLevel::from_difference(difference, bands),
                score_difference: Some(difference),
                risk_level_agreement: sci.risk_level == heu.risk_level,
                scientific_advantages: scientific_advantages(sci, heu),
                heuristic_advantages: heuristic_advantages(sci, heu),
            };
            (Some(merge_scores(sci, heu)), consensus)
        }
        (Some(only), None) | (None, Some(only)) => (
            Some(only.clone()),
            degraded_consensus(scientific.is_some(), heuristic.is_some()),
        ),
        (None, None) => (None, degraded_consensus(false, false)),
    };

    let factor = consensus.agreement_level.reliability_factor();
    let scientific_reliability = scientific.as_ref().map_or(0.0, |score| score.confidence);
    let heuristic_reliability = heuristic.as_ref().map_or(0.0, |score| score.confidence);
    let engine_reliability = EngineReliability {
        scientific: scientific_reliability,
        heuristic: heuristic_reliability,
        overall: clamp01(factor * (scientific_reliability + heuristic_reliability) / 2.0),
    };

    let consolidated = consolidated.map(|mut score| {
        score.confidence = engine_reliability.overall;
        score
    });

    let recommendations = consolidated_recommendations(
        scientific.as_ref(),
        heuristic.as_ref(),
        consolidated.as_ref(),
        &consensus,
    );

    ConsolidatedVoiceResult {
        consolidated_score: consolidated,
        scientific_score: scientific,
        heuristic_score: heuristic,
        consensus,
        engine_reliability,
        partial: !engine_failures.is_empty(),
        engine_failures,
        recommendations,
    }
}

fn degraded_consensus(scientific: bool, heuristic: bool) -> ConsensusResult {
    let survivor_note = "Only surviving engine contributed to the result".to_string();
    ConsensusResult {
        agreement_level: AgreementLevel::Low,
        score_difference: None,
        risk_level_agreement: false,
        scientific_advantages: if scientific {
            vec![survivor_note.clone()]
        } else {
            Vec::new()
        },
        heuristic_advantages: if heuristic {
            vec![survivor_note]
        } else {
            Vec::new()
        },
    }
}

/// More severe of the two levels, capped at HIGH when the engines sit two or more apart.
pub fn conservative_risk_level(scientific: RiskLevel, heuristic: RiskLevel) -> RiskLevel {
    let worst = scientific.max(heuristic);
    if scientific.rank().abs_diff(heuristic.rank()) >= 2 {
        worst.min(RiskLevel::High)
    } else {
        worst
    }
}

/// Union keyed by `(type, question_id)` keeping the higher impact; first-seen order.
pub fn merge_red_flags(scientific: &[RedFlag], heuristic: &[RedFlag]) -> Vec<RedFlag> {
    let mut merged: Vec<RedFlag> = Vec::new();
    for flag in scientific.iter().chain(heuristic) {
        match merged
            .iter_mut()
            .find(|existing| existing.kind == flag.kind && existing.question_id == flag.question_id)
        {
            Some(existing) => {
                if flag.impact_weight > existing.impact_weight {
                    *existing = flag.clone();
                }
            }
            None => merged.push(flag.clone()),
        }
    }
    merged
}

fn merge_scores(scientific: &EngineScore, heuristic: &EngineScore) -> EngineScore {
    let mut category_scores = BTreeMap::new();
    for category in scientific
        .category_scores
        .keys()
        .chain(heuristic.category_scores.keys())
    {
        let value = match (
            scientific.category_scores.get(category),
            heuristic.category_scores.get(category),
        ) {
            (Some(a), Some(b)) => (a + b) / 2.0,
            (Some(only), None) | (None, Some(only)) => *only,
            (None, None) => continue,
        };
        category_scores.insert(*category, value);
    }

    EngineScore {
        total_score: (scientific.total_score + heuristic.total_score) / 2.0,
        risk_level: conservative_risk_level(scientific.risk_level, heuristic.risk_level),
        category_scores,
        red_flags: merge_red_flags(&scientific.red_flags, &heuristic.red_flags),
        recommendations: Vec::new(),
        confidence: 0.0,
        processing_time_ms: scientific.processing_time_ms.max(heuristic.processing_time_ms),
    }
}

fn scientific_advantages(scientific: &EngineScore, heuristic: &EngineScore) -> Vec<String> {
    let mut advantages = Vec::new();
    if scientific.red_flags.len() > heuristic.red_flags.len() {
        advantages.push("Detected more potential inconsistencies".to_string());
    }
    if scientific.category_scores.len() > heuristic.category_scores.len() {
        advantages.push("Broader category coverage".to_string());
    }
    advantages.push("Statistical composite per question".to_string());
    advantages.push("Dimensional coherence checks on declared figures".to_string());
    advantages
}

fn heuristic_advantages(scientific: &EngineScore, heuristic: &EngineScore) -> Vec<String> {
    let mut advantages = vec![
        "Explicit business rules".to_string(),
        "Direct use of evasion and consistency evidence".to_string(),
    ];
    if heuristic.red_flags.len() > scientific.red_flags.len() {
        advantages.push("Flagged more business-rule violations".to_string());
    }
    advantages
}

fn consolidated_recommendations(
    scientific: Option<&EngineScore>,
    heuristic: Option<&EngineScore>,
    consolidated: Option<&EngineScore>,
    consensus: &ConsensusResult,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    match (consensus.score_difference, scientific, heuristic) {
        (Some(difference), Some(sci), Some(heu)) => {
            recommendations.push(format!(
                "{} consensus between engines (difference {:.0} pts)",
                consensus.agreement_level.label(),
                difference
            ));
            if sci.total_score < heu.total_score - 150.0 {
                recommendations.push(
                    "Scientific engine is more conservative; review statistical risk patterns"
                        .to_string(),
                );
            } else if heu.total_score < sci.total_score - 150.0 {
                recommendations.push(
                    "Heuristic engine is more conservative; business rules indicate risk"
                        .to_string(),
                );
            }
        }
        (_, Some(_), None) => recommendations
            .push("Only the scientific engine completed; voice result is partial".to_string()),
        (_, None, Some(_)) => recommendations
            .push("Only the heuristic engine completed; voice result is partial".to_string()),
        _ => recommendations
            .push("No voice engine completed; voice evidence unavailable".to_string()),
    }

    if let Some(score) = consolidated {
        recommendations.push(
            match score.risk_level {
                RiskLevel::Critical => "Decline or restructure: consolidated voice risk is critical",
                RiskLevel::High => "Request additional guarantees before approval",
                RiskLevel::Medium => "Approve only with close monitoring",
                RiskLevel::Low => "Voice evidence supports approval",
            }
            .to_string(),
        );
    }

    recommendations
}
