//! Weighted behavioral ensemble over bureau, voice, and alternate-data signals.

use serde::{Deserialize, Serialize};

use super::config::DecisionConfig;
use super::domain::clamp01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Factor {
    BureauScore,
    VoiceInterview,
    AlternateData,
}

impl Factor {
    pub fn label(&self) -> &'static str {
        match self {
            Factor::BureauScore => "BUREAU_SCORE",
            Factor::VoiceInterview => "VOICE_INTERVIEW",
            Factor::AlternateData => "ALTERNATE_DATA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Impact {
    Pos,
    Neu,
    Neg,
}

impl Impact {
    pub fn from_signal(signal: f64) -> Self {
        if signal >= 0.7 {
            Impact::Pos
        } else if signal >= 0.5 {
            Impact::Neu
        } else {
            Impact::Neg
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Impact::Pos => "POS",
            Impact::Neu => "NEU",
            Impact::Neg => "NEG",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BehavioralCategory {
    Low,
    Medium,
    High,
    Unknown,
}

impl BehavioralCategory {
    pub fn label(&self) -> &'static str {
        match self {
            BehavioralCategory::Low => "LOW",
            BehavioralCategory::Medium => "MEDIUM",
            BehavioralCategory::High => "HIGH",
            BehavioralCategory::Unknown => "UNKNOWN",
        }
    }
}

/// One explain entry; a missing signal carries no impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorExplain {
    pub factor: Factor,
    pub weight: f64,
    pub signal: Option<f64>,
    pub impact: Option<Impact>,
}

/// Factor signals on [0, 1], higher meaning more creditworthy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralInputs {
    pub bureau: Option<f64>,
    pub voice: Option<f64>,
    pub alternate_data: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralResult {
    pub risk_score01: f64,
    pub category: BehavioralCategory,
    pub explain: Vec<FactorExplain>,
    pub fallback_applied: bool,
}

impl BehavioralResult {
    pub fn describe(&self) -> String {
        let factors = self
            .explain
            .iter()
            .map(|entry| match (entry.signal, entry.impact) {
                (Some(signal), Some(impact)) => format!(
                    "{} w={:.2} s={:.3} {}",
                    entry.factor.label(),
                    entry.weight,
                    signal,
                    impact.label()
                ),
                _ => format!("{} w={:.2} missing", entry.factor.label(), entry.weight),
            })
            .collect::<Vec<_>>()
            .join("; ");
        format!(
            "behavioral {} score {:.3}{} [{}]",
            self.category.label(),
            self.risk_score01,
            if self.fallback_applied {
                " (fallback weights)"
            } else {
                ""
            },
            factors
        )
    }
}

/// Aggregates with the primary weights. A missing bureau factor leaves the category
/// UNKNOWN until [`apply_fallback`] substitutes the fallback weighting.
pub fn aggregate(inputs: &BehavioralInputs, config: &DecisionConfig) -> BehavioralResult {
    let weights = &config.weights;
    let explain = vec![
        entry(Factor::BureauScore, weights.bureau, inputs.bureau),
        entry(Factor::VoiceInterview, weights.voice, inputs.voice),
        entry(Factor::AlternateData, weights.alternate_data, inputs.alternate_data),
    ];
    let score = weighted_score(&explain);

    let category = match (inputs.bureau, score) {
        (Some(_), Some(score)) => categorize(score, config),
        _ => BehavioralCategory::Unknown,
    };

    BehavioralResult {
        risk_score01: score.unwrap_or(0.0),
        category,
        explain,
        fallback_applied: false,
    }
}

/// Re-scores without the bureau factor using the fallback weights. Results that already
/// carry a bureau signal are returned unchanged.
pub fn apply_fallback(
    result: BehavioralResult,
    inputs: &BehavioralInputs,
    config: &DecisionConfig,
) -> BehavioralResult {
    if inputs.bureau.is_some() {
        return result;
    }

    let weights = &config.fallback_weights;
    let explain = vec![
        entry(Factor::BureauScore, 0.0, None),
        entry(Factor::VoiceInterview, weights.voice, inputs.voice),
        entry(Factor::AlternateData, weights.alternate_data, inputs.alternate_data),
    ];
    let score = weighted_score(&explain);

    BehavioralResult {
        risk_score01: score.unwrap_or(0.0),
        category: score
            .map(|score| categorize(score, config))
            .unwrap_or(BehavioralCategory::Unknown),
        explain,
        fallback_applied: true,
    }
}

fn entry(factor: Factor, weight: f64, signal: Option<f64>) -> FactorExplain {
    let signal = signal.map(clamp01);
    FactorExplain {
        factor,
        weight,
        signal,
        impact: signal.map(Impact::from_signal),
    }
}

/// Weighted mean over the factors that reported, so a missing factor does not read as zero.
fn weighted_score(explain: &[FactorExplain]) -> Option<f64> {
    let (sum, weight) = explain
        .iter()
        .filter_map(|entry| entry.signal.map(|signal| (signal * entry.weight, entry.weight)))
        .fold((0.0, 0.0), |(sum, weight), (value, w)| (sum + value, weight + w));
    (weight > 0.0).then(|| clamp01(sum / weight))
}

fn categorize(score: f64, config: &DecisionConfig) -> BehavioralCategory {
    let bands = &config.behavioral_bands;
    if score >= bands.low {
        BehavioralCategory::Low
    } else if score >= bands.medium {
        BehavioralCategory::Medium
    } else {
        BehavioralCategory::High
    }
}
