use std::time::Instant;

use tracing::debug;

use super::{
    band_recommendation, high_flag_note, weighted_total, CategoryAccumulator, EngineError,
    EngineInput, VoiceEngine,
};
use crate::decisioning::catalog::{CoherenceCheck, Question};
use crate::decisioning::config::FuelModel;
use crate::decisioning::domain::{
    clamp01, sigmoid, EngineKind, EngineScore, InterviewResponse, QuestionCategory, RedFlag,
    RiskLevel, Severity,
};
use crate::decisioning::signals::{DeclaredFinancials, Transcript};

/// Timing dispersion as a share of the expected response time.
const SIGMA_RATIO: f64 = 0.35;
const NEUTRAL_VOICE: f64 = 0.5;
const NEUTRAL_LEXICAL: f64 = 0.5;
const NEUTRAL_COHERENCE: f64 = 0.7;
const INSUFFICIENT_COHERENCE: f64 = 0.5;
const IMPOSSIBLE_COHERENCE: f64 = 0.1;
const TARGET_UTILIZATION: f64 = 0.65;
/// Likelihood assumed for a term absent from the opposite lexicon.
const ABSENT_LIKELIHOOD: f64 = 1e-3;
/// Weight cap applied to poor answers on heavy questions so one answer cannot dominate.
const LOW_SUBSCORE_WEIGHT_CAP: f64 = 7.0;

const EVASIVE_TERMS: &[(&str, f64)] = &[
    ("aproximadamente", 3.2),
    ("mas o menos", 2.8),
    ("depende", 2.5),
    ("varia", 2.3),
    ("no se", 4.5),
    ("creo que", 3.0),
    ("debe ser", 2.7),
    ("poquito", 2.9),
    ("casi nada", 3.5),
    ("no pago nada", 5.0),
    ("es complicado", 2.4),
];

const HONEST_TERMS: &[(&str, f64)] = &[
    ("exactamente", 0.3),
    ("siempre", 0.4),
    ("fijo", 0.5),
    ("todos los dias", 0.4),
    ("preciso", 0.2),
    ("exacto", 0.3),
];

/// Per-category mix of (timing, voice, lexical, coherence).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Coefficients {
    pub(crate) timing: f64,
    pub(crate) voice: f64,
    pub(crate) lexical: f64,
    pub(crate) coherence: f64,
}

impl Coefficients {
    const fn new(timing: f64, voice: f64, lexical: f64, coherence: f64) -> Self {
        Self {
            timing,
            voice,
            lexical,
            coherence,
        }
    }

    /// Critical questions lean on voice stress and coherence over timing and wording.
    pub(crate) fn for_question(question: &Question) -> Self {
        let base = match question.category {
            QuestionCategory::BasicInfo | QuestionCategory::Assets => {
                Self::new(0.30, 0.20, 0.20, 0.30)
            }
            QuestionCategory::DailyOperation | QuestionCategory::OperationalCosts => {
                Self::new(0.20, 0.25, 0.15, 0.40)
            }
            QuestionCategory::BusinessStructure => Self::new(0.25, 0.20, 0.20, 0.35),
            QuestionCategory::CreditHistory => Self::new(0.15, 0.30, 0.25, 0.30),
            QuestionCategory::PaymentIntention => Self::new(0.20, 0.30, 0.20, 0.30),
            QuestionCategory::RiskEvaluation => Self::new(0.20, 0.35, 0.20, 0.25),
        };
        if question.weight >= 9 {
            Self::new(
                base.timing * 0.8,
                base.voice * 1.1,
                base.lexical * 0.9,
                base.coherence * 1.3,
            )
        } else {
            base
        }
    }
}

/// Component scores for one answer, each on [0, 1] where 1 is most credible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Subscore {
    pub(crate) timing: f64,
    pub(crate) voice: f64,
    pub(crate) lexical: f64,
    pub(crate) coherence: f64,
    pub(crate) composite: f64,
}

/// Statistical composite over timing, voice stress, lexical likelihood ratios, and
/// dimensional coherence of the declared figures.
#[derive(Debug, Clone, Default)]
pub struct ScientificEngine;

impl ScientificEngine {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn subscore(
        response: &InterviewResponse,
        question: &Question,
        financials: &DeclaredFinancials,
        fuel: &FuelModel,
    ) -> Subscore {
        let coefficients = Coefficients::for_question(question);
        let timing = timing_score(response.response_time_ms, question.expected_response_ms);
        let voice = response
            .voice_features
            .map(|features| voice_score(features.stress_load(), question.stress_level))
            .unwrap_or(NEUTRAL_VOICE);
        let lexical = lexical_score(&Transcript::from_response(response));
        let coherence = coherence_score(response, question, financials, fuel);

        let composite = clamp01(
            coefficients.timing * timing
                + coefficients.voice * voice
                + coefficients.lexical * lexical
                + coefficients.coherence * coherence,
        );

        Subscore {
            timing,
            voice,
            lexical,
            coherence,
            composite,
        }
    }
}

impl VoiceEngine for ScientificEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Scientific
    }

    fn score(&self, input: &EngineInput) -> Result<EngineScore, EngineError> {
        let started = Instant::now();
        let config = &input.config;

        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut categories = CategoryAccumulator::default();
        let mut red_flags = Vec::new();
        let mut answered = 0usize;
        let mut with_voice = 0usize;

        for (response, question) in input.scored_responses() {
            let subscore = Self::subscore(response, question, &input.financials, &config.fuel);
            let weight = effective_weight(question, subscore.composite);
            weighted += subscore.composite * weight;
            total_weight += weight;
            categories.add(question.category, subscore.composite);
            detect_red_flags(response, question, &subscore, &mut red_flags);

            answered += 1;
            if response.voice_features.is_some() {
                with_voice += 1;
            }
        }

        if answered == 0 {
            return Err(EngineError::Failed {
                engine: EngineKind::Scientific,
                message: "no catalog question was answered".to_string(),
            });
        }

        let total_score = weighted_total(weighted, total_weight);
        let risk_level = RiskLevel::from_score(total_score, &config.risk_bands);
        let voice_coverage = with_voice as f64 / answered as f64;
        let confidence = clamp01(0.6 + 0.35 * voice_coverage);

        let mut recommendations = vec![band_recommendation(
            total_score,
            &config.risk_bands,
            [
                "Statistically reliable profile; proceed with confidence",
                "Profile within acceptable parameters; verify documentation",
                "Multiple statistical risk indicators; require additional guarantees",
                "Statistically unviable profile; high default risk",
            ],
        )];
        recommendations.extend(high_flag_note(&red_flags));
        if red_flags
            .iter()
            .any(|flag| flag.kind == "MATHEMATICAL_IMPOSSIBILITY")
        {
            recommendations
                .push("Mathematical inconsistencies require immediate verification".to_string());
        }

        debug!(
            engine = "scientific",
            total_score,
            answered,
            flags = red_flags.len(),
            "voice engine scored interview"
        );

        Ok(EngineScore {
            total_score,
            risk_level,
            category_scores: categories.finish(),
            red_flags,
            recommendations,
            confidence,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Answers within 1.5 sigma of the expected time score above 0.5, decaying both ways.
pub(crate) fn timing_score(response_ms: u64, expected_ms: u32) -> f64 {
    let expected = f64::from(expected_ms);
    let sigma = (SIGMA_RATIO * expected).max(1e-6);
    let z = (response_ms as f64 - expected) / sigma;
    sigmoid(2.0 * (1.5 - z.abs()))
}

/// Stress above what the topic warrants lowers the score; stressful topics tolerate more.
pub(crate) fn voice_score(stress_load: f64, topic_stress: u8) -> f64 {
    let tolerance = f64::from(topic_stress) / 5.0 * 0.5;
    sigmoid(6.0 * (tolerance + 0.25 - stress_load))
}

/// Mean log likelihood ratio of evasive versus honest terms, mapped through a sigmoid.
pub(crate) fn lexical_score(transcript: &Transcript) -> f64 {
    let mut log_ratio = 0.0;
    let mut matched = 0u32;
    for (term, likelihood) in EVASIVE_TERMS {
        if transcript.contains(term) {
            log_ratio += (likelihood / ABSENT_LIKELIHOOD).ln();
            matched += 1;
        }
    }
    for (term, likelihood) in HONEST_TERMS {
        if transcript.contains(term) {
            log_ratio += (ABSENT_LIKELIHOOD / likelihood).ln();
            matched += 1;
        }
    }
    if matched == 0 {
        return NEUTRAL_LEXICAL;
    }
    sigmoid(-log_ratio / f64::from(matched))
}

pub(crate) fn coherence_score(
    response: &InterviewResponse,
    question: &Question,
    financials: &DeclaredFinancials,
    fuel: &FuelModel,
) -> f64 {
    let declared = response.numeric_value();
    match question.coherence {
        CoherenceCheck::None => NEUTRAL_COHERENCE,
        CoherenceCheck::Income => {
            let (Some(declared), Some(expected)) = (declared, financials.computed_income()) else {
                return INSUFFICIENT_COHERENCE;
            };
            ratio_coherence(declared, expected)
        }
        CoherenceCheck::FuelCost => {
            let (Some(declared), Some(daily_km)) = (declared, financials.daily_km()) else {
                return INSUFFICIENT_COHERENCE;
            };
            let expected = daily_km / fuel.km_per_litre * fuel.price_per_litre;
            ratio_coherence(declared, expected)
        }
        CoherenceCheck::PaymentCapacity => {
            let (Some(declared), Some(income)) = (declared, financials.daily_income) else {
                return INSUFFICIENT_COHERENCE;
            };
            let days = fuel.working_days_per_week;
            let weekly_expenses = financials.daily_fuel_cost.unwrap_or(0.0) * days
                + financials.weekly_informal_payments.unwrap_or(0.0)
                + financials.weekly_card_payment.unwrap_or(0.0);
            let available = income * days - weekly_expenses;
            if available <= 0.0 {
                return IMPOSSIBLE_COHERENCE;
            }
            let utilization = declared / available;
            (-3.0 * (utilization - TARGET_UTILIZATION).abs()).exp()
        }
    }
}

/// Symmetric penalty on over- and under-declaration: 1.0 at parity.
fn ratio_coherence(declared: f64, expected: f64) -> f64 {
    if expected <= 0.0 || declared <= 0.0 {
        return IMPOSSIBLE_COHERENCE;
    }
    (-2.0 * (declared / expected).ln().abs()).exp()
}

fn effective_weight(question: &Question, composite: f64) -> f64 {
    let weight = f64::from(question.weight);
    if composite < 0.35 && weight > LOW_SUBSCORE_WEIGHT_CAP {
        LOW_SUBSCORE_WEIGHT_CAP
    } else {
        weight
    }
}

fn detect_red_flags(
    response: &InterviewResponse,
    question: &Question,
    subscore: &Subscore,
    flags: &mut Vec<RedFlag>,
) {
    let impact = f64::from(question.weight);

    if subscore.composite < 0.2 {
        flags.push(RedFlag {
            kind: "STATISTICAL_OUTLIER".to_string(),
            question_id: response.question_id.clone(),
            reason: format!("composite {:.3} is statistically anomalous", subscore.composite),
            impact_weight: impact,
            severity: if question.weight >= 9 {
                Severity::High
            } else {
                Severity::Medium
            },
        });
    }

    if subscore.coherence <= IMPOSSIBLE_COHERENCE && question.weight >= 8 {
        flags.push(RedFlag {
            kind: "MATHEMATICAL_IMPOSSIBILITY".to_string(),
            question_id: response.question_id.clone(),
            reason: "declared figure violates the operating model".to_string(),
            impact_weight: impact,
            severity: Severity::High,
        });
    }

    if subscore.voice > 0.8 && subscore.lexical < 0.3 && question.stress_level >= 4 {
        flags.push(RedFlag {
            kind: "VOICE_LEXICAL_CONTRADICTION".to_string(),
            question_id: response.question_id.clone(),
            reason: "calm voice with evasive wording on a stressful question".to_string(),
            impact_weight: impact,
            severity: Severity::Medium,
        });
    }
}
