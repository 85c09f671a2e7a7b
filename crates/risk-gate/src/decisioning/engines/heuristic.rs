use std::time::Instant;

use tracing::debug;

use super::{
    band_recommendation, high_flag_note, weighted_total, CategoryAccumulator, EngineError,
    EngineInput, VoiceEngine,
};
use crate::decisioning::catalog::Question;
use crate::decisioning::consistency::ConsistencyFlag;
use crate::decisioning::domain::{
    EngineKind, EngineScore, InterviewResponse, RedFlag, RiskLevel, Severity,
};
use crate::decisioning::evasion::{EvasionClassification, EvasionSubtype};
use crate::decisioning::signals::{DeclaredFinancials, Transcript};

const BASE_SCORE: f64 = 0.75;
const MIN_SCORE: f64 = 0.1;

/// Interview-wide ratios that shade every per-answer score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct BehaviorPatterns {
    pub(crate) round_numbers_ratio: f64,
    pub(crate) evasive_language_ratio: f64,
}

impl BehaviorPatterns {
    fn from_input(input: &EngineInput) -> Self {
        let mut total = 0usize;
        let mut round = 0usize;
        let mut evasive = 0usize;
        for (response, question) in input.scored_responses() {
            total += 1;
            if has_keyword(response, question) {
                evasive += 1;
            }
            if matches!(response.numeric_value(), Some(value) if value > 100.0 && value % 100.0 == 0.0)
            {
                round += 1;
            }
        }
        if total == 0 {
            return Self::default();
        }
        Self {
            round_numbers_ratio: round as f64 / total as f64,
            evasive_language_ratio: evasive as f64 / total as f64,
        }
    }
}

/// Explicit business rules over timing, stress indicators, keyword triggers, evasion
/// subtypes, and consistency findings.
#[derive(Debug, Clone, Default)]
pub struct HeuristicEngine;

impl HeuristicEngine {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn response_score(
        response: &InterviewResponse,
        question: &Question,
        input: &EngineInput,
        patterns: &BehaviorPatterns,
    ) -> f64 {
        let mut score = BASE_SCORE;

        let timing = response.response_time_ms as f64 / f64::from(question.expected_response_ms);
        if timing < 0.3 {
            score -= 0.2;
        } else if timing > 3.0 {
            score -= 0.15;
        } else if (0.7..=1.5).contains(&timing) {
            score += 0.1;
        }

        let expected = i64::from(question.stress_level);
        let actual = response.stress_indicators.len() as i64;
        if (actual - expected).abs() <= 1 {
            score += 0.05;
        } else if actual > expected + 2 {
            score -= 0.15;
        } else if actual < expected - 2 && expected >= 4 {
            score -= 0.05;
        }

        if response.question_id == "daily_income" {
            score -= margin_penalty(&input.financials);
        }

        if has_keyword(response, question) {
            score -= 0.1;
        }

        if let Some(classification) = input.evasion_for(&response.question_id) {
            score -= evasion_penalty(classification.subtype);
        }

        score -= consistency_penalty(&response.question_id, &input.consistency_flags);

        if patterns.round_numbers_ratio > 0.4 {
            score -= 0.05;
        }
        if patterns.evasive_language_ratio > 0.3 {
            score -= 0.1;
        }

        score.clamp(MIN_SCORE, 1.0)
    }
}

impl VoiceEngine for HeuristicEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Heuristic
    }

    fn score(&self, input: &EngineInput) -> Result<EngineScore, EngineError> {
        let started = Instant::now();
        let config = &input.config;
        let patterns = BehaviorPatterns::from_input(input);

        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut categories = CategoryAccumulator::default();
        let mut red_flags = Vec::new();

        for (response, question) in input.scored_responses() {
            let score = Self::response_score(response, question, input, &patterns);
            let weight = f64::from(question.weight);
            weighted += score * weight;
            total_weight += weight;
            categories.add(question.category, score);
            red_flags.extend(response_flags(response, question, score));
        }

        if total_weight <= 0.0 {
            return Err(EngineError::Failed {
                engine: EngineKind::Heuristic,
                message: "no catalog question was answered".to_string(),
            });
        }

        red_flags.extend(input.evasion.iter().filter_map(evasion_flag));
        red_flags.extend(input.consistency_flags.iter().map(consistency_flag));

        let total_score = weighted_total(weighted, total_weight);
        let risk_level = RiskLevel::from_score(total_score, &config.risk_bands);

        let high_flags = red_flags
            .iter()
            .filter(|flag| flag.severity == Severity::High)
            .count();
        let confidence = if high_flags > 3 { 0.6 } else { 0.75 };

        let mut recommendations = vec![band_recommendation(
            total_score,
            &config.risk_bands,
            [
                "Business rules indicate low risk",
                "Moderate risk by business rules; corroborate with the statistical engine",
                "High risk by business rules; requires additional analysis",
                "Critical risk by business rules; decline or require guarantees",
            ],
        )];
        recommendations.extend(high_flag_note(&red_flags));
        recommendations.extend(financial_notes(&input.financials));

        debug!(
            engine = "heuristic",
            total_score,
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

fn has_keyword(response: &InterviewResponse, question: &Question) -> bool {
    if question.keywords.is_empty() {
        return false;
    }
    let transcript = Transcript::from_response(response);
    question
        .keywords
        .iter()
        .any(|keyword| transcript.contains(keyword))
}

/// Unrealistically thin or fat operating margins on the income answer.
fn margin_penalty(financials: &DeclaredFinancials) -> f64 {
    let (Some(income), Some(fuel)) = (financials.daily_income, financials.daily_fuel_cost) else {
        return 0.0;
    };
    if income <= 0.0 {
        return 0.0;
    }
    let margin = (income - fuel) / income;
    if margin < 0.2 {
        0.2
    } else if margin > 0.9 {
        0.1
    } else {
        0.0
    }
}

pub(crate) fn evasion_penalty(subtype: EvasionSubtype) -> f64 {
    match subtype {
        EvasionSubtype::EvasiveConfident | EvasionSubtype::EvasiveCalculated => 0.4,
        EvasionSubtype::EvasiveNervous => 0.25,
        EvasionSubtype::EvasiveGeneral => 0.15,
        EvasionSubtype::HonestNervous => 0.05,
    }
}

fn consistency_penalty(question_id: &str, flags: &[ConsistencyFlag]) -> f64 {
    flags
        .iter()
        .filter(|flag| flag.fields_involved.iter().any(|field| field == question_id))
        .map(|flag| match flag.severity {
            Severity::High => 0.15,
            Severity::Medium => 0.1,
            Severity::Low => 0.0,
        })
        .fold(0.0, f64::max)
}

fn response_flags(response: &InterviewResponse, question: &Question, score: f64) -> Vec<RedFlag> {
    let mut flags = Vec::new();

    if score < 0.3 && question.weight >= 8 {
        flags.push(RedFlag {
            kind: "HEURISTIC_LOW_SCORE".to_string(),
            question_id: response.question_id.clone(),
            reason: format!("heuristic score {score:.2} on a critical question"),
            impact_weight: f64::from(question.weight),
            severity: if question.weight >= 9 {
                Severity::High
            } else {
                Severity::Medium
            },
        });
    }

    if response.response_time_ms > u64::from(question.expected_response_ms) * 4 {
        flags.push(RedFlag {
            kind: "EXTREME_RESPONSE_TIME".to_string(),
            question_id: response.question_id.clone(),
            reason: format!(
                "answered in {:.1}s against an expected {:.1}s",
                response.response_time_ms as f64 / 1000.0,
                f64::from(question.expected_response_ms) / 1000.0
            ),
            impact_weight: 6.0,
            severity: Severity::Medium,
        });
    }

    if response.stress_indicators.len() >= 4 && question.stress_level <= 2 {
        flags.push(RedFlag {
            kind: "UNEXPECTED_HIGH_STRESS".to_string(),
            question_id: response.question_id.clone(),
            reason: "high stress on a low-stress question".to_string(),
            impact_weight: 5.0,
            severity: Severity::Medium,
        });
    }

    flags
}

fn evasion_flag(classification: &EvasionClassification) -> Option<RedFlag> {
    let (severity, impact_weight) = match classification.risk_level {
        RiskLevel::Critical => (
            Severity::High,
            crate::decisioning::catalog::find(&classification.question_id)
                .map(|question| f64::from(question.weight))
                .unwrap_or(8.0),
        ),
        RiskLevel::High => (Severity::Medium, 6.0),
        RiskLevel::Medium | RiskLevel::Low => return None,
    };
    Some(RedFlag {
        kind: classification.subtype.label().to_string(),
        question_id: classification.question_id.clone(),
        reason: format!(
            "evasion subtype {} scored {:.0}",
            classification.subtype.label(),
            classification.adjusted_score
        ),
        impact_weight,
        severity,
    })
}

fn consistency_flag(flag: &ConsistencyFlag) -> RedFlag {
    RedFlag {
        kind: flag.rule.code().to_string(),
        question_id: "financial_consistency".to_string(),
        reason: flag.describe(),
        impact_weight: match flag.severity {
            Severity::High => 9.0,
            Severity::Medium => 7.0,
            Severity::Low => 4.0,
        },
        severity: flag.severity,
    }
}

fn financial_notes(financials: &DeclaredFinancials) -> Vec<String> {
    let mut notes = Vec::new();
    if let (Some(income), Some(fuel)) = (financials.daily_income, financials.daily_fuel_cost) {
        if income > 0.0 && (income - fuel) / income < 0.3 {
            notes.push("Tight operating margin; repayment at risk in a downturn".to_string());
        }
    }
    if let (Some(income), Some(low)) = (financials.daily_income, financials.low_season_income) {
        if income > 0.0 && 1.0 - low / income > 0.5 {
            notes.push("High seasonal vulnerability; consider additional guarantees".to_string());
        }
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_evasion_costs_the_most() {
        assert!(
            evasion_penalty(EvasionSubtype::EvasiveConfident)
                > evasion_penalty(EvasionSubtype::EvasiveNervous)
        );
        assert!(
            evasion_penalty(EvasionSubtype::EvasiveGeneral)
                > evasion_penalty(EvasionSubtype::HonestNervous)
        );
    }

    #[test]
    fn margin_penalty_targets_implausible_margins() {
        let thin = DeclaredFinancials {
            daily_income: Some(1000.0),
            daily_fuel_cost: Some(900.0),
            ..DeclaredFinancials::default()
        };
        let normal = DeclaredFinancials {
            daily_income: Some(750.0),
            daily_fuel_cost: Some(275.0),
            ..DeclaredFinancials::default()
        };
        assert_eq!(margin_penalty(&thin), 0.2);
        assert_eq!(margin_penalty(&normal), 0.0);
        assert_eq!(margin_penalty(&DeclaredFinancials::default()), 0.0);
    }

    #[test]
    fn financial_notes_cover_margin_and_seasonality() {
        let financials = DeclaredFinancials {
            daily_income: Some(1000.0),
            daily_fuel_cost: Some(800.0),
            low_season_income: Some(300.0),
            ..DeclaredFinancials::default()
        };
        assert_eq!(financial_notes(&financials).len(), 2);
    }
}
