use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::behavioral::BehavioralResult;
use super::bureau::BureauResult;
use super::consensus::ConsolidatedVoiceResult;
use super::consistency::ConsistencyFlag;
use super::domain::{EvaluationId, SubjectId};
use super::evasion::EvasionClassification;
use super::gate::{Decision, Gate, GateRule};

/// Everything produced for one evaluation request. Written once, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub evaluation_id: EvaluationId,
    pub subject_id: SubjectId,
    pub config_version: String,
    pub bureau: BureauResult,
    pub behavioral: BehavioralResult,
    pub voice: ConsolidatedVoiceResult,
    pub consistency_flags: Vec<ConsistencyFlag>,
    pub evasion: Vec<EvasionClassification>,
    pub decision: Decision,
    pub partial: bool,
}

impl EvaluationOutcome {
    pub fn summary(&self) -> String {
        format!(
            "{} {} via {}",
            self.evaluation_id,
            self.decision.gate.label(),
            self.decision.rule.code()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationSection {
    pub topic: String,
    pub lines: Vec<String>,
}

/// Structured rationale for a stored evaluation. Rebuilt from the stored outcome, so two
/// calls for the same id return the same rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub evaluation_id: EvaluationId,
    pub evaluated_at: DateTime<Utc>,
    pub config_version: String,
    pub gate: Gate,
    pub rule: GateRule,
    pub rationale: Vec<ExplanationSection>,
}

impl Explanation {
    pub fn from_outcome(outcome: &EvaluationOutcome, evaluated_at: DateTime<Utc>) -> Self {
        let decision = &outcome.decision;
        let mut rationale = vec![section("decision", decision.reasoning.clone())];
        if !decision.hard_stops.is_empty() {
            rationale.push(section("hard_stops", decision.hard_stops.clone()));
        }
        if !decision.suggestions.is_empty() {
            rationale.push(section("suggestions", decision.suggestions.clone()));
        }

        let bureau = &outcome.bureau;
        let mut bureau_lines = vec![format!(
            "status {:?}, band {}",
            bureau.status,
            bureau.score_band.label()
        )];
        bureau_lines.extend(
            bureau
                .reasons
                .iter()
                .map(|reason| format!("{}: {}", reason.code, reason.description)),
        );
        if let Some(failure) = &bureau.failure {
            bureau_lines.push(format!("lookup failure recorded: {failure:?}"));
        }
        rationale.push(section("bureau", bureau_lines));

        rationale.push(section("behavioral", vec![outcome.behavioral.describe()]));

        let voice = &outcome.voice;
        let mut voice_lines = Vec::new();
        for (label, score) in [
            ("scientific", &voice.scientific_score),
            ("heuristic", &voice.heuristic_score),
        ] {
            match score {
                Some(score) => voice_lines.push(format!(
                    "{label}: {:.0} ({}), {} flag(s)",
                    score.total_score,
                    score.risk_level.label(),
                    score.red_flags.len()
                )),
                None => voice_lines.push(format!("{label}: unavailable")),
            }
        }
        voice_lines.push(format!(
            "agreement {}, reliability {:.2}",
            voice.consensus.agreement_level.label(),
            voice.engine_reliability.overall
        ));
        voice_lines.extend(
            voice
                .engine_failures
                .iter()
                .map(|failure| format!("engine failure: {}", failure.message)),
        );
        voice_lines.extend(voice.red_flags().iter().map(|flag| {
            format!(
                "{} {} on {}: {}",
                flag.severity.label(),
                flag.kind,
                flag.question_id,
                flag.reason
            )
        }));
        voice_lines.extend(voice.recommendations.iter().cloned());
        rationale.push(section("voice", voice_lines));

        if !outcome.consistency_flags.is_empty() {
            rationale.push(section(
                "consistency",
                outcome
                    .consistency_flags
                    .iter()
                    .map(|flag| format!("{} {}", flag.severity.label(), flag.describe()))
                    .collect(),
            ));
        }

        for classification in &outcome.evasion {
            let mut lines = vec![format!(
                "{} scored {:.0} ({})",
                classification.subtype.label(),
                classification.adjusted_score,
                classification.risk_level.label()
            )];
            lines.extend(classification.reasoning.iter().cloned());
            rationale.push(section(
                &format!("evasion:{}", classification.question_id),
                lines,
            ));
        }

        Self {
            evaluation_id: outcome.evaluation_id.clone(),
            evaluated_at,
            config_version: outcome.config_version.clone(),
            gate: decision.gate,
            rule: decision.rule,
            rationale,
        }
    }
}

fn section(topic: &str, lines: Vec<String>) -> ExplanationSection {
    ExplanationSection {
        topic: topic.to_string(),
        lines,
    }
}
