//! Evasion subtype classification for answers on sensitive topics.
//!
//! The classifier is a fixed decision list evaluated top to bottom; the first predicate that
//! holds decides the subtype. Scores and risk levels are then derived per subtype.

use serde::{Deserialize, Serialize};

use super::catalog;
use super::domain::{InterviewResponse, RiskLevel};
use super::signals::Transcript;

const DIRECT_DENIALS: &[&str] = &["no pago nada", "no existe", "no se de que", "eso no pasa"];
const DEFLECTIONS: &[&str] = &["trabajo honestamente", "mi negocio es", "ese tipo de cosas"];
const ABSOLUTES: &[&str] = &["nada", "nunca", "jamas", "imposible"];
const VAGUE_REFERENCES: &[&str] = &["eso", "ese tipo", "esas cosas", "por ahi"];
const NERVOUS_FILLERS: &[&str] = &["eh", "pues", "este", "bueno"];
const ADMISSIONS: &[&str] = &["si pago", "pago algo", "un poquito", "pequena cantidad"];
const EMOTIONAL_QUALIFIERS: &[&str] = &[
    "me da pena",
    "me averguenza",
    "no me gusta",
    "asi es la realidad",
];
const QUALIFICATIONS: &[&str] = &["pero", "aunque", "sin embargo", "la verdad es"];
const SELF_CORRECTIONS: &[&str] = &["bueno", "mejor dicho", "o sea", "en realidad"];
const CALCULATED_LANGUAGE: &[&str] = &["honestamente", "transparente", "legalmente", "oficialmente"];
const NUMBER_WORDS: &[&str] = &[
    "uno", "dos", "tres", "cuatro", "cinco", "seis", "siete", "ocho", "nueve", "diez", "once",
    "doce", "quince", "veinte", "treinta", "cuarenta", "cincuenta", "sesenta", "setenta",
    "ochenta", "noventa", "cien", "ciento", "doscientos", "trescientos", "cuatrocientos",
    "quinientos", "mil",
];

const MIN_SCORE: f64 = 200.0;
const MAX_SCORE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvasionSubtype {
    HonestNervous,
    EvasiveNervous,
    EvasiveConfident,
    EvasiveCalculated,
    EvasiveGeneral,
}

impl EvasionSubtype {
    pub fn label(&self) -> &'static str {
        match self {
            EvasionSubtype::HonestNervous => "HONEST_NERVOUS",
            EvasionSubtype::EvasiveNervous => "EVASIVE_NERVOUS",
            EvasionSubtype::EvasiveConfident => "EVASIVE_CONFIDENT",
            EvasionSubtype::EvasiveCalculated => "EVASIVE_CALCULATED",
            EvasionSubtype::EvasiveGeneral => "EVASIVE_GENERAL",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            EvasionSubtype::HonestNervous => "nervous but admits and gives specifics",
            EvasionSubtype::EvasiveNervous => "evasion with visible nervousness",
            EvasionSubtype::EvasiveConfident => "firm, composed denial",
            EvasionSubtype::EvasiveCalculated => "prepared, defensive wording",
            EvasionSubtype::EvasiveGeneral => "evasive pattern without a specific profile",
        }
    }

    fn base_score(&self) -> f64 {
        match self {
            EvasionSubtype::HonestNervous => 650.0,
            EvasionSubtype::EvasiveNervous => 450.0,
            EvasionSubtype::EvasiveConfident => 300.0,
            EvasionSubtype::EvasiveCalculated => 250.0,
            EvasionSubtype::EvasiveGeneral => 500.0,
        }
    }

    /// Composed or prepared evasion is treated as critical no matter the numeric score.
    pub fn risk_level(&self, score: f64) -> RiskLevel {
        match self {
            EvasionSubtype::EvasiveConfident | EvasionSubtype::EvasiveCalculated => {
                RiskLevel::Critical
            }
            EvasionSubtype::HonestNervous if score >= 600.0 => RiskLevel::Medium,
            EvasionSubtype::HonestNervous => RiskLevel::High,
            EvasionSubtype::EvasiveNervous if score >= 400.0 => RiskLevel::High,
            EvasionSubtype::EvasiveNervous => RiskLevel::Critical,
            EvasionSubtype::EvasiveGeneral if score >= 700.0 => RiskLevel::Low,
            EvasionSubtype::EvasiveGeneral if score >= 550.0 => RiskLevel::Medium,
            EvasionSubtype::EvasiveGeneral if score >= 400.0 => RiskLevel::High,
            EvasionSubtype::EvasiveGeneral => RiskLevel::Critical,
        }
    }
}

/// Counted transcript features. Phrase lists count distinct phrases present; fillers,
/// repetitions, and numeric mentions count occurrences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvasionSignals {
    pub avg_confidence: f64,
    pub confidence_variance: f64,
    pub direct_denials: usize,
    pub deflections: usize,
    pub absolute_statements: usize,
    pub vague_references: usize,
    pub nervous_fillers: usize,
    pub repetitions: usize,
    pub admissions: usize,
    pub specific_numbers: usize,
    pub emotional_qualifiers: usize,
    pub qualifications: usize,
    pub self_corrections: usize,
    pub calculated_language: usize,
}

impl EvasionSignals {
    pub fn extract(response: &InterviewResponse) -> Self {
        let transcript = Transcript::from_response(response);
        let (avg_confidence, confidence_variance) = confidence_stats(response);

        Self {
            avg_confidence,
            confidence_variance,
            direct_denials: transcript.count_present(DIRECT_DENIALS),
            deflections: transcript.count_present(DEFLECTIONS),
            absolute_statements: transcript.count_present(ABSOLUTES),
            vague_references: transcript.count_present(VAGUE_REFERENCES),
            nervous_fillers: transcript.count_occurrences(NERVOUS_FILLERS),
            repetitions: transcript.repetitions(),
            admissions: transcript.count_present(ADMISSIONS),
            specific_numbers: count_numeric_mentions(&transcript),
            emotional_qualifiers: transcript.count_present(EMOTIONAL_QUALIFIERS),
            qualifications: transcript.count_present(QUALIFICATIONS),
            self_corrections: transcript.count_present(SELF_CORRECTIONS),
            calculated_language: transcript.count_present(CALCULATED_LANGUAGE),
        }
    }

    pub fn honesty_total(&self) -> usize {
        self.admissions
            + self.specific_numbers
            + self.emotional_qualifiers
            + self.qualifications
            + self.self_corrections
    }
}

fn confidence_stats(response: &InterviewResponse) -> (f64, f64) {
    if response.words.is_empty() {
        let fallback = response
            .voice_features
            .map(|features| features.confidence_level)
            .unwrap_or(0.0);
        return (fallback, 0.0);
    }

    let count = response.words.len() as f64;
    let mean = response.words.iter().map(|token| token.confidence).sum::<f64>() / count;
    let variance = response
        .words
        .iter()
        .map(|token| (token.confidence - mean).powi(2))
        .sum::<f64>()
        / count;
    (mean, variance)
}

fn count_numeric_mentions(transcript: &Transcript) -> usize {
    transcript
        .words()
        .iter()
        .filter(|word| {
            word.chars().all(|c| c.is_ascii_digit()) || NUMBER_WORDS.contains(&word.as_str())
        })
        .count()
}

pub(crate) type Predicate = fn(&EvasionSignals) -> bool;

pub(crate) fn admits_with_detail(signals: &EvasionSignals) -> bool {
    signals.admissions > 0 && signals.honesty_total() >= 3
}

pub(crate) fn prepared_language(signals: &EvasionSignals) -> bool {
    signals.calculated_language >= 2
        || (signals.avg_confidence > 0.90 && signals.calculated_language >= 1)
}

pub(crate) fn composed_denial(signals: &EvasionSignals) -> bool {
    signals.direct_denials >= 2 && signals.avg_confidence > 0.85 && signals.nervous_fillers <= 2
}

pub(crate) fn nervous_denial(signals: &EvasionSignals) -> bool {
    signals.direct_denials >= 1 && signals.nervous_fillers >= 4 && signals.avg_confidence < 0.80
}

/// Ordered `(rule, predicate, subtype)` list; first match wins, EVASIVE_GENERAL otherwise.
pub(crate) const DECISION_LIST: &[(&str, Predicate, EvasionSubtype)] = &[
    (
        "admission present with honesty indicators >= 3",
        admits_with_detail,
        EvasionSubtype::HonestNervous,
    ),
    (
        "calculated language >= 2, or >= 1 with avg confidence > 0.90",
        prepared_language,
        EvasionSubtype::EvasiveCalculated,
    ),
    (
        "direct denials >= 2 with avg confidence > 0.85 and fillers <= 2",
        composed_denial,
        EvasionSubtype::EvasiveConfident,
    ),
    (
        "direct denial with fillers >= 4 and avg confidence < 0.80",
        nervous_denial,
        EvasionSubtype::EvasiveNervous,
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvasionClassification {
    pub question_id: String,
    pub subtype: EvasionSubtype,
    pub adjusted_score: f64,
    pub risk_level: RiskLevel,
    pub reasoning: Vec<String>,
    pub signals: EvasionSignals,
}

pub fn classify(response: &InterviewResponse) -> EvasionClassification {
    let signals = EvasionSignals::extract(response);

    let matched = DECISION_LIST
        .iter()
        .find(|(_, predicate, _)| predicate(&signals));
    let (subtype, rule) = match matched {
        Some((rule, _, subtype)) => (*subtype, *rule),
        None => (EvasionSubtype::EvasiveGeneral, "no earlier rule matched"),
    };

    let adjusted_score = adjusted_score(subtype, &signals);
    let risk_level = subtype.risk_level(adjusted_score);
    let reasoning = reasoning(subtype, rule, &signals);

    EvasionClassification {
        question_id: response.question_id.clone(),
        subtype,
        adjusted_score,
        risk_level,
        reasoning,
        signals,
    }
}

/// Classifies every answered sensitive-topic question that carries transcript content.
pub fn classify_sensitive(responses: &[InterviewResponse]) -> Vec<EvasionClassification> {
    responses
        .iter()
        .filter(|response| {
            catalog::find(&response.question_id)
                .map(|question| question.sensitive)
                .unwrap_or(false)
        })
        .filter(|response| !Transcript::from_response(response).is_empty())
        .map(classify)
        .collect()
}

pub(crate) fn adjusted_score(subtype: EvasionSubtype, signals: &EvasionSignals) -> f64 {
    let denials = signals.direct_denials as f64;
    let delta = match subtype {
        EvasionSubtype::HonestNervous => {
            30.0 * signals.specific_numbers as f64 + 20.0 * signals.emotional_qualifiers as f64
        }
        EvasionSubtype::EvasiveNervous => {
            let composure = (20.0 - 3.0 * signals.nervous_fillers as f64).max(0.0);
            -40.0 * denials + composure
        }
        EvasionSubtype::EvasiveConfident => {
            let polish = if signals.avg_confidence > 0.90 { 50.0 } else { 0.0 };
            -60.0 * denials - 30.0 * signals.absolute_statements as f64 - polish
        }
        EvasionSubtype::EvasiveCalculated => -70.0 * signals.deflections as f64 - 100.0,
        EvasionSubtype::EvasiveGeneral => -50.0 * denials,
    };
    (subtype.base_score() + delta).round().clamp(MIN_SCORE, MAX_SCORE)
}

fn reasoning(subtype: EvasionSubtype, rule: &str, signals: &EvasionSignals) -> Vec<String> {
    let mut reasons = vec![
        format!("{}: {}", subtype.label(), subtype.description()),
        format!("matched rule: {rule}"),
        format!(
            "average token confidence {:.2} (variance {:.4})",
            signals.avg_confidence, signals.confidence_variance
        ),
    ];

    let counted = [
        ("admission phrases", signals.admissions),
        ("specific numeric mentions", signals.specific_numbers),
        ("emotional qualifiers", signals.emotional_qualifiers),
        ("explicit qualifications", signals.qualifications),
        ("self-corrections", signals.self_corrections),
        ("direct denials", signals.direct_denials),
        ("deflections", signals.deflections),
        ("absolute statements", signals.absolute_statements),
        ("vague references", signals.vague_references),
        ("nervous fillers", signals.nervous_fillers),
        ("lexical repetitions", signals.repetitions),
        ("calculated language", signals.calculated_language),
    ];
    reasons.extend(
        counted
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(label, count)| format!("{label}: {count}")),
    );

    if matches!(
        subtype,
        EvasionSubtype::EvasiveConfident | EvasionSubtype::EvasiveCalculated
    ) {
        reasons.push("composed or prepared evasion is always CRITICAL".to_string());
    }
    reasons
}
