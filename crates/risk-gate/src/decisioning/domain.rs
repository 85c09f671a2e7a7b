use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::RiskBands;

/// Identifier assigned to each evaluation; never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EvaluationId(pub String);

impl fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Applicant being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub String);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    NationalId,
    TaxId,
    VoterCard,
    Passport,
}

/// Document handed to the bureau client for subject lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentIdentifier {
    pub kind: DocumentKind,
    pub value: String,
}

/// Per-response acoustic features supplied by the transcription collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceFeatures {
    pub pitch_variance: f64,
    pub speech_rate_change: f64,
    pub pause_frequency: f64,
    pub voice_tremor: f64,
    pub confidence_level: f64,
}

impl VoiceFeatures {
    pub(crate) fn components(&self) -> [(&'static str, f64); 5] {
        [
            ("pitch_variance", self.pitch_variance),
            ("speech_rate_change", self.speech_rate_change),
            ("pause_frequency", self.pause_frequency),
            ("voice_tremor", self.voice_tremor),
            ("confidence_level", self.confidence_level),
        ]
    }

    /// Weighted nervousness load, 0 = composed and 1 = highly agitated.
    pub(crate) fn stress_load(&self) -> f64 {
        self.pitch_variance * 0.3
            + self.speech_rate_change * 0.25
            + self.pause_frequency * 0.25
            + self.voice_tremor * 0.2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordToken {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub confidence: f64,
}

/// One recorded interview answer. Immutable once captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewResponse {
    pub question_id: String,
    #[serde(default)]
    pub declared_value: String,
    pub response_time_ms: u64,
    #[serde(default)]
    pub transcript_text: String,
    #[serde(default)]
    pub stress_indicators: BTreeSet<String>,
    #[serde(default)]
    pub voice_features: Option<VoiceFeatures>,
    #[serde(default)]
    pub words: Vec<WordToken>,
}

impl InterviewResponse {
    /// Parses the declared value as a number, tolerating currency symbols and thousands separators.
    pub fn numeric_value(&self) -> Option<f64> {
        let cleaned: String = self
            .declared_value
            .trim()
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | ' '))
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        cleaned.parse::<f64>().ok()
    }
}

/// Inbound evaluation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub subject_id: SubjectId,
    pub documents: Vec<DocumentIdentifier>,
    pub responses: Vec<InterviewResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionCategory {
    BasicInfo,
    DailyOperation,
    OperationalCosts,
    BusinessStructure,
    Assets,
    CreditHistory,
    PaymentIntention,
    RiskEvaluation,
}

impl QuestionCategory {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionCategory::BasicInfo => "basic_info",
            QuestionCategory::DailyOperation => "daily_operation",
            QuestionCategory::OperationalCosts => "operational_costs",
            QuestionCategory::BusinessStructure => "business_structure",
            QuestionCategory::Assets => "assets",
            QuestionCategory::CreditHistory => "credit_history",
            QuestionCategory::PaymentIntention => "payment_intention",
            QuestionCategory::RiskEvaluation => "risk_evaluation",
        }
    }
}

/// Risk bucket shared by both voice engines and the evasion classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64, bands: &RiskBands) -> Self {
        if score >= bands.low {
            RiskLevel::Low
        } else if score >= bands.medium {
            RiskLevel::Medium
        } else if score >= bands.high {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    pub(crate) fn rank(&self) -> u8 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::High => 2,
            RiskLevel::Critical => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlag {
    #[serde(rename = "type")]
    pub kind: String,
    pub question_id: String,
    pub reason: String,
    pub impact_weight: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Scientific,
    Heuristic,
}

impl EngineKind {
    pub fn label(&self) -> &'static str {
        match self {
            EngineKind::Scientific => "scientific",
            EngineKind::Heuristic => "heuristic",
        }
    }
}

/// Output of a single voice engine for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineScore {
    pub total_score: f64,
    pub risk_level: RiskLevel,
    pub category_scores: BTreeMap<QuestionCategory, f64>,
    pub red_flags: Vec<RedFlag>,
    pub recommendations: Vec<String>,
    pub confidence: f64,
    pub processing_time_ms: u64,
}

impl EngineScore {
    pub fn worst_flag_severity(&self) -> Option<Severity> {
        self.red_flags.iter().map(|flag| flag.severity).max()
    }
}

pub(crate) fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decisioning::config::DecisionConfig;

    fn response(declared: &str) -> InterviewResponse {
        InterviewResponse {
            question_id: "daily_income".to_string(),
            declared_value: declared.to_string(),
            response_time_ms: 8000,
            transcript_text: String::new(),
            stress_indicators: BTreeSet::new(),
            voice_features: None,
            words: Vec::new(),
        }
    }

    #[test]
    fn numeric_value_tolerates_currency_formatting() {
        assert_eq!(response("$1,200").numeric_value(), Some(1200.0));
        assert_eq!(response(" 750.5 ").numeric_value(), Some(750.5));
        assert_eq!(response("mucho").numeric_value(), None);
        assert_eq!(response("").numeric_value(), None);
    }

    #[test]
    fn risk_level_uses_configured_bands() {
        let bands = DecisionConfig::default().risk_bands;
        assert_eq!(RiskLevel::from_score(750.0, &bands), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(749.0, &bands), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(550.0, &bands), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(350.0, &bands), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(349.9, &bands), RiskLevel::Critical);
    }

    #[test]
    fn red_flag_serializes_type_field() {
        let flag = RedFlag {
            kind: "EXTREME_RESPONSE_TIME".to_string(),
            question_id: "daily_income".to_string(),
            reason: "slow".to_string(),
            impact_weight: 6.0,
            severity: Severity::Medium,
        };
        let value = serde_json::to_value(&flag).expect("serializes");
        assert_eq!(value["type"], "EXTREME_RESPONSE_TIME");
        assert_eq!(value["severity"], "MEDIUM");
    }
}
