//! Final GO / REVIEW / NO-GO decision over all collected evidence.

use serde::{Deserialize, Serialize};

use super::behavioral::{BehavioralCategory, BehavioralResult};
use super::bureau::{BureauResult, ScoreBand};
use super::config::DecisionConfig;
use super::consensus::ConsolidatedVoiceResult;
use super::consistency::ConsistencyFlag;
use super::domain::{RiskLevel, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gate {
    #[serde(rename = "GO")]
    Go,
    #[serde(rename = "REVIEW")]
    Review,
    #[serde(rename = "NO-GO")]
    NoGo,
}

impl Gate {
    pub fn label(&self) -> &'static str {
        match self {
            Gate::Go => "GO",
            Gate::Review => "REVIEW",
            Gate::NoGo => "NO-GO",
        }
    }
}

/// Lifecycle of one evaluation's gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "gate", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateState {
    Pending,
    Evaluating,
    Decided(Gate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("gate cannot move from {from:?} to {to:?}")]
pub struct GateTransitionError {
    pub from: GateState,
    pub to: GateState,
}

impl GateState {
    pub fn start(self) -> Result<GateState, GateTransitionError> {
        match self {
            GateState::Pending => Ok(GateState::Evaluating),
            from => Err(GateTransitionError {
                from,
                to: GateState::Evaluating,
            }),
        }
    }

    /// Terminal states are final; a correction requires a new evaluation.
    pub fn decide(self, gate: Gate) -> Result<GateState, GateTransitionError> {
        match self {
            GateState::Evaluating => Ok(GateState::Decided(gate)),
            from => Err(GateTransitionError {
                from,
                to: GateState::Decided(gate),
            }),
        }
    }
}

/// Which rule of the ordered rule list produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateRule {
    HardStop,
    BureauNotFound,
    Mitigation,
    Approval,
    DefaultReview,
}

impl GateRule {
    pub fn code(&self) -> &'static str {
        match self {
            GateRule::HardStop => "HARD_STOP",
            GateRule::BureauNotFound => "BUREAU_NOT_FOUND",
            GateRule::Mitigation => "MITIGATION",
            GateRule::Approval => "APPROVAL",
            GateRule::DefaultReview => "DEFAULT_REVIEW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub gate: Gate,
    pub hard_stops: Vec<String>,
    pub suggestions: Vec<String>,
    pub reasoning: Vec<String>,
    pub rule: GateRule,
}

/// Borrowed view of the evidence the gate reads.
#[derive(Debug, Clone, Copy)]
pub struct GateEvidence<'a> {
    pub bureau: &'a BureauResult,
    pub behavioral: &'a BehavioralResult,
    pub voice: &'a ConsolidatedVoiceResult,
    pub consistency_flags: &'a [ConsistencyFlag],
}

#[derive(Debug, Clone, PartialEq)]
struct HardStopFinding {
    code: String,
    detail: String,
}

/// Applies the ordered rules. Pure: identical evidence and configuration always yield the
/// same decision.
pub fn decide(evidence: &GateEvidence<'_>, config: &DecisionConfig) -> Decision {
    let mut reasoning = context_lines(evidence);
    let findings = hard_stop_findings(evidence, config);
    let bureau_found = evidence.bureau.is_found();
    let mitigations = &config.mitigations;

    if bureau_found && !findings.is_empty() {
        reasoning.extend(findings.iter().map(|finding| finding.detail.clone()));
        reasoning.push("hard stop: rejection is mandatory".to_string());
        return Decision {
            gate: Gate::NoGo,
            hard_stops: findings.into_iter().map(|finding| finding.code).collect(),
            suggestions: mitigations.alternative_paths.clone(),
            reasoning,
            rule: GateRule::HardStop,
        };
    }

    if !bureau_found {
        let mut suggestions = mitigations.bureau_fallback.clone();
        if findings.is_empty() {
            reasoning.push("bureau record not found: supplementary evidence required".to_string());
        } else {
            reasoning.extend(findings.iter().map(|finding| {
                format!("{} (escalated; no bureau record to confirm)", finding.detail)
            }));
            reasoning.push(
                "bureau record not found: hard-stop findings escalated for analyst review"
                    .to_string(),
            );
            extend_unique(&mut suggestions, &mitigations.escalation);
        }
        return Decision {
            gate: Gate::Review,
            hard_stops: Vec::new(),
            suggestions,
            reasoning,
            rule: GateRule::BureauNotFound,
        };
    }

    let behavioral = evidence.behavioral.category;
    let voice_level = evidence.voice.risk_level();

    if behavioral == BehavioralCategory::Medium
        || matches!(voice_level, Some(RiskLevel::Medium | RiskLevel::High))
    {
        let mut suggestions = mitigations.review.clone();
        for code in evidence.bureau.reason_codes() {
            if let Some(extra) = mitigations.by_reason.get(code) {
                extend_unique(&mut suggestions, extra);
            }
        }
        reasoning.push(format!(
            "mitigable risk: behavioral {}, voice {}",
            behavioral.label(),
            voice_level.map_or("unavailable", |level| level.label())
        ));
        return Decision {
            gate: Gate::Review,
            hard_stops: Vec::new(),
            suggestions,
            reasoning,
            rule: GateRule::Mitigation,
        };
    }

    let flagged = worst_flag(evidence);
    if behavioral == BehavioralCategory::Low
        && voice_level == Some(RiskLevel::Low)
        && !evidence.voice.partial
        && flagged.map_or(true, |severity| severity < Severity::Medium)
    {
        reasoning.push("all evidence within approval thresholds".to_string());
        return Decision {
            gate: Gate::Go,
            hard_stops: Vec::new(),
            suggestions: Vec::new(),
            reasoning,
            rule: GateRule::Approval,
        };
    }

    reasoning.push(format!(
        "no approval rule satisfied (behavioral {}, voice {}, partial voice {}, worst flag {})",
        behavioral.label(),
        voice_level.map_or("unavailable", |level| level.label()),
        evidence.voice.partial,
        flagged.map_or("none", |severity| severity.label())
    ));
    Decision {
        gate: Gate::Review,
        hard_stops: Vec::new(),
        suggestions: mitigations.default_review.clone(),
        reasoning,
        rule: GateRule::DefaultReview,
    }
}

fn context_lines(evidence: &GateEvidence<'_>) -> Vec<String> {
    let bureau = evidence.bureau;
    let bureau_line = match bureau.score_raw {
        Some(score) if bureau.is_found() => format!(
            "bureau OK: score {score}, band {}{}",
            bureau.score_band.label(),
            if bureau.reasons.is_empty() {
                String::new()
            } else {
                format!(
                    ", reasons {}",
                    bureau.reason_codes().collect::<Vec<_>>().join(", ")
                )
            }
        ),
        _ => "bureau NOT_FOUND".to_string(),
    };

    let voice = evidence.voice;
    let voice_line = match (voice.total_score(), voice.risk_level()) {
        (Some(score), Some(level)) => format!(
            "voice {} score {:.0}, agreement {}{}",
            level.label(),
            score,
            voice.consensus.agreement_level.label(),
            if voice.partial { ", partial" } else { "" }
        ),
        _ => "voice unavailable".to_string(),
    };

    vec![bureau_line, evidence.behavioral.describe(), voice_line]
}

fn hard_stop_findings(evidence: &GateEvidence<'_>, config: &DecisionConfig) -> Vec<HardStopFinding> {
    let mut findings = Vec::new();

    for flag in evidence.consistency_flags {
        if flag.severity == Severity::High {
            findings.push(HardStopFinding {
                code: format!("CONSISTENCY_{}", flag.rule.code()),
                detail: format!("hard stop: {}", flag.describe()),
            });
        }
    }

    for flag in evidence.voice.red_flags() {
        if flag.severity == Severity::High && flag.impact_weight >= config.gate.hard_stop_min_impact
        {
            findings.push(HardStopFinding {
                code: format!("VOICE_{}:{}", flag.kind, flag.question_id),
                detail: format!(
                    "hard stop: voice flag {} on {} (impact {:.0}): {}",
                    flag.kind, flag.question_id, flag.impact_weight, flag.reason
                ),
            });
        }
    }

    if evidence.voice.both_critical() {
        findings.push(HardStopFinding {
            code: "VOICE_CRITICAL_CONSENSUS".to_string(),
            detail: "hard stop: both voice engines rate the interview CRITICAL".to_string(),
        });
    }

    let bureau = evidence.bureau;
    if bureau.is_found() && bureau.score_band == ScoreBand::D {
        for code in bureau.reason_codes() {
            if config.is_hard_stop_code(code) {
                findings.push(HardStopFinding {
                    code: code.to_string(),
                    detail: format!("hard stop: bureau band D with reason {code}"),
                });
            }
        }
    }

    findings
}

fn worst_flag(evidence: &GateEvidence<'_>) -> Option<Severity> {
    let voice = evidence.voice.red_flags().iter().map(|flag| flag.severity);
    let consistency = evidence.consistency_flags.iter().map(|flag| flag.severity);
    voice.chain(consistency).max()
}

fn extend_unique(target: &mut Vec<String>, extra: &[String]) {
    for item in extra {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}
