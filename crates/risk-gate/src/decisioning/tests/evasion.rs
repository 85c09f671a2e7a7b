use super::common::*;
use crate::decisioning::domain::RiskLevel;
use crate::decisioning::evasion::{classify, classify_sensitive, EvasionSignals, EvasionSubtype};

#[test]
fn composed_denial_is_confident_and_critical() {
    let result = classify(&informal_payments(CONFIDENT_DENIAL, 0.95));
    assert_eq!(result.subtype, EvasionSubtype::EvasiveConfident);
    assert_eq!(result.signals.direct_denials, 2);
    assert_eq!(result.signals.absolute_statements, 2);
    assert_eq!(result.adjusted_score, 200.0);
    assert_eq!(result.risk_level, RiskLevel::Critical);
    assert!(result
        .reasoning
        .iter()
        .any(|line| line.contains("always CRITICAL")));
}

#[test]
fn denial_with_fillers_is_nervous() {
    let result = classify(&informal_payments(NERVOUS_DENIAL, 0.7));
    assert_eq!(result.subtype, EvasionSubtype::EvasiveNervous);
    assert_eq!(result.signals.nervous_fillers, 5);
    assert_eq!(result.adjusted_score, 415.0);
    assert_eq!(result.risk_level, RiskLevel::High);
}

#[test]
fn prepared_wording_is_calculated() {
    let result = classify(&narrative("union_relations", CALCULATED_ANSWER, 0.8));
    assert_eq!(result.subtype, EvasionSubtype::EvasiveCalculated);
    assert_eq!(result.signals.calculated_language, 3);
    assert_eq!(result.signals.deflections, 1);
    assert_eq!(result.adjusted_score, 200.0);
    assert_eq!(result.risk_level, RiskLevel::Critical);
}

#[test]
fn admission_with_detail_is_honest_nervous() {
    let result = classify(&informal_payments(HONEST_ADMISSION, 0.6));
    assert_eq!(result.subtype, EvasionSubtype::HonestNervous);
    assert_eq!(result.signals.admissions, 2);
    assert_eq!(result.signals.specific_numbers, 1);
    assert_eq!(result.signals.emotional_qualifiers, 2);
    assert_eq!(result.adjusted_score, 720.0);
    assert_eq!(result.risk_level, RiskLevel::Medium);
}

#[test]
fn unmatched_evasion_falls_back_to_general() {
    let result = classify(&narrative("informal_lenders", "No se de que habla", 0.8));
    assert_eq!(result.subtype, EvasionSubtype::EvasiveGeneral);
    assert_eq!(result.adjusted_score, 450.0);
    assert_eq!(result.risk_level, RiskLevel::High);
    assert!(result
        .reasoning
        .iter()
        .any(|line| line.contains("no earlier rule matched")));
}

#[test]
fn honesty_rule_takes_precedence_over_calculated_language() {
    let transcript = "Honestamente si pago algo, como cien, pero me da pena";
    let result = classify(&informal_payments(transcript, 0.95));
    assert_eq!(result.signals.calculated_language, 1);
    assert_eq!(result.subtype, EvasionSubtype::HonestNervous);
}

#[test]
fn token_confidence_drives_average_and_variance() {
    let mut response = informal_payments("", 0.2);
    response.words = tokens(&[("no", 0.9), ("pago", 0.7)]);
    let signals = EvasionSignals::extract(&response);
    assert!((signals.avg_confidence - 0.8).abs() < 1e-9);
    assert!((signals.confidence_variance - 0.01).abs() < 1e-9);

    let mut silent = informal_payments("no pago nada", 0.0);
    silent.voice_features = None;
    assert_eq!(EvasionSignals::extract(&silent).avg_confidence, 0.0);
}

#[test]
fn only_sensitive_answers_with_transcripts_are_classified() {
    let mut responses = clean_responses();
    responses.push(narrative("route_name", "no pago nada", 0.9));
    responses.push(informal_payments(CONFIDENT_DENIAL, 0.95));
    responses.push(narrative("union_relations", "", 0.9));

    let classified = classify_sensitive(&responses);
    assert_eq!(classified.len(), 1);
    assert_eq!(classified[0].question_id, "informal_payments");
}
