use super::common::*;
use crate::decisioning::domain::{EngineKind, RiskLevel, Severity};
use crate::decisioning::engines::{EngineError, HeuristicEngine, ScientificEngine, VoiceEngine};

#[test]
fn coherent_interview_scores_low_risk_on_both_engines() {
    let input = engine_input(clean_responses());

    let scientific = ScientificEngine::new()
        .score(&input)
        .expect("scientific engine scores");
    assert!(scientific.total_score >= 750.0, "got {}", scientific.total_score);
    assert_eq!(scientific.risk_level, RiskLevel::Low);
    assert!(scientific.red_flags.is_empty());
    assert!((scientific.confidence - 0.95).abs() < 1e-9);

    let heuristic = HeuristicEngine::new()
        .score(&input)
        .expect("heuristic engine scores");
    assert!(heuristic.total_score >= 750.0, "got {}", heuristic.total_score);
    assert_eq!(heuristic.risk_level, RiskLevel::Low);
    assert!(heuristic.red_flags.is_empty());
    assert_eq!(heuristic.confidence, 0.75);
}

#[test]
fn engines_are_deterministic_over_the_same_input() {
    let input = engine_input(clean_responses());
    for engine in [
        &ScientificEngine::new() as &dyn VoiceEngine,
        &HeuristicEngine::new() as &dyn VoiceEngine,
    ] {
        let first = engine.score(&input).expect("first run");
        let second = engine.score(&input).expect("second run");
        assert_eq!(first.total_score, second.total_score);
        assert_eq!(first.category_scores, second.category_scores);
        assert_eq!(first.red_flags, second.red_flags);
    }
}

#[test]
fn scientific_flags_unaffordable_payment_capacity() {
    let mut responses = replace_response(clean_responses(), numeric("daily_income", "100"));
    responses = replace_response(responses, numeric("passengers_per_trip", "5"));
    responses = replace_response(responses, numeric("fare_per_passenger", "10"));
    responses.push(numeric("weekly_payment_capacity", "500"));

    let score = ScientificEngine::new()
        .score(&engine_input(responses))
        .expect("scientific engine scores");
    let impossibility = score
        .red_flags
        .iter()
        .find(|flag| flag.kind == "MATHEMATICAL_IMPOSSIBILITY")
        .expect("impossibility flagged");
    assert_eq!(impossibility.question_id, "weekly_payment_capacity");
    assert_eq!(impossibility.severity, Severity::High);
    assert_eq!(impossibility.impact_weight, 9.0);
    assert!(score
        .recommendations
        .iter()
        .any(|note| note.contains("Mathematical inconsistencies")));
}

#[test]
fn scientific_fails_without_catalog_answers() {
    let mut stray = numeric("daily_income", "750");
    stray.question_id = "not_in_battery".to_string();
    let error = ScientificEngine::new()
        .score(&engine_input(vec![stray]))
        .expect_err("nothing to score");
    assert!(matches!(
        error,
        EngineError::Failed {
            engine: EngineKind::Scientific,
            ..
        }
    ));
}

#[test]
fn heuristic_turns_critical_evasion_into_high_flag() {
    let mut responses = clean_responses();
    responses.push(informal_payments(CONFIDENT_DENIAL, 0.95));

    let score = HeuristicEngine::new()
        .score(&engine_input(responses))
        .expect("heuristic engine scores");
    let flag = score
        .red_flags
        .iter()
        .find(|flag| flag.kind == "EVASIVE_CONFIDENT")
        .expect("evasion flag raised");
    assert_eq!(flag.question_id, "informal_payments");
    assert_eq!(flag.severity, Severity::High);
    assert_eq!(flag.impact_weight, 10.0);
}

#[test]
fn heuristic_reports_consistency_findings() {
    let responses = replace_response(clean_responses(), numeric("daily_income", "2000"));
    let score = HeuristicEngine::new()
        .score(&engine_input(responses))
        .expect("heuristic engine scores");
    let flag = score
        .red_flags
        .iter()
        .find(|flag| flag.kind == "INCOME_MISMATCH")
        .expect("consistency flag raised");
    assert_eq!(flag.question_id, "financial_consistency");
    assert_eq!(flag.severity, Severity::High);
    assert_eq!(flag.impact_weight, 9.0);
}

#[test]
fn heuristic_flags_extreme_response_times() {
    let mut slow = numeric("trips_per_day", "2");
    slow.response_time_ms = 20_000;
    let responses = replace_response(clean_responses(), slow);

    let score = HeuristicEngine::new()
        .score(&engine_input(responses))
        .expect("heuristic engine scores");
    assert!(score
        .red_flags
        .iter()
        .any(|flag| flag.kind == "EXTREME_RESPONSE_TIME" && flag.question_id == "trips_per_day"));
}

#[test]
fn evasive_answers_pull_heuristic_score_down() {
    let input = engine_input(clean_responses());
    let baseline = HeuristicEngine::new().score(&input).expect("baseline");

    let mut responses = clean_responses();
    responses.push(informal_payments(CONFIDENT_DENIAL, 0.95));
    let evasive = HeuristicEngine::new()
        .score(&engine_input(responses))
        .expect("evasive run");

    assert!(evasive.total_score < baseline.total_score);
}
