use super::common::*;
use crate::decisioning::config::DecisionConfig;
use crate::decisioning::consensus::{reconcile, AgreementLevel};
use crate::decisioning::domain::{EngineKind, RiskLevel, Severity};
use crate::decisioning::engines::EngineError;

fn bands() -> crate::decisioning::config::ConsensusBands {
    DecisionConfig::default().consensus
}

fn timeout(engine: EngineKind) -> EngineError {
    EngineError::Timeout {
        engine,
        after_ms: 2500,
    }
}

#[test]
fn close_scores_reach_high_agreement() {
    let mut heuristic = engine_score(830.0, Vec::new());
    heuristic.confidence = 0.75;
    let result = reconcile(Ok(engine_score(866.0, Vec::new())), Ok(heuristic), &bands());

    assert_eq!(result.consensus.agreement_level, AgreementLevel::High);
    assert_eq!(result.consensus.score_difference, Some(36.0));
    assert!(result.consensus.risk_level_agreement);
    assert_eq!(result.total_score(), Some(848.0));
    assert_eq!(result.risk_level(), Some(RiskLevel::Low));
    assert!((result.engine_reliability.overall - 0.775).abs() < 1e-9);
    let consolidated = result.consolidated_score.as_ref().expect("consolidated");
    assert!((consolidated.confidence - 0.775).abs() < 1e-9);
    assert!(!result.partial);
    assert!(result.engine_failures.is_empty());
}

#[test]
fn wider_gap_lowers_agreement_and_reliability() {
    let result = reconcile(
        Ok(engine_score(850.0, Vec::new())),
        Ok(engine_score(700.0, Vec::new())),
        &bands(),
    );
    assert_eq!(result.consensus.agreement_level, AgreementLevel::Medium);
    assert_eq!(result.risk_level(), Some(RiskLevel::Medium));
    assert!(!result.consensus.risk_level_agreement);
    assert!((result.engine_reliability.overall - 0.85 * 0.8).abs() < 1e-9);
}

#[test]
fn surviving_engine_stands_alone_when_the_other_times_out() {
    let survivor = engine_score(820.0, vec![red_flag(
        "EXTREME_RESPONSE_TIME",
        "trips_per_day",
        6.0,
        Severity::Medium,
    )]);
    let result = reconcile(
        Err(timeout(EngineKind::Scientific)),
        Ok(survivor.clone()),
        &bands(),
    );

    assert!(result.partial);
    assert!(result.scientific_score.is_none());
    assert_eq!(result.consensus.agreement_level, AgreementLevel::Low);
    assert_eq!(result.consensus.score_difference, None);
    assert_eq!(result.total_score(), Some(820.0));
    assert_eq!(result.red_flags(), survivor.red_flags.as_slice());
    assert_eq!(result.engine_failures.len(), 1);
    assert_eq!(result.engine_failures[0].engine, EngineKind::Scientific);
    assert_eq!(result.engine_failures[0].kind, "timeout");
    assert!((result.engine_reliability.overall - 0.65 * 0.4).abs() < 1e-9);
    assert!(result
        .recommendations
        .iter()
        .any(|note| note.contains("Only the heuristic engine completed")));
}

#[test]
fn no_surviving_engine_leaves_voice_unavailable() {
    let result = reconcile(
        Err(timeout(EngineKind::Scientific)),
        Err(EngineError::Failed {
            engine: EngineKind::Heuristic,
            message: "panicked".to_string(),
        }),
        &bands(),
    );
    assert!(result.partial);
    assert_eq!(result.total_score(), None);
    assert_eq!(result.risk_level(), None);
    assert!(result.red_flags().is_empty());
    assert_eq!(result.engine_failures.len(), 2);
    assert_eq!(result.engine_reliability.overall, 0.0);
}

#[test]
fn merged_flags_keep_the_stronger_duplicate() {
    let scientific = engine_score(
        600.0,
        vec![red_flag("STATISTICAL_OUTLIER", "daily_income", 7.0, Severity::Medium)],
    );
    let heuristic = engine_score(
        640.0,
        vec![
            red_flag("STATISTICAL_OUTLIER", "daily_income", 10.0, Severity::High),
            red_flag("INCOME_MISMATCH", "financial_consistency", 9.0, Severity::High),
        ],
    );
    let result = reconcile(Ok(scientific), Ok(heuristic), &bands());
    let flags = result.red_flags();
    assert_eq!(flags.len(), 2);
    assert_eq!(flags[0].impact_weight, 10.0);
    assert_eq!(flags[1].kind, "INCOME_MISMATCH");
}

#[test]
fn both_critical_requires_both_engines() {
    let both = reconcile(
        Ok(engine_score(200.0, Vec::new())),
        Ok(engine_score(300.0, Vec::new())),
        &bands(),
    );
    assert!(both.both_critical());
    assert_eq!(both.risk_level(), Some(RiskLevel::Critical));

    let single = reconcile(
        Ok(engine_score(200.0, Vec::new())),
        Err(timeout(EngineKind::Heuristic)),
        &bands(),
    );
    assert!(!single.both_critical());
}
