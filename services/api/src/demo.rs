use crate::infra::{
    load_bureau, load_config_store, load_history, CsvHistoryProvider, FixtureBureauClient,
    InMemoryEvaluationRepository,
};
use clap::Args;
use risk_gate::decisioning::{
    catalog, AlternateDataProvider, BureauClient, ConfigStore, DocumentIdentifier, DocumentKind,
    EvaluationOutcome, EvaluationRepository, EvaluationRequest, InterviewResponse,
    RiskDecisionService, SubjectId, VoiceFeatures,
};
use risk_gate::error::AppError;
use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// JSON file holding the evaluation request
    #[arg(long)]
    pub(crate) request: PathBuf,
    /// JSON bureau fixture keyed by document value
    #[arg(long)]
    pub(crate) bureau: Option<PathBuf>,
    /// CSV of `subject_id,signal` alternate-data history
    #[arg(long)]
    pub(crate) history: Option<PathBuf>,
    /// Decision configuration document (defaults to the built-in thresholds)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Print the structured explanation after the decision
    #[arg(long)]
    pub(crate) explain: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CheckConfigArgs {
    /// Decision configuration document to validate
    pub(crate) path: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the full explanation for every demo subject
    #[arg(long)]
    pub(crate) explain: bool,
}

pub(crate) async fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        request,
        bureau,
        history,
        config,
        explain,
    } = args;

    let raw = std::fs::read_to_string(&request)?;
    let request: EvaluationRequest = serde_json::from_str(&raw)
        .map_err(|err| AppError::Fixture(format!("invalid evaluation request: {err}")))?;

    let service = RiskDecisionService::new(
        Arc::new(load_config_store(config.as_deref())?),
        Arc::new(InMemoryEvaluationRepository::default()),
        Arc::new(load_bureau(bureau.as_deref())?),
        Arc::new(load_history(history.as_deref())?),
    );

    let outcome = service.evaluate(request).await?;
    render_outcome(&outcome);
    if explain {
        render_explanation(&service, &outcome)?;
    }
    Ok(())
}

pub(crate) fn run_check_config(args: CheckConfigArgs) -> Result<(), AppError> {
    let store = ConfigStore::from_path(&args.path)?;
    let config = store.current();
    println!(
        "Decision config {} is valid ({} required questions, hard-stop codes: {})",
        config.version,
        config.intake.required_questions.len(),
        config.bureau.hard_stop_codes.join(", ")
    );
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Risk decisioning demo");
    let service = demo_service()?;

    for (label, document) in DEMO_SUBJECTS {
        let outcome = service.evaluate(demo_request(document)).await?;
        println!("\n{label}");
        render_outcome(&outcome);
        if args.explain {
            render_explanation(&service, &outcome)?;
        }
    }

    Ok(())
}

const DEMO_SUBJECTS: [(&str, &str); 4] = [
    ("Established operator, clean bureau file", "DEMO-STRONG"),
    ("Recent credit inquiry on file", "DEMO-INQUIRY"),
    ("Band D with 90-day delinquency", "DEMO-DEFAULTED"),
    ("Subject unknown to the bureau", "DEMO-UNKNOWN"),
];

const DEMO_BUREAU: &str = r#"{
    "DEMO-STRONG": {"score_raw": 780, "reasons": [], "reference_id": "demo-780"},
    "DEMO-INQUIRY": {
        "score_raw": 650,
        "reasons": [{"code": "RECENT_INQUIRY", "description": "Credit inquiry in the last 30 days"}],
        "reference_id": "demo-650"
    },
    "DEMO-DEFAULTED": {
        "score_raw": 420,
        "reasons": [{"code": "MORA_90", "description": "Payment 90 days past due"}],
        "reference_id": "demo-420"
    }
}"#;

const DEMO_HISTORY: &str = "subject_id,signal
subject-DEMO-STRONG,0.85
subject-DEMO-INQUIRY,0.70
subject-DEMO-DEFAULTED,0.40
subject-DEMO-UNKNOWN,0.75
";

pub(crate) type DemoService =
    RiskDecisionService<InMemoryEvaluationRepository, FixtureBureauClient, CsvHistoryProvider>;

pub(crate) fn demo_service() -> Result<DemoService, AppError> {
    Ok(RiskDecisionService::new(
        Arc::new(ConfigStore::default()),
        Arc::new(InMemoryEvaluationRepository::default()),
        Arc::new(FixtureBureauClient::from_reader(Cursor::new(DEMO_BUREAU))?),
        Arc::new(CsvHistoryProvider::from_reader(Cursor::new(DEMO_HISTORY))?),
    ))
}

/// Coherent minibus operator: 25 passengers x 15 fare x 2 trips matches declared income.
pub(crate) fn demo_request(document: &str) -> EvaluationRequest {
    let answers = [
        ("daily_income", "750"),
        ("trips_per_day", "2"),
        ("passengers_per_trip", "25"),
        ("fare_per_passenger", "15"),
        ("km_per_trip", "40"),
        ("daily_fuel_cost", "275"),
    ];

    EvaluationRequest {
        subject_id: SubjectId(format!("subject-{document}")),
        documents: vec![DocumentIdentifier {
            kind: DocumentKind::NationalId,
            value: document.to_string(),
        }],
        responses: answers
            .iter()
            .map(|(question_id, value)| calm_answer(question_id, value))
            .collect(),
    }
}

fn calm_answer(question_id: &str, value: &str) -> InterviewResponse {
    InterviewResponse {
        question_id: question_id.to_string(),
        declared_value: value.to_string(),
        response_time_ms: catalog::find(question_id)
            .map_or(5_000, |question| u64::from(question.expected_response_ms)),
        transcript_text: String::new(),
        stress_indicators: BTreeSet::new(),
        voice_features: Some(VoiceFeatures {
            pitch_variance: 0.1,
            speech_rate_change: 0.1,
            pause_frequency: 0.1,
            voice_tremor: 0.1,
            confidence_level: 0.9,
        }),
        words: Vec::new(),
    }
}

fn render_outcome(outcome: &EvaluationOutcome) {
    let decision = &outcome.decision;
    println!(
        "- {} -> {} ({}) | config {}",
        outcome.evaluation_id,
        decision.gate.label(),
        decision.rule.code(),
        outcome.config_version
    );
    println!(
        "  Bureau: band {} | behavioral {} ({:.3}){}",
        outcome.bureau.score_band.label(),
        outcome.behavioral.category.label(),
        outcome.behavioral.risk_score01,
        if outcome.partial { " | partial voice evidence" } else { "" }
    );
    for line in &decision.reasoning {
        println!("  * {line}");
    }
    if !decision.hard_stops.is_empty() {
        println!("  Hard stops: {}", decision.hard_stops.join(", "));
    }
    for suggestion in &decision.suggestions {
        println!("  -> {suggestion}");
    }
}

fn render_explanation<R, B, D>(
    service: &RiskDecisionService<R, B, D>,
    outcome: &EvaluationOutcome,
) -> Result<(), AppError>
where
    R: EvaluationRepository + 'static,
    B: BureauClient + 'static,
    D: AlternateDataProvider + 'static,
{
    let explanation = service.explain(&outcome.evaluation_id)?;
    match serde_json::to_string_pretty(&explanation) {
        Ok(json) => println!("  Explanation:\n{json}"),
        Err(err) => println!("  Explanation unavailable: {err}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_gate::decisioning::{DecisionConfig, Gate, GateRule};

    #[tokio::test]
    async fn demo_subjects_cover_every_gate() {
        let service = demo_service().expect("demo fixtures load");
        let mut gates = Vec::new();
        for (_, document) in DEMO_SUBJECTS {
            let outcome = service
                .evaluate(demo_request(document))
                .await
                .expect("demo evaluation succeeds");
            gates.push((outcome.decision.gate, outcome.decision.rule));
        }

        assert_eq!(
            gates,
            vec![
                (Gate::Go, GateRule::Approval),
                (Gate::Review, GateRule::Mitigation),
                (Gate::NoGo, GateRule::HardStop),
                (Gate::Review, GateRule::BureauNotFound),
            ]
        );
    }

    #[test]
    fn check_config_accepts_valid_and_rejects_invalid_documents() {
        let dir = std::env::temp_dir();
        let valid = dir.join(format!("risk-gate-valid-{}.json", std::process::id()));
        let invalid = dir.join(format!("risk-gate-invalid-{}.json", std::process::id()));

        let mut config = DecisionConfig::default();
        std::fs::write(&valid, serde_json::to_vec(&config).expect("serialize")).expect("write");
        config.version = String::new();
        std::fs::write(&invalid, serde_json::to_vec(&config).expect("serialize")).expect("write");

        assert!(run_check_config(CheckConfigArgs { path: valid.clone() }).is_ok());
        assert!(matches!(
            run_check_config(CheckConfigArgs {
                path: invalid.clone()
            }),
            Err(AppError::DecisionConfig(_))
        ));

        let _ = std::fs::remove_file(valid);
        let _ = std::fs::remove_file(invalid);
    }
}
