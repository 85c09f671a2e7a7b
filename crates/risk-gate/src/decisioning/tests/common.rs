use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::decisioning::bureau::{BureauClient, BureauPayload, BureauReason, BureauTransportError};
use crate::decisioning::catalog;
use crate::decisioning::config::DecisionConfig;
use crate::decisioning::consistency;
use crate::decisioning::domain::{
    DocumentIdentifier, DocumentKind, EngineKind, EngineScore, EvaluationId, EvaluationRequest,
    InterviewResponse, RedFlag, RiskLevel, Severity, SubjectId, VoiceFeatures, WordToken,
};
use crate::decisioning::engines::{EngineError, EngineInput, VoiceEngine};
use crate::decisioning::evasion;
use crate::decisioning::repository::{
    AlternateDataError, AlternateDataProvider, EvaluationRecord, EvaluationRepository,
    RepositoryError,
};
use crate::decisioning::service::RiskDecisionService;
use crate::decisioning::signals::DeclaredFinancials;
use crate::decisioning::store::ConfigStore;
use crate::decisioning::evaluation_router;

pub(super) const CONFIDENT_DENIAL: &str = "No pago nada. Eso no existe, nunca.";
pub(super) const NERVOUS_DENIAL: &str = "Eh, pues, este... no pago nada, eh, bueno";
pub(super) const CALCULATED_ANSWER: &str =
    "Honestamente, mi negocio es transparente y opero legalmente.";
pub(super) const HONEST_ADMISSION: &str =
    "Si, la verdad es que si pago algo, como doscientos a la semana, me da pena pero asi es la realidad";

pub(super) fn calm_voice(confidence_level: f64) -> VoiceFeatures {
    VoiceFeatures {
        pitch_variance: 0.1,
        speech_rate_change: 0.1,
        pause_frequency: 0.1,
        voice_tremor: 0.1,
        confidence_level,
    }
}

fn expected_ms(question_id: &str) -> u64 {
    catalog::find(question_id)
        .map(|question| u64::from(question.expected_response_ms))
        .unwrap_or(5000)
}

/// Numeric answer given at the expected pace with a calm voice.
pub(super) fn numeric(question_id: &str, value: &str) -> InterviewResponse {
    InterviewResponse {
        question_id: question_id.to_string(),
        declared_value: value.to_string(),
        response_time_ms: expected_ms(question_id),
        transcript_text: String::new(),
        stress_indicators: BTreeSet::new(),
        voice_features: Some(calm_voice(0.9)),
        words: Vec::new(),
    }
}

/// Narrative answer whose average confidence comes from the voice features.
pub(super) fn narrative(question_id: &str, transcript: &str, confidence: f64) -> InterviewResponse {
    InterviewResponse {
        question_id: question_id.to_string(),
        declared_value: String::new(),
        response_time_ms: expected_ms(question_id),
        transcript_text: transcript.to_string(),
        stress_indicators: BTreeSet::new(),
        voice_features: Some(calm_voice(confidence)),
        words: Vec::new(),
    }
}

/// Sensitive numeric answer ("informal_payments") carrying a spoken transcript.
pub(super) fn informal_payments(transcript: &str, confidence: f64) -> InterviewResponse {
    let mut response = narrative("informal_payments", transcript, confidence);
    response.declared_value = "0".to_string();
    response
}

pub(super) fn tokens(words: &[(&str, f64)]) -> Vec<WordToken> {
    words
        .iter()
        .enumerate()
        .map(|(index, (text, confidence))| WordToken {
            text: text.to_string(),
            start_ms: index as u64 * 400,
            end_ms: index as u64 * 400 + 350,
            confidence: *confidence,
        })
        .collect()
}

/// Internally coherent operator: 25 passengers x 15 fare x 2 trips = 750 declared income,
/// and 80 km a day costs about 274 in fuel under the default fuel model.
pub(super) fn clean_responses() -> Vec<InterviewResponse> {
    vec![
        numeric("daily_income", "750"),
        numeric("trips_per_day", "2"),
        numeric("passengers_per_trip", "25"),
        numeric("fare_per_passenger", "15"),
        numeric("km_per_trip", "40"),
        numeric("daily_fuel_cost", "275"),
    ]
}

pub(super) fn request() -> EvaluationRequest {
    EvaluationRequest {
        subject_id: SubjectId("subject-001".to_string()),
        documents: vec![DocumentIdentifier {
            kind: DocumentKind::NationalId,
            value: "GOMJ800101HDFRRN09".to_string(),
        }],
        responses: clean_responses(),
    }
}

pub(super) fn request_with(responses: Vec<InterviewResponse>) -> EvaluationRequest {
    EvaluationRequest {
        responses,
        ..request()
    }
}

/// Replaces (or adds) one answer in the clean interview.
pub(super) fn replace_response(
    mut responses: Vec<InterviewResponse>,
    replacement: InterviewResponse,
) -> Vec<InterviewResponse> {
    responses.retain(|response| response.question_id != replacement.question_id);
    responses.push(replacement);
    responses
}

pub(super) fn payload(score: u16, codes: &[&str]) -> BureauPayload {
    BureauPayload {
        score_raw: score,
        reasons: codes
            .iter()
            .map(|code| BureauReason {
                code: code.to_string(),
                description: format!("{code} reported by bureau"),
            })
            .collect(),
        reference_id: format!("bureau-ref-{score}"),
    }
}

pub(super) fn engine_input(responses: Vec<InterviewResponse>) -> EngineInput {
    let config = Arc::new(DecisionConfig::default());
    let financials = DeclaredFinancials::from_responses(&responses);
    let consistency_flags = consistency::validate(&financials, &config.consistency);
    let evasion = evasion::classify_sensitive(&responses);
    EngineInput {
        responses,
        financials,
        consistency_flags,
        evasion,
        config,
    }
}

pub(super) fn engine_score(total_score: f64, red_flags: Vec<RedFlag>) -> EngineScore {
    let config = DecisionConfig::default();
    EngineScore {
        total_score,
        risk_level: RiskLevel::from_score(total_score, &config.risk_bands),
        category_scores: BTreeMap::new(),
        red_flags,
        recommendations: Vec::new(),
        confidence: 0.8,
        processing_time_ms: 3,
    }
}

pub(super) fn red_flag(kind: &str, question_id: &str, impact: f64, severity: Severity) -> RedFlag {
    RedFlag {
        kind: kind.to_string(),
        question_id: question_id.to_string(),
        reason: format!("{kind} raised in test"),
        impact_weight: impact,
        severity,
    }
}

pub(super) struct StaticBureau {
    outcome: Result<Option<BureauPayload>, BureauTransportError>,
    delay: Option<Duration>,
}

impl StaticBureau {
    pub(super) fn found(score: u16, codes: &[&str]) -> Self {
        Self {
            outcome: Ok(Some(payload(score, codes))),
            delay: None,
        }
    }

    pub(super) fn not_found() -> Self {
        Self {
            outcome: Ok(None),
            delay: None,
        }
    }

    pub(super) fn failing() -> Self {
        Self {
            outcome: Err(BureauTransportError("connection reset by peer".to_string())),
            delay: None,
        }
    }

    pub(super) fn slow(score: u16, delay_ms: u64) -> Self {
        Self {
            outcome: Ok(Some(payload(score, &[]))),
            delay: Some(Duration::from_millis(delay_ms)),
        }
    }
}

impl BureauClient for StaticBureau {
    fn lookup(
        &self,
        _documents: &[DocumentIdentifier],
    ) -> Result<Option<BureauPayload>, BureauTransportError> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.outcome.clone()
    }
}

pub(super) struct FixedAlternateData(pub(super) Option<f64>);

impl AlternateDataProvider for FixedAlternateData {
    fn history_signal(&self, _subject: &SubjectId) -> Result<Option<f64>, AlternateDataError> {
        Ok(self.0)
    }
}

pub(super) struct FailingAlternateData;

impl AlternateDataProvider for FailingAlternateData {
    fn history_signal(&self, _subject: &SubjectId) -> Result<Option<f64>, AlternateDataError> {
        Err(AlternateDataError::Unavailable("history feed offline".to_string()))
    }
}

/// History feed that answers only after `delay_ms`.
pub(super) struct SlowAlternateData {
    pub(super) delay_ms: u64,
}

impl AlternateDataProvider for SlowAlternateData {
    fn history_signal(&self, _subject: &SubjectId) -> Result<Option<f64>, AlternateDataError> {
        std::thread::sleep(Duration::from_millis(self.delay_ms));
        Ok(Some(0.8))
    }
}

/// Engine that outlives any reasonable timeout.
pub(super) struct SlowEngine {
    pub(super) kind: EngineKind,
    pub(super) delay_ms: u64,
}

impl VoiceEngine for SlowEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn score(&self, _input: &EngineInput) -> Result<EngineScore, EngineError> {
        std::thread::sleep(Duration::from_millis(self.delay_ms));
        Ok(engine_score(900.0, Vec::new()))
    }
}

pub(super) struct FailingEngine(pub(super) EngineKind);

impl VoiceEngine for FailingEngine {
    fn kind(&self) -> EngineKind {
        self.0
    }

    fn score(&self, _input: &EngineInput) -> Result<EngineScore, EngineError> {
        Err(EngineError::Failed {
            engine: self.0,
            message: "model unavailable".to_string(),
        })
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<EvaluationId, EvaluationRecord>>>,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl EvaluationRepository for MemoryRepository {
    fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(record.evaluation_id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.evaluation_id().clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct ConflictRepository;

impl EvaluationRepository for ConflictRepository {
    fn insert(&self, _record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, _id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        Ok(None)
    }
}

pub(super) struct UnavailableRepository;

impl EvaluationRepository for UnavailableRepository {
    fn insert(&self, _record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) type TestService = RiskDecisionService<MemoryRepository, StaticBureau, FixedAlternateData>;

pub(super) fn build_service(bureau: StaticBureau) -> (TestService, Arc<MemoryRepository>) {
    build_service_with_config(bureau, DecisionConfig::default())
}

pub(super) fn build_service_with_config(
    bureau: StaticBureau,
    config: DecisionConfig,
) -> (TestService, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let store = Arc::new(ConfigStore::new(config).expect("test config validates"));
    let service = RiskDecisionService::new(
        store,
        repository.clone(),
        Arc::new(bureau),
        Arc::new(FixedAlternateData(Some(0.8))),
    );
    (service, repository)
}

pub(super) fn short_timeouts() -> DecisionConfig {
    let mut config = DecisionConfig::default();
    config.timeouts.bureau_ms = 50;
    config.timeouts.scientific_ms = 50;
    config.timeouts.heuristic_ms = 1000;
    config
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    evaluation_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
