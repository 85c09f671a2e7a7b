use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use super::behavioral::{self, BehavioralInputs};
use super::bureau::{self, BureauClient, BureauFailure, BureauLookup, BureauTransportError};
use super::config::{DecisionConfig, DecisionConfigError};
use super::consensus;
use super::consistency;
use super::domain::{
    DocumentIdentifier, EngineScore, EvaluationId, EvaluationRequest, SubjectId,
};
use super::engines::{EngineError, EngineInput, HeuristicEngine, ScientificEngine, VoiceEngine};
use super::evasion;
use super::gate::{self, GateEvidence, GateState, GateTransitionError};
use super::intake::{IntakeError, IntakeGuard};
use super::outcome::{EvaluationOutcome, Explanation};
use super::repository::{
    AlternateDataError, AlternateDataProvider, EvaluationRecord, EvaluationRepository,
    RepositoryError,
};
use super::signals::DeclaredFinancials;
use super::store::ConfigStore;

/// Service composing intake, the evidence pipeline, the gate, and persistence.
pub struct RiskDecisionService<R, B, D> {
    config: Arc<ConfigStore>,
    guard: IntakeGuard,
    repository: Arc<R>,
    bureau: Arc<B>,
    alternate_data: Arc<D>,
    scientific: Arc<dyn VoiceEngine>,
    heuristic: Arc<dyn VoiceEngine>,
    sequence: AtomicU64,
}

impl<R, B, D> RiskDecisionService<R, B, D>
where
    R: EvaluationRepository + 'static,
    B: BureauClient + 'static,
    D: AlternateDataProvider + 'static,
{
    pub fn new(
        config: Arc<ConfigStore>,
        repository: Arc<R>,
        bureau: Arc<B>,
        alternate_data: Arc<D>,
    ) -> Self {
        Self {
            config,
            guard: IntakeGuard,
            repository,
            bureau,
            alternate_data,
            scientific: Arc::new(ScientificEngine::new()),
            heuristic: Arc::new(HeuristicEngine::new()),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn with_scientific_engine(mut self, engine: Arc<dyn VoiceEngine>) -> Self {
        self.scientific = engine;
        self
    }

    pub fn with_heuristic_engine(mut self, engine: Arc<dyn VoiceEngine>) -> Self {
        self.heuristic = engine;
        self
    }

    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Validates and activates a new decision configuration. Evaluations already running
    /// keep the snapshot they started with.
    pub fn replace_config(
        &self,
        config: DecisionConfig,
    ) -> Result<Arc<DecisionConfig>, EvaluationServiceError> {
        Ok(self.config.replace(config)?)
    }

    fn next_evaluation_id(&self) -> EvaluationId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        EvaluationId(format!("eval-{id:06}"))
    }

    /// Runs one evaluation end to end and persists it under a fresh identifier.
    pub async fn evaluate(
        &self,
        request: EvaluationRequest,
    ) -> Result<EvaluationOutcome, EvaluationServiceError> {
        let config = self.config.current();
        let validated = self.guard.validate(request, &config)?;
        let state = GateState::Pending.start()?;
        let evaluation_id = self.next_evaluation_id();
        let request = validated.request();

        let financials = DeclaredFinancials::from_responses(&request.responses);
        let consistency_flags = consistency::validate(&financials, &config.consistency);
        let evasion = evasion::classify_sensitive(&request.responses);

        let input = Arc::new(EngineInput {
            responses: request.responses.clone(),
            financials,
            consistency_flags: consistency_flags.clone(),
            evasion: evasion.clone(),
            config: Arc::clone(&config),
        });

        let (lookup, scientific, heuristic) = tokio::join!(
            lookup_bureau(
                Arc::clone(&self.bureau),
                request.documents.clone(),
                config.timeouts.bureau_ms,
            ),
            run_engine(
                Arc::clone(&self.scientific),
                Arc::clone(&input),
                config.timeouts.scientific_ms,
            ),
            run_engine(
                Arc::clone(&self.heuristic),
                Arc::clone(&input),
                config.timeouts.heuristic_ms,
            ),
        );

        let bureau = bureau::normalize(lookup, &config.bureau);
        match &bureau.failure {
            Some(BureauFailure::Timeout { after_ms }) => warn!(
                evaluation_id = %evaluation_id,
                kind = "bureau_timeout",
                after_ms,
                "bureau lookup timed out; treated as not found"
            ),
            Some(BureauFailure::Transport { message }) => warn!(
                evaluation_id = %evaluation_id,
                kind = "bureau_transport",
                error = %message,
                "bureau lookup failed; treated as not found"
            ),
            None => {}
        }

        for error in [&scientific, &heuristic]
            .into_iter()
            .filter_map(|result| result.as_ref().err())
        {
            warn!(
                evaluation_id = %evaluation_id,
                engine = error.engine().label(),
                kind = error.kind(),
                error = %error,
                "voice engine degraded"
            );
        }
        let voice = consensus::reconcile(scientific, heuristic, &config.consensus);

        let alternate_data = match fetch_history(
            Arc::clone(&self.alternate_data),
            request.subject_id.clone(),
            config.timeouts.alternate_data_ms,
        )
        .await
        {
            Ok(signal) => signal,
            Err(error) => {
                warn!(
                    evaluation_id = %evaluation_id,
                    kind = "alternate_data",
                    error = %error,
                    "alternate data unavailable"
                );
                None
            }
        };

        let inputs = BehavioralInputs {
            bureau: bureau.normalized_score(&config.bureau),
            voice: voice.total_score().map(|score| score / 1000.0),
            alternate_data,
        };
        let behavioral = behavioral::aggregate(&inputs, &config);
        let behavioral = behavioral::apply_fallback(behavioral, &inputs, &config);

        let decision = gate::decide(
            &GateEvidence {
                bureau: &bureau,
                behavioral: &behavioral,
                voice: &voice,
                consistency_flags: &consistency_flags,
            },
            &config,
        );
        state.decide(decision.gate)?;

        let outcome = EvaluationOutcome {
            evaluation_id: evaluation_id.clone(),
            subject_id: request.subject_id.clone(),
            config_version: config.version.clone(),
            bureau,
            behavioral,
            partial: voice.partial,
            voice,
            consistency_flags,
            evasion,
            decision,
        };

        self.repository.insert(EvaluationRecord {
            request: validated.into_inner(),
            outcome: outcome.clone(),
            evaluated_at: Utc::now(),
        })?;

        info!(
            evaluation_id = %outcome.evaluation_id,
            subject_id = %outcome.subject_id,
            gate = outcome.decision.gate.label(),
            rule = outcome.decision.rule.code(),
            partial = outcome.partial,
            config_version = %outcome.config_version,
            "evaluation decided"
        );

        Ok(outcome)
    }

    /// Fetch a stored evaluation.
    pub fn get(&self, id: &EvaluationId) -> Result<EvaluationRecord, EvaluationServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn explain(&self, id: &EvaluationId) -> Result<Explanation, EvaluationServiceError> {
        Ok(self.get(id)?.explanation())
    }
}

async fn lookup_bureau<B>(
    client: Arc<B>,
    documents: Vec<DocumentIdentifier>,
    timeout_ms: u64,
) -> BureauLookup
where
    B: BureauClient + 'static,
{
    let task = tokio::task::spawn_blocking(move || client.lookup(&documents));
    match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
        Ok(Ok(Ok(Some(payload)))) => BureauLookup::Found(payload),
        Ok(Ok(Ok(None))) => BureauLookup::NotFound,
        Ok(Ok(Err(error))) => BureauLookup::Transport(error),
        Ok(Err(join_error)) => {
            BureauLookup::Transport(BureauTransportError(join_error.to_string()))
        }
        Err(_) => BureauLookup::TimedOut {
            after_ms: timeout_ms,
        },
    }
}

async fn fetch_history<D>(
    provider: Arc<D>,
    subject: SubjectId,
    timeout_ms: u64,
) -> Result<Option<f64>, AlternateDataError>
where
    D: AlternateDataProvider + 'static,
{
    let task = tokio::task::spawn_blocking(move || provider.history_signal(&subject));
    match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(AlternateDataError::Unavailable(join_error.to_string())),
        Err(_) => Err(AlternateDataError::TimedOut {
            after_ms: timeout_ms,
        }),
    }
}

async fn run_engine(
    engine: Arc<dyn VoiceEngine>,
    input: Arc<EngineInput>,
    timeout_ms: u64,
) -> Result<EngineScore, EngineError> {
    let kind = engine.kind();
    let task = tokio::task::spawn_blocking(move || engine.score(&input));
    match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(EngineError::Failed {
            engine: kind,
            message: join_error.to_string(),
        }),
        Err(_) => Err(EngineError::Timeout {
            engine: kind,
            after_ms: timeout_ms,
        }),
    }
}

/// Error raised by the risk decision service.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationServiceError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Config(#[from] DecisionConfigError),
    #[error(transparent)]
    Gate(#[from] GateTransitionError),
}
