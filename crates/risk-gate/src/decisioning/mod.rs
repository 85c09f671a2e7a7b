//! Risk decisioning: intake, bureau and interview evidence, voice consensus, behavioral
//! aggregation, and the GO / REVIEW / NO-GO gate.
//!
//! Evidence flows one way. Intake produces a validated request, the bureau adapter and both
//! voice engines run concurrently against it, and the gate reads the collected results once.

pub mod behavioral;
pub mod bureau;
pub mod catalog;
pub mod config;
pub mod consensus;
pub mod consistency;
pub mod domain;
pub mod engines;
pub mod evasion;
pub mod gate;
pub(crate) mod intake;
pub mod outcome;
pub mod repository;
pub mod router;
pub mod service;
pub mod signals;
pub mod store;

#[cfg(test)]
mod tests;

pub use behavioral::{BehavioralCategory, BehavioralInputs, BehavioralResult, Factor, Impact};
pub use bureau::{
    BureauClient, BureauLookup, BureauPayload, BureauReason, BureauResult, BureauStatus,
    BureauTransportError, ScoreBand,
};
pub use config::{DecisionConfig, DecisionConfigError};
pub use consensus::{AgreementLevel, ConsolidatedVoiceResult};
pub use consistency::{ConsistencyFlag, ConsistencyRule};
pub use domain::{
    DocumentIdentifier, DocumentKind, EngineKind, EngineScore, EvaluationId, EvaluationRequest,
    InterviewResponse, QuestionCategory, RedFlag, RiskLevel, Severity, SubjectId,
    VoiceFeatures, WordToken,
};
pub use engines::{EngineError, EngineInput, HeuristicEngine, ScientificEngine, VoiceEngine};
pub use evasion::{EvasionClassification, EvasionSubtype};
pub use gate::{Decision, Gate, GateRule, GateState};
pub use intake::IntakeError;
pub use outcome::{EvaluationOutcome, Explanation, ExplanationSection};
pub use repository::{
    AlternateDataError, AlternateDataProvider, EvaluationRecord, EvaluationRepository,
    NoAlternateData, RepositoryError,
};
pub use router::evaluation_router;
pub use service::{EvaluationServiceError, RiskDecisionService};
pub use store::ConfigStore;
