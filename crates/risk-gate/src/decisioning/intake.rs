use std::collections::BTreeSet;

use super::catalog;
use super::config::DecisionConfig;
use super::domain::{EvaluationRequest, InterviewResponse};

/// Validation errors raised before any evidence is scored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntakeError {
    #[error("subject identifier must not be empty")]
    MissingSubject,
    #[error("at least one document identifier is required for bureau lookup")]
    MissingDocuments,
    #[error("document identifier of kind {0:?} is blank")]
    BlankDocument(super::domain::DocumentKind),
    #[error("interview contains no responses")]
    EmptyInterview,
    #[error("question '{0}' is not part of the interview battery")]
    UnknownQuestion(String),
    #[error("question '{0}' was answered more than once")]
    DuplicateQuestion(String),
    #[error("required question '{0}' is missing")]
    MissingRequiredQuestion(String),
    #[error("question '{question_id}' requires a numeric answer (found '{value}')")]
    NonNumericAnswer { question_id: String, value: String },
    #[error("question '{question_id}' declared value {value} is outside [0, {max}]")]
    DeclaredValueOutOfRange {
        question_id: String,
        value: f64,
        max: f64,
    },
    #[error("daily income must be greater than zero")]
    NonPositiveIncome,
    #[error("question '{question_id}' voice feature {feature} = {value} is outside [0, 1]")]
    VoiceFeatureOutOfRange {
        question_id: String,
        feature: &'static str,
        value: f64,
    },
    #[error("question '{question_id}' word token '{token}' has confidence {value} outside [0, 1]")]
    TokenConfidenceOutOfRange {
        question_id: String,
        token: String,
        value: f64,
    },
    #[error("question '{question_id}' word token '{token}' ends before it starts")]
    TokenTiming { question_id: String, token: String },
}

/// Request that passed intake; the only input the scoring pipeline accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    request: EvaluationRequest,
}

impl ValidatedRequest {
    pub fn request(&self) -> &EvaluationRequest {
        &self.request
    }

    pub fn responses(&self) -> &[InterviewResponse] {
        &self.request.responses
    }

    pub fn into_inner(self) -> EvaluationRequest {
        self.request
    }
}

/// Guard responsible for rejecting malformed evaluation requests.
#[derive(Debug, Clone, Default)]
pub struct IntakeGuard;

impl IntakeGuard {
    pub fn validate(
        &self,
        request: EvaluationRequest,
        config: &DecisionConfig,
    ) -> Result<ValidatedRequest, IntakeError> {
        if request.subject_id.0.trim().is_empty() {
            return Err(IntakeError::MissingSubject);
        }

        if request.documents.is_empty() {
            return Err(IntakeError::MissingDocuments);
        }
        if let Some(blank) = request
            .documents
            .iter()
            .find(|document| document.value.trim().is_empty())
        {
            return Err(IntakeError::BlankDocument(blank.kind));
        }

        if request.responses.is_empty() {
            return Err(IntakeError::EmptyInterview);
        }

        let mut seen = BTreeSet::new();
        for response in &request.responses {
            let question = catalog::find(&response.question_id)
                .ok_or_else(|| IntakeError::UnknownQuestion(response.question_id.clone()))?;
            if !seen.insert(question.id) {
                return Err(IntakeError::DuplicateQuestion(question.id.to_string()));
            }

            if question.is_numeric() {
                check_declared_value(response, config.intake.max_declared_value)?;
            }
            check_voice_features(response)?;
            check_tokens(response)?;
        }

        for required in &config.intake.required_questions {
            if !seen.contains(required.as_str()) {
                return Err(IntakeError::MissingRequiredQuestion(required.clone()));
            }
        }

        let income = request
            .responses
            .iter()
            .find(|response| response.question_id == "daily_income")
            .and_then(InterviewResponse::numeric_value);
        if matches!(income, Some(value) if value <= 0.0) {
            return Err(IntakeError::NonPositiveIncome);
        }

        Ok(ValidatedRequest { request })
    }
}

fn check_declared_value(response: &InterviewResponse, max: f64) -> Result<(), IntakeError> {
    let value = response
        .numeric_value()
        .ok_or_else(|| IntakeError::NonNumericAnswer {
            question_id: response.question_id.clone(),
            value: response.declared_value.clone(),
        })?;

    if !value.is_finite() || value < 0.0 || value > max {
        return Err(IntakeError::DeclaredValueOutOfRange {
            question_id: response.question_id.clone(),
            value,
            max,
        });
    }
    Ok(())
}

fn check_voice_features(response: &InterviewResponse) -> Result<(), IntakeError> {
    let Some(features) = &response.voice_features else {
        return Ok(());
    };
    for (feature, value) in features.components() {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(IntakeError::VoiceFeatureOutOfRange {
                question_id: response.question_id.clone(),
                feature,
                value,
            });
        }
    }
    Ok(())
}

fn check_tokens(response: &InterviewResponse) -> Result<(), IntakeError> {
    for token in &response.words {
        if !token.confidence.is_finite() || !(0.0..=1.0).contains(&token.confidence) {
            return Err(IntakeError::TokenConfidenceOutOfRange {
                question_id: response.question_id.clone(),
                token: token.text.clone(),
                value: token.confidence,
            });
        }
        if token.end_ms < token.start_ms {
            return Err(IntakeError::TokenTiming {
                question_id: response.question_id.clone(),
                token: token.text.clone(),
            });
        }
    }
    Ok(())
}
