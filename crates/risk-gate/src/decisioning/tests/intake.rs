use super::common::*;
use crate::decisioning::config::DecisionConfig;
use crate::decisioning::domain::{DocumentKind, SubjectId};
use crate::decisioning::intake::{IntakeError, IntakeGuard};

fn validate(request: crate::decisioning::domain::EvaluationRequest) -> Result<(), IntakeError> {
    IntakeGuard
        .validate(request, &DecisionConfig::default())
        .map(|_| ())
}

#[test]
fn accepts_complete_interview() {
    let validated = IntakeGuard
        .validate(request(), &DecisionConfig::default())
        .expect("clean request passes intake");
    assert_eq!(validated.responses().len(), 6);
    assert_eq!(validated.request().subject_id.0, "subject-001");
}

#[test]
fn accepts_formatted_currency_answers() {
    let responses = replace_response(clean_responses(), numeric("daily_income", "$1,200"));
    assert_eq!(validate(request_with(responses)), Ok(()));
}

#[test]
fn rejects_missing_subject_and_documents() {
    let mut blank_subject = request();
    blank_subject.subject_id = SubjectId("   ".to_string());
    assert_eq!(validate(blank_subject), Err(IntakeError::MissingSubject));

    let mut no_documents = request();
    no_documents.documents.clear();
    assert_eq!(validate(no_documents), Err(IntakeError::MissingDocuments));

    let mut blank_document = request();
    blank_document.documents[0].value = String::new();
    assert_eq!(
        validate(blank_document),
        Err(IntakeError::BlankDocument(DocumentKind::NationalId))
    );
}

#[test]
fn rejects_empty_unknown_and_duplicate_answers() {
    assert_eq!(
        validate(request_with(Vec::new())),
        Err(IntakeError::EmptyInterview)
    );

    let mut unknown = clean_responses();
    unknown.push(numeric("favourite_colour", "3"));
    assert_eq!(
        validate(request_with(unknown)),
        Err(IntakeError::UnknownQuestion("favourite_colour".to_string()))
    );

    let mut duplicate = clean_responses();
    duplicate.push(numeric("trips_per_day", "3"));
    assert_eq!(
        validate(request_with(duplicate)),
        Err(IntakeError::DuplicateQuestion("trips_per_day".to_string()))
    );
}

#[test]
fn rejects_missing_required_question() {
    let mut responses = clean_responses();
    responses.retain(|response| response.question_id != "fare_per_passenger");
    assert_eq!(
        validate(request_with(responses)),
        Err(IntakeError::MissingRequiredQuestion(
            "fare_per_passenger".to_string()
        ))
    );
}

#[test]
fn rejects_malformed_numeric_answers() {
    let responses = replace_response(clean_responses(), numeric("trips_per_day", "muchos"));
    assert!(matches!(
        validate(request_with(responses)),
        Err(IntakeError::NonNumericAnswer { question_id, .. }) if question_id == "trips_per_day"
    ));

    let responses = replace_response(clean_responses(), numeric("daily_fuel_cost", "-20"));
    assert!(matches!(
        validate(request_with(responses)),
        Err(IntakeError::DeclaredValueOutOfRange { question_id, .. }) if question_id == "daily_fuel_cost"
    ));

    let responses = replace_response(clean_responses(), numeric("daily_income", "0"));
    assert_eq!(
        validate(request_with(responses)),
        Err(IntakeError::NonPositiveIncome)
    );
}

#[test]
fn rejects_out_of_range_voice_and_token_data() {
    let mut agitated = numeric("trips_per_day", "2");
    if let Some(features) = agitated.voice_features.as_mut() {
        features.pitch_variance = 1.4;
    }
    let responses = replace_response(clean_responses(), agitated);
    assert!(matches!(
        validate(request_with(responses)),
        Err(IntakeError::VoiceFeatureOutOfRange { feature: "pitch_variance", .. })
    ));

    let mut overconfident = narrative("route_name", "ruta norte", 0.9);
    overconfident.words = tokens(&[("ruta", 0.9), ("norte", 1.2)]);
    let mut responses = clean_responses();
    responses.push(overconfident);
    assert!(matches!(
        validate(request_with(responses)),
        Err(IntakeError::TokenConfidenceOutOfRange { token, .. }) if token == "norte"
    ));

    let mut reversed = narrative("route_name", "ruta", 0.9);
    reversed.words = tokens(&[("ruta", 0.9)]);
    reversed.words[0].end_ms = 0;
    reversed.words[0].start_ms = 10;
    let mut responses = clean_responses();
    responses.push(reversed);
    assert!(matches!(
        validate(request_with(responses)),
        Err(IntakeError::TokenTiming { .. })
    ));
}
