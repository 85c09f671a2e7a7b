//! Pre-scored interview battery shared by both voice engines.

use super::domain::QuestionCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Numeric,
    Narrative,
}

/// Which declared-vs-derived check the scientific engine runs for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoherenceCheck {
    None,
    Income,
    FuelCost,
    PaymentCapacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub id: &'static str,
    pub category: QuestionCategory,
    /// 1-10, how much the answer moves the composite.
    pub weight: u8,
    /// 1-5, how stressful the topic is expected to be.
    pub stress_level: u8,
    pub expected_response_ms: u32,
    pub answer: AnswerKind,
    pub coherence: CoherenceCheck,
    /// Sensitive topics are routed through the evasion classifier.
    pub sensitive: bool,
    /// Accent-folded phrases that indicate hedging for this question.
    pub keywords: &'static [&'static str],
}

impl Question {
    pub fn is_numeric(&self) -> bool {
        self.answer == AnswerKind::Numeric
    }
}

use AnswerKind::{Narrative, Numeric};
use CoherenceCheck as Check;
use QuestionCategory::*;

const fn question(
    id: &'static str,
    category: QuestionCategory,
    weight: u8,
    stress_level: u8,
    expected_response_ms: u32,
    answer: AnswerKind,
) -> Question {
    Question {
        id,
        category,
        weight,
        stress_level,
        expected_response_ms,
        answer,
        coherence: Check::None,
        sensitive: false,
        keywords: &[],
    }
}

const fn with_keywords(mut q: Question, keywords: &'static [&'static str]) -> Question {
    q.keywords = keywords;
    q
}

const fn with_coherence(mut q: Question, coherence: CoherenceCheck) -> Question {
    q.coherence = coherence;
    q
}

const fn sensitive(mut q: Question, keywords: &'static [&'static str]) -> Question {
    q.sensitive = true;
    q.keywords = keywords;
    q
}

static QUESTIONS: &[Question] = &[
    question("full_name", BasicInfo, 2, 1, 3000, Narrative),
    question("age", BasicInfo, 4, 1, 2000, Numeric),
    question("route_name", BasicInfo, 6, 2, 4000, Narrative),
    question("years_on_route", BasicInfo, 7, 2, 3000, Numeric),
    question("household_dependents", BasicInfo, 5, 2, 6000, Narrative),
    with_keywords(
        question("trips_per_day", DailyOperation, 8, 3, 4000, Numeric),
        &["depende", "mas o menos"],
    ),
    with_keywords(
        question("km_per_trip", DailyOperation, 7, 3, 5000, Numeric),
        &["creo que", "debe ser", "aproximadamente"],
    ),
    with_coherence(
        with_keywords(
            question("daily_income", DailyOperation, 10, 5, 8000, Numeric),
            &["depende", "varia mucho", "aproximadamente", "mas o menos"],
        ),
        Check::Income,
    ),
    with_keywords(
        question("passengers_per_trip", DailyOperation, 8, 3, 5000, Numeric),
        &["depende la hora", "varia mucho"],
    ),
    question("fare_per_passenger", DailyOperation, 6, 2, 3000, Numeric),
    question("low_season_income", DailyOperation, 9, 4, 10000, Numeric),
    question("route_planning", DailyOperation, 4, 2, 5000, Narrative),
    question("passenger_relations", DailyOperation, 4, 2, 5000, Narrative),
    with_coherence(
        with_keywords(
            question("daily_fuel_cost", OperationalCosts, 9, 4, 6000, Numeric),
            &["aproximadamente", "varia", "depende del precio"],
        ),
        Check::FuelCost,
    ),
    with_keywords(
        question("trips_per_tank", OperationalCosts, 8, 3, 7000, Numeric),
        &["mas o menos", "depende del trafico"],
    ),
    sensitive(
        question("informal_payments", OperationalCosts, 10, 5, 12000, Numeric),
        &["no pago nada", "no se de que habla", "eso no existe"],
    ),
    question("weekly_card_payment", OperationalCosts, 6, 3, 4000, Numeric),
    question("monthly_maintenance", OperationalCosts, 6, 2, 5000, Numeric),
    question("mechanical_knowledge", OperationalCosts, 5, 2, 6000, Narrative),
    question("operation_type", BusinessStructure, 9, 4, 6000, Narrative),
    question("partners_investors", BusinessStructure, 8, 5, 8000, Narrative),
    question("employees", BusinessStructure, 6, 3, 5000, Narrative),
    question("licenses_permits", BusinessStructure, 7, 4, 8000, Narrative),
    sensitive(
        question("union_relations", BusinessStructure, 8, 5, 10000, Narrative),
        &["no se", "eso no pasa"],
    ),
    question("technology_adoption", BusinessStructure, 3, 2, 7000, Narrative),
    question("training", BusinessStructure, 3, 1, 6000, Narrative),
    question("five_year_outlook", BusinessStructure, 4, 3, 8000, Narrative),
    question("vehicle_value", Assets, 7, 3, 6000, Numeric),
    question("other_vehicles", Assets, 5, 2, 4000, Narrative),
    question("real_estate", Assets, 6, 4, 7000, Narrative),
    question("emergency_savings", Assets, 8, 3, 7000, Narrative),
    question("insurance", Assets, 6, 2, 6000, Narrative),
    question("other_investments", Assets, 5, 3, 7000, Narrative),
    question("previous_credit", CreditHistory, 10, 5, 10000, Narrative),
    with_keywords(
        question("payment_problems", CreditHistory, 9, 5, 12000, Narrative),
        &["nunca", "jamas"],
    ),
    question("commercial_references", CreditHistory, 6, 3, 6000, Narrative),
    sensitive(
        question("informal_lenders", CreditHistory, 9, 5, 12000, Narrative),
        &["nunca", "jamas", "no se de que habla"],
    ),
    question("guarantor_history", CreditHistory, 7, 4, 8000, Narrative),
    question("utility_arrears", CreditHistory, 6, 3, 6000, Narrative),
    question("credit_purpose", PaymentIntention, 9, 4, 8000, Narrative),
    question("repayment_plan", PaymentIntention, 10, 4, 10000, Narrative),
    with_coherence(
        question("weekly_payment_capacity", PaymentIntention, 9, 4, 8000, Numeric),
        Check::PaymentCapacity,
    ),
    question("existing_commitments", PaymentIntention, 8, 4, 8000, Narrative),
    question("peer_credit_experience", PaymentIntention, 6, 3, 8000, Narrative),
    question("family_support", PaymentIntention, 7, 4, 9000, Narrative),
    question("route_risks", RiskEvaluation, 8, 5, 10000, Narrative),
    question("pandemic_impact", RiskEvaluation, 7, 3, 6000, Narrative),
    question("contingency_plan", RiskEvaluation, 8, 4, 8000, Narrative),
    question("personal_safety", RiskEvaluation, 9, 5, 12000, Narrative),
    question("unfair_competition", RiskEvaluation, 7, 4, 9000, Narrative),
    question("regulatory_changes", RiskEvaluation, 6, 3, 8000, Narrative),
];

pub fn all() -> &'static [Question] {
    QUESTIONS
}

pub fn find(id: &str) -> Option<&'static Question> {
    QUESTIONS.iter().find(|question| question.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn ids_are_unique() {
        let ids: BTreeSet<_> = all().iter().map(|question| question.id).collect();
        assert_eq!(ids.len(), all().len());
    }

    #[test]
    fn weights_and_stress_levels_stay_in_range() {
        for question in all() {
            assert!((1..=10).contains(&question.weight), "{}", question.id);
            assert!((1..=5).contains(&question.stress_level), "{}", question.id);
            assert!(question.expected_response_ms > 0, "{}", question.id);
        }
    }

    #[test]
    fn coherence_checks_only_on_numeric_questions() {
        for question in all() {
            if question.coherence != CoherenceCheck::None {
                assert!(question.is_numeric(), "{}", question.id);
            }
        }
    }

    #[test]
    fn sensitive_topics_are_flagged() {
        let sensitive: Vec<_> = all()
            .iter()
            .filter(|question| question.sensitive)
            .map(|question| question.id)
            .collect();
        assert_eq!(
            sensitive,
            vec!["informal_payments", "union_relations", "informal_lenders"]
        );
        assert!(find("daily_income").is_some());
        assert!(find("unknown").is_none());
    }
}
