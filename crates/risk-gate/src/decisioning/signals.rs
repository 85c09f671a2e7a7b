//! Normalizes raw interview material into typed evidence.

use serde::{Deserialize, Serialize};

use super::domain::{InterviewResponse, WordToken};

/// Declared operating figures keyed off the numeric interview questions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclaredFinancials {
    pub daily_income: Option<f64>,
    pub daily_fuel_cost: Option<f64>,
    pub passengers_per_trip: Option<f64>,
    pub fare_per_passenger: Option<f64>,
    pub trips_per_day: Option<f64>,
    pub km_per_trip: Option<f64>,
    pub low_season_income: Option<f64>,
    pub weekly_informal_payments: Option<f64>,
    pub weekly_card_payment: Option<f64>,
    pub weekly_payment_capacity: Option<f64>,
}

impl DeclaredFinancials {
    pub fn from_responses(responses: &[InterviewResponse]) -> Self {
        let mut financials = Self::default();
        for response in responses {
            let Some(value) = response.numeric_value() else {
                continue;
            };
            let slot = match response.question_id.as_str() {
                "daily_income" => &mut financials.daily_income,
                "daily_fuel_cost" => &mut financials.daily_fuel_cost,
                "passengers_per_trip" => &mut financials.passengers_per_trip,
                "fare_per_passenger" => &mut financials.fare_per_passenger,
                "trips_per_day" => &mut financials.trips_per_day,
                "km_per_trip" => &mut financials.km_per_trip,
                "low_season_income" => &mut financials.low_season_income,
                "informal_payments" => &mut financials.weekly_informal_payments,
                "weekly_card_payment" => &mut financials.weekly_card_payment,
                "weekly_payment_capacity" => &mut financials.weekly_payment_capacity,
                _ => continue,
            };
            *slot = Some(value);
        }
        financials
    }

    /// `passengers x fare x trips`, when all three were declared.
    pub fn computed_income(&self) -> Option<f64> {
        Some(self.passengers_per_trip? * self.fare_per_passenger? * self.trips_per_day?)
    }

    pub fn daily_km(&self) -> Option<f64> {
        Some(self.km_per_trip? * self.trips_per_day?)
    }
}

/// Lowercases, folds Spanish accents, and strips punctuation so phrase matching works on
/// transcripts regardless of how the transcription provider punctuated them.
pub fn normalize_text(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut last_was_space = true;
    for ch in raw.chars().flat_map(char::to_lowercase) {
        let folded = match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            c if c.is_alphanumeric() => c,
            _ => ' ',
        };
        if folded == ' ' {
            if !last_was_space {
                normalized.push(' ');
            }
            last_was_space = true;
        } else {
            normalized.push(folded);
            last_was_space = false;
        }
    }
    if normalized.ends_with(' ') {
        normalized.pop();
    }
    normalized
}

/// Normalized transcript with word-boundary phrase lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    padded: String,
    words: Vec<String>,
}

impl Transcript {
    pub fn from_response(response: &InterviewResponse) -> Self {
        if response.words.is_empty() {
            Self::from_text(&response.transcript_text)
        } else {
            Self::from_tokens(&response.words)
        }
    }

    pub fn from_text(raw: &str) -> Self {
        let normalized = normalize_text(raw);
        let words = normalized
            .split(' ')
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            padded: format!(" {normalized} "),
            words,
        }
    }

    fn from_tokens(tokens: &[WordToken]) -> Self {
        let joined = tokens
            .iter()
            .map(|token| token.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self::from_text(&joined)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whole-word containment; `phrase` must already be normalized.
    pub fn contains(&self, phrase: &str) -> bool {
        self.padded.contains(&format!(" {phrase} "))
    }

    /// How many of `phrases` appear at least once.
    pub fn count_present(&self, phrases: &[&str]) -> usize {
        phrases.iter().filter(|phrase| self.contains(phrase)).count()
    }

    /// Total occurrences of single-word `tokens`.
    pub fn count_occurrences(&self, tokens: &[&str]) -> usize {
        self.words
            .iter()
            .filter(|word| tokens.contains(&word.as_str()))
            .count()
    }

    /// Adjacent identical words, e.g. "no no".
    pub fn repetitions(&self) -> usize {
        self.words
            .windows(2)
            .filter(|pair| pair[0] == pair[1])
            .count()
    }
}
