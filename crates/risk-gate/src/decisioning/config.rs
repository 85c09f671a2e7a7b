use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog;

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Versioned thresholds, weights, and the mitigation catalog used by every evaluation.
///
/// Every field is required when loaded from JSON; a document missing a threshold is rejected
/// instead of being patched with defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionConfig {
    pub version: String,
    pub weights: FactorWeights,
    pub fallback_weights: FallbackWeights,
    pub behavioral_bands: BehavioralBands,
    pub risk_bands: RiskBands,
    pub bureau: BureauPolicy,
    pub consistency: ConsistencyThresholds,
    pub fuel: FuelModel,
    pub consensus: ConsensusBands,
    pub timeouts: Timeouts,
    pub gate: GatePolicy,
    pub mitigations: MitigationCatalog,
    pub intake: IntakePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub bureau: f64,
    pub voice: f64,
    pub alternate_data: f64,
}

/// Substitute weighting applied when the bureau factor is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackWeights {
    pub voice: f64,
    pub alternate_data: f64,
}

/// Behavioral score cut-points: `>= low` is LOW risk, `>= medium` is MEDIUM, HIGH below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralBands {
    pub low: f64,
    pub medium: f64,
}

/// Engine score cut-points on the 0-1000 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBands {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BureauPolicy {
    pub score_min: u16,
    pub score_max: u16,
    pub band_a: u16,
    pub band_b: u16,
    pub band_c: u16,
    /// Reason codes that, with a D band, force a hard stop.
    pub hard_stop_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyThresholds {
    pub income_deviation: f64,
    pub income_deviation_high: f64,
    pub fuel_ratio: f64,
    pub fuel_ratio_high: f64,
    pub low_season_drop: f64,
    pub min_km_per_currency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelModel {
    pub price_per_litre: f64,
    pub km_per_litre: f64,
    pub working_days_per_week: f64,
}

/// Agreement bands on the absolute engine score difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusBands {
    pub high_below: f64,
    pub medium_below: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeouts {
    pub bureau_ms: u64,
    pub scientific_ms: u64,
    pub heuristic_ms: u64,
    #[serde(default = "default_alternate_data_ms")]
    pub alternate_data_ms: u64,
}

fn default_alternate_data_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Minimum impact weight for a HIGH voice red flag to act as a hard stop.
    pub hard_stop_min_impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MitigationCatalog {
    pub review: Vec<String>,
    pub by_reason: BTreeMap<String, Vec<String>>,
    pub bureau_fallback: Vec<String>,
    pub alternative_paths: Vec<String>,
    pub escalation: Vec<String>,
    pub default_review: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakePolicy {
    pub required_questions: Vec<String>,
    pub max_declared_value: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        let mut by_reason = BTreeMap::new();
        by_reason.insert(
            "UTIL_75".to_string(),
            strings(&["Reduce revolving utilization below 50% before disbursement"]),
        );
        by_reason.insert(
            "RECENT_INQUIRY".to_string(),
            strings(&["Confirm no parallel credit applications are in progress"]),
        );

        Self {
            version: "2024.1".to_string(),
            weights: FactorWeights {
                bureau: 0.45,
                voice: 0.25,
                alternate_data: 0.30,
            },
            fallback_weights: FallbackWeights {
                voice: 0.50,
                alternate_data: 0.30,
            },
            behavioral_bands: BehavioralBands {
                low: 0.75,
                medium: 0.55,
            },
            risk_bands: RiskBands {
                low: 750.0,
                medium: 550.0,
                high: 350.0,
            },
            bureau: BureauPolicy {
                score_min: 300,
                score_max: 850,
                band_a: 700,
                band_b: 600,
                band_c: 500,
                hard_stop_codes: strings(&["MORA_90", "MORA_120", "MORA_180", "DEFAULTS"]),
            },
            consistency: ConsistencyThresholds {
                income_deviation: 0.20,
                income_deviation_high: 0.40,
                fuel_ratio: 0.70,
                fuel_ratio_high: 1.0,
                low_season_drop: 0.70,
                min_km_per_currency: 0.15,
            },
            fuel: FuelModel {
                price_per_litre: 24.0,
                km_per_litre: 7.0,
                working_days_per_week: 6.0,
            },
            consensus: ConsensusBands {
                high_below: 100.0,
                medium_below: 200.0,
            },
            timeouts: Timeouts {
                bureau_ms: 2000,
                scientific_ms: 2500,
                heuristic_ms: 2500,
                alternate_data_ms: default_alternate_data_ms(),
            },
            gate: GatePolicy {
                hard_stop_min_impact: 8.0,
            },
            mitigations: MitigationCatalog {
                review: strings(&[
                    "Add a guarantor (aval)",
                    "Reduce term to 48 months",
                    "Request supporting income documents",
                ]),
                by_reason,
                bureau_fallback: strings(&[
                    "Request proof of income for the last 3 months",
                    "Complete voice interview and alternate-data evaluation",
                ]),
                alternative_paths: strings(&[
                    "Savings plan for 6 months with re-evaluation",
                ]),
                escalation: strings(&[
                    "Escalate to a credit analyst before any disbursement",
                ]),
                default_review: strings(&["Manual analyst review of the full evidence set"]),
            },
            intake: IntakePolicy {
                required_questions: strings(&[
                    "daily_income",
                    "trips_per_day",
                    "passengers_per_trip",
                    "fare_per_passenger",
                    "daily_fuel_cost",
                ]),
                max_declared_value: 10_000_000.0,
            },
        }
    }
}

impl DecisionConfig {
    /// Parses and validates a JSON document; invalid documents never become active.
    pub fn from_json(raw: &str) -> Result<Self, DecisionConfigError> {
        let config: DecisionConfig =
            serde_json::from_str(raw).map_err(|err| DecisionConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DecisionConfigError> {
        if self.version.trim().is_empty() {
            return Err(DecisionConfigError::MissingVersion);
        }

        let weights = [
            ("weights.bureau", self.weights.bureau),
            ("weights.voice", self.weights.voice),
            ("weights.alternate_data", self.weights.alternate_data),
        ];
        check_weight_set("weights", &weights)?;

        let fallback = [
            ("fallback_weights.voice", self.fallback_weights.voice),
            (
                "fallback_weights.alternate_data",
                self.fallback_weights.alternate_data,
            ),
        ];
        check_weight_set("fallback_weights", &fallback)?;

        let bands = &self.behavioral_bands;
        if !(bands.medium > 0.0 && bands.medium < bands.low && bands.low <= 1.0) {
            return Err(DecisionConfigError::BandOrder("behavioral_bands"));
        }

        let risk = &self.risk_bands;
        if !(risk.high > 0.0 && risk.high < risk.medium && risk.medium < risk.low && risk.low <= 1000.0)
        {
            return Err(DecisionConfigError::BandOrder("risk_bands"));
        }

        let bureau = &self.bureau;
        if !(bureau.score_min < bureau.band_c
            && bureau.band_c < bureau.band_b
            && bureau.band_b < bureau.band_a
            && bureau.band_a <= bureau.score_max)
        {
            return Err(DecisionConfigError::BandOrder("bureau"));
        }
        check_list("bureau.hard_stop_codes", &bureau.hard_stop_codes)?;

        let consistency = &self.consistency;
        check_positive("consistency.income_deviation", consistency.income_deviation)?;
        check_positive("consistency.fuel_ratio", consistency.fuel_ratio)?;
        check_positive("consistency.low_season_drop", consistency.low_season_drop)?;
        check_positive(
            "consistency.min_km_per_currency",
            consistency.min_km_per_currency,
        )?;
        if consistency.income_deviation_high <= consistency.income_deviation {
            return Err(DecisionConfigError::BandOrder("consistency.income_deviation"));
        }
        if consistency.fuel_ratio_high <= consistency.fuel_ratio {
            return Err(DecisionConfigError::BandOrder("consistency.fuel_ratio"));
        }
        if consistency.low_season_drop > 1.0 {
            return Err(DecisionConfigError::OutOfRange {
                field: "consistency.low_season_drop",
                value: consistency.low_season_drop,
            });
        }

        check_positive("fuel.price_per_litre", self.fuel.price_per_litre)?;
        check_positive("fuel.km_per_litre", self.fuel.km_per_litre)?;
        check_positive("fuel.working_days_per_week", self.fuel.working_days_per_week)?;

        let consensus = &self.consensus;
        if !(consensus.high_below > 0.0
            && consensus.high_below < consensus.medium_below
            && consensus.medium_below <= 1000.0)
        {
            return Err(DecisionConfigError::BandOrder("consensus"));
        }

        for (field, value) in [
            ("timeouts.bureau_ms", self.timeouts.bureau_ms),
            ("timeouts.scientific_ms", self.timeouts.scientific_ms),
            ("timeouts.heuristic_ms", self.timeouts.heuristic_ms),
            ("timeouts.alternate_data_ms", self.timeouts.alternate_data_ms),
        ] {
            if value == 0 {
                return Err(DecisionConfigError::OutOfRange {
                    field,
                    value: 0.0,
                });
            }
        }

        let impact = self.gate.hard_stop_min_impact;
        if !(0.0..=10.0).contains(&impact) {
            return Err(DecisionConfigError::OutOfRange {
                field: "gate.hard_stop_min_impact",
                value: impact,
            });
        }

        let mitigations = &self.mitigations;
        check_list("mitigations.review", &mitigations.review)?;
        check_list("mitigations.bureau_fallback", &mitigations.bureau_fallback)?;
        check_list(
            "mitigations.alternative_paths",
            &mitigations.alternative_paths,
        )?;
        check_list("mitigations.escalation", &mitigations.escalation)?;
        check_list("mitigations.default_review", &mitigations.default_review)?;
        for entries in mitigations.by_reason.values() {
            check_list("mitigations.by_reason", entries)?;
        }

        check_list("intake.required_questions", &self.intake.required_questions)?;
        for id in &self.intake.required_questions {
            if catalog::find(id).is_none() {
                return Err(DecisionConfigError::UnknownQuestion(id.clone()));
            }
        }
        check_positive("intake.max_declared_value", self.intake.max_declared_value)?;

        Ok(())
    }

    pub(crate) fn is_hard_stop_code(&self, code: &str) -> bool {
        self.bureau
            .hard_stop_codes
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(code))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn check_weight_set(
    group: &'static str,
    weights: &[(&'static str, f64)],
) -> Result<(), DecisionConfigError> {
    let mut sum = 0.0;
    for &(field, value) in weights {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(DecisionConfigError::OutOfRange { field, value });
        }
        sum += value;
    }
    if sum <= 0.0 || sum > 1.0 + WEIGHT_TOLERANCE {
        return Err(DecisionConfigError::WeightSum { group, sum });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), DecisionConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DecisionConfigError::OutOfRange { field, value })
    }
}

fn check_list(field: &'static str, entries: &[String]) -> Result<(), DecisionConfigError> {
    if entries.is_empty() || entries.iter().any(|entry| entry.trim().is_empty()) {
        return Err(DecisionConfigError::EmptyList(field));
    }
    Ok(())
}

/// Reasons a decision configuration is refused at startup or reload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecisionConfigError {
    #[error("decision config is not valid JSON: {0}")]
    Parse(String),
    #[error("decision config version must not be empty")]
    MissingVersion,
    #[error("{field} must be a finite value in range (found {value})")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("{group} must sum to a value in (0, 1] (found {sum:.4})")]
    WeightSum { group: &'static str, sum: f64 },
    #[error("{0} cut-points are not strictly ordered")]
    BandOrder(&'static str),
    #[error("{0} must contain at least one non-blank entry")]
    EmptyList(&'static str),
    #[error("required question '{0}' is not part of the interview battery")]
    UnknownQuestion(String),
}
