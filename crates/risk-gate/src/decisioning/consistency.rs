//! Cross-checks declared operating figures against values derived from the other answers.

use serde::{Deserialize, Serialize};

use super::config::ConsistencyThresholds;
use super::domain::Severity;
use super::signals::DeclaredFinancials;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyRule {
    IncomeMismatch,
    FuelIncomeRatio,
    FuelEfficiency,
    LowSeasonDrop,
}

impl ConsistencyRule {
    pub fn code(&self) -> &'static str {
        match self {
            ConsistencyRule::IncomeMismatch => "INCOME_MISMATCH",
            ConsistencyRule::FuelIncomeRatio => "FUEL_INCOME_RATIO",
            ConsistencyRule::FuelEfficiency => "FUEL_EFFICIENCY",
            ConsistencyRule::LowSeasonDrop => "LOW_SEASON_DROP",
        }
    }
}

/// One fired rule. `deviation_pct` is on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyFlag {
    pub rule: ConsistencyRule,
    pub fields_involved: Vec<String>,
    pub declared_value: f64,
    pub computed_value: f64,
    pub deviation_pct: f64,
    pub severity: Severity,
}

impl ConsistencyFlag {
    pub fn describe(&self) -> String {
        format!(
            "{} on {}: declared {:.2} vs {:.2} ({:.2}%)",
            self.rule.code(),
            self.fields_involved.join(", "),
            self.declared_value,
            self.computed_value,
            self.deviation_pct
        )
    }
}

type Rule = fn(&DeclaredFinancials, &ConsistencyThresholds) -> Option<ConsistencyFlag>;

const RULES: &[Rule] = &[income_mismatch, fuel_income_ratio, fuel_efficiency, low_season_drop];

/// Runs every rule; a request may raise several flags and none of them is fatal.
pub fn validate(
    financials: &DeclaredFinancials,
    thresholds: &ConsistencyThresholds,
) -> Vec<ConsistencyFlag> {
    RULES
        .iter()
        .filter_map(|rule| rule(financials, thresholds))
        .collect()
}

fn income_mismatch(
    financials: &DeclaredFinancials,
    thresholds: &ConsistencyThresholds,
) -> Option<ConsistencyFlag> {
    let declared = positive(financials.daily_income)?;
    let computed = financials.computed_income()?;
    let deviation = (declared - computed).abs() / declared;
    if deviation <= thresholds.income_deviation {
        return None;
    }

    Some(ConsistencyFlag {
        rule: ConsistencyRule::IncomeMismatch,
        fields_involved: fields(&[
            "daily_income",
            "passengers_per_trip",
            "fare_per_passenger",
            "trips_per_day",
        ]),
        declared_value: declared,
        computed_value: computed,
        deviation_pct: deviation * 100.0,
        severity: if deviation > thresholds.income_deviation_high {
            Severity::High
        } else {
            Severity::Medium
        },
    })
}

fn fuel_income_ratio(
    financials: &DeclaredFinancials,
    thresholds: &ConsistencyThresholds,
) -> Option<ConsistencyFlag> {
    let income = positive(financials.daily_income)?;
    let fuel = financials.daily_fuel_cost?;
    let ratio = fuel / income;
    if ratio <= thresholds.fuel_ratio {
        return None;
    }

    Some(ConsistencyFlag {
        rule: ConsistencyRule::FuelIncomeRatio,
        fields_involved: fields(&["daily_fuel_cost", "daily_income"]),
        declared_value: fuel,
        computed_value: income,
        deviation_pct: ratio * 100.0,
        severity: if ratio > thresholds.fuel_ratio_high {
            Severity::High
        } else {
            Severity::Medium
        },
    })
}

fn fuel_efficiency(
    financials: &DeclaredFinancials,
    thresholds: &ConsistencyThresholds,
) -> Option<ConsistencyFlag> {
    let fuel = positive(financials.daily_fuel_cost)?;
    let daily_km = financials.daily_km()?;
    let km_per_currency = daily_km / fuel;
    if km_per_currency >= thresholds.min_km_per_currency {
        return None;
    }

    Some(ConsistencyFlag {
        rule: ConsistencyRule::FuelEfficiency,
        fields_involved: fields(&["daily_fuel_cost", "km_per_trip", "trips_per_day"]),
        declared_value: km_per_currency,
        computed_value: thresholds.min_km_per_currency,
        deviation_pct: (thresholds.min_km_per_currency - km_per_currency)
            / thresholds.min_km_per_currency
            * 100.0,
        severity: Severity::Medium,
    })
}

fn low_season_drop(
    financials: &DeclaredFinancials,
    thresholds: &ConsistencyThresholds,
) -> Option<ConsistencyFlag> {
    let income = positive(financials.daily_income)?;
    let low_season = financials.low_season_income?;
    let drop = (income - low_season) / income;
    if drop <= thresholds.low_season_drop {
        return None;
    }

    Some(ConsistencyFlag {
        rule: ConsistencyRule::LowSeasonDrop,
        fields_involved: fields(&["low_season_income", "daily_income"]),
        declared_value: low_season,
        computed_value: income,
        deviation_pct: drop * 100.0,
        severity: Severity::Medium,
    })
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|value| *value > 0.0)
}

fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}
