use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};

/// `app_settings` key holding the serialized [`PlannerSettings`].
pub const KEY_PLANNER_SETTINGS: &str = "planner_settings";

/// Upper bound for every minute-valued setting: one day.
pub const MAX_SETTING_MINUTES: i64 = 24 * 60;

/// Tunable weights of the schedule score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringWeights {
    pub priority_weight: f64,
    pub deadline_penalty_per_hour: f64,
    pub balance_band_low: f64,
    pub balance_band_high: f64,
    pub balance_penalty_per_unit: f64,
    pub fatigue_gap_minutes: i64,
    pub fatigue_threshold_hours: f64,
    pub fatigue_penalty_per_hour: f64,
    pub appropriate_hours_weight: f64,
    pub appropriate_start_hour: u32,
    pub appropriate_end_hour: u32,
    pub compactness_weight: f64,
    pub compact_gap_minutes: i64,
    pub overlap_penalty: f64,
    pub violation_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            priority_weight: 1.0,
            deadline_penalty_per_hour: 2.0,
            balance_band_low: 2.0,
            balance_band_high: 3.0,
            balance_penalty_per_unit: 5.0,
            fatigue_gap_minutes: 30,
            fatigue_threshold_hours: 6.0,
            fatigue_penalty_per_hour: 4.0,
            appropriate_hours_weight: 10.0,
            appropriate_start_hour: 7,
            appropriate_end_hour: 22,
            compactness_weight: 10.0,
            compact_gap_minutes: 120,
            overlap_penalty: 100.0,
            violation_penalty: 80.0,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> AppResult<()> {
        let penalties = [
            ("priorityWeight", self.priority_weight),
            ("deadlinePenaltyPerHour", self.deadline_penalty_per_hour),
            ("balanceBandLow", self.balance_band_low),
            ("balanceBandHigh", self.balance_band_high),
            ("balancePenaltyPerUnit", self.balance_penalty_per_unit),
            ("fatigueThresholdHours", self.fatigue_threshold_hours),
            ("fatiguePenaltyPerHour", self.fatigue_penalty_per_hour),
            ("appropriateHoursWeight", self.appropriate_hours_weight),
            ("compactnessWeight", self.compactness_weight),
            ("overlapPenalty", self.overlap_penalty),
            ("violationPenalty", self.violation_penalty),
        ];

        for (field, value) in penalties {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::validation_with_details(
                    "scoring weights must be finite and non-negative",
                    json!({"field": field, "value": value}),
                ));
            }
        }

        if self.balance_band_low > self.balance_band_high {
            return Err(AppError::validation_with_details(
                "balance band lower edge must not exceed the upper edge",
                json!({"low": self.balance_band_low, "high": self.balance_band_high}),
            ));
        }

        let gaps = [
            ("fatigueGapMinutes", self.fatigue_gap_minutes),
            ("compactGapMinutes", self.compact_gap_minutes),
        ];
        for (field, value) in gaps {
            if !(0..=MAX_SETTING_MINUTES).contains(&value) {
                return Err(AppError::validation_with_details(
                    "gap must be between 0 and 1440 minutes",
                    json!({"field": field, "value": value}),
                ));
            }
        }

        let (start, end) = (self.appropriate_start_hour, self.appropriate_end_hour);
        if start >= end || end > 24 {
            return Err(AppError::validation_with_details(
                "appropriate hours must form a range within the day",
                json!({"start": start, "end": end}),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizerSettings {
    pub default_iterations: usize,
    pub max_shift_minutes: i64,
    pub time_budget_ms: Option<u64>,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            default_iterations: 1000,
            max_shift_minutes: 30,
            time_budget_ms: None,
        }
    }
}

impl OptimizerSettings {
    pub fn validate(&self) -> AppResult<()> {
        if !(1..=MAX_SETTING_MINUTES).contains(&self.max_shift_minutes) {
            return Err(AppError::validation_with_details(
                "mutation shift range must be between 1 and 1440 minutes",
                json!({"maxShiftMinutes": self.max_shift_minutes}),
            ));
        }
        if self.time_budget_ms == Some(0) {
            return Err(AppError::validation("time budget must be positive when set"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerSettings {
    pub scoring: ScoringWeights,
    pub optimizer: OptimizerSettings,
}

impl PlannerSettings {
    pub fn validate(&self) -> AppResult<()> {
        self.scoring.validate()?;
        self.optimizer.validate()
    }
}
