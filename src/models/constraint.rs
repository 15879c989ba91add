use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintCategory {
    Sleep,
    MealBreak,
    WorkBlock,
    Other,
}

impl ConstraintCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintCategory::Sleep => "sleep",
            ConstraintCategory::MealBreak => "meal_break",
            ConstraintCategory::WorkBlock => "work_block",
            ConstraintCategory::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "sleep" => ConstraintCategory::Sleep,
            "meal_break" | "mealbreak" | "meal-break" => ConstraintCategory::MealBreak,
            "work_block" | "workblock" | "work-block" => ConstraintCategory::WorkBlock,
            _ => ConstraintCategory::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintStatus {
    #[default]
    Active,
    Inactive,
}

impl ConstraintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintStatus::Active => "active",
            ConstraintStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("active") {
            ConstraintStatus::Active
        } else {
            ConstraintStatus::Inactive
        }
    }
}

/// A blocked time-of-day window, either on given dates or on given weekdays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    pub id: String,
    pub title: String,
    pub category: ConstraintCategory,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub repetitive: bool,
    #[serde(default)]
    pub specific_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
    pub user_id: String,
    #[serde(default)]
    pub status: ConstraintStatus,
}

impl Constraint {
    pub fn is_active(&self) -> bool {
        self.status == ConstraintStatus::Active
    }

    /// Whether the constraint blocks anything on `date`.
    ///
    /// Repetitive constraints look only at weekdays, one-off ones only at dates.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;

        if self.repetitive {
            self.weekdays.contains(&date.weekday())
        } else {
            self.specific_dates.contains(&date)
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_fields(&self.title, self.window_start, self.window_end, &self.user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewConstraint {
    pub title: String,
    pub category: ConstraintCategory,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub repetitive: bool,
    #[serde(default)]
    pub specific_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
    pub user_id: String,
    #[serde(default)]
    pub status: ConstraintStatus,
}

impl NewConstraint {
    pub fn validate(&self) -> AppResult<()> {
        validate_fields(&self.title, self.window_start, self.window_end, &self.user_id)
    }

    pub fn into_constraint(self, id: String) -> Constraint {
        Constraint {
            id,
            title: self.title,
            category: self.category,
            window_start: self.window_start,
            window_end: self.window_end,
            repetitive: self.repetitive,
            specific_dates: self.specific_dates,
            weekdays: self.weekdays,
            user_id: self.user_id,
            status: self.status,
        }
    }
}

fn validate_fields(
    title: &str,
    window_start: NaiveTime,
    window_end: NaiveTime,
    user_id: &str,
) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::validation("constraint title must not be empty"));
    }
    if user_id.trim().is_empty() {
        return Err(AppError::validation("constraint must belong to a user"));
    }
    if window_start >= window_end {
        return Err(AppError::validation_with_details(
            "constraint window start must be before its end",
            json!({
                "windowStart": window_start.to_string(),
                "windowEnd": window_end.to_string(),
            }),
        ));
    }
    Ok(())
}

pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MON",
        Weekday::Tue => "TUE",
        Weekday::Wed => "WED",
        Weekday::Thu => "THU",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
        Weekday::Sun => "SUN",
    }
}

pub fn parse_weekday_code(code: &str) -> Option<Weekday> {
    match code.trim().to_ascii_uppercase().as_str() {
        "MON" => Some(Weekday::Mon),
        "TUE" => Some(Weekday::Tue),
        "WED" => Some(Weekday::Wed),
        "THU" => Some(Weekday::Thu),
        "FRI" => Some(Weekday::Fri),
        "SAT" => Some(Weekday::Sat),
        "SUN" => Some(Weekday::Sun),
        _ => None,
    }
}
