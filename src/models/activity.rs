use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};

pub const MIN_PRIORITY: i32 = 1;
pub const MAX_PRIORITY: i32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ActivityCategory {
    Work,
    Study,
    Leisure,
    Rest,
    Sport,
}

impl ActivityCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityCategory::Work => "work",
            ActivityCategory::Study => "study",
            ActivityCategory::Leisure => "leisure",
            ActivityCategory::Rest => "rest",
            ActivityCategory::Sport => "sport",
        }
    }

    /// Lenient parse used for stored rows; unknown labels yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "work" => Some(ActivityCategory::Work),
            "study" => Some(ActivityCategory::Study),
            "leisure" => Some(ActivityCategory::Leisure),
            "rest" => Some(ActivityCategory::Rest),
            "sport" => Some(ActivityCategory::Sport),
            _ => None,
        }
    }

    /// Work and study count as effort for balance and fatigue.
    pub fn is_effort(self) -> bool {
        matches!(self, ActivityCategory::Work | ActivityCategory::Study)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<ActivityCategory>,
    pub priority: i32,
    pub deadline: NaiveDateTime,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn duration(&self) -> Duration {
        self.end_at - self.start_at
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration().num_seconds() as f64 / 3600.0
    }

    pub fn is_effort(&self) -> bool {
        self.category.map(ActivityCategory::is_effort).unwrap_or(false)
    }

    pub fn is_rest(&self) -> bool {
        self.category == Some(ActivityCategory::Rest)
    }

    /// Hours by which `end_at` passes the deadline, zero when on time.
    pub fn lateness_hours(&self) -> f64 {
        if self.end_at > self.deadline {
            (self.end_at - self.deadline).num_seconds() as f64 / 3600.0
        } else {
            0.0
        }
    }

    /// Moves start and end by the same offset. Returns `false` and leaves the
    /// activity untouched when the offset falls outside the representable range.
    pub fn shift_minutes(&mut self, minutes: i64) -> bool {
        let Some(offset) = Duration::try_minutes(minutes) else {
            return false;
        };
        match (
            self.start_at.checked_add_signed(offset),
            self.end_at.checked_add_signed(offset),
        ) {
            (Some(start_at), Some(end_at)) => {
                self.start_at = start_at;
                self.end_at = end_at;
                true
            }
            _ => false,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_fields(&self.title, self.priority, self.start_at, self.end_at, &self.user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<ActivityCategory>,
    pub priority: i32,
    pub deadline: NaiveDateTime,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub user_id: String,
}

impl NewActivity {
    pub fn validate(&self) -> AppResult<()> {
        validate_fields(&self.title, self.priority, self.start_at, self.end_at, &self.user_id)
    }

    pub fn into_activity(self, id: String, created_at: DateTime<Utc>) -> Activity {
        Activity {
            id,
            title: self.title,
            description: self.description,
            category: self.category,
            priority: self.priority,
            deadline: self.deadline,
            start_at: self.start_at,
            end_at: self.end_at,
            user_id: self.user_id,
            created_at,
        }
    }
}

fn validate_fields(
    title: &str,
    priority: i32,
    start_at: NaiveDateTime,
    end_at: NaiveDateTime,
    user_id: &str,
) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::validation("activity title must not be empty"));
    }
    if user_id.trim().is_empty() {
        return Err(AppError::validation("activity must belong to a user"));
    }
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
        return Err(AppError::validation_with_details(
            "activity priority must be between 1 and 10",
            json!({"priority": priority}),
        ));
    }
    if start_at >= end_at {
        return Err(AppError::validation_with_details(
            "activity start must be strictly before its end",
            json!({"startAt": start_at.to_string(), "endAt": end_at.to_string()}),
        ));
    }
    Ok(())
}
