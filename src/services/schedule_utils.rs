use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::{Activity, Constraint};

const STORAGE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const STORAGE_DATE_FORMAT: &str = "%Y-%m-%d";
const STORAGE_TIME_FORMAT: &str = "%H:%M:%S";

/// Half-open interval intersection of two activities' time ranges.
///
/// Touching boundaries do not count. Callers exclude self-comparison.
pub fn overlaps(a: &Activity, b: &Activity) -> bool {
    ranges_intersect(a.start_at, a.end_at, b.start_at, b.end_at)
}

pub fn ranges_intersect<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && a_end > b_start
}

/// Whether `activity` falls inside the blocked window of an active, applicable `constraint`.
pub fn violates(activity: &Activity, constraint: &Constraint) -> bool {
    if !constraint.is_active() {
        return false;
    }

    if !constraint.applies_on(activity.start_at.date()) {
        return false;
    }

    let (activity_start, activity_end) = time_of_day_range(activity);
    let window_start = seconds_from_midnight(constraint.window_start);
    let window_end = seconds_from_midnight(constraint.window_end);

    ranges_intersect(activity_start, activity_end, window_start, window_end)
}

/// Activity range in seconds since the start date's midnight; may run past one day.
pub fn time_of_day_range(activity: &Activity) -> (i64, i64) {
    let start = seconds_from_midnight(activity.start_at.time());
    (start, start + activity.duration().num_seconds().max(0))
}

pub fn seconds_from_midnight(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight())
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format(STORAGE_DATETIME_FORMAT).to_string()
}

pub fn parse_datetime(value: &str) -> AppResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, STORAGE_DATETIME_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "invalid datetime format",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn format_date(value: NaiveDate) -> String {
    value.format(STORAGE_DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, STORAGE_DATE_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "invalid date format",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn format_time(value: NaiveTime) -> String {
    value.format(STORAGE_TIME_FORMAT).to_string()
}

pub fn parse_time(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value, STORAGE_TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|err| {
            AppError::validation_with_details(
                "invalid time format",
                json!({"value": value, "error": err.to_string()}),
            )
        })
}
