// Error handling and edge case tests

use std::sync::Arc;

use activity_planner_lib::db::{DbPool, MemoryStore, PlannerStore, SqliteStore};
use activity_planner_lib::error::AppError;
use activity_planner_lib::models::{
    Activity, ActivityCategory, ConstraintCategory, ConstraintStatus, NewActivity, NewConstraint,
    PlannerSettings,
};
use activity_planner_lib::services::planning_service::{OptimizeScheduleInput, PlanningService};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tempfile::tempdir;

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 10)
        .expect("date")
        .and_hms_opt(hour, minute, 0)
        .expect("time")
}

fn valid_activity() -> NewActivity {
    NewActivity {
        title: "Reading".to_string(),
        description: None,
        category: Some(ActivityCategory::Study),
        priority: 5,
        deadline: at(18, 0),
        start_at: at(9, 0),
        end_at: at(10, 0),
        user_id: "user-1".to_string(),
    }
}

fn planning() -> PlanningService {
    PlanningService::new(Arc::new(MemoryStore::new()), PlannerSettings::default())
        .expect("planning service")
}

#[test]
fn test_inverted_time_range_is_rejected() {
    let mut input = valid_activity();
    input.end_at = input.start_at;
    let err = planning().create_activity(input).expect_err("start == end");
    assert!(err.is_validation());
}

#[test]
fn test_priority_bounds() {
    for priority in [0, 11, -3] {
        let mut input = valid_activity();
        input.priority = priority;
        let err = planning().create_activity(input).expect_err("out of range");
        assert!(matches!(err, AppError::Validation { .. }));
    }

    for priority in [1, 10] {
        let mut input = valid_activity();
        input.priority = priority;
        assert!(planning().create_activity(input).is_ok());
    }
}

#[test]
fn test_empty_title_is_rejected() {
    let mut input = valid_activity();
    input.title = "   ".to_string();
    assert!(planning().create_activity(input).is_err());
}

#[test]
fn test_inverted_constraint_window_is_rejected() {
    let err = planning()
        .create_constraint(NewConstraint {
            title: "Backwards".to_string(),
            category: ConstraintCategory::Other,
            window_start: NaiveTime::from_hms_opt(14, 0, 0).expect("time"),
            window_end: NaiveTime::from_hms_opt(13, 0, 0).expect("time"),
            repetitive: false,
            specific_dates: Vec::new(),
            weekdays: Vec::new(),
            user_id: "user-1".to_string(),
            status: ConstraintStatus::Active,
        })
        .expect_err("window order");
    assert!(err.is_validation());
}

#[test]
fn test_negative_iterations_and_zero_budget() {
    let service = planning();
    service.create_activity(valid_activity()).expect("activity");

    let err = service
        .optimize_schedule(OptimizeScheduleInput {
            user_id: "user-1".to_string(),
            iterations: Some(-1),
            seed: None,
            time_budget_ms: None,
        })
        .expect_err("negative iterations");
    assert!(err.is_validation());
    assert!(err.validation_details().is_some());

    let err = service
        .optimize_schedule(OptimizeScheduleInput {
            user_id: "user-1".to_string(),
            iterations: Some(10),
            seed: None,
            time_budget_ms: Some(0),
        })
        .expect_err("zero budget");
    assert!(err.is_validation());
}

#[test]
fn test_empty_user_id_is_rejected() {
    assert!(planning().evaluate_schedule("").is_err());
}

#[test]
fn test_empty_schedule_is_harmless() {
    let service = planning();
    let evaluation = service.evaluate_schedule("nobody").expect("evaluate");
    assert_eq!(evaluation.activity_count, 0);
    assert_eq!(evaluation.score, 0.0);
    assert!(evaluation.is_valid);

    let result = service
        .optimize_schedule(OptimizeScheduleInput {
            user_id: "nobody".to_string(),
            iterations: Some(100),
            seed: Some(1),
            time_budget_ms: None,
        })
        .expect("optimize empty");
    assert!(result.outcome.activities.is_empty());
    assert_eq!(result.outcome.iterations_run, 0);
}

#[test]
fn test_uncategorized_activity_counts_for_nothing() {
    let service = planning();
    let mut input = valid_activity();
    input.category = None;
    service.create_activity(input).expect("uncategorized");

    let evaluation = service.evaluate_schedule("user-1").expect("evaluate");
    assert_eq!(evaluation.breakdown.balance_penalty, 0.0);
    assert_eq!(evaluation.breakdown.fatigue_penalty, 0.0);
    assert_eq!(evaluation.breakdown.appropriate_hours, 10.0);
    assert_eq!(evaluation.score, 5.0 + 10.0);
}

#[test]
fn test_saving_unknown_activity_is_not_found() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("errors.sqlite")).expect("db pool");
    let store = SqliteStore::new(pool);

    let ghost: Activity = valid_activity().into_activity("ghost".to_string(), chrono::Utc::now());
    let err = store.save_activity(&ghost).expect_err("unknown id");
    assert!(matches!(err, AppError::NotFound));

    let err = MemoryStore::new().save_activity(&ghost).expect_err("unknown id");
    assert!(matches!(err, AppError::NotFound));
}

#[test]
fn test_unknown_stored_category_loads_as_uncategorized() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("anomaly.sqlite")).expect("db pool");
    let store = SqliteStore::new(pool.clone());
    let id = store.insert_activity(&valid_activity()).expect("insert");

    pool.with_connection(|conn| {
        conn.execute("UPDATE activities SET category = 'meditation' WHERE id = ?1", [&id])?;
        Ok(())
    })
    .expect("corrupt category");

    let loaded = store.load_activities("user-1").expect("load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].category, None);
}

#[test]
fn test_priority_check_constraint_maps_to_conflict_error() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("check.sqlite")).expect("db pool");
    let store = SqliteStore::new(pool);

    let mut input = valid_activity();
    input.priority = 42;
    let err = store.insert_activity(&input).expect_err("check constraint");
    assert!(matches!(err, AppError::Conflict { .. }));
}
