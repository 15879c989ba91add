use std::sync::Arc;

use activity_planner_lib::db::{DbPool, MemoryStore, PlannerStore, SqliteStore};
use activity_planner_lib::models::{
    ActivityCategory, ConflictType, ConstraintCategory, ConstraintStatus, NewActivity,
    NewConstraint, PlannerSettings,
};
use activity_planner_lib::services::conflict_service::ConflictService;
use activity_planner_lib::services::planning_service::PlanningService;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use tempfile::{tempdir, TempDir};

const USER: &str = "user-1";

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 10)
        .expect("monday")
        .and_hms_opt(hour, minute, 0)
        .expect("time")
}

fn new_activity(
    title: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    priority: i32,
) -> NewActivity {
    NewActivity {
        title: title.to_string(),
        description: Some(format!("{title} session")),
        category: Some(ActivityCategory::Leisure),
        priority,
        deadline: at(23, 0),
        start_at: start,
        end_at: end,
        user_id: USER.to_string(),
    }
}

fn sqlite_store() -> (TempDir, Arc<SqliteStore>) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("conflicts.sqlite")).expect("db pool");
    (dir, Arc::new(SqliteStore::new(pool)))
}

#[test]
fn overlapping_pair_is_recorded_once_in_sqlite() {
    let (_dir, store) = sqlite_store();
    let reading = store
        .insert_activity(&new_activity("Reading", at(9, 0), at(11, 0), 9))
        .expect("reading");
    let football = store
        .insert_activity(&new_activity("Football", at(10, 0), at(12, 0), 6))
        .expect("football");

    let service = ConflictService::new(store.clone());
    let activities = store.load_activities(USER).expect("load");

    let created = service.detect_overlaps(&activities).expect("detect");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].conflict_type, ConflictType::Overlap);
    assert!(created[0].links_exactly(&[reading.as_str(), football.as_str()]));

    let unresolved = store.load_unresolved_conflicts(USER).expect("unresolved");
    assert_eq!(unresolved.len(), 1);
    assert!(unresolved[0].links_exactly(&[football.as_str(), reading.as_str()]));

    assert!(service.detect_overlaps(&activities).expect("again").is_empty());
    assert!(service
        .already_exists(USER, &reading, &football)
        .expect("exists check"));
}

#[test]
fn mark_resolved_round_trip_in_sqlite() {
    let (_dir, store) = sqlite_store();
    store
        .insert_activity(&new_activity("Reading", at(9, 0), at(11, 0), 9))
        .expect("reading");
    store
        .insert_activity(&new_activity("Football", at(10, 0), at(12, 0), 6))
        .expect("football");
    let service = ConflictService::new(store.clone());

    assert!(!service.mark_resolved("does-not-exist").expect("missing id"));

    let activities = store.load_activities(USER).expect("load");
    let created = service.detect_overlaps(&activities).expect("detect");
    let id = created[0].id.clone();

    assert!(service.mark_resolved(&id).expect("resolve"));
    let stored = store.find_conflict(&id).expect("lookup").expect("exists");
    assert!(stored.resolved);
    assert!(store.load_unresolved_conflicts(USER).expect("unresolved").is_empty());
    assert!(service.mark_resolved(&id).expect("idempotent"));
}

fn stored_resolved_at(store: &SqliteStore, conflict_id: &str) -> Option<String> {
    store
        .pool()
        .with_connection(|conn| {
            let value: Option<String> = conn.query_row(
                "SELECT resolved_at FROM conflicts WHERE id = ?1",
                [conflict_id],
                |row| row.get(0),
            )?;
            Ok(value)
        })
        .expect("resolved_at")
}

#[test]
fn resolving_twice_keeps_the_first_resolution_time() {
    let (_dir, store) = sqlite_store();
    store
        .insert_activity(&new_activity("Reading", at(9, 0), at(11, 0), 9))
        .expect("reading");
    store
        .insert_activity(&new_activity("Football", at(10, 0), at(12, 0), 6))
        .expect("football");
    let service = ConflictService::new(store.clone());

    let activities = store.load_activities(USER).expect("load");
    let id = service.detect_overlaps(&activities).expect("detect")[0].id.clone();
    assert_eq!(stored_resolved_at(&store, &id), None);

    assert!(service.mark_resolved(&id).expect("first resolve"));
    let first = stored_resolved_at(&store, &id);
    assert!(first.is_some());

    std::thread::sleep(std::time::Duration::from_millis(20));
    assert!(service.mark_resolved(&id).expect("second resolve"));
    assert_eq!(stored_resolved_at(&store, &id), first);
    assert!(store.find_conflict(&id).expect("lookup").expect("exists").resolved);
}

#[test]
fn planning_service_records_every_conflict_kind() {
    let store = Arc::new(MemoryStore::new());
    let planning =
        PlanningService::new(store.clone(), PlannerSettings::default()).expect("planning");

    let mut late = new_activity("Report", at(21, 0), at(23, 30), 7);
    late.category = Some(ActivityCategory::Work);
    let report = planning.create_activity_with_conflicts(late).expect("late report");
    assert!(report.conflicts.is_empty());
    let movie = planning
        .create_activity_with_conflicts(new_activity("Movie", at(22, 0), at(23, 0), 3))
        .expect("movie");
    assert_eq!(movie.conflicts.len(), 1);
    assert_eq!(movie.conflicts[0].conflict_type, ConflictType::Overlap);
    let pair = [report.activity.id.as_str(), movie.activity.id.as_str()];
    assert!(movie.conflicts[0].links_exactly(&pair));
    planning
        .create_constraint(NewConstraint {
            title: "Sleep".to_string(),
            category: ConstraintCategory::Sleep,
            window_start: NaiveTime::from_hms_opt(22, 0, 0).expect("time"),
            window_end: NaiveTime::from_hms_opt(23, 59, 0).expect("time"),
            repetitive: true,
            specific_dates: Vec::new(),
            weekdays: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
            user_id: USER.to_string(),
            status: ConstraintStatus::Active,
        })
        .expect("sleep");

    let detected = planning.detect_conflicts(USER).expect("detect");
    assert!(detected.overlaps.is_empty());
    assert_eq!(detected.constraint_violations.len(), 2);
    let quality = detected
        .quality_issues
        .iter()
        .map(|conflict| conflict.conflict_type)
        .collect::<Vec<_>>();
    assert!(quality.contains(&ConflictType::Deadline));
    assert!(quality.contains(&ConflictType::InsufficientRest));

    let again = planning.detect_conflicts(USER).expect("detect again");
    assert_eq!(again.total(), 0);
    assert_eq!(
        planning.unresolved_conflicts(USER).expect("unresolved").len(),
        detected.total() + 1
    );
}

#[test]
fn creating_an_overlapping_activity_records_one_overlap() {
    let (_dir, store) = sqlite_store();
    let planning =
        PlanningService::new(store.clone(), PlannerSettings::default()).expect("planning");

    let reading = planning
        .create_activity(new_activity("Reading", at(9, 0), at(11, 0), 9))
        .expect("reading");
    assert!(store.load_unresolved_conflicts(USER).expect("unresolved").is_empty());

    let football = planning
        .create_activity_with_conflicts(new_activity("Football", at(10, 0), at(12, 0), 6))
        .expect("football");
    assert_eq!(football.conflicts.len(), 1);

    let unresolved = store.load_unresolved_conflicts(USER).expect("unresolved");
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].conflict_type, ConflictType::Overlap);
    assert!(unresolved[0].links_exactly(&[reading.id.as_str(), football.activity.id.as_str()]));

    planning
        .create_activity(new_activity("Walk", at(13, 0), at(14, 0), 4))
        .expect("walk");
    assert_eq!(store.load_unresolved_conflicts(USER).expect("unresolved").len(), 1);
}

#[test]
fn creating_an_activity_inside_a_blocked_window_records_a_violation() {
    let store = Arc::new(MemoryStore::new());
    let planning =
        PlanningService::new(store.clone(), PlannerSettings::default()).expect("planning");
    let constraint_id = planning
        .create_constraint(NewConstraint {
            title: "Lunch".to_string(),
            category: ConstraintCategory::MealBreak,
            window_start: NaiveTime::from_hms_opt(12, 0, 0).expect("time"),
            window_end: NaiveTime::from_hms_opt(13, 0, 0).expect("time"),
            repetitive: true,
            specific_dates: Vec::new(),
            weekdays: vec![Weekday::Mon],
            user_id: USER.to_string(),
            status: ConstraintStatus::Active,
        })
        .expect("lunch");

    let created = planning
        .create_activity_with_conflicts(new_activity("Call", at(12, 30), at(13, 30), 5))
        .expect("call");
    assert_eq!(created.conflicts.len(), 1);
    assert_eq!(created.conflicts[0].conflict_type, ConflictType::ConstraintViolation);
    assert_eq!(created.conflicts[0].constraint_id.as_deref(), Some(constraint_id.as_str()));
}

#[test]
fn auto_resolution_persists_in_sqlite() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("planner.sqlite")).expect("db pool");
    let planning = PlanningService::from_database(pool).expect("planning");

    planning
        .create_activity(new_activity("Reading", at(9, 0), at(11, 0), 9))
        .expect("reading");
    let football = planning
        .create_activity(new_activity("Football", at(10, 0), at(12, 0), 6))
        .expect("football");

    let report = planning.auto_resolve_overlaps(USER).expect("resolve");
    assert_eq!(report.resolved_pairs, 1);
    assert_eq!(report.moved[0].id, football.id);
    assert_eq!(report.moved[0].start_at, at(11, 0));
    assert_eq!(report.moved[0].end_at, at(13, 0));

    let evaluation = planning.evaluate_schedule(USER).expect("evaluate");
    assert!(evaluation.is_valid);
    assert!(planning
        .detect_conflicts(USER)
        .expect("detect")
        .overlaps
        .is_empty());
}

#[test]
fn other_users_are_isolated() {
    let store = Arc::new(MemoryStore::new());
    let planning =
        PlanningService::new(store.clone(), PlannerSettings::default()).expect("planning");

    planning
        .create_activity(new_activity("Reading", at(9, 0), at(11, 0), 9))
        .expect("reading");
    let mut foreign = new_activity("Football", at(10, 0), at(12, 0), 6);
    foreign.user_id = "user-2".to_string();
    planning.create_activity(foreign).expect("foreign");

    assert!(planning.detect_conflicts(USER).expect("user 1").overlaps.is_empty());
    assert!(planning.detect_conflicts("user-2").expect("user 2").overlaps.is_empty());
    assert!(store.all_conflicts().expect("all").is_empty());
}
