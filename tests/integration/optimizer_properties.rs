use activity_planner_lib::models::{
    Activity, ActivityCategory, Constraint, ConstraintCategory, ConstraintStatus, OptimizerSettings,
    ScoringWeights,
};
use activity_planner_lib::services::planning_validator::is_valid;
use activity_planner_lib::services::schedule_optimizer::{
    mutate, RandomSource, ScheduleOptimizer, SeededRandom,
};
use activity_planner_lib::services::schedule_scoring::ScheduleScorer;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 10)
        .expect("date")
        .and_hms_opt(hour, minute, 0)
        .expect("time")
}

fn activity(
    id: &str,
    category: ActivityCategory,
    start: NaiveDateTime,
    minutes: i64,
    priority: i32,
) -> Activity {
    Activity {
        id: id.to_string(),
        title: id.to_string(),
        description: None,
        category: Some(category),
        priority,
        deadline: at(20, 0),
        start_at: start,
        end_at: start + Duration::minutes(minutes),
        user_id: "user-1".to_string(),
        created_at: Utc::now(),
    }
}

fn busy_day() -> (Vec<Activity>, Vec<Constraint>) {
    let activities = vec![
        activity("standup", ActivityCategory::Work, at(9, 0), 30, 6),
        activity("coding", ActivityCategory::Work, at(9, 15), 180, 9),
        activity("course", ActivityCategory::Study, at(12, 0), 120, 7),
        activity("gym", ActivityCategory::Sport, at(13, 30), 60, 5),
        activity("nap", ActivityCategory::Rest, at(14, 0), 45, 3),
    ];
    let lunch = Constraint {
        id: "lunch".to_string(),
        title: "Lunch".to_string(),
        category: ConstraintCategory::MealBreak,
        window_start: NaiveTime::from_hms_opt(12, 0, 0).expect("time"),
        window_end: NaiveTime::from_hms_opt(13, 0, 0).expect("time"),
        repetitive: true,
        specific_dates: Vec::new(),
        weekdays: vec![Weekday::Mon],
        user_id: "user-1".to_string(),
        status: ConstraintStatus::Active,
    };
    (activities, vec![lunch])
}

#[test]
fn optimizer_is_monotone_across_seeds() {
    let optimizer = ScheduleOptimizer::default();
    let scorer = ScheduleScorer::default();
    let (activities, constraints) = busy_day();
    let baseline = scorer.score_with_conflicts(&activities, &constraints);

    for seed in 0..20 {
        let mut rng = SeededRandom::new(seed);
        let outcome = optimizer.optimize(&activities, &constraints, 400, &mut rng);
        assert!(outcome.final_score >= baseline, "seed {seed} lowered the score");
        let rescored = scorer.score_with_conflicts(&outcome.activities, &constraints);
        assert!((rescored - outcome.final_score).abs() < 1e-9);
    }
}

#[test]
fn optimizer_preserves_ids_and_durations() {
    let optimizer = ScheduleOptimizer::default();
    let (activities, constraints) = busy_day();
    let outcome = optimizer.optimize(&activities, &constraints, 1_000, &mut SeededRandom::new(99));

    assert_eq!(outcome.activities.len(), activities.len());
    for (before, after) in activities.iter().zip(&outcome.activities) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.duration(), after.duration());
        assert_eq!(before.priority, after.priority);
    }
}

#[test]
fn penalized_score_never_exceeds_plain_score() {
    let scorer = ScheduleScorer::default();
    let (activities, constraints) = busy_day();
    let mut rng = SeededRandom::new(5);
    let mut current = activities;

    for _ in 0..200 {
        current = mutate(&current, &mut rng, 30);
        assert!(scorer.score_with_conflicts(&current, &constraints) <= scorer.score(&current));
        if is_valid(&current, &constraints) {
            assert_eq!(
                scorer.score_with_conflicts(&current, &constraints),
                scorer.score(&current)
            );
        }
    }
}

#[test]
fn zero_iterations_return_input_unchanged() {
    let optimizer = ScheduleOptimizer::default();
    let (activities, constraints) = busy_day();
    let outcome = optimizer.optimize(&activities, &constraints, 0, &mut SeededRandom::new(1));
    assert_eq!(outcome.activities, activities);
}

#[test]
fn custom_shift_range_bounds_every_move() {
    let settings = OptimizerSettings {
        default_iterations: 50,
        max_shift_minutes: 5,
        time_budget_ms: None,
    };
    let optimizer =
        ScheduleOptimizer::new(ScoringWeights::default(), &settings).expect("optimizer");
    let (activities, constraints) = busy_day();
    let outcome = optimizer.optimize(&activities, &constraints, 1, &mut SeededRandom::new(8));

    for (before, after) in activities.iter().zip(&outcome.activities) {
        let moved = (after.start_at - before.start_at).num_minutes().abs();
        assert!(moved <= 5);
    }
}

struct AlwaysForward;

impl RandomSource for AlwaysForward {
    fn pick_index(&mut self, _len: usize) -> usize {
        0
    }

    fn shift_minutes(&mut self, max_minutes: i64) -> i64 {
        max_minutes
    }
}

#[test]
fn scripted_source_drives_a_known_trajectory() {
    let optimizer = ScheduleOptimizer::default();
    let first = activity("first", ActivityCategory::Leisure, at(9, 0), 60, 5);
    let second = activity("second", ActivityCategory::Leisure, at(8, 0), 90, 5);

    let outcome = optimizer.optimize(&[first, second], &[], 2, &mut AlwaysForward);
    assert_eq!(outcome.activities[0].start_at, at(10, 0));
    assert_eq!(outcome.remaining_overlaps, 0);
    assert_eq!(outcome.improving_moves, 1);
    assert_eq!(outcome.accepted_moves, 2);
}
