use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::db::{DbPool, PlannerStore, SqliteStore};
use crate::error::{AppError, AppResult};
use crate::models::{Activity, Conflict, Constraint, NewActivity, NewConstraint, PlannerSettings};
use crate::services::conflict_service::{resolve_overlaps, ConflictService};
use crate::services::planning_validator::{
    count_overlaps, count_violations, is_valid, validate_schedule_input,
};
use crate::services::schedule_optimizer::{
    checked_iterations, OptimizationOutcome, RandomSource, ScheduleOptimizer, SeededRandom,
};
use crate::services::schedule_scoring::{ScheduleScorer, ScoreBreakdown};
use crate::services::settings_service::SettingsService;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeScheduleInput {
    pub user_id: String,
    #[serde(default)]
    pub iterations: Option<i64>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEvaluation {
    pub user_id: String,
    pub activity_count: usize,
    pub constraint_count: usize,
    pub breakdown: ScoreBreakdown,
    pub score: f64,
    pub score_with_conflicts: f64,
    pub overlap_count: usize,
    pub violation_count: usize,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeScheduleResult {
    pub outcome: OptimizationOutcome,
    pub moved_activity_ids: Vec<String>,
    pub new_conflicts: Vec<Conflict>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DetectedConflicts {
    pub overlaps: Vec<Conflict>,
    pub constraint_violations: Vec<Conflict>,
    pub quality_issues: Vec<Conflict>,
}

impl DetectedConflicts {
    pub fn total(&self) -> usize {
        self.overlaps.len() + self.constraint_violations.len() + self.quality_issues.len()
    }
}

/// A stored activity together with the conflicts its insertion introduced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedActivity {
    pub activity: Activity,
    pub conflicts: Vec<Conflict>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AutoResolveReport {
    pub resolved_pairs: usize,
    pub moved: Vec<Activity>,
    pub remaining_overlaps: usize,
}

/// Entry point for callers: loads a user's schedule, runs the algorithms, writes results back.
pub struct PlanningService {
    store: Arc<dyn PlannerStore>,
    conflicts: ConflictService,
    settings: PlannerSettings,
    scorer: ScheduleScorer,
}

impl PlanningService {
    pub fn new(store: Arc<dyn PlannerStore>, settings: PlannerSettings) -> AppResult<Self> {
        settings.validate()?;
        let scorer = ScheduleScorer::new(settings.scoring.clone())?;
        Ok(Self {
            conflicts: ConflictService::new(store.clone()),
            store,
            settings,
            scorer,
        })
    }

    /// SQLite-backed service configured from the stored planner settings.
    pub fn from_database(db: DbPool) -> AppResult<Self> {
        let settings = SettingsService::new(db.clone()).get()?;
        Self::new(Arc::new(SqliteStore::new(db)), settings)
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    pub fn conflict_service(&self) -> &ConflictService {
        &self.conflicts
    }

    pub fn create_activity(&self, input: NewActivity) -> AppResult<Activity> {
        self.create_activity_with_conflicts(input).map(|created| created.activity)
    }

    /// Stores an activity, then records the overlaps and constraint violations
    /// of the owner's schedule that are not already on record.
    pub fn create_activity_with_conflicts(&self, input: NewActivity) -> AppResult<CreatedActivity> {
        input.validate()?;
        let id = self.store.insert_activity(&input)?;
        info!(
            target: "app::planning",
            activity_id = %id,
            user_id = %input.user_id,
            "activity created"
        );

        let (activities, constraints) = self.load_schedule(&input.user_id)?;
        let activity = activities
            .iter()
            .find(|activity| activity.id == id)
            .cloned()
            .ok_or_else(AppError::not_found)?;

        let mut conflicts = self.conflicts.detect_overlaps(&activities)?;
        conflicts.extend(self.conflicts.detect_constraint_violations(&activities, &constraints)?);
        if !conflicts.is_empty() {
            warn!(
                target: "app::planning",
                activity_id = %id,
                count = conflicts.len(),
                "new activity conflicts with the schedule"
            );
        }

        Ok(CreatedActivity {
            activity,
            conflicts,
        })
    }

    pub fn create_constraint(&self, input: NewConstraint) -> AppResult<String> {
        input.validate()?;
        let id = self.store.insert_constraint(&input)?;
        info!(
            target: "app::planning",
            constraint_id = %id,
            user_id = %input.user_id,
            "constraint created"
        );
        Ok(id)
    }

    pub fn evaluate_schedule(&self, user_id: &str) -> AppResult<ScheduleEvaluation> {
        let (activities, constraints) = self.load_schedule(user_id)?;
        let breakdown = self.scorer.breakdown(&activities);

        Ok(ScheduleEvaluation {
            user_id: user_id.to_string(),
            activity_count: activities.len(),
            constraint_count: constraints.len(),
            score: breakdown.total,
            score_with_conflicts: self.scorer.score_with_conflicts(&activities, &constraints),
            breakdown,
            overlap_count: count_overlaps(&activities),
            violation_count: count_violations(&activities, &constraints),
            is_valid: is_valid(&activities, &constraints),
        })
    }

    /// Optimizes a user's schedule, persists moved activities and records fresh overlaps.
    pub fn optimize_schedule(
        &self,
        input: OptimizeScheduleInput,
    ) -> AppResult<OptimizeScheduleResult> {
        let iterations = match input.iterations {
            Some(value) => checked_iterations(value)?,
            None => self.settings.optimizer.default_iterations,
        };
        let budget_ms = input.time_budget_ms.or(self.settings.optimizer.time_budget_ms);
        if budget_ms == Some(0) {
            return Err(AppError::validation_with_details(
                "time budget must be positive",
                json!({"timeBudgetMs": 0}),
            ));
        }

        let (activities, constraints) = self.load_schedule(&input.user_id)?;
        let optimizer =
            ScheduleOptimizer::new(self.settings.scoring.clone(), &self.settings.optimizer)?;
        let mut rng = match input.seed {
            Some(seed) => SeededRandom::new(seed),
            None => SeededRandom::from_entropy(),
        };

        let outcome = self.run_optimizer(
            &optimizer,
            &activities,
            &constraints,
            iterations,
            budget_ms.map(StdDuration::from_millis),
            &mut rng,
        );

        let mut moved_activity_ids = Vec::new();
        for (before, after) in activities.iter().zip(&outcome.activities) {
            if before.start_at != after.start_at || before.end_at != after.end_at {
                self.store.save_activity(after)?;
                moved_activity_ids.push(after.id.clone());
            }
        }

        let new_conflicts = self.conflicts.detect_overlaps(&outcome.activities)?;
        if outcome.remaining_overlaps > 0 {
            warn!(
                target: "app::planning",
                user_id = %input.user_id,
                remaining = outcome.remaining_overlaps,
                "optimized schedule still contains overlaps"
            );
        }

        info!(
            target: "app::planning",
            user_id = %input.user_id,
            moved = moved_activity_ids.len(),
            final_score = outcome.final_score,
            "schedule optimized"
        );

        Ok(OptimizeScheduleResult {
            outcome,
            moved_activity_ids,
            new_conflicts,
        })
    }

    pub fn detect_conflicts(&self, user_id: &str) -> AppResult<DetectedConflicts> {
        let (activities, constraints) = self.load_schedule(user_id)?;
        let detected = DetectedConflicts {
            overlaps: self.conflicts.detect_overlaps(&activities)?,
            constraint_violations: self
                .conflicts
                .detect_constraint_violations(&activities, &constraints)?,
            quality_issues: self.conflicts.detect_quality_issues(&activities, &self.scorer)?,
        };
        debug!(
            target: "app::planning",
            user_id,
            total = detected.total(),
            "conflict detection finished"
        );
        Ok(detected)
    }

    pub fn auto_resolve_overlaps(&self, user_id: &str) -> AppResult<AutoResolveReport> {
        let (activities, _) = self.load_schedule(user_id)?;
        let (adjusted, resolved_pairs) = resolve_overlaps(&activities);

        let mut moved = Vec::new();
        for activity in &adjusted {
            let changed = activities
                .iter()
                .find(|original| original.id == activity.id)
                .is_some_and(|original| original.start_at != activity.start_at);
            if changed {
                self.store.save_activity(activity)?;
                moved.push(activity.clone());
            }
        }

        info!(
            target: "app::planning",
            user_id,
            resolved_pairs,
            moved = moved.len(),
            "overlaps auto-resolved"
        );

        Ok(AutoResolveReport {
            resolved_pairs,
            moved,
            remaining_overlaps: count_overlaps(&adjusted),
        })
    }

    pub fn mark_conflict_resolved(&self, conflict_id: &str) -> AppResult<bool> {
        self.conflicts.mark_resolved(conflict_id)
    }

    pub fn unresolved_conflicts(&self, user_id: &str) -> AppResult<Vec<Conflict>> {
        self.store.load_unresolved_conflicts(user_id)
    }

    fn run_optimizer(
        &self,
        optimizer: &ScheduleOptimizer,
        activities: &[Activity],
        constraints: &[Constraint],
        iterations: usize,
        budget: Option<StdDuration>,
        rng: &mut dyn RandomSource,
    ) -> OptimizationOutcome {
        match budget {
            Some(budget) => {
                optimizer.optimize_with_budget(activities, constraints, iterations, budget, rng)
            }
            None => optimizer.optimize(activities, constraints, iterations, rng),
        }
    }

    fn load_schedule(&self, user_id: &str) -> AppResult<(Vec<Activity>, Vec<Constraint>)> {
        if user_id.trim().is_empty() {
            return Err(AppError::validation("user id must not be empty"));
        }

        let activities = self.store.load_activities(user_id)?;
        let constraints = self.store.load_active_constraints(user_id)?;
        validate_schedule_input(&activities, &constraints)?;
        Ok((activities, constraints))
    }
}
