use std::time::{Duration as StdDuration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{Activity, Constraint, OptimizerSettings, ScoringWeights};
use crate::services::planning_validator::{count_overlaps, count_violations};
use crate::services::schedule_scoring::ScheduleScorer;

const PROGRESS_LOG_EVERY: usize = 100;

/// Source of randomness for mutations. Seedable so trajectories can be replayed.
pub trait RandomSource {
    /// Uniform index in `0..len`; `len` is never zero.
    fn pick_index(&mut self, len: usize) -> usize;

    /// Uniform offset in `-max_minutes..=max_minutes`.
    fn shift_minutes(&mut self, max_minutes: i64) -> i64;
}

/// [`RandomSource`] backed by a seeded `StdRng`.
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn pick_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    fn shift_minutes(&mut self, max_minutes: i64) -> i64 {
        self.rng.gen_range(-max_minutes..=max_minutes)
    }
}

/// Copy of `activities` with one uniformly chosen activity moved by a random offset.
///
/// The input is left untouched and the moved activity keeps its duration.
pub fn mutate(
    activities: &[Activity],
    rng: &mut dyn RandomSource,
    max_shift_minutes: i64,
) -> Vec<Activity> {
    let mut candidate = activities.to_vec();
    if candidate.is_empty() {
        return candidate;
    }

    let idx = rng.pick_index(candidate.len());
    let offset = rng.shift_minutes(max_shift_minutes);
    candidate[idx].shift_minutes(offset);
    candidate
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationOutcome {
    pub activities: Vec<Activity>,
    pub initial_score: f64,
    pub final_score: f64,
    pub iterations_run: usize,
    pub accepted_moves: usize,
    pub improving_moves: usize,
    pub stopped_early: bool,
    pub remaining_overlaps: usize,
    pub remaining_violations: usize,
}

impl OptimizationOutcome {
    pub fn improved(&self) -> bool {
        self.final_score > self.initial_score
    }
}

/// Greedy hill climbing over single-activity time shifts.
pub struct ScheduleOptimizer {
    scorer: ScheduleScorer,
    max_shift_minutes: i64,
}

impl Default for ScheduleOptimizer {
    fn default() -> Self {
        Self {
            scorer: ScheduleScorer::default(),
            max_shift_minutes: OptimizerSettings::default().max_shift_minutes,
        }
    }
}

impl ScheduleOptimizer {
    pub fn new(weights: ScoringWeights, settings: &OptimizerSettings) -> AppResult<Self> {
        settings.validate()?;
        Ok(Self {
            scorer: ScheduleScorer::new(weights)?,
            max_shift_minutes: settings.max_shift_minutes,
        })
    }

    pub fn scorer(&self) -> &ScheduleScorer {
        &self.scorer
    }

    /// Runs exactly `iterations` mutate-and-score steps and returns the best arrangement.
    pub fn optimize(
        &self,
        activities: &[Activity],
        constraints: &[Constraint],
        iterations: usize,
        rng: &mut dyn RandomSource,
    ) -> OptimizationOutcome {
        self.run(activities, constraints, iterations, None, rng)
    }

    /// Like [`optimize`](Self::optimize) but stops once `budget` has elapsed.
    pub fn optimize_with_budget(
        &self,
        activities: &[Activity],
        constraints: &[Constraint],
        iterations: usize,
        budget: StdDuration,
        rng: &mut dyn RandomSource,
    ) -> OptimizationOutcome {
        let deadline = Instant::now() + budget;
        self.run(activities, constraints, iterations, Some(deadline), rng)
    }

    fn run(
        &self,
        activities: &[Activity],
        constraints: &[Constraint],
        iterations: usize,
        deadline: Option<Instant>,
        rng: &mut dyn RandomSource,
    ) -> OptimizationOutcome {
        let mut best = activities.to_vec();
        let initial_score = self.scorer.score_with_conflicts(&best, constraints);
        let mut best_score = initial_score;

        debug!(
            target: "app::optimizer",
            activities = best.len(),
            constraints = constraints.len(),
            iterations,
            initial_score,
            "starting optimization"
        );

        let mut iterations_run = 0;
        let mut accepted_moves = 0;
        let mut improving_moves = 0;
        let mut stopped_early = false;

        if !best.is_empty() {
            for step in 0..iterations {
                if deadline.is_some_and(|limit| Instant::now() >= limit) {
                    stopped_early = true;
                    break;
                }

                let candidate = mutate(&best, rng, self.max_shift_minutes);
                let candidate_score = self.scorer.score_with_conflicts(&candidate, constraints);
                iterations_run += 1;

                if candidate_score >= best_score {
                    if candidate_score > best_score {
                        improving_moves += 1;
                    }
                    accepted_moves += 1;
                    best = candidate;
                    best_score = candidate_score;
                }

                if (step + 1) % PROGRESS_LOG_EVERY == 0 {
                    debug!(
                        target: "app::optimizer",
                        iteration = step + 1,
                        score = best_score,
                        accepted_moves,
                        "optimization progress"
                    );
                }
            }
        }

        let remaining_overlaps = count_overlaps(&best);
        let remaining_violations = count_violations(&best, constraints);

        info!(
            target: "app::optimizer",
            initial_score,
            final_score = best_score,
            iterations_run,
            improving_moves,
            stopped_early,
            remaining_overlaps,
            remaining_violations,
            "optimization finished"
        );

        OptimizationOutcome {
            activities: best,
            initial_score,
            final_score: best_score,
            iterations_run,
            accepted_moves,
            improving_moves,
            stopped_early,
            remaining_overlaps,
            remaining_violations,
        }
    }
}

/// Converts a caller-supplied iteration count, rejecting negatives.
pub fn checked_iterations(iterations: i64) -> AppResult<usize> {
    usize::try_from(iterations).map_err(|_| {
        AppError::validation_with_details(
            "iterations must not be negative",
            serde_json::json!({"iterations": iterations}),
        )
    })
}
