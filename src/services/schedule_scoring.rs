use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::{Activity, Constraint, ScoringWeights};
use crate::services::planning_validator::{count_overlaps, count_violations};

/// Per-term view of a score; `total` is what [`ScheduleScorer::score`] returns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub priority: f64,
    pub deadline_penalty: f64,
    pub balance_penalty: f64,
    pub fatigue_penalty: f64,
    pub appropriate_hours: f64,
    pub compactness: f64,
    pub total: f64,
}

/// A maximal chain of back-to-back work/study activities.
#[derive(Debug, Clone, PartialEq)]
pub struct EffortRun {
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub activity_ids: Vec<String>,
}

impl EffortRun {
    pub fn hours(&self) -> f64 {
        (self.end_at - self.start_at).num_seconds() as f64 / 3600.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleScorer {
    weights: ScoringWeights,
}

impl ScheduleScorer {
    pub fn new(weights: ScoringWeights) -> AppResult<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Quality of a schedule on its own, ignoring feasibility. Higher is better.
    pub fn score(&self, activities: &[Activity]) -> f64 {
        self.breakdown(activities).total
    }

    pub fn breakdown(&self, activities: &[Activity]) -> ScoreBreakdown {
        let priority = self.priority_term(activities);
        let deadline_penalty = self.deadline_penalty(activities);
        let balance_penalty = self.balance_penalty(activities);
        let fatigue_penalty = self.fatigue_penalty(activities);
        let appropriate_hours = self.appropriate_hours_term(activities);
        let compactness = self.compactness_term(activities);

        ScoreBreakdown {
            priority,
            deadline_penalty,
            balance_penalty,
            fatigue_penalty,
            appropriate_hours,
            compactness,
            total: priority + appropriate_hours + compactness
                - deadline_penalty
                - balance_penalty
                - fatigue_penalty,
        }
    }

    /// [`score`](Self::score) minus a fixed penalty per overlap and per constraint violation.
    pub fn score_with_conflicts(&self, activities: &[Activity], constraints: &[Constraint]) -> f64 {
        let overlaps = count_overlaps(activities) as f64;
        let violations = count_violations(activities, constraints) as f64;

        self.score(activities)
            - overlaps * self.weights.overlap_penalty
            - violations * self.weights.violation_penalty
    }

    pub fn priority_term(&self, activities: &[Activity]) -> f64 {
        let sum: i64 = activities.iter().map(|a| a.priority as i64).sum();
        sum as f64 * self.weights.priority_weight
    }

    pub fn deadline_penalty(&self, activities: &[Activity]) -> f64 {
        let late_hours: f64 = activities.iter().map(Activity::lateness_hours).sum();
        late_hours * self.weights.deadline_penalty_per_hour
    }

    pub fn balance_penalty(&self, activities: &[Activity]) -> f64 {
        let (effort, rest) = effort_and_rest_hours(activities);
        let per_unit = self.weights.balance_penalty_per_unit;

        if rest <= 0.0 {
            // Without rest the ratio is unbounded; charge every effort hour instead.
            return effort * per_unit;
        }

        let ratio = effort / rest;
        let low = self.weights.balance_band_low;
        let high = self.weights.balance_band_high;
        if ratio < low {
            (low - ratio) * per_unit
        } else if ratio > high {
            (ratio - high) * per_unit
        } else {
            0.0
        }
    }

    pub fn fatigue_penalty(&self, activities: &[Activity]) -> f64 {
        let Some(run) = self.longest_effort_run(activities) else {
            return 0.0;
        };
        let excess = run.hours() - self.weights.fatigue_threshold_hours;
        if excess <= 0.0 {
            0.0
        } else {
            excess * excess * self.weights.fatigue_penalty_per_hour
        }
    }

    /// Share of activities starting inside the daytime hours, times its weight.
    pub fn appropriate_hours_term(&self, activities: &[Activity]) -> f64 {
        if activities.is_empty() {
            return 0.0;
        }
        let hours = self.weights.appropriate_start_hour..self.weights.appropriate_end_hour;
        let well_placed = activities
            .iter()
            .filter(|activity| hours.contains(&activity.start_at.hour()))
            .count();
        well_placed as f64 / activities.len() as f64 * self.weights.appropriate_hours_weight
    }

    /// Share of consecutive gaps (by start time) that are neither negative nor
    /// longer than `compact_gap_minutes`, times its weight.
    pub fn compactness_term(&self, activities: &[Activity]) -> f64 {
        if activities.len() < 2 {
            return 0.0;
        }
        let mut ordered = activities.iter().collect::<Vec<_>>();
        ordered.sort_by(|a, b| a.start_at.cmp(&b.start_at).then_with(|| a.id.cmp(&b.id)));

        let max_gap = self.weights.compact_gap_minutes * 60;
        let compact = ordered
            .windows(2)
            .filter(|pair| {
                let gap = (pair[1].start_at - pair[0].end_at).num_seconds();
                (0..=max_gap).contains(&gap)
            })
            .count();
        compact as f64 / (ordered.len() - 1) as f64 * self.weights.compactness_weight
    }

    pub fn longest_effort_run(&self, activities: &[Activity]) -> Option<EffortRun> {
        let max_gap = Duration::try_minutes(self.weights.fatigue_gap_minutes)
            .unwrap_or_else(|| Duration::days(1));
        longest_effort_run(activities, max_gap)
    }

    /// Effort-to-rest ratio, `None` when there is no rest at all.
    pub fn balance_ratio(&self, activities: &[Activity]) -> Option<f64> {
        let (effort, rest) = effort_and_rest_hours(activities);
        if rest > 0.0 {
            Some(effort / rest)
        } else {
            None
        }
    }
}

/// Total work+study hours and rest hours. Activities without a category count for neither.
pub fn effort_and_rest_hours(activities: &[Activity]) -> (f64, f64) {
    activities.iter().fold((0.0, 0.0), |(effort, rest), activity| {
        if activity.is_effort() {
            (effort + activity.duration_hours(), rest)
        } else if activity.is_rest() {
            (effort, rest + activity.duration_hours())
        } else {
            (effort, rest)
        }
    })
}

pub fn longest_effort_run(activities: &[Activity], max_gap: Duration) -> Option<EffortRun> {
    let mut effort = activities
        .iter()
        .filter(|activity| activity.is_effort())
        .collect::<Vec<_>>();
    effort.sort_by(|a, b| a.start_at.cmp(&b.start_at).then_with(|| a.id.cmp(&b.id)));

    let mut best: Option<EffortRun> = None;
    let mut current: Option<EffortRun> = None;

    for activity in effort {
        current = match current.take() {
            Some(mut run) if activity.start_at - run.end_at <= max_gap => {
                run.end_at = run.end_at.max(activity.end_at);
                run.activity_ids.push(activity.id.clone());
                Some(run)
            }
            finished => {
                if let Some(run) = finished {
                    keep_longer(&mut best, run);
                }
                Some(EffortRun {
                    start_at: activity.start_at,
                    end_at: activity.end_at,
                    activity_ids: vec![activity.id.clone()],
                })
            }
        };
    }

    if let Some(run) = current {
        keep_longer(&mut best, run);
    }
    best
}

fn keep_longer(best: &mut Option<EffortRun>, candidate: EffortRun) {
    let replace = match best {
        Some(existing) => {
            candidate.end_at - candidate.start_at > existing.end_at - existing.start_at
        }
        None => true,
    };
    if replace {
        *best = Some(candidate);
    }
}
