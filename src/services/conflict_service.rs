use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::db::PlannerStore;
use crate::error::{AppError, AppResult};
use crate::models::{Activity, Conflict, ConflictType, Constraint, NewConflict};
use crate::services::planning_validator::{constraint_violations, overlapping_pairs};
use crate::services::schedule_scoring::{effort_and_rest_hours, ScheduleScorer};
use crate::services::schedule_utils::overlaps;

/// Records schedule problems as persistent conflicts, never twice while unresolved.
pub struct ConflictService {
    store: Arc<dyn PlannerStore>,
}

impl ConflictService {
    pub fn new(store: Arc<dyn PlannerStore>) -> Self {
        Self { store }
    }

    /// Creates one Overlap conflict per overlapping same-owner pair not already on record.
    pub fn detect_overlaps(&self, activities: &[Activity]) -> AppResult<Vec<Conflict>> {
        let ordered = sorted_by_start(activities);
        let mut known = KnownConflicts::new(self.store.as_ref());
        let mut created = Vec::new();

        for (i, j) in overlapping_pairs(&ordered) {
            let (a, b) = (&ordered[i], &ordered[j]);
            let ids = [a.id.as_str(), b.id.as_str()];
            if known.contains(&a.user_id, ConflictType::Overlap, &ids, None)? {
                debug!(
                    target: "app::conflict",
                    first = %a.id,
                    second = %b.id,
                    "overlap already recorded"
                );
                continue;
            }

            let conflict = self.record(&a.user_id, ConflictType::Overlap, &ids, None)?;
            known.remember(conflict.clone());
            created.push(conflict);
        }

        if !created.is_empty() {
            info!(target: "app::conflict", count = created.len(), "overlap conflicts created");
        }
        Ok(created)
    }

    /// Whether an unresolved Overlap conflict of `user_id` links exactly `{a, b}`.
    pub fn already_exists(&self, user_id: &str, a: &str, b: &str) -> AppResult<bool> {
        let unresolved = self.store.load_unresolved_conflicts(user_id)?;
        Ok(unresolved.iter().any(|conflict| {
            conflict.conflict_type == ConflictType::Overlap && conflict.links_exactly(&[a, b])
        }))
    }

    /// Flags a conflict resolved. Returns `false` when no such conflict exists.
    pub fn mark_resolved(&self, conflict_id: &str) -> AppResult<bool> {
        if self.store.find_conflict(conflict_id)?.is_none() {
            debug!(target: "app::conflict", conflict_id, "conflict to resolve not found");
            return Ok(false);
        }

        match self.store.set_conflict_resolved(conflict_id) {
            Ok(()) => {
                info!(target: "app::conflict", conflict_id, "conflict marked resolved");
                Ok(true)
            }
            Err(AppError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Creates one ConstraintViolation conflict per violating (activity, constraint) pair.
    pub fn detect_constraint_violations(
        &self,
        activities: &[Activity],
        constraints: &[Constraint],
    ) -> AppResult<Vec<Conflict>> {
        let mut known = KnownConflicts::new(self.store.as_ref());
        let mut created = Vec::new();

        for (a_idx, c_idx) in constraint_violations(activities, constraints) {
            let activity = &activities[a_idx];
            let constraint = &constraints[c_idx];
            let ids = [activity.id.as_str()];
            let kind = ConflictType::ConstraintViolation;

            if known.contains(&activity.user_id, kind, &ids, Some(&constraint.id))? {
                continue;
            }

            let conflict = self.record(&activity.user_id, kind, &ids, Some(&constraint.id))?;
            known.remember(conflict.clone());
            created.push(conflict);
        }

        if !created.is_empty() {
            info!(
                target: "app::conflict",
                count = created.len(),
                "constraint violation conflicts created"
            );
        }
        Ok(created)
    }

    /// Turns the soft scoring terms into conflicts: late activities, an overlong
    /// effort run, a work/rest ratio outside the band, or work with no rest at all.
    pub fn detect_quality_issues(
        &self,
        activities: &[Activity],
        scorer: &ScheduleScorer,
    ) -> AppResult<Vec<Conflict>> {
        let mut known = KnownConflicts::new(self.store.as_ref());
        let mut created = Vec::new();

        for (user_id, owned) in group_by_user(activities) {
            for (kind, ids) in quality_findings(&owned, scorer) {
                let refs = ids.iter().map(String::as_str).collect::<Vec<_>>();
                if known.contains(&user_id, kind, &refs, None)? {
                    continue;
                }
                let conflict = self.record(&user_id, kind, &refs, None)?;
                known.remember(conflict.clone());
                created.push(conflict);
            }
        }

        if !created.is_empty() {
            info!(
                target: "app::conflict",
                count = created.len(),
                "schedule quality conflicts created"
            );
        }
        Ok(created)
    }

    fn record(
        &self,
        user_id: &str,
        conflict_type: ConflictType,
        activity_ids: &[&str],
        constraint_id: Option<&str>,
    ) -> AppResult<Conflict> {
        let new_conflict = NewConflict {
            user_id: user_id.to_string(),
            detected_at: Utc::now(),
            conflict_type,
            constraint_id: constraint_id.map(str::to_string),
        };

        let id = self.store.create_conflict(&new_conflict)?;
        for activity_id in activity_ids {
            self.store.link_conflict_activity(&id, activity_id)?;
        }

        debug!(
            target: "app::conflict",
            conflict_id = %id,
            kind = conflict_type.as_str(),
            activities = ?activity_ids,
            "conflict recorded"
        );

        let linked = activity_ids.iter().map(|id| id.to_string()).collect();
        Ok(new_conflict.into_conflict(id, linked))
    }
}

/// Unresolved conflicts per user, loaded on first use and extended as new ones are created.
struct KnownConflicts<'a> {
    store: &'a dyn PlannerStore,
    by_user: HashMap<String, Vec<Conflict>>,
}

impl<'a> KnownConflicts<'a> {
    fn new(store: &'a dyn PlannerStore) -> Self {
        Self {
            store,
            by_user: HashMap::new(),
        }
    }

    fn contains(
        &mut self,
        user_id: &str,
        kind: ConflictType,
        activity_ids: &[&str],
        constraint_id: Option<&str>,
    ) -> AppResult<bool> {
        if !self.by_user.contains_key(user_id) {
            let loaded = self.store.load_unresolved_conflicts(user_id)?;
            self.by_user.insert(user_id.to_string(), loaded);
        }

        Ok(self.by_user.get(user_id).is_some_and(|conflicts| {
            conflicts.iter().any(|conflict| {
                conflict.conflict_type == kind
                    && conflict.constraint_id.as_deref() == constraint_id
                    && conflict.links_exactly(activity_ids)
            })
        }))
    }

    fn remember(&mut self, conflict: Conflict) {
        self.by_user
            .entry(conflict.user_id.clone())
            .or_default()
            .push(conflict);
    }
}

fn sorted_by_start(activities: &[Activity]) -> Vec<Activity> {
    let mut ordered = activities.to_vec();
    ordered.sort_by(|a, b| a.start_at.cmp(&b.start_at).then_with(|| a.id.cmp(&b.id)));
    ordered
}

fn group_by_user(activities: &[Activity]) -> Vec<(String, Vec<Activity>)> {
    let mut groups: Vec<(String, Vec<Activity>)> = Vec::new();
    for activity in activities {
        match groups.iter_mut().find(|(user_id, _)| *user_id == activity.user_id) {
            Some((_, owned)) => owned.push(activity.clone()),
            None => groups.push((activity.user_id.clone(), vec![activity.clone()])),
        }
    }
    groups
}

fn quality_findings(
    activities: &[Activity],
    scorer: &ScheduleScorer,
) -> Vec<(ConflictType, Vec<String>)> {
    let weights = scorer.weights();
    let mut findings = Vec::new();

    for activity in activities.iter().filter(|activity| activity.end_at > activity.deadline) {
        findings.push((ConflictType::Deadline, vec![activity.id.clone()]));
    }

    if let Some(run) = scorer.longest_effort_run(activities) {
        if run.hours() > weights.fatigue_threshold_hours {
            findings.push((ConflictType::ExcessiveFatigue, run.activity_ids));
        }
    }

    let (effort, _) = effort_and_rest_hours(activities);
    match scorer.balance_ratio(activities) {
        Some(ratio) if ratio < weights.balance_band_low || ratio > weights.balance_band_high => {
            let ids = activities
                .iter()
                .filter(|activity| activity.is_effort() || activity.is_rest())
                .map(|activity| activity.id.clone())
                .collect();
            findings.push((ConflictType::LowBalance, ids));
        }
        None if effort > 0.0 => {
            let ids = activities
                .iter()
                .filter(|activity| activity.is_effort())
                .map(|activity| activity.id.clone())
                .collect();
            findings.push((ConflictType::InsufficientRest, ids));
        }
        _ => {}
    }

    findings
}

/// Separates overlapping activities without consulting the store.
///
/// Activities are taken in start order. For each overlapping same-owner pair the
/// lower-priority one (the later one on ties) moves to start when the other ends;
/// if that misses its deadline it moves to end when the other starts instead.
/// A move that would collide with any third activity is skipped. Returns the
/// adjusted activities in start order and the number of pairs separated.
pub fn resolve_overlaps(activities: &[Activity]) -> (Vec<Activity>, usize) {
    let mut result = sorted_by_start(activities);
    let mut resolved = 0;

    for i in 0..result.len() {
        for j in (i + 1)..result.len() {
            let (first, second) = (&result[i], &result[j]);
            if first.user_id != second.user_id || !overlaps(first, second) {
                continue;
            }

            let (keep, moving) = if second.priority > first.priority {
                (j, i)
            } else {
                (i, j)
            };

            let anchor = &result[keep];
            let mut candidate = result[moving].clone();
            let duration = candidate.duration();
            candidate.start_at = anchor.end_at;
            candidate.end_at = anchor.end_at + duration;
            if candidate.end_at > candidate.deadline {
                candidate.end_at = anchor.start_at;
                candidate.start_at = anchor.start_at - duration;
            }

            let collides = result.iter().enumerate().any(|(idx, other)| {
                idx != moving && other.user_id == candidate.user_id && overlaps(&candidate, other)
            });
            if collides {
                debug!(
                    target: "app::conflict",
                    activity_id = %candidate.id,
                    "overlap left in place, move would collide"
                );
                continue;
            }

            result[moving] = candidate;
            resolved += 1;
        }
    }

    (result, resolved)
}
