//! Whole-schedule feasibility checks.
//!
//! Every check is exhaustive (all pairs, all activity × constraint
//! combinations) and side-effect free.

use crate::error::AppResult;
use crate::models::{Activity, Constraint};
use crate::services::schedule_utils::{overlaps, violates};

/// True iff no two activities overlap and no activity violates an active constraint.
pub fn is_valid(activities: &[Activity], constraints: &[Constraint]) -> bool {
    !has_overlap(activities) && !has_violation(activities, constraints)
}

fn has_overlap(activities: &[Activity]) -> bool {
    activities.iter().enumerate().any(|(idx, a)| {
        activities[idx + 1..]
            .iter()
            .any(|b| a.user_id == b.user_id && overlaps(a, b))
    })
}

fn has_violation(activities: &[Activity], constraints: &[Constraint]) -> bool {
    activities
        .iter()
        .any(|activity| constraints.iter().any(|constraint| applies(activity, constraint)))
}

/// Index pairs `(i, j)` with `i < j` of overlapping same-owner activities.
pub fn overlapping_pairs(activities: &[Activity]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..activities.len() {
        for j in (i + 1)..activities.len() {
            let (a, b) = (&activities[i], &activities[j]);
            if a.user_id == b.user_id && overlaps(a, b) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Index pairs `(activity, constraint)` for every violation.
pub fn constraint_violations(
    activities: &[Activity],
    constraints: &[Constraint],
) -> Vec<(usize, usize)> {
    let mut result = Vec::new();
    for (a_idx, activity) in activities.iter().enumerate() {
        for (c_idx, constraint) in constraints.iter().enumerate() {
            if applies(activity, constraint) {
                result.push((a_idx, c_idx));
            }
        }
    }
    result
}

pub fn count_overlaps(activities: &[Activity]) -> usize {
    overlapping_pairs(activities).len()
}

pub fn count_violations(activities: &[Activity], constraints: &[Constraint]) -> usize {
    constraint_violations(activities, constraints).len()
}

/// Rejects a schedule containing a malformed activity or constraint.
pub fn validate_schedule_input(
    activities: &[Activity],
    constraints: &[Constraint],
) -> AppResult<()> {
    for activity in activities {
        activity.validate()?;
    }
    for constraint in constraints {
        constraint.validate()?;
    }
    Ok(())
}

fn applies(activity: &Activity, constraint: &Constraint) -> bool {
    activity.user_id == constraint.user_id && violates(activity, constraint)
}
