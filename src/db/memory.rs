use std::sync::Mutex;

use chrono::Utc;
use tracing::debug;

use crate::db::store::{new_record_id, PlannerStore};
use crate::error::{AppError, AppResult};
use crate::models::{Activity, Conflict, Constraint, NewActivity, NewConflict, NewConstraint};

#[derive(Debug, Default)]
struct MemoryState {
    activities: Vec<Activity>,
    constraints: Vec<Constraint>,
    conflicts: Vec<Conflict>,
}

/// Process-local store for tests and embedding without SQLite.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an activity as-is, keeping its identifier.
    pub fn seed_activity(&self, activity: Activity) -> AppResult<()> {
        let mut state = self.state.lock()?;
        state.activities.retain(|existing| existing.id != activity.id);
        state.activities.push(activity);
        Ok(())
    }

    pub fn seed_constraint(&self, constraint: Constraint) -> AppResult<()> {
        let mut state = self.state.lock()?;
        state.constraints.retain(|existing| existing.id != constraint.id);
        state.constraints.push(constraint);
        Ok(())
    }

    /// Every stored conflict regardless of owner or status.
    pub fn all_conflicts(&self) -> AppResult<Vec<Conflict>> {
        Ok(self.state.lock()?.conflicts.clone())
    }
}

impl PlannerStore for MemoryStore {
    fn load_activities(&self, user_id: &str) -> AppResult<Vec<Activity>> {
        let state = self.state.lock()?;
        let mut activities = state
            .activities
            .iter()
            .filter(|activity| activity.user_id == user_id)
            .cloned()
            .collect::<Vec<_>>();
        activities.sort_by(|a, b| a.start_at.cmp(&b.start_at).then_with(|| a.id.cmp(&b.id)));
        Ok(activities)
    }

    fn load_active_constraints(&self, user_id: &str) -> AppResult<Vec<Constraint>> {
        let state = self.state.lock()?;
        Ok(state
            .constraints
            .iter()
            .filter(|constraint| constraint.user_id == user_id && constraint.is_active())
            .cloned()
            .collect())
    }

    fn save_activity(&self, activity: &Activity) -> AppResult<()> {
        let mut state = self.state.lock()?;
        let slot = state
            .activities
            .iter_mut()
            .find(|existing| existing.id == activity.id)
            .ok_or_else(AppError::not_found)?;
        *slot = activity.clone();
        Ok(())
    }

    fn insert_activity(&self, activity: &NewActivity) -> AppResult<String> {
        let id = new_record_id();
        let record = activity.clone().into_activity(id.clone(), Utc::now());
        self.state.lock()?.activities.push(record);
        debug!(target: "app::db", activity_id = %id, "activity stored in memory");
        Ok(id)
    }

    fn insert_constraint(&self, constraint: &NewConstraint) -> AppResult<String> {
        let id = new_record_id();
        let record = constraint.clone().into_constraint(id.clone());
        self.state.lock()?.constraints.push(record);
        Ok(id)
    }

    fn load_unresolved_conflicts(&self, user_id: &str) -> AppResult<Vec<Conflict>> {
        let state = self.state.lock()?;
        Ok(state
            .conflicts
            .iter()
            .filter(|conflict| conflict.user_id == user_id && !conflict.resolved)
            .cloned()
            .collect())
    }

    fn find_conflict(&self, conflict_id: &str) -> AppResult<Option<Conflict>> {
        let state = self.state.lock()?;
        Ok(state
            .conflicts
            .iter()
            .find(|conflict| conflict.id == conflict_id)
            .cloned())
    }

    fn create_conflict(&self, conflict: &NewConflict) -> AppResult<String> {
        let id = new_record_id();
        let record = conflict.clone().into_conflict(id.clone(), Vec::new());
        self.state.lock()?.conflicts.push(record);
        Ok(id)
    }

    fn link_conflict_activity(&self, conflict_id: &str, activity_id: &str) -> AppResult<()> {
        let mut state = self.state.lock()?;
        let conflict = state
            .conflicts
            .iter_mut()
            .find(|conflict| conflict.id == conflict_id)
            .ok_or_else(AppError::not_found)?;
        if !conflict.activity_ids.iter().any(|id| id == activity_id) {
            conflict.activity_ids.push(activity_id.to_string());
        }
        Ok(())
    }

    fn set_conflict_resolved(&self, conflict_id: &str) -> AppResult<()> {
        let mut state = self.state.lock()?;
        let conflict = state
            .conflicts
            .iter_mut()
            .find(|conflict| conflict.id == conflict_id)
            .ok_or_else(AppError::not_found)?;
        conflict.resolved = true;
        Ok(())
    }
}
