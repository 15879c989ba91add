//! Persistence boundary of the planner.
//!
//! Services only talk to [`PlannerStore`]; identifiers for new records are
//! generated here (UUID v4), never by the core.

use crate::error::AppResult;
use crate::models::{Activity, Conflict, Constraint, NewActivity, NewConflict, NewConstraint};

pub trait PlannerStore: Send + Sync {
    /// All activities owned by `user_id`, ordered by start time then id.
    fn load_activities(&self, user_id: &str) -> AppResult<Vec<Activity>>;

    fn load_active_constraints(&self, user_id: &str) -> AppResult<Vec<Constraint>>;

    /// Persists the current fields of an existing activity.
    fn save_activity(&self, activity: &Activity) -> AppResult<()>;

    fn insert_activity(&self, activity: &NewActivity) -> AppResult<String>;

    fn insert_constraint(&self, constraint: &NewConstraint) -> AppResult<String>;

    /// Unresolved conflicts of `user_id` with their activity links populated.
    fn load_unresolved_conflicts(&self, user_id: &str) -> AppResult<Vec<Conflict>>;

    fn find_conflict(&self, conflict_id: &str) -> AppResult<Option<Conflict>>;

    fn create_conflict(&self, conflict: &NewConflict) -> AppResult<String>;

    /// Idempotent: linking the same pair twice keeps one link.
    fn link_conflict_activity(&self, conflict_id: &str, activity_id: &str) -> AppResult<()>;

    /// Fails with `NotFound` when the conflict does not exist.
    fn set_conflict_resolved(&self, conflict_id: &str) -> AppResult<()>;
}

pub(crate) fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
