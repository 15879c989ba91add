use chrono::Utc;
use tracing::debug;

use crate::db::repositories::activity_repository::{ActivityRepository, ActivityRow};
use crate::db::repositories::conflict_repository::{ConflictRepository, ConflictRow};
use crate::db::repositories::constraint_repository::{ConstraintRepository, ConstraintRow};
use crate::db::store::{new_record_id, PlannerStore};
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{Activity, Conflict, Constraint, NewActivity, NewConflict, NewConstraint};

/// [`PlannerStore`] backed by the SQLite database behind a [`DbPool`].
#[derive(Clone, Debug)]
pub struct SqliteStore {
    db: DbPool,
}

impl SqliteStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &DbPool {
        &self.db
    }
}

impl PlannerStore for SqliteStore {
    fn load_activities(&self, user_id: &str) -> AppResult<Vec<Activity>> {
        self.db.with_connection(|conn| {
            ActivityRepository::list_by_user(conn, user_id)?
                .into_iter()
                .map(ActivityRow::into_record)
                .collect()
        })
    }

    fn load_active_constraints(&self, user_id: &str) -> AppResult<Vec<Constraint>> {
        self.db.with_connection(|conn| {
            ConstraintRepository::list_active_by_user(conn, user_id)?
                .into_iter()
                .map(ConstraintRow::into_record)
                .collect()
        })
    }

    fn save_activity(&self, activity: &Activity) -> AppResult<()> {
        let row = ActivityRow::from_record(activity);
        self.db
            .with_connection(|conn| ActivityRepository::update(conn, &row))
    }

    fn insert_activity(&self, activity: &NewActivity) -> AppResult<String> {
        let id = new_record_id();
        let record = activity.clone().into_activity(id.clone(), Utc::now());
        let row = ActivityRow::from_record(&record);
        self.db
            .with_connection(|conn| ActivityRepository::insert(conn, &row))?;
        debug!(target: "app::db", activity_id = %id, "activity inserted");
        Ok(id)
    }

    fn insert_constraint(&self, constraint: &NewConstraint) -> AppResult<String> {
        let id = new_record_id();
        let record = constraint.clone().into_constraint(id.clone());
        let row = ConstraintRow::from_record(&record)?;
        self.db
            .with_connection(|conn| ConstraintRepository::insert(conn, &row))?;
        debug!(target: "app::db", constraint_id = %id, "constraint inserted");
        Ok(id)
    }

    fn load_unresolved_conflicts(&self, user_id: &str) -> AppResult<Vec<Conflict>> {
        self.db.with_connection(|conn| {
            ConflictRepository::list_unresolved_by_user(conn, user_id)?
                .into_iter()
                .map(|row| {
                    let links = ConflictRepository::list_activity_ids(conn, &row.id)?;
                    row.into_record(links)
                })
                .collect()
        })
    }

    fn find_conflict(&self, conflict_id: &str) -> AppResult<Option<Conflict>> {
        self.db.with_connection(|conn| {
            match ConflictRepository::find_by_id(conn, conflict_id)? {
                Some(row) => {
                    let links = ConflictRepository::list_activity_ids(conn, &row.id)?;
                    Ok(Some(row.into_record(links)?))
                }
                None => Ok(None),
            }
        })
    }

    fn create_conflict(&self, conflict: &NewConflict) -> AppResult<String> {
        let id = new_record_id();
        let record = conflict.clone().into_conflict(id.clone(), Vec::new());
        let row = ConflictRow::from_record(&record);
        self.db
            .with_connection(|conn| ConflictRepository::insert(conn, &row))?;
        Ok(id)
    }

    fn link_conflict_activity(&self, conflict_id: &str, activity_id: &str) -> AppResult<()> {
        self.db.with_connection(|conn| {
            ConflictRepository::link_activity(conn, conflict_id, activity_id)
        })
    }

    fn set_conflict_resolved(&self, conflict_id: &str) -> AppResult<()> {
        let resolved_at = Utc::now().to_rfc3339();
        self.db.with_connection(|conn| {
            ConflictRepository::mark_resolved(conn, conflict_id, &resolved_at)
        })
    }
}
