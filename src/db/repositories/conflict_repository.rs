use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};
use serde_json::json;

use crate::db::repositories::activity_repository::parse_timestamp;
use crate::error::{AppError, AppResult};
use crate::models::conflict::{Conflict, ConflictType};

#[derive(Debug, Clone)]
pub struct ConflictRow {
    pub id: String,
    pub user_id: String,
    pub conflict_type: String,
    pub detected_at: String,
    pub resolved: bool,
    pub constraint_id: Option<String>,
}

impl ConflictRow {
    pub fn from_record(record: &Conflict) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            conflict_type: record.conflict_type.as_str().to_string(),
            detected_at: record.detected_at.to_rfc3339(),
            resolved: record.resolved,
            constraint_id: record.constraint_id.clone(),
        }
    }

    /// Builds the domain record; links live in their own table and are passed in.
    pub fn into_record(self, activity_ids: Vec<String>) -> AppResult<Conflict> {
        let conflict_type = ConflictType::parse(&self.conflict_type).ok_or_else(|| {
            AppError::validation_with_details(
                "unknown conflict type",
                json!({"id": self.id, "type": self.conflict_type}),
            )
        })?;

        Ok(Conflict {
            detected_at: parse_timestamp(&self.detected_at)?,
            conflict_type,
            resolved: self.resolved,
            activity_ids,
            constraint_id: self.constraint_id,
            id: self.id,
            user_id: self.user_id,
        })
    }
}

impl TryFrom<&Row<'_>> for ConflictRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            conflict_type: row.get("conflict_type")?,
            detected_at: row.get("detected_at")?,
            resolved: row.get::<_, i64>("resolved")? != 0,
            constraint_id: row.get("constraint_id")?,
        })
    }
}

pub struct ConflictRepository;

impl ConflictRepository {
    pub fn insert(conn: &Connection, row: &ConflictRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO conflicts (
                    id,
                    user_id,
                    conflict_type,
                    detected_at,
                    resolved,
                    constraint_id
                ) VALUES (
                    :id,
                    :user_id,
                    :conflict_type,
                    :detected_at,
                    :resolved,
                    :constraint_id
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":conflict_type": &row.conflict_type,
                ":detected_at": &row.detected_at,
                ":resolved": row.resolved as i64,
                ":constraint_id": &row.constraint_id,
            },
        )?;

        Ok(())
    }

    pub fn link_activity(conn: &Connection, conflict_id: &str, activity_id: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO conflict_activities (conflict_id, activity_id)
                VALUES (:conflict_id, :activity_id)
                ON CONFLICT(conflict_id, activity_id) DO NOTHING
            "#,
            named_params! {":conflict_id": conflict_id, ":activity_id": activity_id},
        )?;
        Ok(())
    }

    pub fn list_activity_ids(conn: &Connection, conflict_id: &str) -> AppResult<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT activity_id FROM conflict_activities WHERE conflict_id = ?1 ORDER BY activity_id",
        )?;

        let ids = stmt
            .query_map([conflict_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ids)
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<ConflictRow>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, conflict_type, detected_at, resolved, constraint_id
            FROM conflicts
            WHERE id = ?1
        "#,
        )?;

        let row = stmt
            .query_row([id], |row| ConflictRow::try_from(row))
            .optional()?;

        Ok(row)
    }

    pub fn list_unresolved_by_user(
        conn: &Connection,
        user_id: &str,
    ) -> AppResult<Vec<ConflictRow>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, conflict_type, detected_at, resolved, constraint_id
            FROM conflicts
            WHERE user_id = ?1 AND resolved = 0
            ORDER BY detected_at ASC, id ASC
        "#,
        )?;

        let rows = stmt
            .query_map([user_id], |row| ConflictRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Flags a conflict resolved. The first resolution time is kept on repeat calls.
    pub fn mark_resolved(conn: &Connection, id: &str, resolved_at: &str) -> AppResult<()> {
        let affected = conn.execute(
            r#"
            UPDATE conflicts
            SET resolved = 1, resolved_at = COALESCE(resolved_at, ?1)
            WHERE id = ?2
            "#,
            [resolved_at, id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }
}
