use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::activity::{Activity, ActivityCategory};
use crate::services::schedule_utils::{format_datetime, parse_datetime};

#[derive(Debug, Clone)]
pub struct ActivityRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: i64,
    pub deadline: String,
    pub start_at: String,
    pub end_at: String,
    pub created_at: String,
}

impl ActivityRow {
    pub fn from_record(record: &Activity) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            category: record.category.map(|category| category.as_str().to_string()),
            priority: i64::from(record.priority),
            deadline: format_datetime(record.deadline),
            start_at: format_datetime(record.start_at),
            end_at: format_datetime(record.end_at),
            created_at: record.created_at.to_rfc3339(),
        }
    }

    pub fn into_record(self) -> AppResult<Activity> {
        let priority = i32::try_from(self.priority).map_err(|_| {
            AppError::validation_with_details(
                "stored priority is out of range",
                json!({"id": self.id, "priority": self.priority}),
            )
        })?;

        Ok(Activity {
            // Unknown stored categories load as uncategorized.
            category: self.category.as_deref().and_then(ActivityCategory::parse),
            priority,
            deadline: parse_datetime(&self.deadline)?,
            start_at: parse_datetime(&self.start_at)?,
            end_at: parse_datetime(&self.end_at)?,
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
        })
    }
}

impl TryFrom<&Row<'_>> for ActivityRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            category: row.get("category")?,
            priority: row.get("priority")?,
            deadline: row.get("deadline")?,
            start_at: row.get("start_at")?,
            end_at: row.get("end_at")?,
            created_at: row.get("created_at")?,
        })
    }
}

pub struct ActivityRepository;

impl ActivityRepository {
    pub fn insert(conn: &Connection, row: &ActivityRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO activities (
                    id,
                    user_id,
                    title,
                    description,
                    category,
                    priority,
                    deadline,
                    start_at,
                    end_at,
                    created_at
                ) VALUES (
                    :id,
                    :user_id,
                    :title,
                    :description,
                    :category,
                    :priority,
                    :deadline,
                    :start_at,
                    :end_at,
                    :created_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":title": &row.title,
                ":description": &row.description,
                ":category": &row.category,
                ":priority": row.priority,
                ":deadline": &row.deadline,
                ":start_at": &row.start_at,
                ":end_at": &row.end_at,
                ":created_at": &row.created_at,
            },
        )?;

        Ok(())
    }

    pub fn update(conn: &Connection, row: &ActivityRow) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE activities SET
                    title = :title,
                    description = :description,
                    category = :category,
                    priority = :priority,
                    deadline = :deadline,
                    start_at = :start_at,
                    end_at = :end_at,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = :id
            "#,
            named_params! {
                ":id": &row.id,
                ":title": &row.title,
                ":description": &row.description,
                ":category": &row.category,
                ":priority": row.priority,
                ":deadline": &row.deadline,
                ":start_at": &row.start_at,
                ":end_at": &row.end_at,
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<ActivityRow>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, title, description, category, priority,
                   deadline, start_at, end_at, created_at
            FROM activities
            WHERE id = ?1
        "#,
        )?;

        let row = stmt
            .query_row([id], |row| ActivityRow::try_from(row))
            .optional()?;

        Ok(row)
    }

    pub fn list_by_user(conn: &Connection, user_id: &str) -> AppResult<Vec<ActivityRow>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, title, description, category, priority,
                   deadline, start_at, end_at, created_at
            FROM activities
            WHERE user_id = ?1
            ORDER BY start_at ASC, id ASC
        "#,
        )?;

        let rows = stmt
            .query_map([user_id], |row| ActivityRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute("DELETE FROM activities WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }
}

pub(crate) fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| {
            AppError::validation_with_details(
                "invalid timestamp format",
                json!({"value": value, "error": err.to_string()}),
            )
        })
}
