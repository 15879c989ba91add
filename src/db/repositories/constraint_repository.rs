use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::constraint::{
    parse_weekday_code, weekday_code, Constraint, ConstraintCategory, ConstraintStatus,
};
use crate::services::schedule_utils::{format_date, format_time, parse_date, parse_time};

#[derive(Debug, Clone)]
pub struct ConstraintRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: String,
    pub window_start: String,
    pub window_end: String,
    pub repetitive: bool,
    pub specific_dates: String,
    pub weekdays: String,
    pub status: String,
}

impl ConstraintRow {
    pub fn from_record(record: &Constraint) -> AppResult<Self> {
        let dates = record
            .specific_dates
            .iter()
            .map(|date| format_date(*date))
            .collect::<Vec<_>>();
        let weekdays = record
            .weekdays
            .iter()
            .map(|day| weekday_code(*day))
            .collect::<Vec<_>>();

        Ok(Self {
            id: record.id.clone(),
            user_id: record.user_id.clone(),
            title: record.title.clone(),
            category: record.category.as_str().to_string(),
            window_start: format_time(record.window_start),
            window_end: format_time(record.window_end),
            repetitive: record.repetitive,
            specific_dates: serde_json::to_string(&dates)?,
            weekdays: serde_json::to_string(&weekdays)?,
            status: record.status.as_str().to_string(),
        })
    }

    pub fn into_record(self) -> AppResult<Constraint> {
        let dates: Vec<String> = serde_json::from_str(&self.specific_dates)?;
        let specific_dates = dates
            .iter()
            .map(|value| parse_date(value))
            .collect::<AppResult<Vec<_>>>()?;

        let codes: Vec<String> = serde_json::from_str(&self.weekdays)?;
        let weekdays = codes
            .iter()
            .map(|code| {
                parse_weekday_code(code).ok_or_else(|| {
                    AppError::validation_with_details(
                        "unknown weekday code",
                        json!({"constraintId": self.id, "code": code}),
                    )
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Constraint {
            category: ConstraintCategory::parse(&self.category),
            window_start: parse_time(&self.window_start)?,
            window_end: parse_time(&self.window_end)?,
            status: ConstraintStatus::parse(&self.status),
            repetitive: self.repetitive,
            specific_dates,
            weekdays,
            id: self.id,
            user_id: self.user_id,
            title: self.title,
        })
    }
}

impl TryFrom<&Row<'_>> for ConstraintRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            category: row.get("category")?,
            window_start: row.get("window_start")?,
            window_end: row.get("window_end")?,
            repetitive: row.get::<_, i64>("repetitive")? != 0,
            specific_dates: row.get("specific_dates")?,
            weekdays: row.get("weekdays")?,
            status: row.get("status")?,
        })
    }
}

pub struct ConstraintRepository;

impl ConstraintRepository {
    pub fn insert(conn: &Connection, row: &ConstraintRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO constraints (
                    id,
                    user_id,
                    title,
                    category,
                    window_start,
                    window_end,
                    repetitive,
                    specific_dates,
                    weekdays,
                    status
                ) VALUES (
                    :id,
                    :user_id,
                    :title,
                    :category,
                    :window_start,
                    :window_end,
                    :repetitive,
                    :specific_dates,
                    :weekdays,
                    :status
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":title": &row.title,
                ":category": &row.category,
                ":window_start": &row.window_start,
                ":window_end": &row.window_end,
                ":repetitive": row.repetitive as i64,
                ":specific_dates": &row.specific_dates,
                ":weekdays": &row.weekdays,
                ":status": &row.status,
            },
        )?;

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<ConstraintRow>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, title, category, window_start, window_end,
                   repetitive, specific_dates, weekdays, status
            FROM constraints
            WHERE id = ?1
        "#,
        )?;

        let row = stmt
            .query_row([id], |row| ConstraintRow::try_from(row))
            .optional()?;

        Ok(row)
    }

    pub fn list_active_by_user(conn: &Connection, user_id: &str) -> AppResult<Vec<ConstraintRow>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, title, category, window_start, window_end,
                   repetitive, specific_dates, weekdays, status
            FROM constraints
            WHERE user_id = :user_id AND status = :status
            ORDER BY window_start ASC, id ASC
        "#,
        )?;

        let rows = stmt
            .query_map(
                named_params! {
                    ":user_id": user_id,
                    ":status": ConstraintStatus::Active.as_str(),
                },
                |row| ConstraintRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    pub fn set_status(conn: &Connection, id: &str, status: ConstraintStatus) -> AppResult<()> {
        let affected = conn.execute(
            "UPDATE constraints SET status = ?1 WHERE id = ?2",
            [status.as_str(), id],
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }
}
