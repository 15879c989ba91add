use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum ConflictType {
    Overlap,
    ConstraintViolation,
    Deadline,
    ExcessiveFatigue,
    LowBalance,
    InsufficientRest,
}

impl ConflictType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictType::Overlap => "overlap",
            ConflictType::ConstraintViolation => "constraint_violation",
            ConflictType::Deadline => "deadline",
            ConflictType::ExcessiveFatigue => "excessive_fatigue",
            ConflictType::LowBalance => "low_balance",
            ConflictType::InsufficientRest => "insufficient_rest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "overlap" => Some(ConflictType::Overlap),
            "constraint_violation" => Some(ConflictType::ConstraintViolation),
            "deadline" => Some(ConflictType::Deadline),
            "excessive_fatigue" => Some(ConflictType::ExcessiveFatigue),
            "low_balance" => Some(ConflictType::LowBalance),
            "insufficient_rest" => Some(ConflictType::InsufficientRest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: String,
    pub user_id: String,
    pub detected_at: DateTime<Utc>,
    pub conflict_type: ConflictType,
    pub resolved: bool,
    #[serde(default)]
    pub activity_ids: Vec<String>,
    #[serde(default)]
    pub constraint_id: Option<String>,
}

impl Conflict {
    /// True when the linked activities are exactly `ids`, in any order.
    pub fn links_exactly(&self, ids: &[&str]) -> bool {
        let linked = self
            .activity_ids
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>();
        let wanted = ids.iter().copied().collect::<BTreeSet<_>>();
        linked == wanted
    }
}

/// Conflict as handed to the store, before it has an identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewConflict {
    pub user_id: String,
    pub detected_at: DateTime<Utc>,
    pub conflict_type: ConflictType,
    #[serde(default)]
    pub constraint_id: Option<String>,
}

impl NewConflict {
    pub fn into_conflict(self, id: String, activity_ids: Vec<String>) -> Conflict {
        Conflict {
            id,
            user_id: self.user_id,
            detected_at: self.detected_at,
            conflict_type: self.conflict_type,
            resolved: false,
            activity_ids,
            constraint_id: self.constraint_id,
        }
    }
}
