pub mod activity;
pub mod conflict;
pub mod constraint;
pub mod settings;

pub use activity::{Activity, ActivityCategory, NewActivity};
pub use conflict::{Conflict, ConflictType, NewConflict};
pub use constraint::{Constraint, ConstraintCategory, ConstraintStatus, NewConstraint};
pub use settings::{OptimizerSettings, PlannerSettings, ScoringWeights};
