//! Activity planning core: overlap and constraint checks, schedule scoring,
//! local-search optimization and a persistent conflict registry.

pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use db::{DbPool, MemoryStore, PlannerStore, SqliteStore};
pub use error::{AppError, AppResult};
pub use services::planning_service::PlanningService;
