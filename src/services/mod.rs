pub mod conflict_service;
pub mod planning_service;
pub mod planning_validator;
pub mod schedule_optimizer;
pub mod schedule_scoring;
pub mod schedule_utils;
pub mod settings_service;
