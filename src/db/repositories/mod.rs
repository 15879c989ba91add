pub mod activity_repository;
pub mod conflict_repository;
pub mod constraint_repository;
pub mod settings_repository;
