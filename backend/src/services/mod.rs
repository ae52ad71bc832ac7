//! Business logic services for the Mango Surveillance Platform

pub mod calculation;
pub mod farm;
pub mod maintenance;
pub mod memory_store;
pub mod pg_store;
pub mod season;
pub mod store;
pub mod survey;

pub use calculation::CalculationService;
pub use farm::FarmService;
pub use maintenance::MaintenanceService;
pub use memory_store::MemoryStore;
pub use pg_store::PgStore;
pub use season::SeasonService;
pub use store::{SessionTransition, SurveillanceStore};
pub use survey::SurveyService;
