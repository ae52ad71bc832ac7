//! Domain models for the Mango Surveillance Platform
//!
//! Re-exports the models from the shared crate so backend code has one import path

pub use shared::models::*;
