//! Shared domain logic for the Mango Surveillance Platform
//!
//! This crate holds the pure parts of the system: the surveillance effort
//! calculator, the survey session rules, seasonal lookup and compliance
//! scheduling. It is used by the backend and, through WASM, by the browser.

pub mod calculator;
pub mod clock;
pub mod compliance;
pub mod error;
pub mod models;
pub mod target;
pub mod validation;

pub use calculator::*;
pub use clock::*;
pub use compliance::*;
pub use error::*;
pub use models::*;
pub use target::*;
pub use validation::*;
