//! HTTP request handlers

pub mod calculation;
pub mod farm;
pub mod health;
pub mod maintenance;
pub mod season;
pub mod survey;

pub use calculation::*;
pub use farm::*;
pub use health::*;
pub use maintenance::*;
pub use season::*;
pub use survey::*;
