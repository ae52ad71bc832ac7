//! Domain models for mango pest and disease surveillance

mod calculation;
mod farm;
mod observation;
mod season;
mod session;

pub use calculation::*;
pub use farm::*;
pub use observation::*;
pub use season::*;
pub use session::*;
