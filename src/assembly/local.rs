//! Element assemblers for the mass and flux operators.
mod curl;
mod gradient;
mod mass;

pub use curl::*;
pub use gradient::*;
pub use mass::*;
