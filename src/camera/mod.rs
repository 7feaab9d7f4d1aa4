// Frame capture: the source trait, its error type and the synthetic camera.

pub mod backend;
pub mod dummy;
pub mod error;
pub mod types;
