// Hand model, landmark sources and the bone graph builder.

pub mod bones;
pub mod detector;
pub mod error;
pub mod landmark;
pub mod replay;
pub mod synthetic;
