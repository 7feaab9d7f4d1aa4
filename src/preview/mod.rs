// Preview pipeline: frame annotation, JPEG snapshots and the operator stop key.

pub mod compress;
pub mod draw;
pub mod error;
pub mod sink;
pub mod stop_key;
