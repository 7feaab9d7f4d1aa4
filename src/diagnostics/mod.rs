// Streaming diagnostics: frame, send and drop counters.

pub mod stats;
