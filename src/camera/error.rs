use thiserror::Error;

/// Capture subsystem errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The device is alive but this frame could not be read.
    #[error("frame not acquired: {0}")]
    Transient(String),

    #[error("capture device disconnected: {0}")]
    Disconnected(String),
}

impl CaptureError {
    /// Whether the frame loop must stop instead of retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Disconnected(_))
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CaptureError>;
