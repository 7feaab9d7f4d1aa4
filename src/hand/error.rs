use thiserror::Error;

use crate::hand::landmark::LANDMARK_COUNT;

/// Reasons a set of landmarks cannot form a complete hand pose.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoseError {
    #[error("incomplete hand pose: {found} of {LANDMARK_COUNT} landmarks")]
    Incomplete { found: usize },

    #[error("landmark {0} appears more than once")]
    DuplicateLandmark(usize),

    #[error("landmark index {0} is outside the 21-point hand model")]
    OutOfRange(usize),
}

/// Landmark source errors.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The model failed on this frame; the next frame may succeed.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The source could not be opened at all.
    #[error("failed to load landmark source: {0}")]
    Load(String),
}
