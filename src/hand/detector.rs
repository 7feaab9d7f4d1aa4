use async_trait::async_trait;

use crate::camera::types::Frame;
use crate::hand::error::DetectError;
use crate::hand::landmark::DetectedHand;

/// Hand landmark model.
///
/// Given a frame, returns every detected hand in the model's ranking order;
/// the frame loop streams only the first. Implementations own their model
/// handle and release it when dropped.
#[async_trait]
pub trait LandmarkSource: Send {
    /// Human-readable model name for logs.
    fn name(&self) -> &str;

    /// Run the model on one frame.
    async fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedHand>, DetectError>;
}
