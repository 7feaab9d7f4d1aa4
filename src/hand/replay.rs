use std::path::Path;

use async_trait::async_trait;

use crate::camera::types::Frame;
use crate::hand::detector::LandmarkSource;
use crate::hand::error::DetectError;
use crate::hand::landmark::DetectedHand;

/// Replays recorded detections, looping at the end.
///
/// The file is a JSON array with one entry per frame; each entry is the array
/// of hands detected in that frame, and each hand is an array of
/// `{"x", "y", "z"}` normalized points:
///
/// ```json
/// [
///   [[{"x": 0.51, "y": 0.72, "z": 0.0}, ...]],
///   [],
///   ...
/// ]
/// ```
#[derive(Debug)]
pub struct ReplayLandmarks {
    name: String,
    frames: Vec<Vec<DetectedHand>>,
    cursor: usize,
}

impl ReplayLandmarks {
    /// Load a recording from disk.
    pub fn load(path: &Path) -> Result<Self, DetectError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DetectError::Load(format!("{}: {e}", path.display())))?;
        let frames: Vec<Vec<DetectedHand>> = serde_json::from_str(&contents)
            .map_err(|e| DetectError::Load(format!("{}: {e}", path.display())))?;
        let source = Self::from_frames(path.display().to_string(), frames)?;
        tracing::info!(
            "loaded {} recorded frames from {}",
            source.frames.len(),
            path.display()
        );
        Ok(source)
    }

    /// Build a replay from in-memory detections.
    pub fn from_frames(
        name: impl Into<String>,
        frames: Vec<Vec<DetectedHand>>,
    ) -> Result<Self, DetectError> {
        let name = name.into();
        if frames.is_empty() {
            return Err(DetectError::Load(format!("{name}: recording has no frames")));
        }
        Ok(Self {
            name,
            frames,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[async_trait]
impl LandmarkSource for ReplayLandmarks {
    fn name(&self) -> &str {
        &self.name
    }

    async fn detect(&mut self, _frame: &Frame) -> Result<Vec<DetectedHand>, DetectError> {
        let hands = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(hands)
    }
}
