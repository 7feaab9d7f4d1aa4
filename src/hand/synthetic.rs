use async_trait::async_trait;

use crate::camera::types::Frame;
use crate::hand::detector::LandmarkSource;
use crate::hand::error::DetectError;
use crate::hand::landmark::{DetectedHand, NormalizedLandmark, LANDMARK_COUNT};

/// Open right hand, palm facing the camera, as offsets from the frame centre
/// in normalized units. Index order follows the hand model.
const OPEN_HAND: [(f32, f32); LANDMARK_COUNT] = [
    (0.000, 0.200),   // wrist
    (-0.060, 0.150),  // thumb
    (-0.110, 0.100),
    (-0.140, 0.050),
    (-0.160, 0.010),
    (-0.050, 0.020),  // index
    (-0.060, -0.060),
    (-0.065, -0.110),
    (-0.070, -0.150),
    (0.000, 0.010),   // middle
    (0.000, -0.080),
    (0.000, -0.130),
    (0.000, -0.180),
    (0.045, 0.020),   // ring
    (0.050, -0.050),
    (0.055, -0.100),
    (0.060, -0.140),
    (0.085, 0.050),   // pinky
    (0.100, -0.010),
    (0.110, -0.050),
    (0.120, -0.090),
];

const ORBIT_RADIUS: f32 = 0.05;
const ORBIT_STEP: f32 = 0.03;
const SWAY: f32 = 0.3;

/// A landmark source that needs no model: one open hand drifting in a small
/// circle around the frame centre while swaying about the wrist.
#[derive(Debug, Default)]
pub struct SyntheticHand {
    tick: u64,
}

impl SyntheticHand {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hand at animation step `tick`. All points stay inside [0, 1].
    pub fn pose_at(tick: u64) -> DetectedHand {
        let phase = tick as f32 * ORBIT_STEP;
        let (cx, cy) = (
            0.5 + ORBIT_RADIUS * phase.cos(),
            0.5 + ORBIT_RADIUS * phase.sin(),
        );
        let (sin, cos) = (SWAY * phase.sin()).sin_cos();
        let (wx, wy) = OPEN_HAND[0];

        let landmarks = OPEN_HAND
            .iter()
            .map(|&(dx, dy)| {
                // rotate about the wrist
                let (rx, ry) = (dx - wx, dy - wy);
                NormalizedLandmark::new(
                    cx + wx + rx * cos - ry * sin,
                    cy + wy + rx * sin + ry * cos,
                )
            })
            .collect();
        DetectedHand::new(landmarks)
    }
}

#[async_trait]
impl LandmarkSource for SyntheticHand {
    fn name(&self) -> &str {
        "synthetic hand"
    }

    async fn detect(&mut self, _frame: &Frame) -> Result<Vec<DetectedHand>, DetectError> {
        let hand = Self::pose_at(self.tick);
        self.tick += 1;
        Ok(vec![hand])
    }
}
