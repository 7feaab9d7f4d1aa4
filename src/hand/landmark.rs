//! The 21-point hand model: detector output in normalized space, landmarks in
//! pixel space, and the validated [`HandPose`].

use serde::{Deserialize, Serialize};

use crate::hand::error::PoseError;

/// Number of keypoints in the hand model.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// A keypoint as reported by the landmark source, in [0, 1] image space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
    /// Relative depth. Carried through but never used.
    #[serde(default)]
    pub z: f32,
}

impl NormalizedLandmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// One detected hand: its keypoints in model order.
///
/// Nothing guarantees the source returned all 21 points; validation happens
/// when building a [`HandPose`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectedHand {
    pub landmarks: Vec<NormalizedLandmark>,
}

impl DetectedHand {
    pub fn new(landmarks: Vec<NormalizedLandmark>) -> Self {
        Self { landmarks }
    }

    /// Scale to pixel space, numbering landmarks by their position.
    pub fn to_pixels(&self, width: u32, height: u32) -> Vec<Landmark> {
        self.landmarks
            .iter()
            .enumerate()
            .map(|(id, lm)| Landmark::from_normalized(id, lm, width, height))
            .collect()
    }
}

/// A keypoint in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub id: usize,
    pub x: u32,
    pub y: u32,
    pub z: f32,
}

impl Landmark {
    /// Scale a normalized keypoint by the frame size.
    ///
    /// Truncates toward zero. Negative (off-frame) and NaN inputs become 0.
    pub fn from_normalized(id: usize, lm: &NormalizedLandmark, width: u32, height: u32) -> Self {
        Self {
            id,
            x: (lm.x * width as f32) as u32,
            y: (lm.y * height as f32) as u32,
            z: lm.z,
        }
    }
}

/// A 2D pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelPoint {
    pub x: u32,
    pub y: u32,
}

/// A complete hand: exactly one pixel point for every landmark index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandPose {
    points: [PixelPoint; LANDMARK_COUNT],
}

impl HandPose {
    /// Validate a landmark list into a pose.
    ///
    /// Landmarks may arrive in any order but every index 0..=20 must appear
    /// exactly once.
    pub fn from_landmarks(landmarks: &[Landmark]) -> Result<Self, PoseError> {
        let mut slots: [Option<PixelPoint>; LANDMARK_COUNT] = [None; LANDMARK_COUNT];
        for lm in landmarks {
            let slot = slots.get_mut(lm.id).ok_or(PoseError::OutOfRange(lm.id))?;
            if slot.is_some() {
                return Err(PoseError::DuplicateLandmark(lm.id));
            }
            *slot = Some(PixelPoint { x: lm.x, y: lm.y });
        }

        let found = slots.iter().flatten().count();
        if found < LANDMARK_COUNT {
            return Err(PoseError::Incomplete { found });
        }
        Ok(Self {
            points: slots.map(Option::unwrap_or_default),
        })
    }

    /// Pixel position of landmark `index`.
    ///
    /// # Panics
    ///
    /// If `index >= LANDMARK_COUNT`.
    pub fn point(&self, index: usize) -> PixelPoint {
        self.points[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landmarks(count: usize) -> Vec<Landmark> {
        (0..count)
            .map(|id| Landmark {
                id,
                x: id as u32 * 10,
                y: id as u32 * 20,
                z: 0.0,
            })
            .collect()
    }

    #[test]
    fn scaling_truncates_toward_zero() {
        let lm = Landmark::from_normalized(3, &NormalizedLandmark::new(0.5, 0.999), 641, 480);
        assert_eq!(lm.id, 3);
        assert_eq!(lm.x, 320);
        assert_eq!(lm.y, 479);
    }

    #[test]
    fn off_frame_coordinates_saturate_at_zero() {
        let lm = Landmark::from_normalized(0, &NormalizedLandmark::new(-0.2, f32::NAN), 640, 480);
        assert_eq!((lm.x, lm.y), (0, 0));
    }

    #[test]
    fn to_pixels_numbers_landmarks_in_order() {
        let hand = DetectedHand::new(vec![
            NormalizedLandmark::new(0.0, 0.0),
            NormalizedLandmark::new(0.5, 0.5),
        ]);
        let pixels = hand.to_pixels(100, 200);
        assert_eq!(pixels[1].id, 1);
        assert_eq!((pixels[1].x, pixels[1].y), (50, 100));
    }

    #[test]
    fn full_pose_is_accepted() {
        let pose = HandPose::from_landmarks(&landmarks(21)).unwrap();
        assert_eq!(pose.point(20), PixelPoint { x: 200, y: 400 });
    }

    #[test]
    fn unordered_landmarks_are_placed_by_id() {
        let mut lms = landmarks(21);
        lms.reverse();
        let pose = HandPose::from_landmarks(&lms).unwrap();
        assert_eq!(pose.point(WRIST), PixelPoint { x: 0, y: 0 });
        assert_eq!(pose.point(THUMB_TIP), PixelPoint { x: 40, y: 80 });
    }

    #[test]
    fn partial_pose_is_rejected() {
        let err = HandPose::from_landmarks(&landmarks(15)).unwrap_err();
        assert_eq!(err, PoseError::Incomplete { found: 15 });
    }

    #[test]
    fn duplicate_landmark_is_rejected() {
        let mut lms = landmarks(21);
        lms[20].id = 4;
        assert_eq!(
            HandPose::from_landmarks(&lms).unwrap_err(),
            PoseError::DuplicateLandmark(4)
        );
    }

    #[test]
    fn out_of_range_landmark_is_rejected() {
        let mut lms = landmarks(21);
        lms[7].id = 21;
        assert_eq!(
            HandPose::from_landmarks(&lms).unwrap_err(),
            PoseError::OutOfRange(21)
        );
    }

    #[test]
    fn gap_in_ids_counts_as_incomplete() {
        let mut lms = landmarks(21);
        lms.retain(|lm| lm.id != MIDDLE_MCP);
        assert_eq!(
            HandPose::from_landmarks(&lms).unwrap_err(),
            PoseError::Incomplete { found: 20 }
        );
    }

    #[test]
    fn empty_landmark_list_is_incomplete() {
        assert_eq!(
            HandPose::from_landmarks(&[]).unwrap_err(),
            PoseError::Incomplete { found: 0 }
        );
    }

    #[test]
    fn detected_hand_deserialises_from_point_array() {
        let json = r#"[{"x":0.25,"y":0.5,"z":-0.1},{"x":1.0,"y":0.0}]"#;
        let hand: DetectedHand = serde_json::from_str(json).unwrap();
        assert_eq!(hand.landmarks.len(), 2);
        assert_eq!(hand.landmarks[0].x, 0.25);
        assert_eq!(hand.landmarks[1].z, 0.0);
    }
}
