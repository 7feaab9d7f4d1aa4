use crate::camera::types::Frame;
use crate::hand::bones::BONES;
use crate::hand::landmark::{DetectedHand, Landmark};

const BONE_COLOR: [u8; 3] = [0, 255, 0];
const LANDMARK_COLOR: [u8; 3] = [255, 0, 0];
const LANDMARK_RADIUS: i64 = 2;

/// Overlay every detected hand on the frame: bone lines first, landmark dots
/// on top. Partial hands get dots only for the points they have.
pub fn annotate(frame: &mut Frame, hands: &[DetectedHand]) {
    for hand in hands {
        let points = hand.to_pixels(frame.width, frame.height);
        for def in &BONES {
            if let (Some(head), Some(tail)) = (find(&points, def.head), find(&points, def.tail)) {
                draw_line(frame, tail, head, BONE_COLOR);
            }
        }
        for lm in &points {
            draw_dot(frame, lm, LANDMARK_COLOR);
        }
    }
}

fn find(points: &[Landmark], id: usize) -> Option<&Landmark> {
    points.iter().find(|lm| lm.id == id)
}

fn draw_dot(frame: &mut Frame, center: &Landmark, rgb: [u8; 3]) {
    let (cx, cy) = (i64::from(center.x), i64::from(center.y));
    for y in cy - LANDMARK_RADIUS..=cy + LANDMARK_RADIUS {
        for x in cx - LANDMARK_RADIUS..=cx + LANDMARK_RADIUS {
            frame.put_pixel(x, y, rgb);
        }
    }
}

/// Bresenham line over the part of the segment that lies inside the frame.
fn draw_line(frame: &mut Frame, from: &Landmark, to: &Landmark, rgb: [u8; 3]) {
    let from = (f64::from(from.x), f64::from(from.y));
    let to = (f64::from(to.x), f64::from(to.y));
    let Some(((mut x, mut y), (x1, y1))) = clip_to_frame(frame, from, to) else {
        return;
    };
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        frame.put_pixel(x, y, rgb);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

type PixelPair = ((i64, i64), (i64, i64));

/// Liang-Barsky clip of a segment to the frame rectangle.
///
/// Returns `None` when the segment misses the frame entirely. Landmarks can
/// sit far outside the frame (saturated to `u32::MAX`), so stepping the
/// unclipped segment is not an option.
fn clip_to_frame(frame: &Frame, from: (f64, f64), to: (f64, f64)) -> Option<PixelPair> {
    if frame.width == 0 || frame.height == 0 {
        return None;
    }
    let (max_x, max_y) = (f64::from(frame.width - 1), f64::from(frame.height - 1));
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);

    for (p, q) in [
        (-dx, from.0),
        (dx, max_x - from.0),
        (-dy, from.1),
        (dy, max_y - from.1),
    ] {
        if p.abs() < f64::EPSILON {
            // Parallel to this edge: entirely outside or irrelevant.
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let at = |t: f64| {
        (
            (from.0 + t * dx).round().clamp(0.0, max_x) as i64,
            (from.1 + t * dy).round().clamp(0.0, max_y) as i64,
        )
    };
    Some((at(t0), at(t1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::landmark::NormalizedLandmark;

    fn pixel(frame: &Frame, x: i64, y: i64) -> [u8; 3] {
        let idx = frame.offset(x, y).unwrap();
        [frame.data[idx], frame.data[idx + 1], frame.data[idx + 2]]
    }

    fn lm(id: usize, x: u32, y: u32) -> Landmark {
        Landmark { id, x, y, z: 0.0 }
    }

    #[test]
    fn line_covers_both_endpoints() {
        let mut frame = Frame::blank(20, 20, 0, 0);
        draw_line(&mut frame, &lm(0, 2, 3), &lm(1, 15, 9), BONE_COLOR);
        assert_eq!(pixel(&frame, 2, 3), BONE_COLOR);
        assert_eq!(pixel(&frame, 15, 9), BONE_COLOR);
    }

    #[test]
    fn vertical_line_is_continuous() {
        let mut frame = Frame::blank(10, 10, 0, 0);
        draw_line(&mut frame, &lm(0, 4, 8), &lm(1, 4, 1), BONE_COLOR);
        for y in 1..=8 {
            assert_eq!(pixel(&frame, 4, y), BONE_COLOR, "gap at y={y}");
        }
    }

    #[test]
    fn dot_near_edge_is_clipped() {
        let mut frame = Frame::blank(10, 10, 0, 0);
        draw_dot(&mut frame, &lm(0, 0, 0), LANDMARK_COLOR);
        assert_eq!(pixel(&frame, 0, 0), LANDMARK_COLOR);
        assert_eq!(pixel(&frame, 2, 2), LANDMARK_COLOR);
        assert_eq!(pixel(&frame, 3, 3), [0, 0, 0]);
    }

    #[test]
    fn annotate_marks_every_landmark() {
        let mut frame = Frame::blank(100, 100, 0, 0);
        let hand = DetectedHand::new(
            (0..21)
                .map(|i| NormalizedLandmark::new(0.1 + i as f32 * 0.04, 0.5))
                .collect(),
        );
        annotate(&mut frame, &[hand.clone()]);
        for point in hand.to_pixels(100, 100) {
            assert_eq!(
                pixel(&frame, i64::from(point.x), i64::from(point.y)),
                LANDMARK_COLOR
            );
        }
    }

    #[test]
    fn line_to_a_far_off_frame_point_is_clipped() {
        let mut frame = Frame::blank(16, 16, 0, 0);
        draw_line(&mut frame, &lm(0, 0, 0), &lm(1, u32::MAX, u32::MAX), BONE_COLOR);
        for i in 0..16 {
            assert_eq!(pixel(&frame, i, i), BONE_COLOR, "gap at {i}");
        }
    }

    #[test]
    fn line_entirely_outside_draws_nothing() {
        let mut frame = Frame::blank(16, 16, 0, 0);
        draw_line(&mut frame, &lm(0, 100, 0), &lm(1, u32::MAX, 5), BONE_COLOR);
        assert!(frame.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn line_crossing_the_frame_keeps_its_inside_part() {
        let mut frame = Frame::blank(10, 10, 0, 0);
        draw_line(&mut frame, &lm(0, 4, 2), &lm(1, 4, 5000), BONE_COLOR);
        for y in 2..10 {
            assert_eq!(pixel(&frame, 4, y), BONE_COLOR, "gap at y={y}");
        }
        assert_eq!(pixel(&frame, 4, 1), [0, 0, 0]);
    }

    #[test]
    fn annotate_survives_infinite_landmarks() {
        let mut frame = Frame::blank(64, 48, 0, 0);
        let mut landmarks: Vec<_> = (0..21)
            .map(|i| NormalizedLandmark::new(0.1 + i as f32 * 0.02, 0.5))
            .collect();
        landmarks[8] = NormalizedLandmark::new(f32::INFINITY, f32::INFINITY);
        landmarks[12] = NormalizedLandmark::new(1.0e12, 0.5);
        annotate(&mut frame, &[DetectedHand::new(landmarks)]);
        assert!(frame.data.iter().any(|&b| b != 0));
    }

    #[test]
    fn annotate_without_hands_leaves_frame_untouched() {
        let mut frame = Frame::blank(10, 10, 0, 0);
        annotate(&mut frame, &[]);
        assert!(frame.data.iter().all(|&b| b == 0));
    }
}
