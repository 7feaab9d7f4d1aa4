use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::{Interval, MissedTickBehavior};

use crate::camera::backend::FrameSource;
use crate::camera::error::Result;
use crate::camera::types::{Frame, CAPTURE_HEIGHT, CAPTURE_WIDTH};

const DUMMY_DEVICE_NAME: &str = "Synthetic Test Camera";

/// Frame pacing of the synthetic camera (~30 fps).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// A fake camera for running the pipeline without real hardware.
///
/// Produces a slowly shifting gradient at the fixed capture resolution,
/// paced at [`FRAME_INTERVAL`].
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    sequence: u64,
    opened_at: Instant,
    // Created on first use so construction does not need a running runtime.
    ticker: Option<Interval>,
}

impl SyntheticCamera {
    /// Open the synthetic camera at the fixed capture resolution.
    pub fn new() -> Self {
        Self::with_size(CAPTURE_WIDTH, CAPTURE_HEIGHT)
    }

    fn with_size(width: u32, height: u32) -> Self {
        tracing::info!("opened {DUMMY_DEVICE_NAME} ({width}x{height})");
        Self {
            width,
            height,
            sequence: 0,
            opened_at: Instant::now(),
            ticker: None,
        }
    }

    /// Render the test pattern for the given frame number.
    fn test_pattern(&self, sequence: u64) -> Vec<u8> {
        let shift = (sequence % 256) as u32;
        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push(((x + shift) % 256) as u8); // R
                data.push((y % 256) as u8); // G
                data.push(64); // B
            }
        }
        data
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameSource for SyntheticCamera {
    fn name(&self) -> &str {
        DUMMY_DEVICE_NAME
    }

    async fn next_frame(&mut self) -> Result<Frame> {
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = tokio::time::interval(FRAME_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        ticker.tick().await;

        let sequence = self.sequence;
        self.sequence += 1;
        Ok(Frame {
            data: self.test_pattern(sequence),
            width: self.width,
            height: self.height,
            sequence,
            timestamp_us: self.opened_at.elapsed().as_micros() as u64,
        })
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        tracing::info!(
            "released {DUMMY_DEVICE_NAME} after {} frames",
            self.sequence
        );
    }
}
