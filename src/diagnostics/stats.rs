use serde::Serialize;
use std::time::Instant;

/// Collects diagnostic statistics for a streaming session.
pub struct StreamStats {
    frame_count: u64,
    capture_failures: u64,
    detect_failures: u64,
    frames_without_hand: u64,
    partial_poses: u64,
    sent_count: u64,
    drop_count: u64,
    total_bytes: u64,
    start_time: Instant,
    last_sent_time: Option<Instant>,
}

/// Snapshot of diagnostic stats for logging and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSnapshot {
    pub fps: f64,
    pub frame_count: u64,
    pub capture_failures: u64,
    pub detect_failures: u64,
    pub frames_without_hand: u64,
    pub partial_poses: u64,
    pub sent_count: u64,
    pub drop_count: u64,
    pub drop_rate: f64,
    pub bandwidth_bps: u64,
    pub ms_since_last_send: Option<u64>,
}

impl StreamStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            capture_failures: 0,
            detect_failures: 0,
            frames_without_hand: 0,
            partial_poses: 0,
            sent_count: 0,
            drop_count: 0,
            total_bytes: 0,
            start_time: Instant::now(),
            last_sent_time: None,
        }
    }

    /// Record a successfully captured frame.
    pub fn record_frame(&mut self) {
        self.frame_count += 1;
    }

    /// Record a frame the camera failed to deliver.
    pub fn record_capture_failure(&mut self) {
        self.capture_failures += 1;
    }

    /// Record a frame the landmark source failed on.
    pub fn record_detect_failure(&mut self) {
        self.detect_failures += 1;
    }

    /// Record a frame in which no hand was detected.
    pub fn record_no_hand(&mut self) {
        self.frames_without_hand += 1;
    }

    /// Record a frame skipped because the first hand was incomplete.
    pub fn record_partial_pose(&mut self) {
        self.partial_poses += 1;
    }

    /// Record a bone frame delivered to the client.
    pub fn record_sent(&mut self, bytes: usize) {
        self.sent_count += 1;
        self.total_bytes += bytes as u64;
        self.last_sent_time = Some(Instant::now());
    }

    /// Record a bone frame that was built but never delivered.
    pub fn record_drop(&mut self) {
        self.drop_count += 1;
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Calculate current FPS based on elapsed time.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.frame_count as f64 / elapsed
    }

    /// Share of built messages that were dropped, as a percentage (0.0 - 100.0).
    pub fn drop_rate(&self) -> f64 {
        let total = self.sent_count + self.drop_count;
        if total == 0 {
            return 0.0;
        }
        (self.drop_count as f64 / total as f64) * 100.0
    }

    /// Bandwidth in bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            fps: self.fps(),
            frame_count: self.frame_count,
            capture_failures: self.capture_failures,
            detect_failures: self.detect_failures,
            frames_without_hand: self.frames_without_hand,
            partial_poses: self.partial_poses,
            sent_count: self.sent_count,
            drop_count: self.drop_count,
            drop_rate: self.drop_rate(),
            bandwidth_bps: self.bandwidth_bps(),
            ms_since_last_send: self
                .last_sent_time
                .map(|t| t.elapsed().as_millis() as u64),
        }
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}
