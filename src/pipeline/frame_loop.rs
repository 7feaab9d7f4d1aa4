use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use crate::camera::backend::FrameSource;
use crate::camera::types::Frame;
use crate::diagnostics::stats::{StreamSnapshot, StreamStats};
use crate::hand::bones::build_bone_frame;
use crate::hand::detector::LandmarkSource;
use crate::preview::draw;
use crate::preview::sink::{DisplayControl, DisplaySink};
use crate::stream::slot::BoneSink;

/// Log a diagnostics line every this many captured frames (~10 s at 30 fps).
pub const DEFAULT_REPORT_EVERY: u64 = 300;

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Process-wide shutdown was signalled.
    Interrupted,
    /// The display sink relayed the operator's stop key.
    OperatorStop,
    /// The capture device is gone.
    CaptureLost(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupted => write!(f, "interrupted"),
            Self::OperatorStop => write!(f, "operator stop"),
            Self::CaptureLost(reason) => write!(f, "capture lost: {reason}"),
        }
    }
}

/// Result of a finished loop.
#[derive(Debug, Clone)]
pub struct LoopExit {
    pub reason: StopReason,
    pub stats: StreamSnapshot,
}

/// What happened to a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Sent,
    NoHand,
    PartialPose,
    DetectFailed,
    /// A message was built but could not be delivered.
    Dropped,
}

/// Capture, detect, build, send. One frame at a time.
///
/// Owns the frame source and the landmark source; both are dropped when
/// [`FrameLoop::run`] returns, whatever the exit path.
pub struct FrameLoop {
    camera: Box<dyn FrameSource>,
    detector: Box<dyn LandmarkSource>,
    sink: Arc<dyn BoneSink>,
    display: Option<Box<dyn DisplaySink>>,
    stats: Arc<Mutex<StreamStats>>,
    report_every: u64,
    // Set while consecutive sends fail, so only the first one warns.
    dropping: bool,
}

impl FrameLoop {
    pub fn new(
        camera: Box<dyn FrameSource>,
        detector: Box<dyn LandmarkSource>,
        sink: Arc<dyn BoneSink>,
        stats: Arc<Mutex<StreamStats>>,
    ) -> Self {
        Self {
            camera,
            detector,
            sink,
            display: None,
            stats,
            report_every: DEFAULT_REPORT_EVERY,
            dropping: false,
        }
    }

    /// Attach a preview. Frames are annotated only when one is attached.
    pub fn with_display(mut self, display: Option<Box<dyn DisplaySink>>) -> Self {
        self.display = display;
        self
    }

    /// Log diagnostics every `frames` frames; 0 disables the periodic report.
    pub fn report_every(mut self, frames: u64) -> Self {
        self.report_every = frames;
        self
    }

    /// Run until shutdown, operator stop or capture loss.
    ///
    /// Capture failures are retried immediately; frames that cannot be sent
    /// are dropped and counted. Neither ends the loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> LoopExit {
        info!(
            "frame loop started (camera: {}, landmarks: {}, preview: {})",
            self.camera.name(),
            self.detector.name(),
            if self.display.is_some() { "on" } else { "off" }
        );

        let reason = loop {
            if *shutdown.borrow() {
                break StopReason::Interrupted;
            }
            let next = tokio::select! {
                biased;
                _ = shutdown.changed() => break StopReason::Interrupted,
                next = self.camera.next_frame() => next,
            };

            let mut frame = match next {
                Ok(frame) => frame,
                Err(e) if e.is_fatal() => {
                    error!("{e}");
                    break StopReason::CaptureLost(e.to_string());
                }
                Err(e) => {
                    warn!("{e}");
                    self.stats.lock().record_capture_failure();
                    tokio::task::yield_now().await;
                    continue;
                }
            };
            let frame_count = {
                let mut stats = self.stats.lock();
                stats.record_frame();
                stats.frame_count()
            };

            // A client that stops reading must not keep shutdown waiting.
            let outcome = tokio::select! {
                biased;
                _ = shutdown.changed() => break StopReason::Interrupted,
                outcome = self.process(&mut frame) => outcome,
            };
            trace!("frame {}: {outcome:?}", frame.sequence);

            if let Some(display) = self.display.as_mut() {
                if display.show(&frame) == DisplayControl::Stop {
                    break StopReason::OperatorStop;
                }
            }

            if self.report_every > 0 && frame_count % self.report_every == 0 {
                self.report();
            }
        };

        let stats = self.stats.lock().snapshot();
        let FrameLoop {
            camera,
            detector,
            display,
            ..
        } = self;
        drop(display);
        drop(detector);
        drop(camera);
        info!(
            "frame loop stopped ({reason}): {} frames, {} sent, {} dropped",
            stats.frame_count, stats.sent_count, stats.drop_count
        );
        LoopExit { reason, stats }
    }

    /// Detect, build and send for one frame.
    pub async fn process(&mut self, frame: &mut Frame) -> FrameOutcome {
        let hands = match self.detector.detect(frame).await {
            Ok(hands) => hands,
            Err(e) => {
                warn!("frame {}: {e}", frame.sequence);
                self.stats.lock().record_detect_failure();
                return FrameOutcome::DetectFailed;
            }
        };
        if self.display.is_some() {
            draw::annotate(frame, &hands);
        }

        // Only the first hand is streamed.
        let Some(hand) = hands.first() else {
            self.stats.lock().record_no_hand();
            return FrameOutcome::NoHand;
        };
        let bones = match build_bone_frame(&hand.to_pixels(frame.width, frame.height)) {
            Ok(bones) => bones,
            Err(e) => {
                trace!("frame {} skipped: {e}", frame.sequence);
                self.stats.lock().record_partial_pose();
                return FrameOutcome::PartialPose;
            }
        };

        let text = match bones.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!("frame {}: failed to serialise bone frame: {e}", frame.sequence);
                self.stats.lock().record_drop();
                return FrameOutcome::Dropped;
            }
        };
        let len = text.len();

        match self.sink.send_text(text).await {
            Ok(()) => {
                if self.dropping {
                    info!("bone frames flowing again");
                }
                self.dropping = false;
                self.stats.lock().record_sent(len);
                FrameOutcome::Sent
            }
            Err(e) => {
                if self.dropping {
                    debug!("frame {} dropped: {e}", frame.sequence);
                } else {
                    warn!("dropping bone frames: {e}");
                }
                self.dropping = true;
                self.stats.lock().record_drop();
                FrameOutcome::Dropped
            }
        }
    }

    fn report(&self) {
        let snap = self.stats.lock().snapshot();
        info!("{}", report_line(&snap));
    }
}

/// One-line diagnostics summary for the periodic report.
fn report_line(snap: &StreamSnapshot) -> String {
    let last_send = match snap.ms_since_last_send {
        Some(ms) => format!("last send {ms} ms ago"),
        None => "nothing sent yet".to_string(),
    };
    format!(
        "{} frames ({:.1} fps): {} sent, {} dropped ({:.1}%), {} without hand, {} partial, \
         {} capture failures, {} detect failures, {} B/s, {last_send}",
        snap.frame_count,
        snap.fps,
        snap.sent_count,
        snap.drop_count,
        snap.drop_rate,
        snap.frames_without_hand,
        snap.partial_poses,
        snap.capture_failures,
        snap.detect_failures,
        snap.bandwidth_bps,
    )
}
