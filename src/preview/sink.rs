use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::camera::types::Frame;
use crate::preview::compress::compress_frame;
use crate::preview::error::PreviewError;
use crate::preview::stop_key::StopKey;

/// Write a snapshot every this many frames (~2 per second at 30 fps).
const SNAPSHOT_EVERY: u64 = 15;
const SNAPSHOT_QUALITY: u8 = 80;

/// What the frame loop should do after a frame was displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayControl {
    Continue,
    /// The operator asked to stop.
    Stop,
}

/// Consumer of annotated frames.
///
/// Optional: the frame loop only annotates and displays when a sink is
/// attached.
pub trait DisplaySink: Send {
    fn show(&mut self, frame: &Frame) -> DisplayControl;
}

/// Headless preview: periodically writes the annotated frame as a JPEG file
/// and watches the console stop key.
///
/// Encoding and file IO run on the blocking pool; a snapshot is skipped while
/// the previous one is still being written.
pub struct SnapshotSink {
    path: PathBuf,
    stop_key: Option<StopKey>,
    failing: Arc<AtomicBool>,
    in_flight: Option<JoinHandle<()>>,
}

impl SnapshotSink {
    pub fn new(path: PathBuf, stop_key: Option<StopKey>) -> Self {
        Self {
            path,
            stop_key,
            failing: Arc::new(AtomicBool::new(false)),
            in_flight: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn start_write(&mut self, frame: &Frame) {
        let snapshot = Frame {
            data: frame.data.clone(),
            width: frame.width,
            height: frame.height,
            sequence: frame.sequence,
            timestamp_us: frame.timestamp_us,
        };
        let path = self.path.clone();
        let failing = Arc::clone(&self.failing);
        let job = move || record_outcome(&path, write_snapshot(&path, &snapshot), &failing);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => self.in_flight = Some(handle.spawn_blocking(job)),
            // Outside a runtime there is no loop to stall.
            Err(_) => job(),
        }
    }
}

/// Encode and replace the snapshot atomically (write .tmp then rename).
fn write_snapshot(path: &Path, frame: &Frame) -> Result<(), PreviewError> {
    let jpeg = compress_frame(frame, SNAPSHOT_QUALITY)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("jpg.tmp");
    std::fs::write(&tmp_path, &jpeg)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Warn once per failure streak.
fn record_outcome(path: &Path, result: Result<(), PreviewError>, failing: &AtomicBool) {
    match result {
        Ok(()) => {
            if failing.swap(false, Ordering::Relaxed) {
                debug!("preview snapshot writes recovered");
            }
        }
        Err(e) => {
            if !failing.swap(true, Ordering::Relaxed) {
                warn!("{}: {e}", path.display());
            }
        }
    }
}

impl DisplaySink for SnapshotSink {
    fn show(&mut self, frame: &Frame) -> DisplayControl {
        if self.stop_key.as_ref().is_some_and(StopKey::is_pressed) {
            return DisplayControl::Stop;
        }
        if frame.sequence % SNAPSHOT_EVERY != 0 {
            return DisplayControl::Continue;
        }
        if self.in_flight.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("preview write still running, skipping frame {}", frame.sequence);
            return DisplayControl::Continue;
        }

        self.start_write(frame);
        DisplayControl::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    /// Wait for the pending background write, if any.
    async fn settle(sink: &mut SnapshotSink) {
        if let Some(handle) = sink.in_flight.take() {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn writes_jpeg_on_snapshot_frames() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preview.jpg");
        let mut sink = SnapshotSink::new(path.clone(), None);

        assert_eq!(sink.show(&Frame::blank(16, 16, 0, 0)), DisplayControl::Continue);
        settle(&mut sink).await;
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert!(!path.with_extension("jpg.tmp").exists());
    }

    #[tokio::test]
    async fn write_runs_off_the_calling_task() {
        let dir = TempDir::new().unwrap();
        let mut sink = SnapshotSink::new(dir.path().join("preview.jpg"), None);
        sink.show(&Frame::blank(16, 16, 0, 0));
        assert!(sink.in_flight.is_some());
        settle(&mut sink).await;
    }

    #[tokio::test]
    async fn skips_frames_between_snapshots() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preview.jpg");
        let mut sink = SnapshotSink::new(path.clone(), None);

        sink.show(&Frame::blank(16, 16, 1, 0));
        assert!(sink.in_flight.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("preview.jpg");
        let mut sink = SnapshotSink::new(path.clone(), None);
        sink.show(&Frame::blank(16, 16, 0, 0));
        settle(&mut sink).await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn write_failure_does_not_stop_the_loop() {
        let dir = TempDir::new().unwrap();
        // The parent "directory" is a regular file.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let mut sink = SnapshotSink::new(blocker.join("preview.jpg"), None);

        assert_eq!(sink.show(&Frame::blank(16, 16, 0, 0)), DisplayControl::Continue);
        settle(&mut sink).await;
        assert!(sink.failing.load(Ordering::Relaxed));
    }

    #[test]
    fn write_failure_is_typed() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let err = write_snapshot(&blocker.join("p.jpg"), &Frame::blank(4, 4, 0, 0)).unwrap_err();
        assert!(matches!(err, PreviewError::Io(_)));

        let mut short = Frame::blank(4, 4, 0, 0);
        short.data.truncate(10);
        let err = write_snapshot(&dir.path().join("p.jpg"), &short).unwrap_err();
        assert!(matches!(err, PreviewError::Encode(_)));
    }

    #[test]
    fn writes_inline_without_a_runtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preview.jpg");
        let mut sink = SnapshotSink::new(path.clone(), None);
        sink.show(&Frame::blank(16, 16, 0, 0));
        assert!(sink.in_flight.is_none());
        assert!(path.exists());
    }

    #[test]
    fn stop_key_requests_stop() {
        let dir = TempDir::new().unwrap();
        let key = StopKey::listen(Cursor::new("q\n")).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while !key.is_pressed() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        let mut sink = SnapshotSink::new(dir.path().join("p.jpg"), Some(key));
        assert_eq!(sink.show(&Frame::blank(16, 16, 3, 0)), DisplayControl::Stop);
    }
}
