use async_trait::async_trait;

use crate::camera::error::Result;
use crate::camera::types::Frame;

/// Source of video frames.
///
/// Implementations own their device handle exclusively and release it when
/// dropped. The frame loop holds the only instance, so dropping the loop
/// releases the device on every exit path.
#[async_trait]
pub trait FrameSource: Send {
    /// Human-readable device name for logs.
    fn name(&self) -> &str;

    /// Wait for the next frame.
    ///
    /// `CaptureError::Transient` means "try again"; `CaptureError::Disconnected`
    /// ends the stream.
    async fn next_frame(&mut self) -> Result<Frame>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::error::CaptureError;

    /// Mock source for testing the trait contract.
    struct MockSource {
        remaining: u64,
    }

    #[async_trait]
    impl FrameSource for MockSource {
        fn name(&self) -> &str {
            "mock"
        }

        async fn next_frame(&mut self) -> Result<Frame> {
            if self.remaining == 0 {
                return Err(CaptureError::Disconnected("mock exhausted".to_string()));
            }
            self.remaining -= 1;
            Ok(Frame::blank(2, 2, self.remaining, 0))
        }
    }

    #[tokio::test]
    async fn mock_source_yields_frames_then_disconnects() {
        let mut source: Box<dyn FrameSource> = Box::new(MockSource { remaining: 1 });
        assert!(source.next_frame().await.is_ok());
        let err = source.next_frame().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn trait_object_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Box<dyn FrameSource>>();
    }
}
