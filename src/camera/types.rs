use std::fmt;

/// Fixed capture resolution. Resolution negotiation is not supported.
pub const CAPTURE_WIDTH: u32 = 640;
pub const CAPTURE_HEIGHT: u32 = 480;

/// A single captured frame from the camera.
pub struct Frame {
    /// Raw pixel data (RGB, row-major, 3 bytes per pixel).
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Monotonic frame counter assigned by the source.
    pub sequence: u64,
    /// Capture timestamp in microseconds since the source was opened.
    pub timestamp_us: u64,
}

impl Frame {
    /// Create a black frame of the given size.
    pub fn blank(width: u32, height: u32, sequence: u64, timestamp_us: u64) -> Self {
        Self {
            data: vec![0; (width as usize) * (height as usize) * 3],
            width,
            height,
            sequence,
            timestamp_us,
        }
    }

    /// Byte offset of pixel (x, y), or `None` when outside the frame.
    pub fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        (idx + 2 < self.data.len()).then_some(idx)
    }

    /// Overwrite one pixel. Coordinates outside the frame are ignored.
    pub fn put_pixel(&mut self, x: i64, y: i64, rgb: [u8; 3]) {
        if let Some(idx) = self.offset(x, y) {
            self.data[idx..idx + 3].copy_from_slice(&rgb);
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("timestamp_us", &self.timestamp_us)
            .field("bytes", &self.data.len())
            .finish()
    }
}
