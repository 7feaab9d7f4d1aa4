use thiserror::Error;

/// Preview snapshot failures. Never fatal to the frame loop.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("failed to encode preview: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to write preview: {0}")]
    Io(#[from] std::io::Error),
}
