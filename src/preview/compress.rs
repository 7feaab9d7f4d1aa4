use image::codecs::jpeg::JpegEncoder;
use image::error::{ParameterError, ParameterErrorKind};
use image::{ImageBuffer, ImageError, Rgb};

use crate::camera::types::Frame;

/// Compress raw RGB pixel data to JPEG at the given quality (1-100).
pub fn compress_jpeg(
    data: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, ImageError> {
    let img: ImageBuffer<Rgb<u8>, _> =
        ImageBuffer::from_raw(width, height, data).ok_or_else(dimension_mismatch)?;

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    img.write_with_encoder(encoder)?;
    Ok(buf)
}

fn dimension_mismatch() -> ImageError {
    ImageError::Parameter(ParameterError::from_kind(
        ParameterErrorKind::DimensionMismatch,
    ))
}

/// Compress a whole frame.
pub fn compress_frame(frame: &Frame, quality: u8) -> Result<Vec<u8>, ImageError> {
    compress_jpeg(&frame.data, frame.width, frame.height, quality)
}
