//! Synthetic frame rendering and JPEG encoding.

use std::io::Write;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgb, RgbImage};

use camera_capture_core::processing::orientation::normalize_degrees;
use camera_capture_core::{CameraError, Resolution, SensorLocation};

const JPEG_QUALITY: u8 = 92;

/// Render a gradient test card for one sensor.
///
/// The top-left quadrant carries a white marker so rotation is visible in the
/// encoded still. Back frames are blue-tinted, front frames green-tinted.
pub fn render_test_pattern(resolution: Resolution, location: SensorLocation, sequence: u64) -> RgbImage {
    let (width, height) = (resolution.width, resolution.height);
    let marker_w = (width / 8).max(1);
    let marker_h = (height / 8).max(1);
    let phase = (sequence % 256) as u32;

    RgbImage::from_fn(width, height, |x, y| {
        if x < marker_w && y < marker_h {
            return Rgb([255, 255, 255]);
        }
        let horizontal = ((x * 255) / width.max(1) + phase) % 256;
        let vertical = (y * 255) / height.max(1);
        match location {
            SensorLocation::Back => Rgb([horizontal as u8, vertical as u8, 200]),
            SensorLocation::Front => Rgb([vertical as u8, 200, horizontal as u8]),
        }
    })
}

/// Rotate a frame clockwise by the encode orientation (multiples of 90 only).
pub fn apply_encode_orientation(frame: RgbImage, degrees: i32) -> RgbImage {
    match normalize_degrees(degrees) {
        90 => imageops::rotate90(&frame),
        180 => imageops::rotate180(&frame),
        270 => imageops::rotate270(&frame),
        0 => frame,
        other => {
            log::warn!("Encode orientation {} is not a quarter turn; frame left unrotated", other);
            frame
        }
    }
}

pub fn encode_jpeg<W: Write>(frame: &RgbImage, out: W) -> Result<(), CameraError> {
    let mut encoder = JpegEncoder::new_with_quality(out, JPEG_QUALITY);
    encoder
        .encode_image(frame)
        .map_err(|e| CameraError::CaptureFailed(format!("failed to encode JPEG: {}", e)))
}
