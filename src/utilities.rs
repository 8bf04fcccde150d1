//! Internal utility functions.
//!
//! Plane copying and timestamp arithmetic shared by the stages.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy plane 0 of a packed video frame into a tightly packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (`stride > width × bpp`);
/// the result has exactly `width × bytes_per_pixel` bytes per row. Returns
/// `None` if the plane is too short for the requested geometry.
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Option<Vec<u8>> {
    copy_rows(
        video_frame.data(0),
        video_frame.stride(0),
        width as usize * bytes_per_pixel,
        height as usize,
    )
}

/// Copy `rows` rows of `row_len` bytes out of a strided plane.
pub(crate) fn copy_rows(data: &[u8], stride: usize, row_len: usize, rows: usize) -> Option<Vec<u8>> {
    if rows == 0 {
        return Some(Vec::new());
    }
    if stride < row_len || data.len() < stride * (rows - 1) + row_len {
        return None;
    }

    if stride == row_len {
        return Some(data[..row_len * rows].to_vec());
    }

    let mut buffer = Vec::with_capacity(row_len * rows);
    for row in 0..rows {
        let row_start = row * stride;
        buffer.extend_from_slice(&data[row_start..row_start + row_len]);
    }
    Some(buffer)
}

/// Rescale a timestamp from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Estimate a frame count from a duration and frame rate.
pub(crate) fn estimate_frame_count(seconds: f64, frames_per_second: f64) -> u64 {
    if seconds > 0.0 && frames_per_second > 0.0 {
        (seconds * frames_per_second).round() as u64
    } else {
        0
    }
}
