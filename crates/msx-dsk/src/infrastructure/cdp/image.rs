//! Screenshot decoding: base64 PNG from `Page.captureScreenshot` to pixels.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use msx_core::{Rgb, Screenshot};
use png::{ColorType, Transformations};

use crate::application::driver::DriverError;

/// Decodes the `data` field of a `Page.captureScreenshot` response.
///
/// # Errors
///
/// [`DriverError::Image`] if the data is not base64 or not a PNG.
pub fn decode_screenshot(data: &str) -> Result<Screenshot, DriverError> {
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| DriverError::Image(format!("bad base64: {e}")))?;
    decode_png(&bytes)
}

/// Decodes a PNG into an RGB [`Screenshot`], dropping alpha.
///
/// # Errors
///
/// [`DriverError::Image`] on malformed or unsupported images.
pub fn decode_png(bytes: &[u8]) -> Result<Screenshot, DriverError> {
    let image_err = |e: png::DecodingError| DriverError::Image(e.to_string());

    let mut decoder = png::Decoder::new(bytes);
    // Palette and low bit depths expand to 8-bit, 16-bit strips to 8-bit.
    decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
    let mut reader = decoder.read_info().map_err(image_err)?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).map_err(image_err)?;
    let data = &buf[..info.buffer_size()];

    let channels = match info.color_type {
        ColorType::Rgb => 3,
        ColorType::Rgba => 4,
        ColorType::Grayscale => 1,
        ColorType::GrayscaleAlpha => 2,
        ColorType::Indexed => {
            return Err(DriverError::Image("indexed PNG was not expanded".into()));
        }
    };

    let row_len = info.width as usize * channels;
    let mut pixels = Vec::with_capacity(info.width as usize * info.height as usize);
    for row in data.chunks(info.line_size).take(info.height as usize) {
        for px in row[..row_len.min(row.len())].chunks_exact(channels) {
            pixels.push(match channels {
                1 | 2 => Rgb::new(px[0], px[0], px[0]),
                _ => Rgb::new(px[0], px[1], px[2]),
            });
        }
    }

    Screenshot::new(info.width, info.height, pixels)
        .ok_or_else(|| DriverError::Image("truncated PNG frame".into()))
}
