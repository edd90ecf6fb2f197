//! Disk-activity detection from the drive button's LED colour.
//!
//! WebMSX draws the disk-A drive button with a red LED while the drive is
//! being accessed.  Sampling one pixel of that button tells whether the disk
//! is busy.  The check is a heuristic: a repaint that happens to match the
//! reference colours reads as busy, and a very short access can be missed.

use super::screenshot::Screenshot;

/// An 8-bit RGB colour sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `true` if every channel differs from `other` by at most `tolerance`.
    pub fn is_near(self, other: Rgb, tolerance: u8) -> bool {
        self.r.abs_diff(other.r) <= tolerance
            && self.g.abs_diff(other.g) <= tolerance
            && self.b.abs_diff(other.b) <= tolerance
    }
}

/// LED colour while the drive is being accessed.
pub const BUSY_LIT: Rgb = Rgb::new(255, 36, 34);
/// LED colour while the drive button is also pressed (darkened).
pub const BUSY_PRESSED: Rgb = Rgb::new(170, 24, 23);
/// Per-channel tolerance, inclusive.
pub const BUSY_TOLERANCE: u8 = 10;

/// Sample point inside the disk-A button screenshot.
pub const SAMPLE_X: u32 = 9;
pub const SAMPLE_Y: u32 = 10;

/// Classifies one colour sample.
pub fn is_busy(sample: Rgb) -> bool {
    sample.is_near(BUSY_LIT, BUSY_TOLERANCE) || sample.is_near(BUSY_PRESSED, BUSY_TOLERANCE)
}

/// Reads the LED pixel from a screenshot of the drive button.
///
/// Returns `None` when the screenshot is too small to contain the sample
/// point, which happens if the button is hidden.
pub fn is_busy_screenshot(shot: &Screenshot) -> Option<bool> {
    shot.pixel(SAMPLE_X, SAMPLE_Y).map(is_busy)
}
