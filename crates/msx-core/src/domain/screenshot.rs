//! Decoded screenshots of page elements.

use super::busy::Rgb;

/// An RGB raster, row-major, top-left origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl Screenshot {
    /// Wraps a pixel buffer.  Returns `None` if its length is not `width * height`.
    pub fn new(width: u32, height: u32, pixels: Vec<Rgb>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self { width, height, pixels })
    }

    pub fn filled(width: u32, height: u32, colour: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![colour; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Overwrites one pixel; out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, colour: Rgb) {
        if x < self.width && y < self.height {
            let i = y as usize * self.width as usize + x as usize;
            self.pixels[i] = colour;
        }
    }
}
