// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The in-memory image being populated before it is handed to the
//! sink.  Workers never share a row: `split_bands` hands each band its
//! own `&mut` slice of the pixel vector, so the grid needs no lock.

use crate::render::Band;

/// An RGBA pixel, 8 bits per channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8, pub u8);

/// Fill for a fresh buffer.  Any pixel still this color after a render
/// was never written.
pub const UNWRITTEN: Color = Color(0, 0, 255, 255);

/// A `width` x `height` grid of colors, stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Framebuffer {
    /// Allocate a buffer filled with `UNWRITTEN`.
    pub fn new(width: usize, height: usize) -> Framebuffer {
        Framebuffer {
            width,
            height,
            pixels: vec![UNWRITTEN; width * height],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The color at column `x`, row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `x` is not less than the width or `y` is not less than
    /// the height.
    pub fn get(&self, x: usize, y: usize) -> Color {
        assert!(
            x < self.width && y < self.height,
            "pixel ({}, {}) is outside a {}x{} framebuffer",
            x,
            y,
            self.width,
            self.height
        );
        self.pixels[y * self.width + x]
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Carve the buffer into one mutable row slice per band.  The bands
    /// must be contiguous and cover every row exactly once; anything
    /// else is a bug in the caller.
    pub fn split_bands(&mut self, bands: &[Band]) -> Vec<(Band, &mut [Color])> {
        let width = self.width;
        let mut next_row = 0;
        let mut rest: &mut [Color] = &mut self.pixels;
        let mut slices = Vec::with_capacity(bands.len());
        for band in bands {
            assert_eq!(band.start, next_row, "bands must be contiguous");
            assert!(band.end >= band.start, "band {:?} is inverted", band);
            let (rows, tail) = std::mem::take(&mut rest).split_at_mut(band.len() * width);
            slices.push((*band, rows));
            rest = tail;
            next_row = band.end;
        }
        assert_eq!(next_row, self.height, "bands must cover every row");
        slices
    }

    /// Packed 8-bit RGB, row-major, alpha dropped.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixels.len() * 3);
        for &Color(r, g, b, _) in &self.pixels {
            rgb.extend_from_slice(&[r, g, b]);
        }
        rgb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_unwritten() {
        let fb = Framebuffer::new(3, 2);
        assert_eq!(fb.pixels().len(), 6);
        assert!(fb.pixels().iter().all(|&p| p == UNWRITTEN));
    }

    #[test]
    fn split_bands_hands_out_disjoint_rows() {
        let mut fb = Framebuffer::new(2, 5);
        let bands = [Band::new(0, 2), Band::new(2, 2), Band::new(2, 5)];
        {
            let slices = fb.split_bands(&bands);
            assert_eq!(slices.len(), 3);
            for (i, (band, rows)) in slices.into_iter().enumerate() {
                assert_eq!(rows.len(), band.len() * 2);
                for p in rows.iter_mut() {
                    *p = Color(i as u8, 0, 0, 255);
                }
            }
        }
        assert_eq!(fb.get(1, 1), Color(0, 0, 0, 255));
        assert_eq!(fb.get(0, 2), Color(2, 0, 0, 255));
        assert_eq!(fb.get(1, 4), Color(2, 0, 0, 255));
    }

    #[test]
    #[should_panic(expected = "cover every row")]
    fn split_bands_rejects_gaps() {
        let mut fb = Framebuffer::new(2, 5);
        fb.split_bands(&[Band::new(0, 3)]);
    }

    #[test]
    #[should_panic(expected = "outside a 3x2 framebuffer")]
    fn get_past_the_last_column_panics() {
        // (3, 0) would alias (0, 1) without the bounds check.
        Framebuffer::new(3, 2).get(3, 0);
    }

    #[test]
    fn to_rgb_drops_alpha() {
        let mut fb = Framebuffer::new(2, 1);
        {
            let mut slices = fb.split_bands(&[Band::new(0, 1)]);
            slices[0].1[1] = Color(10, 20, 30, 40);
        }
        assert_eq!(fb.to_rgb(), vec![0, 0, 255, 10, 20, 30]);
    }
}
