// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0
//! (the pixels of an image) and a rectangle on the complex plane (the
//! viewport being rendered).
use crate::errors::MandelError;
use num::Complex;

/// The rectangle of the complex plane an image covers.  The real part
/// runs along x, the imaginary part along y.  Immutable once a render
/// starts.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Left edge.
    pub xmin: f64,
    /// Right edge.
    pub xmax: f64,
    /// Edge mapped to row 0.
    pub ymin: f64,
    /// Edge mapped past the last row.
    pub ymax: f64,
}

impl Viewport {
    /// Build a viewport from its edges.  The minimum of each axis must
    /// not be past its maximum.
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<Viewport, MandelError> {
        if !(xmin.is_finite() && xmax.is_finite() && ymin.is_finite() && ymax.is_finite()) {
            return Err(MandelError::config("viewport edges must be finite"));
        }
        if xmax < xmin {
            return Err(MandelError::config(
                "the left edge is not to the left of the right edge",
            ));
        }
        if ymax < ymin {
            return Err(MandelError::config(
                "the lower edge is not below the upper edge",
            ));
        }
        Ok(Viewport {
            xmin,
            xmax,
            ymin,
            ymax,
        })
    }

    /// The square of half-width `scale` around `center`.
    pub fn centered(center: Complex<f64>, scale: f64) -> Result<Viewport, MandelError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(MandelError::config(format!(
                "scale must be a positive number, got {}",
                scale
            )));
        }
        Viewport::new(
            center.re - scale,
            center.re + scale,
            center.im - scale,
            center.im + scale,
        )
    }
}

/// The largest width or height an image may have.
pub const MAX_DIMENSION: usize = 65_535;

/// Maps pixels of a `width` x `height` image onto a viewport.
#[derive(Copy, Clone, Debug)]
pub struct PlaneMapper {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// The region of the complex plane being sampled.
    pub viewport: Viewport,
}

impl PlaneMapper {
    /// Both dimensions must be between 1 and `MAX_DIMENSION` pixels.
    pub fn new(width: usize, height: usize, viewport: Viewport) -> Result<PlaneMapper, MandelError> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(MandelError::config(format!(
                "image must be between 1x1 and {}x{} pixels, got {}x{}",
                MAX_DIMENSION, MAX_DIMENSION, width, height
            )));
        }
        Ok(PlaneMapper {
            width,
            height,
            viewport,
        })
    }

    /// The total number of pixels.  Used to size the framebuffer.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Never true for a constructed mapper; here to pair with `len`.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Given the column and row of a pixel, return the point on the
    /// complex plane it samples.  Pixel (0, 0) samples (xmin, ymin).
    #[inline]
    pub fn pixel_to_point(&self, column: usize, row: usize) -> Complex<f64> {
        let v = &self.viewport;
        Complex::new(
            v.xmin + (column as f64) * (v.xmax - v.xmin) / (self.width as f64),
            v.ymin + (row as f64) * (v.ymax - v.ymin) / (self.height as f64),
        )
    }
}
