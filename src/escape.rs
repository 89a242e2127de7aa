// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The two leaves of the renderer: counting how long a point takes to
//! escape, and turning that count into a color.  Both are pure and may
//! be called from any number of threads at once.

use crate::framebuffer::Color;

/// Iterate z <- z*z + c, starting at z = c = (x0, y0), until |z|^2
/// exceeds 4 or `max` iterations have been taken.  Returns the number
/// of iterations performed.  A point already outside the escape
/// radius returns 0; a point that never escapes returns `max`.
#[inline]
pub fn iterate(x0: f64, y0: f64, max: u32) -> u32 {
    let (mut x, mut y) = (x0, y0);
    let mut iter = 0;
    while x * x + y * y <= 4.0 && iter < max {
        let xt = x * x - y * y + x0;
        let yt = 2.0 * x * y + y0;
        x = xt;
        y = yt;
        iter += 1;
    }
    iter
}

/// Scale an iteration count to gray, with `max` mapping to white.
#[inline]
pub fn color_of(iter: u32, max: u32) -> Color {
    let gray = if max == 0 {
        0
    } else {
        (255 * u64::from(iter.min(max)) / u64::from(max)) as u8
    };
    Color(gray, gray, gray, 255)
}
