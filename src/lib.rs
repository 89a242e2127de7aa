#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot renderer
//!
//! The Mandelbrot set is the set of points c on the complex plane for
//! which repeatedly squaring z and adding c never sends z off to
//! infinity.  For points outside the set, the number of iterations it
//! takes for |z| to pass 2 measures how quickly the point escapes;
//! that count, scaled to gray, is the color of the pixel.
//!
//! An image is rendered by cutting its rows into one band per worker
//! thread.  Each worker owns its rows outright, so the framebuffer is
//! shared without any locking, and the image is saved only after every
//! worker has been joined.
//!
//! A zoom series renders many such images, each at a smaller scale
//! than the last, a bounded number at a time.

extern crate crossbeam;
extern crate failure;
extern crate image;
extern crate itertools;
extern crate num;

pub mod cli;
pub mod errors;
pub mod escape;
pub mod framebuffer;
pub mod render;
pub mod series;
pub mod sink;
pub mod viewport;

pub use errors::MandelError;
pub use framebuffer::{Color, Framebuffer};
pub use render::{partition, render, run, Band, RenderJob};
pub use series::{
    render_series, FrameDescriptor, FrameRunner, InProcessRunner, ScaleSchedule, Series,
    SeriesReport, SubprocessRunner,
};
pub use viewport::{PlaneMapper, Viewport};
