// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The threaded renderer.  The image is cut into horizontal bands, one
//! per worker; each worker owns its rows outright and writes them
//! without coordination.  The render is complete only once every
//! worker has been joined.

use std::fmt;
use std::path::PathBuf;

use itertools::iproduct;
use log::{debug, warn};
use num::Complex;

use crate::errors::MandelError;
use crate::escape::{color_of, iterate};
use crate::framebuffer::{Color, Framebuffer};
use crate::sink;
use crate::viewport::{PlaneMapper, Viewport};

/// A half-open range of rows, `[start, end)`, owned by one worker.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Band {
    /// First row.
    pub start: usize,
    /// One past the last row.
    pub end: usize,
}

impl Band {
    /// A band from `start` up to, but not including, `end`.
    pub fn new(start: usize, end: usize) -> Band {
        Band { start, end }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True for a band with no rows, which happens when there are more
    /// workers than rows.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "rows {}..{}", self.start, self.end)
    }
}

/// Cut `height` rows into exactly `workers` contiguous bands of
/// `height / workers` rows each, the last band taking the remainder.
/// A worker count of zero is treated as one.
pub fn partition(height: usize, workers: usize) -> Vec<Band> {
    let workers = workers.max(1);
    let band_height = height / workers;
    let mut bands = Vec::with_capacity(workers);
    let mut start = 0;
    for _ in 0..workers {
        bands.push(Band::new(start, start + band_height));
        start += band_height;
    }
    if let Some(last) = bands.last_mut() {
        last.end = height;
    }
    bands
}

/// Render one band into `rows`, the slice of the framebuffer that
/// holds exactly the rows of `band`.
pub fn render_band(rows: &mut [Color], band: Band, plane: &PlaneMapper, max: u32) {
    assert_eq!(rows.len(), band.len() * plane.width);
    let pixels = iproduct!(band.start..band.end, 0..plane.width);
    for (pixel, (row, column)) in rows.iter_mut().zip(pixels) {
        let c = plane.pixel_to_point(column, row);
        *pixel = color_of(iterate(c.re, c.im, max), max);
    }
}

/// Render every pixel of `plane` with `workers` threads.  Blocks until
/// all of them have finished.  If any band could not be rendered, the
/// remaining bands still run to completion and the first failure is
/// returned.
pub fn render_plane(plane: &PlaneMapper, max: u32, workers: usize) -> Result<Framebuffer, MandelError> {
    let bands = partition(plane.height, workers);
    let mut framebuffer = Framebuffer::new(plane.width, plane.height);

    let failures = {
        let slices = framebuffer.split_bands(&bands);
        crossbeam::scope(|scope| {
            let handles: Vec<_> = slices
                .into_iter()
                .map(|(band, rows)| {
                    debug!("starting worker for {}", band);
                    let handle = scope
                        .builder()
                        .name(format!("band-{}", band.start))
                        .spawn(move |_| render_band(rows, band, plane, max));
                    (band, handle)
                })
                .collect();

            handles
                .into_iter()
                .filter_map(|(band, handle)| match handle {
                    Err(cause) => Some(MandelError::Spawn {
                        unit: format!("worker for {}", band),
                        cause,
                    }),
                    Ok(handle) => handle
                        .join()
                        .err()
                        .map(|_| MandelError::WorkerPanicked(format!("worker for {}", band))),
                })
                .collect::<Vec<_>>()
        })
        .map_err(|_| MandelError::WorkerPanicked("render scope".to_string()))?
    };

    for failure in &failures {
        warn!("{}", failure);
    }
    match failures.into_iter().next() {
        Some(failure) => Err(failure),
        None => Ok(framebuffer),
    }
}

/// One image to be rendered and saved.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderJob {
    /// Center of the image on the complex plane.
    pub center: Complex<f64>,
    /// Half the width (and height) of the visible region.
    pub scale: f64,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Iteration cap per point.
    pub max_iter: u32,
    /// Number of worker threads.
    pub workers: usize,
    /// Where the finished image goes.
    pub output: PathBuf,
}

impl Default for RenderJob {
    fn default() -> Self {
        RenderJob {
            center: Complex::new(0.0, 0.0),
            scale: 4.0,
            width: 500,
            height: 500,
            max_iter: 1000,
            workers: 1,
            output: PathBuf::from("mandel.bmp"),
        }
    }
}

impl RenderJob {
    /// The region of the plane this job covers.
    pub fn viewport(&self) -> Result<Viewport, MandelError> {
        Viewport::centered(self.center, self.scale)
    }

    /// Check every parameter and build the pixel mapping.
    pub fn plane(&self) -> Result<PlaneMapper, MandelError> {
        if self.max_iter == 0 {
            return Err(MandelError::config("the iteration cap must be at least 1"));
        }
        if self.workers == 0 {
            return Err(MandelError::config("the worker count must be at least 1"));
        }
        PlaneMapper::new(self.width, self.height, self.viewport()?)
    }
}

impl fmt::Display for RenderJob {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "x={:.6} y={:.6} scale={:.6} max={} outfile={} threads={}",
            self.center.re,
            self.center.im,
            self.scale,
            self.max_iter,
            self.output.display(),
            self.workers
        )
    }
}

/// Render a job into a framebuffer without saving it.
pub fn render(job: &RenderJob) -> Result<Framebuffer, MandelError> {
    let plane = job.plane()?;
    render_plane(&plane, job.max_iter, job.workers)
}

/// Render a job and save it.  Nothing is written unless every band
/// finished.
pub fn run(job: &RenderJob) -> Result<(), MandelError> {
    let framebuffer = render(job)?;
    sink::save(&framebuffer, &job.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::UNWRITTEN;

    fn assert_covers(bands: &[Band], height: usize) {
        let mut next = 0;
        for band in bands {
            assert_eq!(band.start, next);
            assert!(band.end >= band.start);
            next = band.end;
        }
        assert_eq!(next, height);
    }

    #[test]
    fn partition_covers_every_row_once() {
        for height in 0..40 {
            for workers in 1..12 {
                let bands = partition(height, workers);
                assert_eq!(bands.len(), workers);
                assert_covers(&bands, height);
            }
        }
    }

    #[test]
    fn last_band_absorbs_the_remainder() {
        assert_eq!(
            partition(10, 3),
            vec![Band::new(0, 3), Band::new(3, 6), Band::new(6, 10)]
        );
    }

    #[test]
    fn more_workers_than_rows_yields_empty_bands() {
        let bands = partition(2, 4);
        assert_eq!(bands.len(), 4);
        assert!(bands[..3].iter().all(Band::is_empty));
        assert_eq!(bands[3], Band::new(0, 2));
    }

    #[test]
    fn zero_workers_means_one() {
        assert_eq!(partition(7, 0), vec![Band::new(0, 7)]);
    }

    fn small_job(workers: usize) -> RenderJob {
        RenderJob {
            center: Complex::new(-0.5, 0.1),
            scale: 1.5,
            width: 37,
            height: 23,
            max_iter: 64,
            workers,
            output: PathBuf::from("unused.bmp"),
        }
    }

    #[test]
    fn worker_count_does_not_change_the_image() {
        let reference = render(&small_job(1)).unwrap();
        for workers in &[2, 3, 7, 23, 40] {
            assert_eq!(render(&small_job(*workers)).unwrap(), reference);
        }
    }

    #[test]
    fn every_pixel_is_written() {
        for workers in &[1, 4, 30] {
            let fb = render(&small_job(*workers)).unwrap();
            assert!(fb.pixels().iter().all(|&p| p != UNWRITTEN));
        }
    }

    #[test]
    fn center_is_in_the_set_and_corner_escapes() {
        let job = RenderJob {
            center: Complex::new(0.0, 0.0),
            scale: 2.0,
            width: 10,
            height: 10,
            max_iter: 10,
            workers: 3,
            output: PathBuf::from("unused.bmp"),
        };
        let plane = job.plane().unwrap();
        let c = plane.pixel_to_point(5, 5);
        assert_eq!(iterate(c.re, c.im, 10), 10);
        let c = plane.pixel_to_point(0, 0);
        assert!(iterate(c.re, c.im, 10) <= 2);

        let fb = render(&job).unwrap();
        assert_eq!(fb.get(5, 5), Color(255, 255, 255, 255));
        assert!(fb.get(0, 0).0 <= color_of(2, 10).0);
    }

    #[test]
    fn bad_jobs_are_configuration_errors() {
        let mut job = small_job(1);
        job.width = 0;
        assert!(matches!(render(&job), Err(MandelError::Config(_))));

        let mut job = small_job(1);
        job.max_iter = 0;
        assert!(matches!(render(&job), Err(MandelError::Config(_))));

        let job = small_job(0);
        assert!(matches!(render(&job), Err(MandelError::Config(_))));

        let mut job = small_job(1);
        job.scale = -1.0;
        assert!(matches!(render(&job), Err(MandelError::Config(_))));
    }

    #[test]
    fn display_echoes_the_configuration() {
        let job = RenderJob::default();
        assert_eq!(
            job.to_string(),
            "x=0.000000 y=0.000000 scale=4.000000 max=1000 outfile=mandel.bmp threads=1"
        );
    }
}
