// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Zoom series.  A schedule of shrinking scales yields one frame per
//! index; frames are rendered in batches of at most `concurrency`
//! independent units, and every unit of a batch has finished before
//! the next batch is launched.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use num::Complex;

use crate::errors::MandelError;
use crate::render::{self, RenderJob};

/// Evenly spaced, strictly decreasing scales from `start` to `end`
/// inclusive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScaleSchedule {
    frames: usize,
    start: f64,
    end: f64,
}

impl ScaleSchedule {
    /// A single-frame schedule ignores `end`.
    pub fn new(frames: usize, start: f64, end: f64) -> Result<ScaleSchedule, MandelError> {
        if frames == 0 {
            return Err(MandelError::config("a series needs at least one frame"));
        }
        if !(start.is_finite() && start > 0.0 && end.is_finite() && end > 0.0) {
            return Err(MandelError::config("scales must be positive numbers"));
        }
        if frames > 1 && start <= end {
            return Err(MandelError::config(format!(
                "the starting scale {} must be larger than the ending scale {}",
                start, end
            )));
        }
        Ok(ScaleSchedule { frames, start, end })
    }

    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// The amount the scale shrinks between consecutive frames.
    pub fn step(&self) -> f64 {
        if self.frames == 1 {
            0.0
        } else {
            (self.start - self.end) / ((self.frames - 1) as f64)
        }
    }

    /// The scale of frame `index`.  The last frame is exactly `end`.
    pub fn scale_at(&self, index: usize) -> f64 {
        if self.frames > 1 && index == self.frames - 1 {
            self.end
        } else {
            self.start - (index as f64) * self.step()
        }
    }

    /// Every scale, in frame order.
    pub fn scales(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.frames).map(move |i| self.scale_at(i))
    }
}

/// One frame of a series: which it is, how zoomed in, and where it goes.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameDescriptor {
    /// Position in the series.
    pub index: usize,
    /// Half-width of the visible region.
    pub scale: f64,
    /// Unique output file for this frame.
    pub output: PathBuf,
}

/// The parameters shared by every frame of a series.
#[derive(Clone, Debug)]
pub struct Series {
    /// The point being zoomed into.
    pub center: Complex<f64>,
    /// Width of every frame, in pixels.
    pub width: usize,
    /// Height of every frame, in pixels.
    pub height: usize,
    /// Iteration cap for every frame.
    pub max_iter: u32,
    /// Worker threads used inside each frame.
    pub workers: usize,
    /// The scale of each frame.
    pub schedule: ScaleSchedule,
    /// Directory the frames are written to.
    pub outdir: PathBuf,
    /// File name stem; the frame index follows it.
    pub prefix: String,
    /// File extension, which also picks the image format.
    pub extension: String,
}

impl Series {
    /// The reference zoom: fifty 1800x1800 frames into
    /// (0.286932, 0.014287), scale 2 down to 0.000015.
    pub fn reference() -> Series {
        Series {
            center: Complex::new(0.286932, 0.014287),
            width: 1800,
            height: 1800,
            max_iter: 500,
            workers: 1,
            schedule: ScaleSchedule {
                frames: 50,
                start: 2.0,
                end: 0.000015,
            },
            outdir: PathBuf::from("."),
            prefix: "mandel".to_string(),
            extension: "bmp".to_string(),
        }
    }

    /// The output path of frame `index`.
    pub fn output_for(&self, index: usize) -> PathBuf {
        self.outdir
            .join(format!("{}{}.{}", self.prefix, index, self.extension))
    }

    /// Every frame of the series, in order.
    pub fn frames(&self) -> Vec<FrameDescriptor> {
        self.schedule
            .scales()
            .enumerate()
            .map(|(index, scale)| FrameDescriptor {
                index,
                scale,
                output: self.output_for(index),
            })
            .collect()
    }

    /// The full render job for one frame.
    pub fn job_for(&self, frame: &FrameDescriptor) -> RenderJob {
        RenderJob {
            center: self.center,
            scale: frame.scale,
            width: self.width,
            height: self.height,
            max_iter: self.max_iter,
            workers: self.workers,
            output: frame.output.clone(),
        }
    }
}

/// Launches one frame as an independent unit of work and waits for it
/// to finish.  Called concurrently from one thread per frame.
pub trait FrameRunner: Sync {
    /// Render and save `job`, the job derived from `frame`.
    fn run(&self, frame: &FrameDescriptor, job: &RenderJob) -> Result<(), MandelError>;
}

/// Renders frames on threads of this process.
#[derive(Copy, Clone, Debug, Default)]
pub struct InProcessRunner;

impl FrameRunner for InProcessRunner {
    fn run(&self, _frame: &FrameDescriptor, job: &RenderJob) -> Result<(), MandelError> {
        render::run(job)
    }
}

/// Renders each frame in its own `mandel` process.
#[derive(Clone, Debug)]
pub struct SubprocessRunner {
    program: PathBuf,
}

impl SubprocessRunner {
    /// Run frames with the executable at `program`.
    pub fn new<P: AsRef<Path>>(program: P) -> SubprocessRunner {
        SubprocessRunner {
            program: program.as_ref().to_path_buf(),
        }
    }

    /// The `mandel` executable installed next to the running one.
    pub fn sibling() -> Result<SubprocessRunner, MandelError> {
        let current = std::env::current_exe().map_err(|cause| MandelError::Spawn {
            unit: "frame process".to_string(),
            cause,
        })?;
        let name = format!("mandel{}", std::env::consts::EXE_SUFFIX);
        Ok(SubprocessRunner::new(current.with_file_name(name)))
    }

    /// The command line for one frame.
    pub fn command(&self, job: &RenderJob) -> Command {
        let mut output = OsString::from("--output=");
        output.push(&job.output);
        let mut command = Command::new(&self.program);
        command
            .arg(format!("--xcenter={}", job.center.re))
            .arg(format!("--ycenter={}", job.center.im))
            .arg(format!("--scale={}", job.scale))
            .arg(format!("--width={}", job.width))
            .arg(format!("--height={}", job.height))
            .arg(format!("--max={}", job.max_iter))
            .arg(format!("--threads={}", job.workers))
            .arg(output);
        command
    }
}

impl FrameRunner for SubprocessRunner {
    fn run(&self, frame: &FrameDescriptor, job: &RenderJob) -> Result<(), MandelError> {
        let status = self
            .command(job)
            .status()
            .map_err(|cause| MandelError::Spawn {
                unit: format!("process for frame {}", frame.index),
                cause,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(MandelError::Process {
                frame: frame.index,
                status,
            })
        }
    }
}

/// What happened to one frame.
#[derive(Debug)]
pub struct FrameOutcome {
    /// The frame.
    pub frame: FrameDescriptor,
    /// How it ended.
    pub result: Result<(), MandelError>,
}

/// The result of a whole series.
#[derive(Debug)]
pub struct SeriesReport {
    /// One entry per frame, in frame order.
    pub outcomes: Vec<FrameOutcome>,
    /// Size of each batch, in launch order.
    pub batches: Vec<usize>,
    /// Wall-clock time for the whole series.
    pub elapsed: Duration,
}

impl SeriesReport {
    /// Frames that did not produce an image.
    pub fn failures(&self) -> impl Iterator<Item = &FrameOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// True if every frame was written.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

// Launch every frame of the batch, then wait for all of them.
fn run_batch<R: FrameRunner>(
    series: &Series,
    batch: &[FrameDescriptor],
    runner: &R,
) -> Vec<Result<(), MandelError>> {
    let outcome = crossbeam::scope(|scope| {
        let handles: Vec<_> = batch
            .iter()
            .map(|frame| {
                let job = series.job_for(frame);
                debug!("launching frame {} at scale {}", frame.index, frame.scale);
                scope
                    .builder()
                    .name(format!("frame-{}", frame.index))
                    .spawn(move |_| runner.run(frame, &job))
            })
            .collect();

        handles
            .into_iter()
            .zip(batch)
            .map(|(handle, frame)| match handle {
                Err(cause) => Err(MandelError::Spawn {
                    unit: format!("frame {}", frame.index),
                    cause,
                }),
                Ok(handle) => handle.join().unwrap_or_else(|_| {
                    Err(MandelError::WorkerPanicked(format!("frame {}", frame.index)))
                }),
            })
            .collect::<Vec<_>>()
    });
    outcome.unwrap_or_else(|_| {
        batch
            .iter()
            .map(|frame| Err(MandelError::WorkerPanicked(format!("frame {}", frame.index))))
            .collect()
    })
}

/// Render every frame of `series`, at most `concurrency` at a time.
/// A failed frame is recorded in the report and does not stop the
/// others.
pub fn render_series<R: FrameRunner>(
    series: &Series,
    concurrency: usize,
    runner: &R,
) -> Result<SeriesReport, MandelError> {
    if concurrency == 0 {
        return Err(MandelError::config("the concurrency limit must be at least 1"));
    }
    // Every frame shares everything but its scale, so one bad frame
    // means a bad series.
    if let Some(frame) = series.frames().first() {
        series.job_for(frame).plane()?;
    }

    let begin = Instant::now();
    let frames = series.frames();
    let mut outcomes = Vec::with_capacity(frames.len());
    let mut batches = Vec::new();

    for batch in frames.chunks(concurrency) {
        info!(
            "batch {}: frames {}..{}",
            batches.len(),
            batch[0].index,
            batch[0].index + batch.len()
        );
        let results = run_batch(series, batch, runner);
        for (frame, result) in batch.iter().zip(results) {
            if let Err(ref e) = result {
                warn!("frame {} failed: {}", frame.index, e);
            }
            outcomes.push(FrameOutcome {
                frame: frame.clone(),
                result,
            });
        }
        batches.push(batch.len());
    }

    Ok(SeriesReport {
        outcomes,
        batches,
        elapsed: begin.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq)]
    enum Event {
        Start(usize),
        End(usize),
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
        fail: Option<usize>,
    }

    impl FrameRunner for Recorder {
        fn run(&self, frame: &FrameDescriptor, _job: &RenderJob) -> Result<(), MandelError> {
            self.events.lock().unwrap().push(Event::Start(frame.index));
            thread::sleep(Duration::from_millis(5 * (frame.index % 3) as u64));
            self.events.lock().unwrap().push(Event::End(frame.index));
            if self.fail == Some(frame.index) {
                Err(MandelError::config("planned failure"))
            } else {
                Ok(())
            }
        }
    }

    fn tiny(frames: usize) -> Series {
        Series {
            width: 8,
            height: 8,
            max_iter: 20,
            schedule: ScaleSchedule::new(frames, 2.0, 0.5).unwrap(),
            ..Series::reference()
        }
    }

    #[test]
    fn reference_schedule_zooms_evenly() {
        let schedule = Series::reference().schedule;
        let scales: Vec<f64> = schedule.scales().collect();
        assert_eq!(scales.len(), 50);
        assert_eq!(scales[0], 2.0);
        assert!((scales[49] - 0.000015).abs() < 1e-12);
        let step = scales[0] - scales[1];
        for pair in scales.windows(2) {
            assert!(pair[1] < pair[0]);
            assert!(((pair[0] - pair[1]) - step).abs() < 1e-12);
        }
    }

    #[test]
    fn schedule_rejects_bad_ranges() {
        assert!(ScaleSchedule::new(0, 2.0, 1.0).is_err());
        assert!(ScaleSchedule::new(5, 1.0, 2.0).is_err());
        assert!(ScaleSchedule::new(5, 1.0, 1.0).is_err());
        assert!(ScaleSchedule::new(5, 1.0, 0.0).is_err());
        assert!(ScaleSchedule::new(5, std::f64::NAN, 0.5).is_err());
    }

    #[test]
    fn single_frame_schedule_uses_the_start() {
        let schedule = ScaleSchedule::new(1, 3.0, 3.0).unwrap();
        assert_eq!(schedule.scales().collect::<Vec<_>>(), vec![3.0]);
    }

    #[test]
    fn frames_get_unique_indexed_names() {
        let series = Series {
            outdir: PathBuf::from("out"),
            ..tiny(3)
        };
        let names: Vec<PathBuf> = series.frames().into_iter().map(|f| f.output).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("out/mandel0.bmp"),
                PathBuf::from("out/mandel1.bmp"),
                PathBuf::from("out/mandel2.bmp"),
            ]
        );
    }

    #[test]
    fn batches_wait_for_every_frame() {
        let recorder = Recorder::default();
        let report = render_series(&tiny(10), 4, &recorder).unwrap();
        assert_eq!(report.batches, vec![4, 4, 2]);
        assert!(report.is_success());

        let events = recorder.events.into_inner().unwrap();
        assert_eq!(events.len(), 20);
        let batch_of = |i: usize| i / 4;
        for (pos, event) in events.iter().enumerate() {
            if let Event::Start(i) = *event {
                // Every frame of earlier batches has already ended.
                for earlier in 0..batch_of(i) * 4 {
                    assert!(events[..pos].contains(&Event::End(earlier)));
                }
                // Nothing from a later batch has started.
                assert!(events[..pos].iter().all(|e| match *e {
                    Event::Start(j) | Event::End(j) => batch_of(j) <= batch_of(i),
                }));
            }
        }
    }

    #[test]
    fn a_failed_frame_does_not_stop_the_others() {
        let recorder = Recorder {
            fail: Some(1),
            ..Recorder::default()
        };
        let report = render_series(&tiny(5), 2, &recorder).unwrap();
        assert_eq!(report.batches, vec![2, 2, 1]);
        let failed: Vec<usize> = report.failures().map(|o| o.frame.index).collect();
        assert_eq!(failed, vec![1]);
        assert!(!report.is_success());
        assert_eq!(recorder.events.into_inner().unwrap().len(), 10);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(render_series(&tiny(2), 0, &Recorder::default()).is_err());
    }

    #[test]
    fn in_process_series_writes_every_frame() {
        let dir = tempdir().unwrap();
        let series = Series {
            outdir: dir.path().to_path_buf(),
            workers: 2,
            ..tiny(5)
        };
        let report = render_series(&series, 3, &InProcessRunner).unwrap();
        assert!(report.is_success());
        for i in 0..5 {
            assert!(dir.path().join(format!("mandel{}.bmp", i)).is_file());
        }
    }

    #[test]
    fn unwritable_frames_are_reported_with_their_path() {
        let dir = tempdir().unwrap();
        let series = Series {
            outdir: dir.path().join("missing"),
            ..tiny(2)
        };
        let report = render_series(&series, 2, &InProcessRunner).unwrap();
        assert_eq!(report.failures().count(), 2);
        for outcome in report.failures() {
            match outcome.result {
                Err(MandelError::Io { ref path, .. }) => assert!(path.contains("missing")),
                ref other => panic!("expected an I/O error, got {:?}", other),
            }
        }
    }

    #[test]
    fn subprocess_command_carries_the_frame_parameters() {
        let runner = SubprocessRunner::new("/bin/mandel");
        let series = tiny(3);
        let frame = &series.frames()[2];
        let command = format!("{:?}", runner.command(&series.job_for(frame)));
        assert!(command.contains("--scale=0.5"));
        assert!(command.contains("--xcenter=0.286932"));
        assert!(command.contains("--width=8"));
        assert!(command.contains("\"--output=./mandel2.bmp\""));
    }

    #[test]
    fn output_directories_starting_with_a_dash_stay_values() {
        let runner = SubprocessRunner::new("/bin/mandel");
        let series = Series {
            outdir: PathBuf::from("-frames"),
            ..tiny(1)
        };
        let frame = &series.frames()[0];
        let command = format!("{:?}", runner.command(&series.job_for(frame)));
        assert!(command.contains("\"--output=-frames/mandel0.bmp\""));
    }

    #[test]
    fn last_scale_is_exactly_the_end() {
        for &(frames, end) in &[(2, 1e-17), (50, 1e-15), (50, 0.000015), (7, 0.3)] {
            let schedule = ScaleSchedule::new(frames, 2.0, end).unwrap();
            assert_eq!(schedule.scale_at(frames - 1), end);
            let scales: Vec<f64> = schedule.scales().collect();
            assert_eq!(scales[0], 2.0);
            for pair in scales.windows(2) {
                assert!(pair[1] < pair[0]);
                assert!(pair[1] > 0.0);
            }
        }
    }

    #[test]
    fn tiny_ending_scale_still_renders() {
        let dir = tempdir().unwrap();
        let series = Series {
            outdir: dir.path().to_path_buf(),
            schedule: ScaleSchedule::new(2, 2.0, 1e-17).unwrap(),
            ..tiny(2)
        };
        let report = render_series(&series, 2, &InProcessRunner).unwrap();
        assert!(report.is_success());
        assert!(dir.path().join("mandel1.bmp").is_file());
    }

    #[test]
    fn oversized_frames_are_rejected_before_launch() {
        let recorder = Recorder::default();
        let series = Series {
            width: 70_000,
            ..tiny(3)
        };
        match render_series(&series, 2, &recorder) {
            Err(MandelError::Config(_)) => {}
            other => panic!("expected a configuration error, got {:?}", other),
        }
        assert!(recorder.events.into_inner().unwrap().is_empty());
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let dir = tempdir().unwrap();
        let runner = SubprocessRunner::new(dir.path().join("no-such-mandel"));
        let series = Series {
            outdir: dir.path().to_path_buf(),
            ..tiny(1)
        };
        let report = render_series(&series, 1, &runner).unwrap();
        match report.outcomes[0].result {
            Err(MandelError::Spawn { .. }) => {}
            ref other => panic!("expected a spawn error, got {:?}", other),
        }
    }
}
