extern crate clap;
extern crate mandel;
extern crate num;

use clap::{value_t, App, AppSettings, Arg, ArgMatches};
use mandel::cli::{
    validate_dimension, validate_float, validate_iterations, validate_positive_float,
    validate_range,
};
use mandel::{
    render_series, InProcessRunner, MandelError, ScaleSchedule, Series, SeriesReport,
    SubprocessRunner,
};
use num::Complex;
use std::path::PathBuf;
use std::time::Instant;

const PROCESSES: &str = "processes";
const FRAMES: &str = "frames";
const START: &str = "start";
const END: &str = "end";
const XCENTER: &str = "xcenter";
const YCENTER: &str = "ycenter";
const WIDTH: &str = "width";
const HEIGHT: &str = "height";
const MAX: &str = "max";
const THREADS: &str = "threads";
const PREFIX: &str = "prefix";
const FORMAT: &str = "format";
const OUTDIR: &str = "outdir";
const MANDEL: &str = "mandel";
const IN_PROCESS: &str = "in-process";


fn args<'a>() -> ArgMatches<'a> {
    App::new("mandelseries")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Renders a Mandelbrot zoom, one image per frame, a few frames at a time")
        .setting(AppSettings::AllowNegativeNumbers)
        .arg(
            Arg::with_name(PROCESSES)
                .required(true)
                .index(1)
                .validator(|s| {
                    validate_range(
                        &s,
                        1usize,
                        usize::max_value(),
                        "Could not parse process count",
                        "Process count must be at least 1",
                    )
                })
                .help("Number of frames to render at once"),
        )
        .arg(
            Arg::with_name(FRAMES)
                .long(FRAMES)
                .takes_value(true)
                .default_value("50")
                .validator(|s| {
                    validate_range(
                        &s,
                        1usize,
                        usize::max_value(),
                        "Could not parse frame count",
                        "Frame count must be at least 1",
                    )
                })
                .help("Number of frames in the zoom"),
        )
        .arg(
            Arg::with_name(START)
                .long(START)
                .takes_value(true)
                .default_value("2")
                .validator(|s| validate_positive_float(&s, "Scale must be a positive number"))
                .help("Scale of the first frame"),
        )
        .arg(
            Arg::with_name(END)
                .long(END)
                .takes_value(true)
                .default_value("0.000015")
                .validator(|s| validate_positive_float(&s, "Scale must be a positive number"))
                .help("Scale of the last frame"),
        )
        .arg(
            Arg::with_name(XCENTER)
                .long(XCENTER)
                .short("x")
                .takes_value(true)
                .default_value("0.286932")
                .validator(|s| validate_float(&s, "Could not parse x coordinate"))
                .help("X coordinate of the zoom center"),
        )
        .arg(
            Arg::with_name(YCENTER)
                .long(YCENTER)
                .short("y")
                .takes_value(true)
                .default_value("0.014287")
                .validator(|s| validate_float(&s, "Could not parse y coordinate"))
                .help("Y coordinate of the zoom center"),
        )
        .arg(
            Arg::with_name(WIDTH)
                .long(WIDTH)
                .short("W")
                .takes_value(true)
                .default_value("1800")
                .validator(|s| validate_dimension(&s, "width"))
                .help("Width of each frame in pixels"),
        )
        .arg(
            Arg::with_name(HEIGHT)
                .long(HEIGHT)
                .short("H")
                .takes_value(true)
                .default_value("1800")
                .validator(|s| validate_dimension(&s, "height"))
                .help("Height of each frame in pixels"),
        )
        .arg(
            Arg::with_name(MAX)
                .long(MAX)
                .short("m")
                .takes_value(true)
                .default_value("500")
                .validator(|s| validate_iterations(&s))
                .help("The maximum number of iterations per point"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("n")
                .takes_value(true)
                .default_value("1")
                .validator(|s| {
                    validate_range(
                        &s,
                        1usize,
                        usize::max_value(),
                        "Could not parse thread count",
                        "Thread count must be at least 1",
                    )
                })
                .help("Number of threads used inside each frame"),
        )
        .arg(
            Arg::with_name(PREFIX)
                .long(PREFIX)
                .takes_value(true)
                .default_value("mandel")
                .help("Frame file name prefix; the frame index follows it"),
        )
        .arg(
            Arg::with_name(FORMAT)
                .long(FORMAT)
                .takes_value(true)
                .default_value("bmp")
                .possible_values(&["bmp", "png", "ppm", "pnm"])
                .help("Frame image format"),
        )
        .arg(
            Arg::with_name(OUTDIR)
                .long(OUTDIR)
                .takes_value(true)
                .default_value(".")
                .help("Directory the frames are written to"),
        )
        .arg(
            Arg::with_name(MANDEL)
                .long(MANDEL)
                .takes_value(true)
                .conflicts_with(IN_PROCESS)
                .help("The mandel executable that renders each frame (default: next to this one)"),
        )
        .arg(
            Arg::with_name(IN_PROCESS)
                .long(IN_PROCESS)
                .help("Render frames on threads of this process instead of child processes"),
        )
        .get_matches()
}

fn series(matches: &ArgMatches) -> Result<Series, MandelError> {
    let schedule = ScaleSchedule::new(
        value_t!(matches, FRAMES, usize).unwrap_or_else(|e| e.exit()),
        value_t!(matches, START, f64).unwrap_or_else(|e| e.exit()),
        value_t!(matches, END, f64).unwrap_or_else(|e| e.exit()),
    )?;
    Ok(Series {
        center: Complex::new(
            value_t!(matches, XCENTER, f64).unwrap_or_else(|e| e.exit()),
            value_t!(matches, YCENTER, f64).unwrap_or_else(|e| e.exit()),
        ),
        width: value_t!(matches, WIDTH, usize).unwrap_or_else(|e| e.exit()),
        height: value_t!(matches, HEIGHT, usize).unwrap_or_else(|e| e.exit()),
        max_iter: value_t!(matches, MAX, u32).unwrap_or_else(|e| e.exit()),
        workers: value_t!(matches, THREADS, usize).unwrap_or_else(|e| e.exit()),
        schedule,
        outdir: PathBuf::from(matches.value_of_os(OUTDIR).unwrap_or_default()),
        prefix: matches.value_of(PREFIX).unwrap_or("mandel").to_string(),
        extension: matches.value_of(FORMAT).unwrap_or("bmp").to_string(),
    })
}

fn run(matches: &ArgMatches) -> Result<SeriesReport, MandelError> {
    let series = series(matches)?;
    let processes = value_t!(matches, PROCESSES, usize).unwrap_or_else(|e| e.exit());

    println!(
        "mandelseries: processes={} frames={} scale={}..{} x={:.6} y={:.6}",
        processes,
        series.schedule.frames(),
        series.schedule.scale_at(0),
        series.schedule.scale_at(series.schedule.frames() - 1),
        series.center.re,
        series.center.im
    );

    if matches.is_present(IN_PROCESS) {
        render_series(&series, processes, &InProcessRunner)
    } else {
        let runner = match matches.value_of_os(MANDEL) {
            Some(program) => SubprocessRunner::new(program),
            None => SubprocessRunner::sibling()?,
        };
        render_series(&series, processes, &runner)
    }
}

fn main() {
    env_logger::init();
    let matches = args();
    let begin = Instant::now();

    let report = match run(&matches) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("mandelseries: {}", e);
            std::process::exit(1);
        }
    };

    for outcome in report.failures() {
        if let Err(ref e) = outcome.result {
            eprintln!(
                "mandelseries: frame {} ({}): {}",
                outcome.frame.index,
                outcome.frame.output.display(),
                e
            );
        }
    }

    println!("Duration: {}", begin.elapsed().as_micros());

    if !report.is_success() {
        std::process::exit(1);
    }
}
