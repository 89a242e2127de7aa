extern crate clap;
extern crate mandel;
extern crate num;
extern crate num_cpus;

use clap::{value_t, App, AppSettings, Arg, ArgMatches};
use log::warn;
use mandel::cli::{
    validate_dimension, validate_float, validate_iterations, validate_positive_float,
    validate_range,
};
use mandel::RenderJob;
use num::Complex;
use std::path::PathBuf;
use std::time::Instant;

const XCENTER: &str = "xcenter";
const YCENTER: &str = "ycenter";
const SCALE: &str = "scale";
const WIDTH: &str = "width";
const HEIGHT: &str = "height";
const MAX: &str = "max";
const OUTPUT: &str = "output";
const THREADS: &str = "threads";

const EXAMPLES: &str = "Some examples are:
    mandel -x -0.5 -y -0.5 -s 0.2
    mandel -x -.38 -y -.665 -s .05 -m 100
    mandel -x 0.286932 -y 0.014287 -s .0005 -m 1000";

fn args<'a>() -> ArgMatches<'a> {
    App::new("mandel")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Threaded Mandelbrot renderer")
        .setting(AppSettings::AllowNegativeNumbers)
        .after_help(EXAMPLES)
        .arg(
            Arg::with_name(XCENTER)
                .long(XCENTER)
                .short("x")
                .takes_value(true)
                .default_value("0")
                .validator(|s| validate_float(&s, "Could not parse x coordinate"))
                .help("X coordinate of image center point"),
        )
        .arg(
            Arg::with_name(YCENTER)
                .long(YCENTER)
                .short("y")
                .takes_value(true)
                .default_value("0")
                .validator(|s| validate_float(&s, "Could not parse y coordinate"))
                .help("Y coordinate of image center point"),
        )
        .arg(
            Arg::with_name(SCALE)
                .long(SCALE)
                .short("s")
                .takes_value(true)
                .default_value("4")
                .validator(|s| validate_positive_float(&s, "Scale must be a positive number"))
                .help("Scale of the image in Mandelbrot coordinates"),
        )
        .arg(
            Arg::with_name(WIDTH)
                .long(WIDTH)
                .short("W")
                .takes_value(true)
                .default_value("500")
                .validator(|s| validate_dimension(&s, "width"))
                .help("Width of the image in pixels"),
        )
        .arg(
            Arg::with_name(HEIGHT)
                .long(HEIGHT)
                .short("H")
                .takes_value(true)
                .default_value("500")
                .validator(|s| validate_dimension(&s, "height"))
                .help("Height of the image in pixels"),
        )
        .arg(
            Arg::with_name(MAX)
                .long(MAX)
                .short("m")
                .takes_value(true)
                .default_value("1000")
                .validator(|s| validate_iterations(&s))
                .help("The maximum number of iterations per point"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .default_value("mandel.bmp")
                .help("Output file"),
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
                .help("Number of threads to use in solver"),
        )
        .get_matches()
}

fn job(matches: &ArgMatches) -> RenderJob {
    RenderJob {
        center: Complex::new(
            value_t!(matches, XCENTER, f64).unwrap_or_else(|e| e.exit()),
            value_t!(matches, YCENTER, f64).unwrap_or_else(|e| e.exit()),
        ),
        scale: value_t!(matches, SCALE, f64).unwrap_or_else(|e| e.exit()),
        width: value_t!(matches, WIDTH, usize).unwrap_or_else(|e| e.exit()),
        height: value_t!(matches, HEIGHT, usize).unwrap_or_else(|e| e.exit()),
        max_iter: value_t!(matches, MAX, u32).unwrap_or_else(|e| e.exit()),
        workers: value_t!(matches, THREADS, usize).unwrap_or_else(|e| e.exit()),
        output: PathBuf::from(matches.value_of_os(OUTPUT).unwrap_or_default()),
    }
}

fn main() {
    env_logger::init();
    let job = job(&args());

    let cpus = num_cpus::get();
    if job.workers > cpus {
        warn!("{} threads requested on {} cpus", job.workers, cpus);
    }

    println!("mandel: {}", job);
    let begin = Instant::now();

    if let Err(e) = mandel::run(&job) {
        eprintln!("mandel: {}", e);
        std::process::exit(1);
    }

    println!("Duration: {}", begin.elapsed().as_micros());
}
