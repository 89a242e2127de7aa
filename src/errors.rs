// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The error taxonomy shared by the renderer and the series driver.

use failure::Fail;
use std::io;
use std::process::ExitStatus;

/// Everything that can go wrong while rendering an image or a series
/// of them.  Arithmetic is never an error: the escape-time loop is
/// total over finite inputs.
#[derive(Debug, Fail)]
pub enum MandelError {
    /// Malformed or out-of-range parameters.  Nothing is rendered.
    #[fail(display = "invalid configuration: {}", _0)]
    Config(String),

    /// A worker thread or frame process could not be started.
    #[fail(display = "could not start {}: {}", unit, cause)]
    Spawn {
        /// The unit of work that failed to start.
        unit: String,
        /// The underlying OS error.
        #[cause]
        cause: io::Error,
    },

    /// A worker or frame unit died without reporting a result.
    #[fail(display = "{} panicked", _0)]
    WorkerPanicked(String),

    /// The image sink could not write its destination.
    #[fail(display = "couldn't write to {}: {}", path, cause)]
    Io {
        /// The destination that could not be written.
        path: String,
        /// The underlying OS error.
        #[cause]
        cause: io::Error,
    },

    /// A frame process ran but exited unsuccessfully.
    #[fail(display = "frame {} exited with {}", frame, status)]
    Process {
        /// The index of the frame.
        frame: usize,
        /// How the process ended.
        status: ExitStatus,
    },
}

impl MandelError {
    /// Shorthand for a configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MandelError::Config(msg.into())
    }
}
