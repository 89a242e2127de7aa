// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Argument validators for the command-line drivers.  Each returns the
//! message clap prints when the value is rejected.

use std::str::FromStr;

use crate::viewport::MAX_DIMENSION;

/// Accept any finite floating point number.
pub fn validate_float(s: &str, isnotanumber_err: &str) -> Result<(), String> {
    match f64::from_str(s) {
        Ok(f) if f.is_finite() => Ok(()),
        _ => Err(isnotanumber_err.to_string()),
    }
}

/// Accept a finite number strictly greater than zero.
pub fn validate_positive_float(s: &str, isnotanumber_err: &str) -> Result<(), String> {
    match f64::from_str(s) {
        Ok(f) if f.is_finite() && f > 0.0 => Ok(()),
        _ => Err(isnotanumber_err.to_string()),
    }
}

/// Accept an image width or height the renderer can allocate.
pub fn validate_dimension(s: &str, what: &str) -> Result<(), String> {
    validate_range(
        s,
        1usize,
        MAX_DIMENSION,
        &format!("Could not parse image {}", what),
        &format!("Image {} must be between 1 and {}", what, MAX_DIMENSION),
    )
}

/// Accept an iteration cap.
pub fn validate_iterations(s: &str) -> Result<(), String> {
    validate_range(
        s,
        1u32,
        u32::max_value(),
        "Could not parse iteration count",
        "Iteration count must be between 1 and 4294967295",
    )
}

/// Accept a number in `[low, high]`.
pub fn validate_range<T: FromStr + PartialOrd>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}
