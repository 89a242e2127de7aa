// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writes a finished framebuffer to disk.  The encoder is picked from
//! the file extension; BMP is the fallback.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use image::bmp::BMPEncoder;
use image::png::PNGEncoder;
use image::pnm::{PNMEncoder, PNMSubtype, SampleEncoding};
use image::ColorType;
use log::debug;

use crate::errors::MandelError;
use crate::framebuffer::Framebuffer;

/// The image formats the sink can produce.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Format {
    /// Windows bitmap.
    Bmp,
    /// Portable Network Graphics.
    Png,
    /// Binary PPM.
    Pnm,
}

impl Format {
    /// Choose a format from the path's extension.
    pub fn from_path(path: &Path) -> Format {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_ref().map(String::as_str) {
            Some("png") => Format::Png,
            Some("ppm") | Some("pnm") => Format::Pnm,
            _ => Format::Bmp,
        }
    }
}

fn encode<W: Write>(
    format: Format,
    writer: &mut W,
    pixels: &[u8],
    bounds: (u32, u32),
) -> Result<(), io::Error> {
    match format {
        Format::Bmp => BMPEncoder::new(writer).encode(pixels, bounds.0, bounds.1, ColorType::RGB(8)),
        Format::Png => PNGEncoder::new(writer).encode(pixels, bounds.0, bounds.1, ColorType::RGB(8)),
        Format::Pnm => PNMEncoder::new(writer)
            .with_subtype(PNMSubtype::Pixmap(SampleEncoding::Binary))
            .encode(pixels, bounds.0, bounds.1, ColorType::RGB(8)),
    }
}

/// Save `framebuffer` to `path`.  Any failure carries the path and the
/// operating system's reason.
pub fn save(framebuffer: &Framebuffer, path: &Path) -> Result<(), MandelError> {
    let io_error = |cause| MandelError::Io {
        path: path.display().to_string(),
        cause,
    };
    let format = Format::from_path(path);
    debug!("writing {} as {:?}", path.display(), format);

    let mut output = BufWriter::new(File::create(path).map_err(io_error)?);
    encode(
        format,
        &mut output,
        &framebuffer.to_rgb(),
        (framebuffer.width() as u32, framebuffer.height() as u32),
    )
    .map_err(io_error)?;
    output.flush().map_err(io_error)
}
