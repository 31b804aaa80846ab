//! Format identity, detection, and the raw decode/encode entry points.

use std::io::{Read, Seek, SeekFrom, Write};

use tracing::{debug, trace};

use crate::canonical::CanonicalImage;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::raster::Raster;

/// The four bytes every QOI stream starts with.
pub const MAGIC: [u8; 4] = *b"qoif";

pub const FORMAT_NAMES: [&str; 2] = ["qoi", "QOI"];
pub const SUFFIXES: [&str; 1] = ["qoi"];
pub const MIME_TYPES: [&str; 1] = ["image/qoi"];
pub const VENDOR: &str = "QOI";

/// Whether `header` starts with the QOI magic. Fewer than four bytes is
/// never a match.
///
/// ```
/// assert!(qoi_raster::probe(b"qoif\0\0\0\x01"));
/// assert!(!qoi_raster::probe(b"\x89PNG"));
/// assert!(!qoi_raster::probe(b"qoi"));
/// ```
pub fn probe(header: &[u8]) -> bool {
    header.starts_with(&MAGIC)
}

/// Peek at the start of `stream` without consuming it.
///
/// Streams longer than [`Limits::max_input_bytes`] are refused with
/// [`Error::TooLarge`] before anything is read. The stream position is
/// restored on success.
pub fn probe_stream<R: Read + Seek + ?Sized>(stream: &mut R, limits: &Limits) -> Result<bool> {
    let start = stream.stream_position().map_err(Error::decode_io)?;
    let end = stream.seek(SeekFrom::End(0)).map_err(Error::decode_io)?;
    let remaining = end.saturating_sub(start);
    stream.seek(SeekFrom::Start(start)).map_err(Error::decode_io)?;
    limits.check_input_size(remaining)?;

    let mut head = [0u8; 4];
    let mut filled = 0;
    while filled < head.len() {
        match stream.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::decode_io(e)),
        }
    }
    stream.seek(SeekFrom::Start(start)).map_err(Error::decode_io)?;
    trace!(remaining, filled, "probed stream");
    Ok(probe(&head[..filled]))
}

/// Read the whole of `stream` and decode it.
///
/// Bytes after the end marker are ignored. The stream is read at most one
/// byte past `limits.max_input_bytes`.
pub fn decode<R: Read>(stream: R, limits: &Limits) -> Result<CanonicalImage<'static>> {
    let mut bytes = Vec::new();
    stream
        .take(limits.max_input_bytes.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(Error::decode_io)?;
    limits.check_input_size(bytes.len() as u64)?;

    let header = qoi::decode_header(&bytes).map_err(Error::Decode)?;
    limits.check_dimensions(header.width, header.height)?;
    let (header, pixels) = qoi::decode_to_vec(&bytes).map_err(Error::Decode)?;
    debug!(
        width = header.width,
        height = header.height,
        channels = header.channels.as_u8(),
        input_bytes = bytes.len(),
        "decoded"
    );
    CanonicalImage::new(
        header.width,
        header.height,
        header.channels,
        header.colorspace,
        pixels,
    )
}

/// Encode `image` into `stream` and flush it.
pub fn encode<W: Write>(image: &CanonicalImage<'_>, stream: &mut W) -> Result<()> {
    let encoder = qoi::Encoder::new(image.pixels(), image.width(), image.height())
        .map_err(Error::Encode)?
        .with_colorspace(image.color_space());
    let written = encoder.encode_to_stream(stream).map_err(Error::Encode)?;
    stream.flush().map_err(Error::encode_io)?;
    debug!(
        width = image.width(),
        height = image.height(),
        written,
        "encoded"
    );
    Ok(())
}

/// Whether a raster can be written: 3 or 4 bands, each 8 bits wide.
pub fn can_encode(raster: &Raster) -> bool {
    matches!(raster.num_bands(), 3 | 4) && raster.sample_sizes().iter().all(|&s| s == 8)
}
