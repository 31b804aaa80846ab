//! # qoi-raster
//!
//! *Get your pixels into QOI and back, whatever they were wearing.*
//!
//! Hosts hand images around in many storage layouts: packed `0xAARRGGBB`
//! words, B,G,R byte triples, gray bytes, palettes, or arbitrary rasters
//! with a color model attached. QOI wants exactly one thing: interleaved
//! 8-bit R,G,B[,A], row-major, no padding. This crate moves pixels between
//! the two.
//!
//! ## Writing
//!
//! [`QoiWriter`] takes any [`RenderedImage`]. With default [`WriteParams`]
//! the raster is converted as a whole ([`to_canonical`]): canonical byte
//! storage is borrowed without a copy, known packed and byte layouts run a
//! row kernel from [`bytes`], and everything else is resolved pixel by pixel
//! through its [`ColorModel`]. A source region, subsampling grid or band
//! selection switches to a per-pixel copy of raw samples.
//!
//! ## Reading
//!
//! [`QoiReader`] decodes once and wraps the decoded buffer as a raster
//! ([`from_canonical`]). Default [`ReadParams`] return that raster as-is;
//! anything else copies the selected region, bands and subsamples into a
//! destination image, optionally at an offset.
//!
//! Both directions report to a [`Monitor`] and poll a [`Stop`] token between
//! rows, returning [`Completion::Aborted`] once it asks them to stop.
//!
//! ```
//! use qoi_raster::{ImageType, QoiReader, QoiWriter, ReadParams, WriteParams};
//!
//! let mut img = ImageType::IntArgb.create(2, 1)?;
//! img.raster_mut().set_pixel(1, 0, &[10, 20, 30, 255]);
//!
//! let mut writer = QoiWriter::new(Vec::new());
//! writer.write(&img, &WriteParams::default())?;
//!
//! let bytes = writer.into_inner();
//! let decoded = QoiReader::new(&bytes[..]).read(0, &ReadParams::default())?;
//! let mut px = [0; 4];
//! decoded.raster().get_pixel(1, 0, &mut px);
//! assert_eq!(px, [10, 20, 30, 255]);
//! # Ok::<(), qoi_raster::Error>(())
//! ```

#![forbid(unsafe_code)]

pub mod bytes;

mod canonical;
mod color;
mod convert;
mod error;
mod format;
mod image;
mod layout;
mod limits;
mod param;
mod progress;
mod raster;
mod read;
mod write;

pub use enough::{Stop, StopReason, Unstoppable};
pub use qoi::{Channels, ColorSpace, Header};

pub use canonical::CanonicalImage;
pub use color::{ColorModel, Transparency};
pub use convert::{from_canonical, to_canonical, to_canonical_generic};
pub use error::{Error, Result};
pub use format::{
    FORMAT_NAMES, MAGIC, MIME_TYPES, SUFFIXES, VENDOR, can_encode, decode, encode, probe,
    probe_stream,
};
pub use image::{ImageType, RasterImage, RenderedImage, TiledImage};
pub use layout::RasterLayout;
pub use limits::{DEFAULT_MAX_INPUT_BYTES, Limits};
pub use param::{Point, ReadParams, Rect, Subsampling, WriteParams, check_band_settings};
pub use progress::{Completion, Monitor};
pub use raster::{DataBuffer, Raster, RasterView, RasterViewMut, SampleModel};
pub use read::{QoiReader, ReadOutcome};
pub use write::QoiWriter;
