//! QOI's native pixel buffer: `width × height` pixels of interleaved 8-bit
//! R, G, B[, A], row-major, no padding.
//!
//! Typed access goes through [`rgb`] pixel types and [`imgref`] images:
//!
//! ```rust
//! use imgref::ImgVec;
//! use rgb::Rgb;
//! use qoi_raster::CanonicalImage;
//!
//! let img = ImgVec::new(vec![Rgb::new(255u8, 0, 0), Rgb::new(0, 255, 0)], 2, 1);
//! let canonical = CanonicalImage::try_from(img).unwrap();
//! assert_eq!(canonical.pixels(), &[255, 0, 0, 0, 255, 0]);
//! assert_eq!(canonical.as_rgb().unwrap().buf()[1], Rgb::new(0, 255, 0));
//! ```

use std::borrow::Cow;

use imgref::{ImgRef, ImgVec};
use qoi::{Channels, ColorSpace};
use rgb::{Rgb, Rgba};

use crate::error::{Error, Result};

/// An interleaved 8-bit RGB or RGBA image, borrowed or owned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalImage<'a> {
    width: u32,
    height: u32,
    channels: Channels,
    color_space: ColorSpace,
    pixels: Cow<'a, [u8]>,
}

impl<'a> CanonicalImage<'a> {
    /// Fails unless both dimensions are positive and `pixels` holds exactly
    /// `width * height * channels` bytes.
    pub fn new(
        width: u32,
        height: u32,
        channels: Channels,
        color_space: ColorSpace,
        pixels: impl Into<Cow<'a, [u8]>>,
    ) -> Result<Self> {
        let pixels = pixels.into();
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        let expected = width as u64 * height as u64 * channels.as_u8() as u64;
        if pixels.len() as u64 != expected {
            return Err(Error::invalid(format!(
                "{width}x{height}x{} image needs {expected} bytes, got {}",
                channels.as_u8(),
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            color_space,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Whether the pixels are borrowed from somewhere else.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.pixels, Cow::Borrowed(_))
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels.into_owned()
    }

    pub fn into_owned(self) -> CanonicalImage<'static> {
        CanonicalImage {
            width: self.width,
            height: self.height,
            channels: self.channels,
            color_space: self.color_space,
            pixels: Cow::Owned(self.pixels.into_owned()),
        }
    }

    /// Typed view of a 3-channel image.
    pub fn as_rgb(&self) -> Option<ImgRef<'_, Rgb<u8>>> {
        match self.channels {
            Channels::Rgb => Some(ImgRef::new(
                bytemuck::cast_slice(&self.pixels),
                self.width as usize,
                self.height as usize,
            )),
            Channels::Rgba => None,
        }
    }

    /// Typed view of a 4-channel image.
    pub fn as_rgba(&self) -> Option<ImgRef<'_, Rgba<u8>>> {
        match self.channels {
            Channels::Rgba => Some(ImgRef::new(
                bytemuck::cast_slice(&self.pixels),
                self.width as usize,
                self.height as usize,
            )),
            Channels::Rgb => None,
        }
    }
}

fn dims(width: usize, height: usize) -> Result<(u32, u32)> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(Error::invalid(format!("{width}x{height} is too large for QOI"))),
    }
}

/// Packed pixels of `img`, reusing its buffer when rows are unpadded.
fn packed_bytes<T: bytemuck::Pod>(img: ImgVec<T>) -> Vec<u8> {
    if img.stride() == img.width() && img.buf().len() == img.width() * img.height() {
        match bytemuck::allocation::try_cast_vec::<T, u8>(img.into_buf()) {
            Ok(bytes) => bytes,
            Err((_, buf)) => bytemuck::cast_slice(&buf).to_vec(),
        }
    } else {
        img.as_ref()
            .rows()
            .flat_map(|row| bytemuck::cast_slice::<T, u8>(row).iter().copied())
            .collect()
    }
}

impl TryFrom<ImgVec<Rgb<u8>>> for CanonicalImage<'static> {
    type Error = Error;

    fn try_from(img: ImgVec<Rgb<u8>>) -> Result<Self> {
        let (w, h) = dims(img.width(), img.height())?;
        Self::new(w, h, Channels::Rgb, ColorSpace::Srgb, packed_bytes(img))
    }
}

impl TryFrom<ImgVec<Rgba<u8>>> for CanonicalImage<'static> {
    type Error = Error;

    fn try_from(img: ImgVec<Rgba<u8>>) -> Result<Self> {
        let (w, h) = dims(img.width(), img.height())?;
        Self::new(w, h, Channels::Rgba, ColorSpace::Srgb, packed_bytes(img))
    }
}
