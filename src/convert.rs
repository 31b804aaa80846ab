//! Conversions between host rasters and [`CanonicalImage`]s.
//!
//! Encode direction, fastest first:
//!
//! 1. Byte storage that already is canonical RGB or RGBA is borrowed as-is.
//! 2. Known packed and byte layouts run a row kernel from [`crate::bytes`].
//! 3. Everything else resolves each pixel through its color model.
//!
//! Decode direction wraps the canonical bytes as an interleaved raster
//! without copying.

use qoi::ColorSpace;
use tracing::{debug, trace, warn};

use crate::bytes::{self, SizeError};
use crate::canonical::CanonicalImage;
use crate::color::ColorModel;
use crate::error::{Error, Result};
use crate::image::{ImageType, RasterImage};
use crate::layout::RasterLayout;
use crate::raster::{DataBuffer, Raster};

fn qoi_dims(raster: &Raster) -> Result<(u32, u32)> {
    match (u32::try_from(raster.width()), u32::try_from(raster.height())) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(Error::invalid(format!(
            "{}x{} is too large for QOI",
            raster.width(),
            raster.height()
        ))),
    }
}

fn check_pairing(raster: &Raster, color_model: &ColorModel) -> Result<()> {
    if color_model.is_compatible_raster(raster) {
        Ok(())
    } else {
        Err(Error::invalid("color model cannot interpret raster"))
    }
}

/// Convert `raster` to canonical sRGB bytes, borrowing its storage when it
/// is already canonical.
///
/// Produces the same pixels as [`to_canonical_generic`].
pub fn to_canonical<'a>(
    raster: &'a Raster,
    color_model: &ColorModel,
) -> Result<CanonicalImage<'a>> {
    check_pairing(raster, color_model)?;
    let (w32, h32) = qoi_dims(raster)?;
    let layout = RasterLayout::classify(raster, color_model);
    debug!(?layout, width = w32, height = h32, "converting raster to QOI pixels");

    if let (RasterLayout::DirectByte3 | RasterLayout::DirectByte4, DataBuffer::Byte(buf)) =
        (layout, raster.data())
    {
        let channels = if layout == RasterLayout::DirectByte4 {
            qoi::Channels::Rgba
        } else {
            qoi::Channels::Rgb
        };
        return CanonicalImage::new(w32, h32, channels, ColorSpace::Srgb, buf.as_slice());
    }

    let channels = color_model.channels();
    let (w, h) = (raster.width(), raster.height());
    let n = channels.as_u8() as usize;
    let mut out = vec![0u8; w * h * n];
    let off = raster.offset();
    let stride = raster.sample_model().scanline_stride();

    let kernel: Option<Result<(), SizeError>> = match (layout, raster.data()) {
        (RasterLayout::PackedIntArgb, DataBuffer::Int(words)) => Some(bytes::argb_to_rgba_strided(
            &words[off..],
            &mut out,
            w,
            h,
            stride,
            w * n,
        )),
        (RasterLayout::PackedIntRgb, DataBuffer::Int(words)) => Some(bytes::xrgb_to_rgb_strided(
            &words[off..],
            &mut out,
            w,
            h,
            stride,
            w * n,
        )),
        (RasterLayout::PackedIntBgr, DataBuffer::Int(words)) => Some(bytes::xbgr_to_rgb_strided(
            &words[off..],
            &mut out,
            w,
            h,
            stride,
            w * n,
        )),
        (RasterLayout::ThreeByteBgr, DataBuffer::Byte(b)) => Some(bytes::bgr_to_rgb_strided(
            &b[off..],
            &mut out,
            w,
            h,
            stride,
            w * n,
        )),
        (RasterLayout::FourByteAbgr, DataBuffer::Byte(b)) => Some(bytes::abgr_to_rgba_strided(
            &b[off..],
            &mut out,
            w,
            h,
            stride,
            w * n,
        )),
        (RasterLayout::ByteGray, DataBuffer::Byte(b)) => Some(bytes::gray_to_rgb_strided(
            &b[off..],
            &mut out,
            w,
            h,
            stride,
            w * n,
        )),
        _ => None,
    };

    match kernel {
        Some(Ok(())) => CanonicalImage::new(w32, h32, channels, ColorSpace::Srgb, out),
        Some(Err(e)) => {
            warn!(
                ?layout,
                error = %e,
                "layout kernel rejected raster geometry, using generic path"
            );
            resolve_each_pixel(raster, color_model, w32, h32)
        }
        None => resolve_each_pixel(raster, color_model, w32, h32),
    }
}

/// Convert `raster` by resolving every pixel through `color_model`, skipping
/// all layout-specific shortcuts.
///
/// Always copies and always produces sRGB.
pub fn to_canonical_generic(
    raster: &Raster,
    color_model: &ColorModel,
) -> Result<CanonicalImage<'static>> {
    check_pairing(raster, color_model)?;
    let (w32, h32) = qoi_dims(raster)?;
    resolve_each_pixel(raster, color_model, w32, h32)
}

fn resolve_each_pixel(
    raster: &Raster,
    color_model: &ColorModel,
    w32: u32,
    h32: u32,
) -> Result<CanonicalImage<'static>> {
    let channels = color_model.channels();
    let n = channels.as_u8() as usize;
    let w = raster.width();
    trace!(width = w32, height = h32, channels = n, "resolving pixels through color model");
    let mut out = vec![0u8; w * raster.height() * n];
    let mut elements = Vec::with_capacity(4);
    for (y, row) in out.chunks_exact_mut(w * n).enumerate() {
        for (x, px) in row.chunks_exact_mut(n).enumerate() {
            raster.pixel_elements(x, y, &mut elements);
            let c = color_model.to_rgba(&elements);
            px[0] = c.r;
            px[1] = c.g;
            px[2] = c.b;
            if n == 4 {
                px[3] = c.a;
            }
        }
    }
    CanonicalImage::new(w32, h32, channels, ColorSpace::Srgb, out)
}

/// Wrap canonical bytes as an interleaved byte image with band offsets
/// `0..channels`, in the image's declared color space. Owned pixels are moved,
/// not copied.
pub fn from_canonical(image: CanonicalImage<'_>) -> Result<RasterImage> {
    let ty = ImageType::Interleaved {
        channels: image.channels(),
        space: image.color_space(),
    };
    let (w, h) = (image.width() as usize, image.height() as usize);
    ty.wrap(w, h, DataBuffer::Byte(image.into_pixels()))
}
