// ---------------------------------------------------------------------------
// Row-level kernels that turn host storage layouts into QOI's interleaved
// R,G,B[,A] bytes.
//
// Architecture: scalar row functions in `scalar` contain the loops. The
// public functions below validate sizes once, then run either a single
// contiguous call or a loop over strided rows.
// ---------------------------------------------------------------------------

use core::fmt;

mod scalar;
use scalar::*;


/// Buffer geometry that a kernel cannot process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeError {
    /// Buffer is empty or its length is not a whole number of pixels.
    NotPixelAligned,
    /// Destination holds fewer pixels than the source.
    PixelCountMismatch,
    /// Zero dimensions, a stride shorter than a row, or a buffer too short
    /// for the last row.
    InvalidStride,
}

impl fmt::Display for SizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPixelAligned => f.write_str("buffer length is not a whole number of pixels"),
            Self::PixelCountMismatch => f.write_str("destination is smaller than the source"),
            Self::InvalidStride => f.write_str("invalid width, height or stride for buffer"),
        }
    }
}

impl std::error::Error for SizeError {}

// ===========================================================================
// Validation helpers
// ===========================================================================

#[inline]
fn check_copy(
    src_len: usize,
    src_bpp: usize,
    dst_len: usize,
    dst_bpp: usize,
) -> Result<(), SizeError> {
    if src_len == 0 || !src_len.is_multiple_of(src_bpp) {
        return Err(SizeError::NotPixelAligned);
    }
    if dst_len < (src_len / src_bpp) * dst_bpp {
        return Err(SizeError::PixelCountMismatch);
    }
    Ok(())
}

/// `len`, `stride` and `bpp` are all counted in elements of the buffer
/// (bytes for byte buffers, words for packed `u32` buffers).
#[inline]
fn check_strided(
    len: usize,
    width: usize,
    height: usize,
    stride: usize,
    bpp: usize,
) -> Result<(), SizeError> {
    if width == 0 || height == 0 {
        return Err(SizeError::InvalidStride);
    }
    let row = width.checked_mul(bpp).ok_or(SizeError::InvalidStride)?;
    if row > stride {
        return Err(SizeError::InvalidStride);
    }
    let total = (height - 1)
        .checked_mul(stride)
        .ok_or(SizeError::InvalidStride)?
        .checked_add(row)
        .ok_or(SizeError::InvalidStride)?;
    if len < total {
        return Err(SizeError::InvalidStride);
    }
    Ok(())
}

// ===========================================================================
// Public API, contiguous
// ===========================================================================

/// BGR (3 bytes/px) → RGB (3 bytes/px). Reverses bytes 0↔2.
pub fn bgr_to_rgb(src: &[u8], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 3, dst.len(), 3)?;
    bgr_to_rgb_row(src, dst);
    Ok(())
}

/// ABGR (4 bytes/px, alpha first) → RGBA (4 bytes/px). Reverses every pixel.
pub fn abgr_to_rgba(src: &[u8], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 4, dst.len(), 4)?;
    abgr_to_rgba_row(src, dst);
    Ok(())
}

/// Gray (1 byte/px) → RGB (3 bytes/px). R=G=B=gray.
pub fn gray_to_rgb(src: &[u8], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 1, dst.len(), 3)?;
    gray_to_rgb_row(src, dst);
    Ok(())
}

/// Packed `0xAARRGGBB` words → RGBA (4 bytes/px).
///
/// Words are read by value, so the result does not depend on host endianness.
pub fn argb_to_rgba(src: &[u32], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 1, dst.len(), 4)?;
    argb_to_rgba_row(src, dst);
    Ok(())
}

/// Packed `0x00RRGGBB` words → RGB (3 bytes/px). The high byte is ignored.
pub fn xrgb_to_rgb(src: &[u32], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 1, dst.len(), 3)?;
    xrgb_to_rgb_row(src, dst);
    Ok(())
}

/// Packed `0x00BBGGRR` words → RGB (3 bytes/px). The high byte is ignored.
pub fn xbgr_to_rgb(src: &[u32], dst: &mut [u8]) -> Result<(), SizeError> {
    check_copy(src.len(), 1, dst.len(), 3)?;
    xbgr_to_rgb_row(src, dst);
    Ok(())
}

// ===========================================================================
// Public API, strided
// ===========================================================================

/// BGR → RGB between strided buffers.
///
/// `src_stride` / `dst_stride` are the distances in bytes between the start of
/// consecutive rows. Padding bytes between rows are never read or written.
pub fn bgr_to_rgb_strided(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    src_stride: usize,
    dst_stride: usize,
) -> Result<(), SizeError> {
    check_strided(src.len(), width, height, src_stride, 3)?;
    check_strided(dst.len(), width, height, dst_stride, 3)?;
    for y in 0..height {
        bgr_to_rgb_row(
            &src[y * src_stride..][..width * 3],
            &mut dst[y * dst_stride..][..width * 3],
        );
    }
    Ok(())
}

/// ABGR → RGBA between strided buffers.
///
/// `src_stride` / `dst_stride` are the distances in bytes between the start of
/// consecutive rows. Padding bytes between rows are never read or written.
pub fn abgr_to_rgba_strided(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    src_stride: usize,
    dst_stride: usize,
) -> Result<(), SizeError> {
    check_strided(src.len(), width, height, src_stride, 4)?;
    check_strided(dst.len(), width, height, dst_stride, 4)?;
    for y in 0..height {
        abgr_to_rgba_row(
            &src[y * src_stride..][..width * 4],
            &mut dst[y * dst_stride..][..width * 4],
        );
    }
    Ok(())
}

/// Gray → RGB between strided buffers.
pub fn gray_to_rgb_strided(
    src: &[u8],
    dst: &mut [u8],
    width: usize,
    height: usize,
    src_stride: usize,
    dst_stride: usize,
) -> Result<(), SizeError> {
    check_strided(src.len(), width, height, src_stride, 1)?;
    check_strided(dst.len(), width, height, dst_stride, 3)?;
    for y in 0..height {
        gray_to_rgb_row(&src[y * src_stride..][..width], &mut dst[y * dst_stride..][..width * 3]);
    }
    Ok(())
}

/// Packed ARGB words → RGBA bytes between strided buffers.
///
/// `src_stride` counts words, `dst_stride` counts bytes.
pub fn argb_to_rgba_strided(
    src: &[u32],
    dst: &mut [u8],
    width: usize,
    height: usize,
    src_stride: usize,
    dst_stride: usize,
) -> Result<(), SizeError> {
    check_strided(src.len(), width, height, src_stride, 1)?;
    check_strided(dst.len(), width, height, dst_stride, 4)?;
    for y in 0..height {
        argb_to_rgba_row(&src[y * src_stride..][..width], &mut dst[y * dst_stride..][..width * 4]);
    }
    Ok(())
}

/// Packed xRGB words → RGB bytes between strided buffers.
///
/// `src_stride` counts words, `dst_stride` counts bytes.
pub fn xrgb_to_rgb_strided(
    src: &[u32],
    dst: &mut [u8],
    width: usize,
    height: usize,
    src_stride: usize,
    dst_stride: usize,
) -> Result<(), SizeError> {
    check_strided(src.len(), width, height, src_stride, 1)?;
    check_strided(dst.len(), width, height, dst_stride, 3)?;
    for y in 0..height {
        xrgb_to_rgb_row(&src[y * src_stride..][..width], &mut dst[y * dst_stride..][..width * 3]);
    }
    Ok(())
}

/// Packed xBGR words → RGB bytes between strided buffers.
///
/// `src_stride` counts words, `dst_stride` counts bytes.
pub fn xbgr_to_rgb_strided(
    src: &[u32],
    dst: &mut [u8],
    width: usize,
    height: usize,
    src_stride: usize,
    dst_stride: usize,
) -> Result<(), SizeError> {
    check_strided(src.len(), width, height, src_stride, 1)?;
    check_strided(dst.len(), width, height, dst_stride, 3)?;
    for y in 0..height {
        xbgr_to_rgb_row(&src[y * src_stride..][..width], &mut dst[y * dst_stride..][..width * 3]);
    }
    Ok(())
}
