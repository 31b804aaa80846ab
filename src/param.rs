//! Region, subsampling and band selection for reads and writes.

use crate::error::{Error, Result};

/// A pixel position. May be negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle `[x, x + width) × [y, y + height)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// `[0, width) × [0, height)`, saturating dimensions that do not fit.
    pub fn of_size(width: usize, height: usize) -> Self {
        Self::new(
            0,
            0,
            u32::try_from(width).unwrap_or(u32::MAX),
            u32::try_from(height).unwrap_or(u32::MAX),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The overlap of two rectangles. Disjoint rectangles give an empty
    /// rectangle.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x as i64 + self.width as i64).min(other.x as i64 + other.width as i64);
        let y1 = (self.y as i64 + self.height as i64).min(other.y as i64 + other.height as i64);
        Rect {
            x: x0,
            y: y0,
            width: (x1 - x0 as i64).max(0) as u32,
            height: (y1 - y0 as i64).max(0) as u32,
        }
    }
}

/// Subsampling grid shared by reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subsampling {
    /// Take every `x`-th column.
    pub x: u32,
    /// Take every `y`-th row.
    pub y: u32,
    /// First sampled column, relative to the source region.
    pub x_offset: u32,
    /// First sampled row, relative to the source region.
    pub y_offset: u32,
}

impl Default for Subsampling {
    fn default() -> Self {
        Self {
            x: 1,
            y: 1,
            x_offset: 0,
            y_offset: 0,
        }
    }
}

impl Subsampling {
    fn validate(&self) -> Result<()> {
        if self.x == 0 || self.y == 0 {
            return Err(Error::invalid("subsampling factors must be at least 1"));
        }
        if self.x_offset >= self.x || self.y_offset >= self.y {
            return Err(Error::invalid(format!(
                "subsampling offsets ({}, {}) must be smaller than factors ({}, {})",
                self.x_offset, self.y_offset, self.x, self.y
            )));
        }
        Ok(())
    }
}

fn validate_region(region: Option<&Rect>, sub: &Subsampling) -> Result<()> {
    if let Some(r) = region {
        if r.is_empty() {
            return Err(Error::invalid("source region must have positive size"));
        }
        if r.width <= sub.x_offset || r.height <= sub.y_offset {
            return Err(Error::invalid(
                "source region lies entirely between subsamples",
            ));
        }
    }
    Ok(())
}

fn validate_bands(what: &str, bands: Option<&[usize]>) -> Result<()> {
    if let Some(bands) = bands {
        if bands.is_empty() {
            return Err(Error::invalid(format!("{what} bands must not be empty")));
        }
        for (i, b) in bands.iter().enumerate() {
            if bands[i + 1..].contains(b) {
                return Err(Error::invalid(format!("duplicate {what} band {b}")));
            }
        }
    }
    Ok(())
}

/// Clip `requested` to the image, then move the origin inward by the
/// subsampling offsets.
fn effective_region(
    width: usize,
    height: usize,
    requested: Option<&Rect>,
    sub: &Subsampling,
) -> Rect {
    let full = Rect::of_size(width, height);
    let mut r = match requested {
        Some(req) => full.intersection(req),
        None => full,
    };
    r.x = (r.x as i64 + sub.x_offset as i64).min(i32::MAX as i64) as i32;
    r.y = (r.y as i64 + sub.y_offset as i64).min(i32::MAX as i64) as i32;
    r.width = r.width.saturating_sub(sub.x_offset);
    r.height = r.height.saturating_sub(sub.y_offset);
    r
}

/// Settings for [`QoiReader::read`](crate::QoiReader::read).
///
/// The default reads the whole image unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadParams {
    /// Part of the image to read; `None` is the whole image.
    pub source_region: Option<Rect>,
    pub subsampling: Subsampling,
    /// Source bands to read, in the order they are delivered.
    pub source_bands: Option<Vec<usize>>,
    /// Destination bands receiving the source bands, in order.
    pub destination_bands: Option<Vec<usize>>,
    /// Where the first read pixel lands in the destination.
    pub destination_offset: Point,
}

impl ReadParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_region(mut self, region: Rect) -> Self {
        self.source_region = Some(region);
        self
    }

    /// Read every `x`-th column and `y`-th row.
    pub fn with_subsampling(mut self, x: u32, y: u32) -> Self {
        self.subsampling.x = x;
        self.subsampling.y = y;
        self
    }

    pub fn with_subsampling_offset(mut self, x: u32, y: u32) -> Self {
        self.subsampling.x_offset = x;
        self.subsampling.y_offset = y;
        self
    }

    pub fn with_source_bands(mut self, bands: impl Into<Vec<usize>>) -> Self {
        self.source_bands = Some(bands.into());
        self
    }

    pub fn with_destination_bands(mut self, bands: impl Into<Vec<usize>>) -> Self {
        self.destination_bands = Some(bands.into());
        self
    }

    pub fn with_destination_offset(mut self, offset: Point) -> Self {
        self.destination_offset = offset;
        self
    }

    /// Whether these settings read the whole image unchanged.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.subsampling.validate()?;
        validate_region(self.source_region.as_ref(), &self.subsampling)?;
        validate_bands("source", self.source_bands.as_deref())?;
        validate_bands("destination", self.destination_bands.as_deref())
    }

    /// The source rectangle actually iterated for a `width × height` image.
    pub fn effective_region(&self, width: usize, height: usize) -> Rect {
        effective_region(width, height, self.source_region.as_ref(), &self.subsampling)
    }
}

/// Settings for [`QoiWriter::write`](crate::QoiWriter::write).
///
/// The default writes the whole image with all of its bands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteParams {
    /// Part of the image to write; `None` is the whole image.
    pub source_region: Option<Rect>,
    pub subsampling: Subsampling,
    /// Source bands written as R, G, B[, A], in that order.
    pub source_bands: Option<Vec<usize>>,
}

impl WriteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_region(mut self, region: Rect) -> Self {
        self.source_region = Some(region);
        self
    }

    /// Write every `x`-th column and `y`-th row.
    pub fn with_subsampling(mut self, x: u32, y: u32) -> Self {
        self.subsampling.x = x;
        self.subsampling.y = y;
        self
    }

    pub fn with_subsampling_offset(mut self, x: u32, y: u32) -> Self {
        self.subsampling.x_offset = x;
        self.subsampling.y_offset = y;
        self
    }

    pub fn with_source_bands(mut self, bands: impl Into<Vec<usize>>) -> Self {
        self.source_bands = Some(bands.into());
        self
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.subsampling.validate()?;
        validate_region(self.source_region.as_ref(), &self.subsampling)?;
        validate_bands("source", self.source_bands.as_deref())
    }

    pub fn effective_region(&self, width: usize, height: usize) -> Rect {
        effective_region(width, height, self.source_region.as_ref(), &self.subsampling)
    }
}

/// Check that a read moves as many bands as it delivers, and that every
/// selected band exists.
pub fn check_band_settings(
    source_bands: Option<&[usize]>,
    destination_bands: Option<&[usize]>,
    num_source_bands: usize,
    num_destination_bands: usize,
) -> Result<()> {
    let src_len = source_bands.map_or(num_source_bands, <[usize]>::len);
    let dst_len = destination_bands.map_or(num_destination_bands, <[usize]>::len);
    if src_len != dst_len {
        return Err(Error::invalid(format!(
            "reading {src_len} source bands into {dst_len} destination bands"
        )));
    }
    if let Some(b) = source_bands.and_then(|s| s.iter().find(|&&b| b >= num_source_bands)) {
        return Err(Error::invalid(format!(
            "source band {b} out of range for {num_source_bands} bands"
        )));
    }
    if let Some(b) =
        destination_bands.and_then(|d| d.iter().find(|&&b| b >= num_destination_bands))
    {
        return Err(Error::invalid(format!(
            "destination band {b} out of range for {num_destination_bands} bands"
        )));
    }
    Ok(())
}
