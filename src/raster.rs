//! Addressable pixel grids over byte or packed-word storage.
//!
//! A [`Raster`] owns a [`DataBuffer`] and a [`SampleModel`] that says where
//! each band's sample of pixel `(x, y)` lives. [`RasterView`] and
//! [`RasterViewMut`] are windows over a raster that restrict the visible
//! rectangle and reorder or subset the bands without copying.

use crate::error::{Error, Result};

// ===========================================================================
// Storage
// ===========================================================================

/// Backing storage of a raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataBuffer {
    /// One byte per element.
    Byte(Vec<u8>),
    /// One 32-bit word per element.
    Int(Vec<u32>),
}

impl DataBuffer {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(v) => v.len(),
            Self::Int(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width of one element in bits.
    pub fn element_bits(&self) -> u32 {
        match self {
            Self::Byte(_) => 8,
            Self::Int(_) => 32,
        }
    }

    #[inline]
    fn get(&self, i: usize) -> u32 {
        match self {
            Self::Byte(v) => v[i] as u32,
            Self::Int(v) => v[i],
        }
    }

    #[inline]
    fn set(&mut self, i: usize, value: u32) {
        match self {
            Self::Byte(v) => v[i] = value as u8,
            Self::Int(v) => v[i] = value,
        }
    }

    fn zeroed_like(&self, len: usize) -> Self {
        match self {
            Self::Byte(_) => Self::Byte(vec![0; len]),
            Self::Int(_) => Self::Int(vec![0; len]),
        }
    }
}

// ===========================================================================
// Sample models
// ===========================================================================

/// How samples are laid out in a [`DataBuffer`].
///
/// Strides and offsets are counted in buffer elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SampleModel {
    /// Every band in its own element, pixels `pixel_stride` elements apart.
    PixelInterleaved {
        pixel_stride: usize,
        scanline_stride: usize,
        band_offsets: Vec<usize>,
    },
    /// All bands of a pixel packed into one element; each band is selected
    /// by a contiguous bit mask.
    SinglePixelPacked {
        scanline_stride: usize,
        masks: Vec<u32>,
    },
    /// Several single-band pixels of `bits` bits packed into each element,
    /// leftmost pixel in the most significant bits.
    MultiPixelPacked { bits: u8, scanline_stride: usize },
}

impl SampleModel {
    pub fn num_bands(&self) -> usize {
        match self {
            Self::PixelInterleaved { band_offsets, .. } => band_offsets.len(),
            Self::SinglePixelPacked { masks, .. } => masks.len(),
            Self::MultiPixelPacked { .. } => 1,
        }
    }

    pub fn scanline_stride(&self) -> usize {
        match self {
            Self::PixelInterleaved {
                scanline_stride, ..
            }
            | Self::SinglePixelPacked {
                scanline_stride, ..
            }
            | Self::MultiPixelPacked {
                scanline_stride, ..
            } => *scanline_stride,
        }
    }
}

// ===========================================================================
// Raster
// ===========================================================================

/// A `width × height` pixel grid over owned storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    width: usize,
    height: usize,
    offset: usize,
    model: SampleModel,
    data: DataBuffer,
}

impl Raster {
    /// Build a raster, checking that the model addresses only elements the
    /// buffer actually holds.
    pub fn new(width: usize, height: usize, model: SampleModel, data: DataBuffer) -> Result<Self> {
        Self::with_offset(width, height, 0, model, data)
    }

    /// Like [`new`](Self::new), with pixel `(0, 0)` starting `offset` elements
    /// into the buffer.
    pub fn with_offset(
        width: usize,
        height: usize,
        offset: usize,
        model: SampleModel,
        data: DataBuffer,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!(
                "raster dimensions must be positive, got {width}x{height}"
            )));
        }
        validate_model(width, &model, &data)?;
        let required = required_len(width, height, &model, &data)
            .and_then(|n| n.checked_add(offset))
            .ok_or_else(|| Error::invalid("raster size overflows"))?;
        if data.len() < required {
            return Err(Error::invalid(format!(
                "buffer holds {} elements, raster needs {required}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            offset,
            model,
            data,
        })
    }

    /// Zero-filled pixel-interleaved byte raster with band offsets
    /// `0..bands`, pixel stride `bands` and no row padding.
    pub fn interleaved(width: usize, height: usize, bands: usize) -> Result<Self> {
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(bands))
            .ok_or_else(|| Error::invalid("raster size overflows"))?;
        Self::new(
            width,
            height,
            SampleModel::PixelInterleaved {
                pixel_stride: bands,
                scanline_stride: width * bands,
                band_offsets: (0..bands).collect(),
            },
            DataBuffer::Byte(vec![0; len]),
        )
    }

    /// Packed-word raster, one `u32` per pixel, no row padding.
    pub fn packed(width: usize, height: usize, masks: Vec<u32>, data: Vec<u32>) -> Result<Self> {
        Self::new(
            width,
            height,
            SampleModel::SinglePixelPacked {
                scanline_stride: width,
                masks,
            },
            DataBuffer::Int(data),
        )
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Element offset of pixel `(0, 0)`.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn sample_model(&self) -> &SampleModel {
        &self.model
    }

    pub fn data(&self) -> &DataBuffer {
        &self.data
    }

    pub fn into_data(self) -> DataBuffer {
        self.data
    }

    pub fn num_bands(&self) -> usize {
        self.model.num_bands()
    }

    /// Bits per sample of `band`.
    pub fn sample_size(&self, band: usize) -> u32 {
        match &self.model {
            SampleModel::PixelInterleaved { .. } => self.data.element_bits(),
            SampleModel::SinglePixelPacked { masks, .. } => masks[band].count_ones(),
            SampleModel::MultiPixelPacked { bits, .. } => *bits as u32,
        }
    }

    /// Sample sizes of every band.
    pub fn sample_sizes(&self) -> Vec<u32> {
        (0..self.num_bands()).map(|b| self.sample_size(b)).collect()
    }

    #[inline]
    fn pixel_index(&self, x: usize, y: usize) -> usize {
        let row = self.offset + y * self.model.scanline_stride();
        match &self.model {
            SampleModel::PixelInterleaved { pixel_stride, .. } => row + x * pixel_stride,
            SampleModel::SinglePixelPacked { .. } => row + x,
            SampleModel::MultiPixelPacked { bits, .. } => {
                row + x * *bits as usize / self.data.element_bits() as usize
            }
        }
    }

    /// Shift of pixel `x` inside its element for multi-pixel packing.
    #[inline]
    fn packed_shift(&self, x: usize, bits: u8) -> u32 {
        let per_element = self.data.element_bits() as usize / bits as usize;
        ((per_element - 1 - x % per_element) * bits as usize) as u32
    }

    /// Sample of `band` at `(x, y)`. Panics if out of bounds.
    pub fn get_sample(&self, x: usize, y: usize, band: usize) -> u32 {
        debug_assert!(x < self.width && y < self.height);
        let i = self.pixel_index(x, y);
        match &self.model {
            SampleModel::PixelInterleaved { band_offsets, .. } => {
                self.data.get(i + band_offsets[band])
            }
            SampleModel::SinglePixelPacked { masks, .. } => {
                let mask = masks[band];
                (self.data.get(i) & mask) >> mask.trailing_zeros()
            }
            SampleModel::MultiPixelPacked { bits, .. } => {
                let shift = self.packed_shift(x, *bits);
                (self.data.get(i) >> shift) & low_mask(*bits as u32)
            }
        }
    }

    /// Store `value` into `band` at `(x, y)`, truncated to the sample size.
    pub fn set_sample(&mut self, x: usize, y: usize, band: usize, value: u32) {
        debug_assert!(x < self.width && y < self.height);
        let i = self.pixel_index(x, y);
        match &self.model {
            SampleModel::PixelInterleaved { band_offsets, .. } => {
                let j = i + band_offsets[band];
                self.data.set(j, value);
            }
            SampleModel::SinglePixelPacked { masks, .. } => {
                let mask = masks[band];
                let old = self.data.get(i);
                let new = (old & !mask) | ((value << mask.trailing_zeros()) & mask);
                self.data.set(i, new);
            }
            SampleModel::MultiPixelPacked { bits, .. } => {
                let shift = self.packed_shift(x, *bits);
                let mask = low_mask(*bits as u32) << shift;
                let old = self.data.get(i);
                self.data.set(i, (old & !mask) | ((value << shift) & mask));
            }
        }
    }

    /// All band samples of `(x, y)` into `out[..num_bands]`.
    pub fn get_pixel(&self, x: usize, y: usize, out: &mut [u32]) {
        for (band, v) in out.iter_mut().enumerate().take(self.num_bands()) {
            *v = self.get_sample(x, y, band);
        }
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, samples: &[u32]) {
        for (band, &v) in samples.iter().enumerate().take(self.num_bands()) {
            self.set_sample(x, y, band, v);
        }
    }

    /// The raw storage elements that make up pixel `(x, y)`, the form a
    /// [`ColorModel`](crate::ColorModel) resolves to a color: one sample per
    /// band for interleaved storage, the whole packed word for packed
    /// storage, and the pixel value for multi-pixel storage.
    pub fn pixel_elements(&self, x: usize, y: usize, out: &mut Vec<u32>) {
        out.clear();
        match &self.model {
            SampleModel::PixelInterleaved { .. } => {
                out.extend((0..self.num_bands()).map(|b| self.get_sample(x, y, b)));
            }
            SampleModel::SinglePixelPacked { .. } => {
                out.push(self.data.get(self.pixel_index(x, y)))
            }
            SampleModel::MultiPixelPacked { .. } => out.push(self.get_sample(x, y, 0)),
        }
    }

    /// A zero-filled raster of the same storage kind and band layout at new
    /// dimensions.
    pub fn compatible(&self, width: usize, height: usize) -> Result<Self> {
        let model = match &self.model {
            SampleModel::PixelInterleaved {
                pixel_stride,
                band_offsets,
                ..
            } => SampleModel::PixelInterleaved {
                pixel_stride: *pixel_stride,
                scanline_stride: width * pixel_stride,
                band_offsets: band_offsets.clone(),
            },
            SampleModel::SinglePixelPacked { masks, .. } => SampleModel::SinglePixelPacked {
                scanline_stride: width,
                masks: masks.clone(),
            },
            SampleModel::MultiPixelPacked { bits, .. } => {
                let element_bits = self.data.element_bits() as usize;
                SampleModel::MultiPixelPacked {
                    bits: *bits,
                    scanline_stride: (width * *bits as usize).div_ceil(element_bits),
                }
            }
        };
        let len = required_len(width, height, &model, &self.data)
            .ok_or_else(|| Error::invalid("raster size overflows"))?;
        let data = self.data.zeroed_like(len);
        Self::new(width, height, model, data)
    }

    /// Copy every pixel of `src` into this raster with its top-left corner at
    /// `(x, y)`. Both rasters must have the same band count.
    pub fn copy_from(&mut self, src: &Raster, x: usize, y: usize) -> Result<()> {
        if src.num_bands() != self.num_bands() {
            return Err(Error::invalid("band count mismatch"));
        }
        let w = src.width.min(self.width.saturating_sub(x));
        let h = src.height.min(self.height.saturating_sub(y));
        let mut px = vec![0u32; src.num_bands()];
        for sy in 0..h {
            for sx in 0..w {
                src.get_pixel(sx, sy, &mut px);
                self.set_pixel(x + sx, y + sy, &px);
            }
        }
        Ok(())
    }
}

#[inline]
fn low_mask(bits: u32) -> u32 {
    if bits >= 32 { u32::MAX } else { (1 << bits) - 1 }
}

fn validate_model(width: usize, model: &SampleModel, data: &DataBuffer) -> Result<()> {
    match model {
        SampleModel::PixelInterleaved {
            pixel_stride,
            scanline_stride,
            band_offsets,
        } => {
            if band_offsets.is_empty() {
                return Err(Error::invalid("interleaved raster needs at least one band"));
            }
            if *pixel_stride == 0 {
                return Err(Error::invalid("pixel stride must be positive"));
            }
            if width > 1 && *scanline_stride < (width - 1) * pixel_stride + 1 {
                return Err(Error::invalid("scanline stride shorter than a row"));
            }
        }
        SampleModel::SinglePixelPacked {
            scanline_stride,
            masks,
        } => {
            if masks.is_empty() {
                return Err(Error::invalid("packed raster needs at least one band"));
            }
            let element_bits = data.element_bits();
            for &m in masks {
                let run = m.checked_shr(m.trailing_zeros()).unwrap_or(0);
                let contiguous = m != 0 && run & run.wrapping_add(1) == 0;
                if !contiguous || 32 - m.leading_zeros() > element_bits {
                    return Err(Error::invalid(format!("invalid band mask {m:#x}")));
                }
            }
            if *scanline_stride < width {
                return Err(Error::invalid("scanline stride shorter than a row"));
            }
        }
        SampleModel::MultiPixelPacked {
            bits,
            scanline_stride,
        } => {
            let element_bits = data.element_bits();
            if !matches!(bits, 1 | 2 | 4 | 8) || *bits as u32 > element_bits {
                return Err(Error::invalid(format!("unsupported pixel bit depth {bits}")));
            }
            let row = (width * *bits as usize).div_ceil(element_bits as usize);
            if *scanline_stride < row {
                return Err(Error::invalid("scanline stride shorter than a row"));
            }
        }
    }
    Ok(())
}

/// Elements needed to hold the last addressed sample, or `None` on overflow.
fn required_len(
    width: usize,
    height: usize,
    model: &SampleModel,
    data: &DataBuffer,
) -> Option<usize> {
    let last_row = (height - 1).checked_mul(model.scanline_stride())?;
    let row_len = match model {
        SampleModel::PixelInterleaved {
            pixel_stride,
            band_offsets,
            ..
        } => {
            let max_offset = band_offsets.iter().copied().max().unwrap_or(0);
            (width - 1).checked_mul(*pixel_stride)?.checked_add(max_offset)? + 1
        }
        SampleModel::SinglePixelPacked { .. } => width,
        SampleModel::MultiPixelPacked { bits, .. } => {
            (width.checked_mul(*bits as usize)?).div_ceil(data.element_bits() as usize)
        }
    };
    last_row.checked_add(row_len)
}

// ===========================================================================
// Views
// ===========================================================================

#[derive(Clone, Debug)]
struct Window {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    bands: Vec<usize>,
}

impl Window {
    fn full(raster: &Raster) -> Self {
        Self {
            x: 0,
            y: 0,
            width: raster.width,
            height: raster.height,
            bands: (0..raster.num_bands()).collect(),
        }
    }

    /// Sub-window in this window's coordinates. Band indices refer to this
    /// window's bands.
    fn child(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        bands: Option<&[usize]>,
    ) -> Result<Self> {
        let fits = x.checked_add(width).is_some_and(|r| r <= self.width)
            && y.checked_add(height).is_some_and(|b| b <= self.height);
        if !fits {
            return Err(Error::invalid(format!(
                "child rectangle {x},{y} {width}x{height} outside {}x{}",
                self.width, self.height
            )));
        }
        let bands = match bands {
            None => self.bands.clone(),
            Some(list) => list
                .iter()
                .map(|&b| {
                    self.bands
                        .get(b)
                        .copied()
                        .ok_or_else(|| Error::invalid(format!("band {b} out of range")))
                })
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(Self {
            x: self.x + x,
            y: self.y + y,
            width,
            height,
            bands,
        })
    }
}

/// Read-only window over a [`Raster`]. Coordinates start at `(0, 0)` at the
/// window's top-left corner.
#[derive(Clone, Debug)]
pub struct RasterView<'a> {
    raster: &'a Raster,
    window: Window,
}

impl<'a> RasterView<'a> {
    pub fn new(raster: &'a Raster) -> Self {
        Self {
            raster,
            window: Window::full(raster),
        }
    }

    /// A narrower view over the same storage. `bands` picks and orders
    /// this view's bands; `None` keeps them all.
    pub fn child(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        bands: Option<&[usize]>,
    ) -> Result<RasterView<'a>> {
        Ok(RasterView {
            raster: self.raster,
            window: self.window.child(x, y, width, height, bands)?,
        })
    }

    pub fn width(&self) -> usize {
        self.window.width
    }

    pub fn height(&self) -> usize {
        self.window.height
    }

    pub fn num_bands(&self) -> usize {
        self.window.bands.len()
    }

    pub fn sample_size(&self, band: usize) -> u32 {
        self.raster.sample_size(self.window.bands[band])
    }

    pub fn get_sample(&self, x: usize, y: usize, band: usize) -> u32 {
        self.raster
            .get_sample(self.window.x + x, self.window.y + y, self.window.bands[band])
    }

    pub fn get_pixel(&self, x: usize, y: usize, out: &mut [u32]) {
        for (band, v) in out.iter_mut().enumerate().take(self.num_bands()) {
            *v = self.get_sample(x, y, band);
        }
    }
}

/// Writable window over a [`Raster`].
#[derive(Debug)]
pub struct RasterViewMut<'a> {
    raster: &'a mut Raster,
    window: Window,
}

impl<'a> RasterViewMut<'a> {
    pub fn new(raster: &'a mut Raster) -> Self {
        let window = Window::full(raster);
        Self { raster, window }
    }

    /// Narrow this view. Consumes `self` so only one writable view of the
    /// storage is live at a time.
    pub fn child(
        self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        bands: Option<&[usize]>,
    ) -> Result<RasterViewMut<'a>> {
        let window = self.window.child(x, y, width, height, bands)?;
        Ok(RasterViewMut {
            raster: self.raster,
            window,
        })
    }

    pub fn width(&self) -> usize {
        self.window.width
    }

    pub fn height(&self) -> usize {
        self.window.height
    }

    pub fn num_bands(&self) -> usize {
        self.window.bands.len()
    }

    pub fn sample_size(&self, band: usize) -> u32 {
        self.raster.sample_size(self.window.bands[band])
    }

    pub fn get_sample(&self, x: usize, y: usize, band: usize) -> u32 {
        self.raster
            .get_sample(self.window.x + x, self.window.y + y, self.window.bands[band])
    }

    pub fn set_sample(&mut self, x: usize, y: usize, band: usize, value: u32) {
        let b = self.window.bands[band];
        self.raster
            .set_sample(self.window.x + x, self.window.y + y, b, value);
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, samples: &[u32]) {
        for (band, &v) in samples.iter().enumerate().take(self.num_bands()) {
            self.set_sample(x, y, band, v);
        }
    }
}
