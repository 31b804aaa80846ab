//! Images: a raster paired with the color model that interprets it.

use std::borrow::Cow;

use qoi::ColorSpace;

use crate::color::ColorModel;
use crate::error::{Error, Result};
use crate::raster::{DataBuffer, Raster, SampleModel};

/// A single raster and its color model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    raster: Raster,
    color_model: ColorModel,
}

impl RasterImage {
    /// Pair `raster` with `color_model`, rejecting combinations the model
    /// cannot interpret.
    pub fn new(raster: Raster, color_model: ColorModel) -> Result<Self> {
        if !color_model.is_compatible_raster(&raster) {
            return Err(Error::invalid(format!(
                "color model {color_model:?} cannot interpret a {}-band {:?} raster",
                raster.num_bands(),
                raster.sample_model()
            )));
        }
        Ok(Self {
            raster,
            color_model,
        })
    }

    pub fn width(&self) -> usize {
        self.raster.width()
    }

    pub fn height(&self) -> usize {
        self.raster.height()
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Mutable pixel access. The sample model cannot be changed through this,
    /// so the pairing with the color model stays valid.
    pub fn raster_mut(&mut self) -> &mut Raster {
        &mut self.raster
    }

    pub fn color_model(&self) -> &ColorModel {
        &self.color_model
    }

    pub fn into_parts(self) -> (Raster, ColorModel) {
        (self.raster, self.color_model)
    }
}

/// Common storage layouts, for allocating or wrapping image buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageType {
    /// `u32` words `0xAARRGGBB`.
    IntArgb,
    /// `u32` words `0xAARRGGBB`, color premultiplied by alpha.
    IntArgbPre,
    /// `u32` words `0x00RRGGBB`.
    IntRgb,
    /// `u32` words `0x00BBGGRR`.
    IntBgr,
    /// Bytes B, G, R per pixel.
    ThreeByteBgr,
    /// Bytes A, B, G, R per pixel.
    FourByteAbgr,
    /// One gray byte per pixel.
    ByteGray,
    /// Bytes R, G, B[, A] per pixel, the layout QOI decodes to.
    Interleaved {
        channels: qoi::Channels,
        space: ColorSpace,
    },
}

impl ImageType {
    /// Allocate a zero-filled image of this type.
    pub fn create(self, width: usize, height: usize) -> Result<RasterImage> {
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(self.elements_per_pixel()))
            .ok_or_else(|| Error::invalid("image size overflows"))?;
        let data = if self.is_int() {
            DataBuffer::Int(vec![0; len])
        } else {
            DataBuffer::Byte(vec![0; len])
        };
        self.wrap(width, height, data)
    }

    /// Wrap an existing buffer without copying. The buffer must be the
    /// right storage kind and hold at least `width * height` pixels.
    pub fn wrap(self, width: usize, height: usize, data: DataBuffer) -> Result<RasterImage> {
        if self.is_int() != matches!(data, DataBuffer::Int(_)) {
            return Err(Error::invalid(format!(
                "{self:?} needs {} storage",
                if self.is_int() { "u32" } else { "byte" }
            )));
        }
        let n = self.elements_per_pixel();
        let model = match self {
            Self::IntArgb | Self::IntArgbPre | Self::IntRgb | Self::IntBgr => {
                SampleModel::SinglePixelPacked {
                    scanline_stride: width,
                    masks: self.packed_masks(),
                }
            }
            Self::ThreeByteBgr => interleaved(width, n, vec![2, 1, 0]),
            Self::FourByteAbgr => interleaved(width, n, vec![3, 2, 1, 0]),
            Self::ByteGray => interleaved(width, n, vec![0]),
            Self::Interleaved { .. } => interleaved(width, n, (0..n).collect()),
        };
        let raster = Raster::new(width, height, model, data)?;
        RasterImage::new(raster, self.color_model())
    }

    pub fn color_model(self) -> ColorModel {
        match self {
            Self::IntArgb => ColorModel::argb(false),
            Self::IntArgbPre => ColorModel::argb(true),
            Self::IntRgb => ColorModel::xrgb(),
            Self::IntBgr => ColorModel::xbgr(),
            Self::ThreeByteBgr => ColorModel::rgb(ColorSpace::Srgb),
            Self::FourByteAbgr => ColorModel::rgba(ColorSpace::Srgb, false),
            Self::ByteGray => ColorModel::gray(),
            Self::Interleaved {
                channels: qoi::Channels::Rgb,
                space,
            } => ColorModel::rgb(space),
            Self::Interleaved {
                channels: qoi::Channels::Rgba,
                space,
            } => ColorModel::rgba(space, false),
        }
    }

    fn is_int(self) -> bool {
        matches!(
            self,
            Self::IntArgb | Self::IntArgbPre | Self::IntRgb | Self::IntBgr
        )
    }

    fn elements_per_pixel(self) -> usize {
        match self {
            Self::IntArgb | Self::IntArgbPre | Self::IntRgb | Self::IntBgr | Self::ByteGray => 1,
            Self::ThreeByteBgr => 3,
            Self::FourByteAbgr => 4,
            Self::Interleaved { channels, .. } => channels.as_u8() as usize,
        }
    }

    fn packed_masks(self) -> Vec<u32> {
        match self.color_model() {
            ColorModel::Packed {
                red_mask,
                green_mask,
                blue_mask,
                alpha_mask,
                ..
            } => {
                let mut masks = vec![red_mask, green_mask, blue_mask];
                if alpha_mask != 0 {
                    masks.push(alpha_mask);
                }
                masks
            }
            _ => Vec::new(),
        }
    }
}

fn interleaved(width: usize, pixel_stride: usize, band_offsets: Vec<usize>) -> SampleModel {
    SampleModel::PixelInterleaved {
        pixel_stride,
        scanline_stride: width * pixel_stride,
        band_offsets,
    }
}

/// Anything that can hand out its pixels as one raster.
pub trait RenderedImage {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn color_model(&self) -> &ColorModel;
    /// The whole image as a single raster, borrowed when the image already
    /// stores it that way.
    fn data(&self) -> Result<Cow<'_, Raster>>;
}

impl RenderedImage for RasterImage {
    fn width(&self) -> usize {
        self.raster.width()
    }

    fn height(&self) -> usize {
        self.raster.height()
    }

    fn color_model(&self) -> &ColorModel {
        &self.color_model
    }

    fn data(&self) -> Result<Cow<'_, Raster>> {
        Ok(Cow::Borrowed(&self.raster))
    }
}

/// An image split into equally sized tiles, stored row-major.
///
/// Edge tiles may extend past the image; only the covered part is used.
#[derive(Clone, Debug)]
pub struct TiledImage {
    width: usize,
    height: usize,
    tile_width: usize,
    tile_height: usize,
    tiles: Vec<Raster>,
    color_model: ColorModel,
}

impl TiledImage {
    pub fn new(
        width: usize,
        height: usize,
        tile_width: usize,
        tile_height: usize,
        tiles: Vec<Raster>,
        color_model: ColorModel,
    ) -> Result<Self> {
        if width == 0 || height == 0 || tile_width == 0 || tile_height == 0 {
            return Err(Error::invalid("image and tile dimensions must be positive"));
        }
        let expected = width.div_ceil(tile_width) * height.div_ceil(tile_height);
        if tiles.len() != expected {
            return Err(Error::invalid(format!(
                "expected {expected} tiles, got {}",
                tiles.len()
            )));
        }
        for tile in &tiles {
            if tile.width() != tile_width || tile.height() != tile_height {
                return Err(Error::invalid(format!(
                    "tile is {}x{}, expected {tile_width}x{tile_height}",
                    tile.width(),
                    tile.height()
                )));
            }
            if !color_model.is_compatible_raster(tile) {
                return Err(Error::invalid("tile is incompatible with the color model"));
            }
        }
        Ok(Self {
            width,
            height,
            tile_width,
            tile_height,
            tiles,
            color_model,
        })
    }

    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile(&self, tx: usize, ty: usize) -> Option<&Raster> {
        let across = self.width.div_ceil(self.tile_width);
        if tx >= across {
            return None;
        }
        self.tiles.get(ty * across + tx)
    }
}

impl RenderedImage for TiledImage {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn color_model(&self) -> &ColorModel {
        &self.color_model
    }

    fn data(&self) -> Result<Cow<'_, Raster>> {
        if let [tile] = self.tiles.as_slice()
            && tile.width() == self.width
            && tile.height() == self.height
        {
            return Ok(Cow::Borrowed(tile));
        }
        tracing::debug!(
            tiles = self.tiles.len(),
            width = self.width,
            height = self.height,
            "materializing tiled image"
        );
        let across = self.width.div_ceil(self.tile_width);
        let first = &self.tiles[0];
        let mut whole = first.compatible(self.width, self.height)?;
        for (i, tile) in self.tiles.iter().enumerate() {
            let x = (i % across) * self.tile_width;
            let y = (i / across) * self.tile_height;
            whole.copy_from(tile, x, y)?;
        }
        Ok(Cow::Owned(whole))
    }
}
