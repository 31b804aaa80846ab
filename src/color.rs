//! Mapping raw pixel elements to 8-bit sRGB[A].

use linear_srgb::linear_to_srgb_u8;
use qoi::ColorSpace;
use rgb::Rgba;

use crate::raster::{Raster, SampleModel};

/// How much of the alpha range a color model can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transparency {
    /// Every pixel is fully opaque.
    Opaque,
    /// Pixels are either fully opaque or fully transparent.
    Bitmask,
    /// Arbitrary alpha.
    Translucent,
}

/// Interpretation of a raster's pixel elements as colors.
///
/// The element form each variant expects is the one produced by
/// [`Raster::pixel_elements`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorModel {
    /// One sample per component: gray, gray+alpha, RGB or RGBA.
    Component {
        space: ColorSpace,
        gray: bool,
        has_alpha: bool,
        premultiplied: bool,
        /// Significant bits per component, 1 to 8.
        bits: u8,
    },
    /// Components packed into a single element, selected by masks.
    /// `alpha_mask == 0` means no alpha.
    Packed {
        red_mask: u32,
        green_mask: u32,
        blue_mask: u32,
        alpha_mask: u32,
        premultiplied: bool,
    },
    /// Palette lookup. Indices past the end of the palette are transparent
    /// black.
    Indexed { palette: Vec<Rgba<u8>>, bits: u8 },
}

impl ColorModel {
    /// 8-bit RGB in `space`.
    pub fn rgb(space: ColorSpace) -> Self {
        Self::Component {
            space,
            gray: false,
            has_alpha: false,
            premultiplied: false,
            bits: 8,
        }
    }

    /// 8-bit RGBA in `space`.
    pub fn rgba(space: ColorSpace, premultiplied: bool) -> Self {
        Self::Component {
            space,
            gray: false,
            has_alpha: true,
            premultiplied,
            bits: 8,
        }
    }

    /// 8-bit sRGB gray.
    pub fn gray() -> Self {
        Self::Component {
            space: ColorSpace::Srgb,
            gray: true,
            has_alpha: false,
            premultiplied: false,
            bits: 8,
        }
    }

    /// 8-bit sRGB gray with alpha.
    pub fn gray_alpha() -> Self {
        Self::Component {
            space: ColorSpace::Srgb,
            gray: true,
            has_alpha: true,
            premultiplied: false,
            bits: 8,
        }
    }

    /// Packed `0xAARRGGBB`.
    pub fn argb(premultiplied: bool) -> Self {
        Self::Packed {
            red_mask: 0x00FF_0000,
            green_mask: 0x0000_FF00,
            blue_mask: 0x0000_00FF,
            alpha_mask: 0xFF00_0000,
            premultiplied,
        }
    }

    /// Packed `0x00RRGGBB`.
    pub fn xrgb() -> Self {
        Self::Packed {
            red_mask: 0x00FF_0000,
            green_mask: 0x0000_FF00,
            blue_mask: 0x0000_00FF,
            alpha_mask: 0,
            premultiplied: false,
        }
    }

    /// Packed `0x00BBGGRR`.
    pub fn xbgr() -> Self {
        Self::Packed {
            red_mask: 0x0000_00FF,
            green_mask: 0x0000_FF00,
            blue_mask: 0x00FF_0000,
            alpha_mask: 0,
            premultiplied: false,
        }
    }

    pub fn transparency(&self) -> Transparency {
        match self {
            Self::Component { has_alpha, .. } => {
                if *has_alpha {
                    Transparency::Translucent
                } else {
                    Transparency::Opaque
                }
            }
            Self::Packed { alpha_mask, .. } => match alpha_mask.count_ones() {
                0 => Transparency::Opaque,
                1 => Transparency::Bitmask,
                _ => Transparency::Translucent,
            },
            Self::Indexed { palette, .. } => {
                if palette.iter().all(|c| c.a == 255) {
                    Transparency::Opaque
                } else if palette.iter().all(|c| c.a == 0 || c.a == 255) {
                    Transparency::Bitmask
                } else {
                    Transparency::Translucent
                }
            }
        }
    }

    pub fn has_alpha(&self) -> bool {
        self.transparency() != Transparency::Opaque
    }

    /// QOI channel count for images in this model: 4 unless opaque.
    pub fn channels(&self) -> qoi::Channels {
        if self.has_alpha() {
            qoi::Channels::Rgba
        } else {
            qoi::Channels::Rgb
        }
    }

    pub fn is_alpha_premultiplied(&self) -> bool {
        match self {
            Self::Component { premultiplied, .. } | Self::Packed { premultiplied, .. } => {
                *premultiplied
            }
            Self::Indexed { .. } => false,
        }
    }

    /// Number of samples per pixel this model expects from a raster.
    pub fn num_components(&self) -> usize {
        match self {
            Self::Component { gray, has_alpha, .. } => {
                (if *gray { 1 } else { 3 }) + *has_alpha as usize
            }
            Self::Packed { alpha_mask, .. } => 3 + (*alpha_mask != 0) as usize,
            Self::Indexed { .. } => 1,
        }
    }

    /// Whether pixels of `raster` can be interpreted by this model.
    pub fn is_compatible_raster(&self, raster: &Raster) -> bool {
        match (self, raster.sample_model()) {
            (Self::Component { bits, .. }, SampleModel::PixelInterleaved { .. }) => {
                (1..=8).contains(bits)
                    && raster.num_bands() == self.num_components()
                    && raster.sample_sizes().iter().all(|&s| s >= *bits as u32)
            }
            (
                Self::Packed {
                    red_mask,
                    green_mask,
                    blue_mask,
                    alpha_mask,
                    ..
                },
                SampleModel::SinglePixelPacked { masks, .. },
            ) => {
                let mut expected = vec![*red_mask, *green_mask, *blue_mask];
                if *alpha_mask != 0 {
                    expected.push(*alpha_mask);
                }
                *masks == expected
            }
            (Self::Indexed { bits, .. }, _) => {
                (1..=8).contains(bits)
                    && raster.num_bands() == 1
                    && raster.sample_size(0) >= *bits as u32
            }
            _ => false,
        }
    }

    /// Resolve the raw elements of one pixel to non-premultiplied 8-bit sRGB.
    /// Opaque models report alpha 255.
    pub fn to_rgba(&self, elements: &[u32]) -> Rgba<u8> {
        match self {
            Self::Component {
                space,
                gray,
                has_alpha,
                premultiplied,
                bits,
            } => {
                let max = low_mask(*bits as u32);
                let c = |i: usize| scale_to_u8(elements[i] & max, *bits as u32);
                let (r, g, b) = if *gray {
                    let v = c(0);
                    (v, v, v)
                } else {
                    (c(0), c(1), c(2))
                };
                let a = if *has_alpha {
                    c(if *gray { 1 } else { 3 })
                } else {
                    255
                };
                let px = if *premultiplied {
                    unpremultiply(Rgba::new(r, g, b, a))
                } else {
                    Rgba::new(r, g, b, a)
                };
                match space {
                    ColorSpace::Srgb => px,
                    ColorSpace::Linear => Rgba::new(
                        encode_srgb(px.r),
                        encode_srgb(px.g),
                        encode_srgb(px.b),
                        px.a,
                    ),
                }
            }
            Self::Packed {
                red_mask,
                green_mask,
                blue_mask,
                alpha_mask,
                premultiplied,
            } => {
                let word = elements[0];
                let r = extract(word, *red_mask);
                let g = extract(word, *green_mask);
                let b = extract(word, *blue_mask);
                let a = if *alpha_mask == 0 {
                    255
                } else {
                    extract(word, *alpha_mask)
                };
                if *premultiplied {
                    unpremultiply(Rgba::new(r, g, b, a))
                } else {
                    Rgba::new(r, g, b, a)
                }
            }
            Self::Indexed { palette, .. } => palette
                .get(elements[0] as usize)
                .copied()
                .unwrap_or(Rgba::new(0, 0, 0, 0)),
        }
    }
}

#[inline]
fn low_mask(bits: u32) -> u32 {
    if bits >= 32 { u32::MAX } else { (1 << bits) - 1 }
}

/// Rescale a `bits`-wide value to 0..=255, rounding to nearest.
#[inline]
fn scale_to_u8(v: u32, bits: u32) -> u8 {
    if bits == 8 {
        return v as u8;
    }
    let max = low_mask(bits) as u64;
    ((v as u64 * 255 + max / 2) / max) as u8
}

#[inline]
fn extract(word: u32, mask: u32) -> u8 {
    let v = (word & mask) >> mask.trailing_zeros();
    scale_to_u8(v, mask.count_ones())
}

fn unpremultiply(px: Rgba<u8>) -> Rgba<u8> {
    if px.a == 0 {
        return Rgba::new(0, 0, 0, 0);
    }
    let a = px.a as u32;
    let f = |c: u8| ((c as u32 * 255 + a / 2) / a).min(255) as u8;
    Rgba::new(f(px.r), f(px.g), f(px.b), px.a)
}

/// Gamma-encode one linear 8-bit component.
#[inline]
fn encode_srgb(linear: u8) -> u8 {
    linear_to_srgb_u8(linear as f32 / 255.0)
}
