use qoi::ColorSpace;

use crate::color::ColorModel;
use crate::raster::{DataBuffer, Raster, SampleModel};

/// Storage layouts with a dedicated conversion to canonical bytes.
///
/// Everything without one is [`Generic`](Self::Generic) and goes through the
/// color model pixel by pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasterLayout {
    /// sRGB byte storage that already is canonical RGB.
    DirectByte3,
    /// sRGB byte storage that already is canonical RGBA.
    DirectByte4,
    /// `u32` words `0xAARRGGBB`.
    PackedIntArgb,
    /// `u32` words `0x00RRGGBB`.
    PackedIntRgb,
    /// `u32` words `0x00BBGGRR`.
    PackedIntBgr,
    /// Bytes B, G, R.
    ThreeByteBgr,
    /// Bytes A, B, G, R.
    FourByteAbgr,
    /// One sRGB gray byte.
    ByteGray,
    Generic,
}

const ARGB_MASKS: [u32; 4] = [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000];
const RGB_MASKS: [u32; 3] = [0x00FF_0000, 0x0000_FF00, 0x0000_00FF];
const BGR_MASKS: [u32; 3] = [0x0000_00FF, 0x0000_FF00, 0x00FF_0000];

impl RasterLayout {
    /// Pick the fastest conversion that is valid for `raster` under
    /// `color_model`.
    pub fn classify(raster: &Raster, color_model: &ColorModel) -> Self {
        if let Some(layout) = direct_byte(raster, color_model) {
            return layout;
        }
        if color_model.is_alpha_premultiplied() {
            return Self::Generic;
        }
        match (raster.sample_model(), raster.data(), color_model) {
            (
                SampleModel::SinglePixelPacked { masks, .. },
                DataBuffer::Int(_),
                ColorModel::Packed { .. },
            ) => {
                if masks[..] == ARGB_MASKS {
                    Self::PackedIntArgb
                } else if masks[..] == RGB_MASKS {
                    Self::PackedIntRgb
                } else if masks[..] == BGR_MASKS {
                    Self::PackedIntBgr
                } else {
                    Self::Generic
                }
            }
            (
                SampleModel::PixelInterleaved {
                    pixel_stride,
                    band_offsets,
                    ..
                },
                DataBuffer::Byte(_),
                ColorModel::Component {
                    space: ColorSpace::Srgb,
                    gray,
                    has_alpha,
                    bits: 8,
                    ..
                },
            ) => match (*gray, *has_alpha, *pixel_stride, band_offsets.as_slice()) {
                (false, false, 3, [2, 1, 0]) => Self::ThreeByteBgr,
                (false, true, 4, [3, 2, 1, 0]) => Self::FourByteAbgr,
                (true, false, 1, [0]) => Self::ByteGray,
                _ => Self::Generic,
            },
            _ => Self::Generic,
        }
    }
}

/// The zero-copy cases: sRGB byte storage starting at the buffer origin,
/// covering it exactly, with QOI's channel order and no row padding.
fn direct_byte(raster: &Raster, color_model: &ColorModel) -> Option<RasterLayout> {
    let ColorModel::Component {
        space: ColorSpace::Srgb,
        premultiplied: false,
        bits: 8,
        ..
    } = color_model
    else {
        return None;
    };
    let DataBuffer::Byte(buf) = raster.data() else {
        return None;
    };
    let SampleModel::PixelInterleaved {
        pixel_stride,
        scanline_stride,
        band_offsets,
    } = raster.sample_model()
    else {
        return None;
    };
    let (w, h) = (raster.width(), raster.height());
    let layout = match band_offsets.as_slice() {
        [0, 1, 2] => RasterLayout::DirectByte3,
        [0, 1, 2, 3] => RasterLayout::DirectByte4,
        _ => return None,
    };
    let n = band_offsets.len();
    let exact = raster.offset() == 0
        && *pixel_stride == n
        && *scanline_stride == n * w
        && buf.len() == w * h * n;
    exact.then_some(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageType;

    fn classify(img: &crate::RasterImage) -> RasterLayout {
        RasterLayout::classify(img.raster(), img.color_model())
    }

    #[test]
    fn image_types_map_to_layouts() {
        let cases = [
            (ImageType::IntArgb, RasterLayout::PackedIntArgb),
            (ImageType::IntArgbPre, RasterLayout::Generic),
            (ImageType::IntRgb, RasterLayout::PackedIntRgb),
            (ImageType::IntBgr, RasterLayout::PackedIntBgr),
            (ImageType::ThreeByteBgr, RasterLayout::ThreeByteBgr),
            (ImageType::FourByteAbgr, RasterLayout::FourByteAbgr),
            (ImageType::ByteGray, RasterLayout::ByteGray),
            (
                ImageType::Interleaved {
                    channels: qoi::Channels::Rgb,
                    space: ColorSpace::Srgb,
                },
                RasterLayout::DirectByte3,
            ),
            (
                ImageType::Interleaved {
                    channels: qoi::Channels::Rgba,
                    space: ColorSpace::Srgb,
                },
                RasterLayout::DirectByte4,
            ),
            (
                ImageType::Interleaved {
                    channels: qoi::Channels::Rgba,
                    space: ColorSpace::Linear,
                },
                RasterLayout::Generic,
            ),
        ];
        for (ty, expected) in cases {
            let img = ty.create(3, 2).unwrap();
            assert_eq!(classify(&img), expected, "{ty:?}");
        }
    }

    #[test]
    fn padded_rows_are_not_direct() {
        let raster = Raster::new(
            2,
            2,
            SampleModel::PixelInterleaved {
                pixel_stride: 3,
                scanline_stride: 8,
                band_offsets: vec![0, 1, 2],
            },
            DataBuffer::Byte(vec![0; 14]),
        )
        .unwrap();
        let cm = ColorModel::rgb(ColorSpace::Srgb);
        assert_eq!(RasterLayout::classify(&raster, &cm), RasterLayout::Generic);
    }

    #[test]
    fn oversized_buffer_is_not_direct() {
        let img = ImageType::Interleaved {
            channels: qoi::Channels::Rgb,
            space: ColorSpace::Srgb,
        }
        .wrap(1, 1, DataBuffer::Byte(vec![0; 4]))
        .unwrap();
        assert_eq!(classify(&img), RasterLayout::Generic);
    }

    #[test]
    fn premultiplied_rgba_is_generic() {
        let raster = Raster::interleaved(2, 1, 4).unwrap();
        let cm = ColorModel::rgba(ColorSpace::Srgb, true);
        assert_eq!(RasterLayout::classify(&raster, &cm), RasterLayout::Generic);
    }
}
