//! Writing rasters as QOI streams.

use std::io::Write;

use enough::{Stop, Unstoppable};
use qoi::{Channels, ColorSpace};
use tracing::{debug, trace};

use crate::canonical::CanonicalImage;
use crate::convert;
use crate::error::{Error, Result};
use crate::format;
use crate::image::RenderedImage;
use crate::param::WriteParams;
use crate::progress::{Completion, Monitor, Session};
use crate::raster::RasterView;

/// QOI writer over a byte sink.
///
/// ```
/// use qoi_raster::{ImageType, QoiWriter, WriteParams, probe};
///
/// let img = ImageType::IntArgb.create(4, 4)?;
/// let mut writer = QoiWriter::new(Vec::new());
/// writer.write(&img, &WriteParams::default())?;
/// assert!(probe(writer.get_ref()));
/// # Ok::<(), qoi_raster::Error>(())
/// ```
pub struct QoiWriter<W> {
    output: W,
}

impl<W: Write> QoiWriter<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    /// Encode `image` with `params`, without progress reporting.
    pub fn write<I: RenderedImage + ?Sized>(
        &mut self,
        image: &I,
        params: &WriteParams,
    ) -> Result<()> {
        self.write_with(image, params, &mut (), &Unstoppable).map(|_| ())
    }

    /// Encode `image` with `params`, reporting to `monitor`.
    ///
    /// `stop` is polled after every output row and is not reset first. An
    /// aborted write leaves the sink untouched.
    pub fn write_with<I: RenderedImage + ?Sized, M: Monitor + ?Sized>(
        &mut self,
        image: &I,
        params: &WriteParams,
        monitor: &mut M,
        stop: &dyn Stop,
    ) -> Result<Completion> {
        let mut session = Session::start(monitor, stop, "write");
        match self.write_inner(image, params, &mut session) {
            Ok(Completion::Completed) => Ok(session.complete()),
            Ok(Completion::Aborted) => Ok(session.abort()),
            Err(e) => Err(session.fail(e)),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.output
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_inner(self) -> W {
        self.output
    }

    fn write_inner<I: RenderedImage + ?Sized, M: Monitor + ?Sized>(
        &mut self,
        image: &I,
        params: &WriteParams,
        session: &mut Session<'_, M>,
    ) -> Result<Completion> {
        params.validate()?;
        let raster = image.data()?;

        if params.is_default() {
            let canonical = convert::to_canonical(&raster, image.color_model())?;
            format::encode(&canonical, &mut self.output)?;
            return Ok(Completion::Completed);
        }

        let region = params.effective_region(image.width(), image.height());
        if region.is_empty() {
            return Err(Error::invalid(format!(
                "source region {region:?} leaves nothing to write"
            )));
        }

        let native = raster.num_bands();
        let bands = params.source_bands.as_deref();
        let count = bands.map_or(native, <[usize]>::len);
        if !matches!(count, 3 | 4) {
            return Err(Error::unsupported(format!(
                "cannot write {count} bands, QOI holds 3 or 4"
            )));
        }
        if let Some(b) = bands.and_then(|list| list.iter().find(|&&b| b >= native)) {
            return Err(Error::invalid(format!(
                "source band {b} out of range for {native} bands"
            )));
        }

        let view = RasterView::new(&raster).child(
            region.x as usize,
            region.y as usize,
            region.width as usize,
            region.height as usize,
            bands,
        )?;
        if let Some(b) = (0..count).find(|&b| view.sample_size(b) > 8) {
            return Err(Error::unsupported(format!(
                "band {b} is {} bits wide, QOI holds 8",
                view.sample_size(b)
            )));
        }

        let (sx, sy) = (params.subsampling.x as usize, params.subsampling.y as usize);
        let out_w = view.width().div_ceil(sx);
        let out_h = view.height().div_ceil(sy);
        debug!(?region, out_w, out_h, bands = count, "writing region");

        let mut pixels = vec![0u8; out_w * out_h * count];
        let mut px = vec![0u32; count];
        for (oy, row) in pixels.chunks_exact_mut(out_w * count).enumerate() {
            for (ox, out) in row.chunks_exact_mut(count).enumerate() {
                view.get_pixel(ox * sx, oy * sy, &mut px);
                for (d, &s) in out.iter_mut().zip(&px) {
                    *d = s as u8;
                }
            }
            session.progress(oy as f32 * 100.0 / out_h as f32);
            if session.abort_requested() {
                trace!(row = oy, "abort requested, nothing written");
                return Ok(Completion::Aborted);
            }
        }

        let channels = if count == 4 { Channels::Rgba } else { Channels::Rgb };
        let canonical = CanonicalImage::new(
            u32::try_from(out_w).map_err(|_| Error::invalid("output too wide for QOI"))?,
            u32::try_from(out_h).map_err(|_| Error::invalid("output too tall for QOI"))?,
            channels,
            ColorSpace::Srgb,
            pixels,
        )?;
        format::encode(&canonical, &mut self.output)?;
        Ok(Completion::Completed)
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::color::ColorModel;
    use crate::image::{ImageType, RasterImage, TiledImage};
    use crate::limits::Limits;
    use crate::param::Rect;
    use crate::progress::tests::{Recorder, StopAfter};
    use crate::raster::Raster;

    /// Raster with no color-model pairing checks.
    struct Bare(Raster, ColorModel);

    impl RenderedImage for Bare {
        fn width(&self) -> usize {
            self.0.width()
        }
        fn height(&self) -> usize {
            self.0.height()
        }
        fn color_model(&self) -> &ColorModel {
            &self.1
        }
        fn data(&self) -> Result<Cow<'_, Raster>> {
            Ok(Cow::Borrowed(&self.0))
        }
    }

    /// 4×2 RGBA image where pixel (x, y) is `[x, y, 10 + x, 20 + y]`.
    fn rgba_4x2() -> RasterImage {
        let mut img = ImageType::Interleaved {
            channels: Channels::Rgba,
            space: ColorSpace::Srgb,
        }
        .create(4, 2)
        .unwrap();
        for y in 0..2 {
            for x in 0..4 {
                let v = [x as u32, y as u32, 10 + x as u32, 20 + y as u32];
                img.raster_mut().set_pixel(x, y, &v);
            }
        }
        img
    }

    fn write(
        image: &dyn RenderedImage,
        params: &WriteParams,
    ) -> Result<CanonicalImage<'static>> {
        let mut writer = QoiWriter::new(Vec::new());
        writer.write(image, params)?;
        format::decode(&writer.into_inner()[..], &Limits::default())
    }

    #[test]
    fn fast_path_keeps_pixels() {
        let out = write(&rgba_4x2(), &WriteParams::default()).unwrap();
        assert_eq!((out.width(), out.height()), (4, 2));
        assert_eq!(&out.pixels()[4..8], &[1, 0, 11, 20]);
    }

    #[test]
    fn subsampled_columns() {
        let out = write(&rgba_4x2(), &WriteParams::new().with_subsampling(2, 1)).unwrap();
        assert_eq!((out.width(), out.height()), (2, 2));
        assert_eq!(
            out.pixels(),
            &[0, 0, 10, 20, 2, 0, 12, 20, 0, 1, 10, 21, 2, 1, 12, 21]
        );
    }

    #[test]
    fn region_offset_and_bands() {
        let params = WriteParams::new()
            .with_source_region(Rect::new(1, -4, 10, 10))
            .with_subsampling(2, 2)
            .with_subsampling_offset(1, 1)
            .with_source_bands([2, 1, 0]);
        let out = write(&rgba_4x2(), &params).unwrap();
        assert_eq!(out.channels(), Channels::Rgb);
        assert_eq!((out.width(), out.height()), (1, 1));
        assert_eq!(out.pixels(), &[12, 1, 2]);
    }

    #[test]
    fn ceil_output_size() {
        let out = write(&rgba_4x2(), &WriteParams::new().with_subsampling(3, 3)).unwrap();
        assert_eq!((out.width(), out.height()), (2, 1));
        assert_eq!(out.pixels(), &[0, 0, 10, 20, 3, 0, 13, 20]);
    }

    #[test]
    fn band_count_errors() {
        let img = rgba_4x2();
        let two = WriteParams::new().with_source_bands([0, 1]);
        assert!(matches!(write(&img, &two), Err(Error::UnsupportedLayout(_))));
        let out_of_range = WriteParams::new().with_source_bands([0, 1, 7]);
        assert!(matches!(write(&img, &out_of_range), Err(Error::InvalidArgument(_))));

        let five = Bare(
            Raster::interleaved(2, 2, 5).unwrap(),
            ColorModel::rgb(ColorSpace::Srgb),
        );
        let sub = WriteParams::new().with_subsampling(2, 1);
        assert!(matches!(write(&five, &sub), Err(Error::UnsupportedLayout(_))));
    }

    #[test]
    fn wide_bands_rejected() {
        let (r, g, b) = (0x3FF0_0000, 0x000F_FC00, 0x0000_03FF);
        let raster = Raster::packed(2, 1, vec![r, g, b], vec![0; 2]).unwrap();
        let cm = ColorModel::Packed {
            red_mask: r,
            green_mask: g,
            blue_mask: b,
            alpha_mask: 0,
            premultiplied: false,
        };
        let img = RasterImage::new(raster, cm).unwrap();
        let params = WriteParams::new().with_source_region(Rect::new(0, 0, 1, 1));
        assert!(matches!(write(&img, &params), Err(Error::UnsupportedLayout(_))));
    }

    #[test]
    fn empty_region_is_an_error() {
        let params = WriteParams::new().with_source_region(Rect::new(10, 10, 5, 5));
        let mut rec = Recorder::default();
        let mut writer = QoiWriter::new(Vec::new());
        let err = writer
            .write_with(&rgba_4x2(), &params, &mut rec, &Unstoppable)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(rec.events, ["started", "failed"]);
    }

    #[test]
    fn abort_writes_nothing() {
        let mut rec = Recorder::default();
        let params = WriteParams::new().with_source_bands([0, 1, 2]);
        let mut writer = QoiWriter::new(Vec::new());
        let done = writer
            .write_with(&rgba_4x2(), &params, &mut rec, &StopAfter::new(1))
            .unwrap();
        assert_eq!(done, Completion::Aborted);
        assert_eq!(rec.events, ["started", "progress 0", "aborted"]);
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn progress_per_output_row() {
        let mut rec = Recorder::default();
        let mut writer = QoiWriter::new(Vec::new());
        let params = WriteParams::new().with_subsampling(2, 1);
        let done = writer
            .write_with(&rgba_4x2(), &params, &mut rec, &Unstoppable)
            .unwrap();
        assert_eq!(done, Completion::Completed);
        assert_eq!(rec.events, ["started", "progress 0", "progress 50", "completed"]);
    }

    #[test]
    fn tiled_image() {
        let mut tiles = Vec::new();
        for t in 0..2u8 {
            let mut tile = Raster::interleaved(2, 1, 3).unwrap();
            for x in 0..2 {
                tile.set_pixel(x, 0, &[(t * 2 + x as u8) as u32, 0, 0]);
            }
            tiles.push(tile);
        }
        let cm = ColorModel::rgb(ColorSpace::Srgb);
        let img = TiledImage::new(3, 1, 2, 1, tiles, cm).unwrap();
        let out = write(&img, &WriteParams::default()).unwrap();
        assert_eq!(out.pixels(), &[0, 0, 0, 1, 0, 0, 2, 0, 0]);

        let out = write(&img, &WriteParams::new().with_subsampling(2, 1)).unwrap();
        assert_eq!(out.pixels(), &[0, 0, 0, 2, 0, 0]);
    }
}
