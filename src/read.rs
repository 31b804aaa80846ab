//! Reading QOI streams into rasters.
//!
//! With default [`ReadParams`] and no destination, the decoded pixels are
//! handed out as-is: an interleaved byte image whose storage *is* the decoded
//! buffer. Anything else goes through a per-pixel copy that honors the source
//! region, subsampling grid, band selection and destination offset.

use std::io::Read;

use enough::{Stop, Unstoppable};
use qoi::Header;
use tracing::{debug, trace};

use crate::convert;
use crate::error::{Error, Result};
use crate::format;
use crate::image::{ImageType, RasterImage};
use crate::limits::Limits;
use crate::param::{Point, ReadParams, Rect, Subsampling, check_band_settings};
use crate::progress::{Completion, Monitor, Session};
use crate::raster::{RasterView, RasterViewMut};

/// The decoded image and how the read ended.
#[derive(Debug)]
pub struct ReadOutcome {
    pub image: RasterImage,
    pub completion: Completion,
}

struct Decoded {
    header: Header,
    /// `None` once the fast path has handed it out.
    image: Option<RasterImage>,
}

/// Single-image QOI reader over a byte stream.
///
/// The stream is read to the end and decoded on first use, then cached
/// until [`reset`](Self::reset).
///
/// ```
/// use qoi_raster::{CanonicalImage, Channels, ColorSpace, QoiReader, ReadParams, encode};
///
/// let px = vec![255, 0, 0, 0, 255, 0];
/// let img = CanonicalImage::new(2, 1, Channels::Rgb, ColorSpace::Srgb, px)?;
/// let mut bytes = Vec::new();
/// encode(&img, &mut bytes)?;
///
/// let mut reader = QoiReader::new(&bytes[..]);
/// assert_eq!(reader.width(0)?, 2);
/// let image = reader.read(0, &ReadParams::default())?;
/// assert_eq!(image.raster().get_sample(1, 0, 1), 255);
/// # Ok::<(), qoi_raster::Error>(())
/// ```
pub struct QoiReader<R> {
    input: R,
    limits: Limits,
    decoded: Option<Decoded>,
}

impl<R: Read> QoiReader<R> {
    pub fn new(input: R) -> Self {
        Self::with_limits(input, Limits::default())
    }

    pub fn with_limits(input: R, limits: Limits) -> Self {
        Self {
            input,
            limits,
            decoded: None,
        }
    }

    /// A QOI stream always holds exactly one image.
    pub fn num_images(&self) -> usize {
        1
    }

    pub fn header(&mut self) -> Result<Header> {
        Ok(self.decoded()?.header)
    }

    pub fn width(&mut self, index: usize) -> Result<usize> {
        check_index(index)?;
        Ok(self.header()?.width as usize)
    }

    pub fn height(&mut self, index: usize) -> Result<usize> {
        check_index(index)?;
        Ok(self.header()?.height as usize)
    }

    /// The layout [`read`](Self::read) produces by default.
    pub fn image_type(&mut self, index: usize) -> Result<ImageType> {
        check_index(index)?;
        let header = self.header()?;
        Ok(ImageType::Interleaved {
            channels: header.channels,
            space: header.colorspace,
        })
    }

    /// Read image `index` with `params` into a fresh image, without progress
    /// reporting.
    pub fn read(&mut self, index: usize, params: &ReadParams) -> Result<RasterImage> {
        self.read_with(index, params, None, &mut (), &Unstoppable).map(|out| out.image)
    }

    /// Read image `index` into `destination` (or a fresh image of the decoded
    /// size and layout), reporting to `monitor`.
    ///
    /// `stop` is polled after every copied row. Once it reports a stop, the
    /// rows copied so far are returned with [`Completion::Aborted`]. The token
    /// is not reset, so one that is already stopped aborts after the first
    /// row.
    pub fn read_with<M: Monitor + ?Sized>(
        &mut self,
        index: usize,
        params: &ReadParams,
        destination: Option<RasterImage>,
        monitor: &mut M,
        stop: &dyn Stop,
    ) -> Result<ReadOutcome> {
        let mut session = Session::start(monitor, stop, "read");
        match self.read_inner(index, params, destination, &mut session) {
            Ok((image, Completion::Completed)) => Ok(ReadOutcome {
                image,
                completion: session.complete(),
            }),
            Ok((image, Completion::Aborted)) => Ok(ReadOutcome {
                image,
                completion: session.abort(),
            }),
            Err(e) => Err(session.fail(e)),
        }
    }

    /// Drop the cached image. The next call decodes from the stream's current
    /// position.
    pub fn reset(&mut self) {
        self.decoded = None;
    }

    pub fn get_ref(&self) -> &R {
        &self.input
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.input
    }

    pub fn into_inner(self) -> R {
        self.input
    }

    fn decoded(&mut self) -> Result<&mut Decoded> {
        let decoded = match self.decoded.take() {
            Some(d) => d,
            None => {
                let canonical = format::decode(&mut self.input, &self.limits)?;
                let header = Header {
                    width: canonical.width(),
                    height: canonical.height(),
                    channels: canonical.channels(),
                    colorspace: canonical.color_space(),
                };
                let image = convert::from_canonical(canonical)?;
                Decoded {
                    header,
                    image: Some(image),
                }
            }
        };
        Ok(self.decoded.insert(decoded))
    }

    fn read_inner<M: Monitor + ?Sized>(
        &mut self,
        index: usize,
        params: &ReadParams,
        destination: Option<RasterImage>,
        session: &mut Session<'_, M>,
    ) -> Result<(RasterImage, Completion)> {
        check_index(index)?;
        params.validate()?;
        let decoded = self.decoded()?;

        if params.is_default() && destination.is_none() {
            let image = decoded.image.take().ok_or_else(handed_out)?;
            debug!("default parameters, returning decoded raster");
            return Ok((image, Completion::Completed));
        }

        let header = decoded.header;
        let source = decoded.image.as_ref().ok_or_else(handed_out)?;
        let (width, height) = (header.width as usize, header.height as usize);
        let region = params.effective_region(width, height);

        let mut dest = match destination {
            Some(d) => d,
            None => ImageType::Interleaved {
                channels: header.channels,
                space: header.colorspace,
            }
            .create(width, height)?,
        };
        let dest_bands = dest.raster().num_bands();
        if let Some(band) = (0..dest_bands).find(|&b| dest.raster().sample_size(b) != 8) {
            return Err(Error::unsupported(format!(
                "destination band {band} is {} bits, only 8-bit bands can be read into",
                dest.raster().sample_size(band)
            )));
        }
        check_band_settings(
            params.source_bands.as_deref(),
            params.destination_bands.as_deref(),
            header.channels.as_u8() as usize,
            dest_bands,
        )?;

        let src = RasterView::new(source.raster()).child(
            0,
            0,
            width,
            height,
            params.source_bands.as_deref(),
        )?;
        let dst_full = RasterViewMut::new(dest.raster_mut());
        let (dw, dh) = (dst_full.width(), dst_full.height());
        let dst = dst_full.child(0, 0, dw, dh, params.destination_bands.as_deref())?;
        debug!(
            ?region,
            subsampling = ?params.subsampling,
            offset = ?params.destination_offset,
            "reading region"
        );

        let completion = copy_region(
            &src,
            dst,
            region,
            &params.subsampling,
            params.destination_offset,
            session,
        );
        Ok((dest, completion))
    }
}

fn check_index(index: usize) -> Result<()> {
    if index != 0 {
        return Err(Error::invalid(format!(
            "image index {index} out of range, a QOI stream holds one image"
        )));
    }
    Ok(())
}

fn handed_out() -> Error {
    Error::invalid("decoded image was already handed out; reset the reader to read again")
}

/// Point-sample `region` of `src` into `dst`, one source row per progress
/// step. Rows and columns landing outside either raster are skipped.
fn copy_region<M: Monitor + ?Sized>(
    src: &RasterView<'_>,
    mut dst: RasterViewMut<'_>,
    region: Rect,
    sub: &Subsampling,
    offset: Point,
    session: &mut Session<'_, M>,
) -> Completion {
    let (sx, sy) = (sub.x as i64, sub.y as i64);
    let (rx, ry) = (region.x as i64, region.y as i64);
    let (sw, sh) = (src.width() as i64, src.height() as i64);
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    let mut pixel = vec![0u32; src.num_bands()];

    for y in (ry..ry + region.height as i64).step_by(sy as usize) {
        if !(0..sh).contains(&y) {
            continue;
        }
        let dest_y = offset.y as i64 + (y - ry) / sy;
        if !(0..dh).contains(&dest_y) {
            continue;
        }
        for x in (rx..rx + region.width as i64).step_by(sx as usize) {
            if !(0..sw).contains(&x) {
                continue;
            }
            let dest_x = offset.x as i64 + (x - rx) / sx;
            if !(0..dw).contains(&dest_x) {
                continue;
            }
            src.get_pixel(x as usize, y as usize, &mut pixel);
            dst.set_pixel(dest_x as usize, dest_y as usize, &pixel);
        }

        session.progress(((y - ry) * 100) as f32 / region.height as f32);
        if session.abort_requested() {
            trace!(row = y, "abort requested");
            return Completion::Aborted;
        }
    }
    Completion::Completed
}
