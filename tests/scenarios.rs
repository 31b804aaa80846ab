//! End-to-end behavior through real QOI bytes.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use qoi_raster::{
    CanonicalImage, Channels, ColorModel, ColorSpace, Completion, DataBuffer, Error, ImageType,
    Limits, Monitor, Point, QoiReader, QoiWriter, Raster, RasterImage, ReadParams, Rect,
    SampleModel, Stop, StopReason, TiledImage, Unstoppable, WriteParams, decode, encode, probe,
    probe_stream, to_canonical, to_canonical_generic,
};

fn encode_to_vec(img: &RasterImage, params: &WriteParams) -> Vec<u8> {
    let mut writer = QoiWriter::new(Vec::new());
    writer.write(img, params).unwrap();
    writer.into_inner()
}

fn pixel(img: &RasterImage, x: usize, y: usize) -> Vec<u32> {
    let mut out = vec![0; img.raster().num_bands()];
    img.raster().get_pixel(x, y, &mut out);
    out
}

fn rgb_row(pixels: &[[u8; 3]]) -> RasterImage {
    let mut img = ImageType::Interleaved {
        channels: Channels::Rgb,
        space: ColorSpace::Srgb,
    }
    .create(pixels.len(), 1)
    .unwrap();
    for (x, p) in pixels.iter().enumerate() {
        img.raster_mut().set_pixel(x, 0, &p.map(u32::from));
    }
    img
}

#[test]
fn two_pixel_round_trip() {
    let img = rgb_row(&[[255, 0, 0], [0, 255, 0]]);
    let canonical = to_canonical(img.raster(), img.color_model()).unwrap();
    assert_eq!(canonical.pixels(), &[255, 0, 0, 0, 255, 0]);

    let bytes = encode_to_vec(&img, &WriteParams::default());
    let back = QoiReader::new(&bytes[..]).read(0, &ReadParams::default()).unwrap();
    assert_eq!(pixel(&back, 0, 0), vec![255, 0, 0]);
    assert_eq!(pixel(&back, 1, 0), vec![0, 255, 0]);
}

#[test]
fn every_layout_round_trips() {
    let types = [
        ImageType::IntArgb,
        ImageType::IntRgb,
        ImageType::IntBgr,
        ImageType::ThreeByteBgr,
        ImageType::FourByteAbgr,
        ImageType::Interleaved {
            channels: Channels::Rgba,
            space: ColorSpace::Srgb,
        },
    ];
    for ty in types {
        let mut img = ty.create(7, 5).unwrap();
        let bands = img.raster().num_bands();
        for y in 0..5 {
            for x in 0..7 {
                let px: Vec<u32> = (0..bands)
                    .map(|b| ((x * 31 + y * 17 + b * 71) % 256) as u32)
                    .collect();
                img.raster_mut().set_pixel(x, y, &px);
            }
        }
        let bytes = encode_to_vec(&img, &WriteParams::default());
        let back = decode(&bytes[..], &Limits::default()).unwrap();
        let expected = to_canonical_generic(img.raster(), img.color_model()).unwrap();
        assert_eq!(back, expected, "{ty:?}");
    }
}

#[test]
fn gray_expands_to_rgb() {
    let mut img = ImageType::ByteGray.create(2, 1).unwrap();
    img.raster_mut().set_pixel(0, 0, &[7]);
    img.raster_mut().set_pixel(1, 0, &[200]);
    let bytes = encode_to_vec(&img, &WriteParams::default());
    let back = decode(&bytes[..], &Limits::default()).unwrap();
    assert_eq!(back.channels(), Channels::Rgb);
    assert_eq!(back.pixels(), &[7, 7, 7, 200, 200, 200]);
}

#[test]
fn indexed_image_encodes_through_palette() {
    // Two 1-bit pixels packed into one byte, MSB first.
    let raster = Raster::new(
        2,
        1,
        SampleModel::MultiPixelPacked {
            bits: 1,
            scanline_stride: 1,
        },
        DataBuffer::Byte(vec![0b0100_0000]),
    )
    .unwrap();
    let palette = vec![rgb::Rgba::new(0, 0, 0, 0), rgb::Rgba::new(9, 8, 7, 255)];
    let img = RasterImage::new(raster, ColorModel::Indexed { palette, bits: 1 }).unwrap();
    let bytes = encode_to_vec(&img, &WriteParams::default());
    let back = decode(&bytes[..], &Limits::default()).unwrap();
    assert_eq!(back.channels(), Channels::Rgba);
    assert_eq!(back.pixels(), &[0, 0, 0, 0, 9, 8, 7, 255]);
}

#[test]
fn read_at_destination_offset() {
    let bytes = encode_to_vec(&rgb_row(&[[1, 2, 3], [4, 5, 6]]), &WriteParams::default());
    let dest = rgb_row(&[[9, 9, 9], [0, 0, 0], [0, 0, 0]]);
    let params = ReadParams::new()
        .with_source_region(Rect::new(0, 0, 2, 1))
        .with_destination_offset(Point::new(1, 0));
    let out = QoiReader::new(&bytes[..])
        .read_with(0, &params, Some(dest), &mut (), &Unstoppable)
        .unwrap();
    assert_eq!(out.completion, Completion::Completed);
    assert_eq!(pixel(&out.image, 0, 0), vec![9, 9, 9]);
    assert_eq!(pixel(&out.image, 1, 0), vec![1, 2, 3]);
    assert_eq!(pixel(&out.image, 2, 0), vec![4, 5, 6]);
}

#[test]
fn write_every_other_column() {
    let img = rgb_row(&[[1, 1, 1], [2, 2, 2], [3, 3, 3], [4, 4, 4]]);
    let bytes = encode_to_vec(&img, &WriteParams::new().with_subsampling(2, 1));
    let back = decode(&bytes[..], &Limits::default()).unwrap();
    assert_eq!(back.pixels(), &[1, 1, 1, 3, 3, 3]);
}

#[test]
fn subsampling_visits_each_grid_point_once() {
    // Pixel value encodes its own coordinates.
    let mut img = ImageType::Interleaved {
        channels: Channels::Rgb,
        space: ColorSpace::Srgb,
    }
    .create(9, 7)
    .unwrap();
    for y in 0..7 {
        for x in 0..9 {
            img.raster_mut().set_pixel(x, y, &[x as u32, y as u32, 0]);
        }
    }
    let bytes = encode_to_vec(&img, &WriteParams::default());
    let params = WriteParams::new()
        .with_source_region(Rect::new(1, 1, 8, 6))
        .with_subsampling(3, 2)
        .with_subsampling_offset(1, 1);
    let decoded = QoiReader::new(&bytes[..]).read(0, &ReadParams::default()).unwrap();
    let out = decode(&encode_to_vec(&decoded, &params)[..], &Limits::default()).unwrap();

    let sampled: Vec<(u8, u8)> = out.pixels().chunks_exact(3).map(|p| (p[0], p[1])).collect();
    let expected: Vec<(u8, u8)> = (0..3)
        .flat_map(|j| (0..3).map(move |k| (2 + 3 * k, 2 + 2 * j)))
        .collect();
    assert_eq!(sampled, expected);
}

#[test]
fn clipped_and_empty_read_regions() {
    let bytes = encode_to_vec(&rgb_row(&[[1, 2, 3], [4, 5, 6]]), &WriteParams::default());

    let clipped = ReadParams::new().with_source_region(Rect::new(1, -3, 50, 50));
    let img = QoiReader::new(&bytes[..]).read(0, &clipped).unwrap();
    assert_eq!(pixel(&img, 0, 0), vec![4, 5, 6]);
    assert_eq!(pixel(&img, 1, 0), vec![0, 0, 0]);

    let disjoint = ReadParams::new().with_source_region(Rect::new(10, 10, 2, 2));
    let out = QoiReader::new(&bytes[..])
        .read_with(0, &disjoint, None, &mut (), &Unstoppable)
        .unwrap();
    assert_eq!(out.completion, Completion::Completed);
    assert_eq!(pixel(&out.image, 0, 0), vec![0, 0, 0]);
}

#[test]
fn band_remap_on_read() {
    let bytes = encode_to_vec(&rgb_row(&[[10, 20, 30]]), &WriteParams::default());
    let dest = ImageType::Interleaved {
        channels: Channels::Rgba,
        space: ColorSpace::Srgb,
    }
    .create(1, 1)
    .unwrap();
    let params = ReadParams::new()
        .with_source_bands([2, 0])
        .with_destination_bands([0, 1]);
    let out = QoiReader::new(&bytes[..])
        .read_with(0, &params, Some(dest), &mut (), &Unstoppable)
        .unwrap();
    assert_eq!(pixel(&out.image, 0, 0), vec![30, 10, 0, 0]);
}

/// Stops once it has been polled `rows` times.
struct StopAfter {
    rows: usize,
    polls: AtomicUsize,
}

impl Stop for StopAfter {
    fn check(&self) -> Result<(), StopReason> {
        if self.polls.fetch_add(1, Ordering::Relaxed) + 1 >= self.rows {
            Err(StopReason::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A plain cancellation flag.
struct Flag(AtomicBool);

impl Stop for Flag {
    fn check(&self) -> Result<(), StopReason> {
        if self.0.load(Ordering::Relaxed) {
            Err(StopReason::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
struct Tally {
    rows: usize,
    aborted: bool,
}

impl Monitor for Tally {
    fn progress(&mut self, _percent: f32) {
        self.rows += 1;
    }

    fn aborted(&mut self) {
        self.aborted = true;
    }
}

#[test]
fn abort_after_first_row() {
    let mut img = ImageType::IntRgb.create(2, 3).unwrap();
    for y in 0..3 {
        for x in 0..2 {
            img.raster_mut().set_pixel(x, y, &[1 + x as u32, 1 + y as u32, 5]);
        }
    }
    let bytes = encode_to_vec(&img, &WriteParams::default());

    let stop = StopAfter {
        rows: 1,
        polls: AtomicUsize::new(0),
    };
    let mut tally = Tally::default();
    let params = ReadParams::new().with_source_region(Rect::new(0, 0, 2, 3));
    let out = QoiReader::new(&bytes[..])
        .read_with(0, &params, None, &mut tally, &stop)
        .unwrap();
    assert_eq!(out.completion, Completion::Aborted);
    assert!(tally.aborted);
    assert_eq!(tally.rows, 1);
    assert_eq!(pixel(&out.image, 0, 0), vec![1, 1, 5]);
    assert_eq!(pixel(&out.image, 1, 0), vec![2, 1, 5]);
    for y in 1..3 {
        for x in 0..2 {
            assert_eq!(pixel(&out.image, x, y), vec![0, 0, 0]);
        }
    }
}

#[test]
fn cancellation_flag_stops_write() {
    let img = rgb_row(&[[1, 1, 1], [2, 2, 2]]);
    let cancel = Flag(AtomicBool::new(true));
    let params = WriteParams::new().with_subsampling(2, 1);
    let mut writer = QoiWriter::new(Vec::new());
    // The flag is left set, so every call stops after its first row.
    for _ in 0..2 {
        let done = writer.write_with(&img, &params, &mut (), &cancel).unwrap();
        assert_eq!(done, Completion::Aborted);
        assert!(writer.get_ref().is_empty());
    }

    cancel.0.store(false, Ordering::Relaxed);
    let done = writer.write_with(&img, &params, &mut (), &cancel).unwrap();
    assert_eq!(done, Completion::Completed);
    assert!(probe(writer.get_ref()));
}

#[test]
fn probing_and_limits() {
    let bytes = encode_to_vec(&rgb_row(&[[1, 2, 3]]), &WriteParams::default());
    assert!(probe(&bytes[..4]));
    assert!(!probe(b"GIF8"));

    let mut cur = Cursor::new(bytes.clone());
    assert!(probe_stream(&mut cur, &Limits::default()).unwrap());
    assert!(matches!(
        probe_stream(&mut cur, &Limits::default().with_max_input_bytes(8)),
        Err(Error::TooLarge { .. })
    ));

    let mut reader = QoiReader::with_limits(&bytes[..], Limits::default().with_max_pixels(0));
    assert!(matches!(reader.header(), Err(Error::TooLarge { .. })));
}

#[test]
fn trailing_bytes_are_ignored() {
    let img =
        CanonicalImage::new(1, 1, Channels::Rgba, ColorSpace::Linear, vec![5, 6, 7, 8]).unwrap();
    let mut bytes = Vec::new();
    encode(&img, &mut bytes).unwrap();
    bytes.extend_from_slice(b"trailing junk");
    let back = decode(&bytes[..], &Limits::default()).unwrap();
    assert_eq!(back, img);
}

#[test]
fn tiled_source() {
    let tiles = (0..4u32)
        .map(|t| {
            let mut tile = Raster::interleaved(2, 2, 3).unwrap();
            for y in 0..2 {
                for x in 0..2 {
                    tile.set_pixel(x, y, &[t, x as u32, y as u32]);
                }
            }
            tile
        })
        .collect();
    let img = TiledImage::new(4, 4, 2, 2, tiles, ColorModel::rgb(ColorSpace::Srgb)).unwrap();
    let mut writer = QoiWriter::new(Vec::new());
    writer.write(&img, &WriteParams::default()).unwrap();
    let back = decode(&writer.into_inner()[..], &Limits::default()).unwrap();
    let px = |x: usize, y: usize| &back.pixels()[(y * 4 + x) * 3..][..3];
    assert_eq!(px(0, 0), &[0, 0, 0]);
    assert_eq!(px(3, 0), &[1, 1, 0]);
    assert_eq!(px(2, 3), &[3, 0, 1]);
}

#[test]
fn linear_images_are_written_as_srgb() {
    let mut img = ImageType::Interleaved {
        channels: Channels::Rgb,
        space: ColorSpace::Linear,
    }
    .create(1, 1)
    .unwrap();
    img.raster_mut().set_pixel(0, 0, &[64, 128, 255]);
    let expected = to_canonical_generic(img.raster(), img.color_model()).unwrap();

    let bytes = encode_to_vec(&img, &WriteParams::default());
    let mut reader = QoiReader::new(&bytes[..]);
    assert_eq!(reader.header().unwrap().colorspace, ColorSpace::Srgb);
    let back = reader.read(0, &ReadParams::default()).unwrap();
    assert_eq!(back.color_model(), &ColorModel::rgb(ColorSpace::Srgb));
    let px = pixel(&back, 0, 0);
    let bytes: Vec<u8> = px.iter().map(|&v| v as u8).collect();
    assert_eq!(bytes, expected.pixels());
    assert!(px[0] > 64 && px[1] > 128 && px[2] == 255, "{px:?}");
}

#[test]
fn linear_streams_decode_in_their_own_space() {
    let img = CanonicalImage::new(1, 1, Channels::Rgb, ColorSpace::Linear, vec![64, 128, 255])
        .unwrap();
    let mut bytes = Vec::new();
    encode(&img, &mut bytes).unwrap();
    let back = QoiReader::new(&bytes[..]).read(0, &ReadParams::default()).unwrap();
    assert_eq!(back.color_model(), &ColorModel::rgb(ColorSpace::Linear));
    assert_eq!(pixel(&back, 0, 0), vec![64, 128, 255]);
}
