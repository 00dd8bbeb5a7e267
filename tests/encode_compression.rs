extern crate tiff_baseline as tiff;

mod common;

use std::io::{Cursor, Read, Write};

use common::TiffFile;
use tiff::encoder::{
    Compression, EncodeParams, FaxEncoder, JpegEncoder, JpegParams, TiffEncoder,
};
use tiff::image::{ImageSource, MemoryImage, Raster};
use tiff::tags::Tag;
use tiff::{TiffError, TiffResult, TiffUnsupportedError};

fn encode_seekable(
    image: &MemoryImage,
    params: &EncodeParams,
    fax: Option<Box<dyn FaxEncoder>>,
    jpeg: Option<Box<dyn JpegEncoder>>,
) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    let mut encoder = TiffEncoder::new(&mut cursor).unwrap();
    if let Some(fax) = fax {
        encoder.set_fax_encoder(fax);
    }
    if let Some(jpeg) = jpeg {
        encoder.set_jpeg_encoder(jpeg);
    }
    encoder.write_image(image, params).unwrap();
    drop(encoder);
    cursor.into_inner()
}

#[test]
fn packbits_4x1_grayscale() {
    let image = MemoryImage::gray8(4, 1, vec![0xAA, 0xAA, 0xAA, 0xBB]).unwrap();
    let params = EncodeParams {
        compression: Compression::PackBits,
        ..EncodeParams::default()
    };
    let data = encode_seekable(&image, &params, None, None);

    let file = TiffFile::parse(&data);
    let ifd = &file.ifds()[0];
    assert_eq!(file.entry_u32(ifd.entry(Tag::Compression.to_u16())), 0x8005);
    assert_eq!(
        file.entry_u32s(ifd.entry(Tag::StripByteCounts.to_u16())),
        [4]
    );
    // Run of three 0xAA, then a one-byte literal.
    assert_eq!(file.payload(ifd), [0xFE, 0xAA, 0x00, 0xBB]);
}

#[test]
fn packbits_compresses_row_by_row() {
    // Two strips of 8 and 2 rows; each row compresses to a 2-byte run.
    let image = MemoryImage::gray8(16, 10, vec![0x55; 160]).unwrap();
    let params = EncodeParams {
        compression: Compression::PackBits,
        ..EncodeParams::default()
    };
    let data = encode_seekable(&image, &params, None, None);

    let file = TiffFile::parse(&data);
    let ifd = &file.ifds()[0];
    let counts = file.entry_u32s(ifd.entry(Tag::StripByteCounts.to_u16()));
    assert_eq!(counts, [16, 4]);
    let first = file.chunk(ifd, 0);
    assert_eq!(&first[..2], &[0xF1, 0x55]);
    assert_eq!(first.len(), 16);
}

#[test]
fn deflate_strips_are_independent_zlib_streams() {
    let samples: Vec<u8> = (0..210).map(|i| (i % 17) as u8).collect();
    let image = MemoryImage::gray8(21, 10, samples.clone()).unwrap();
    let params = EncodeParams {
        compression: Compression::Deflate,
        deflate_level: 9,
        ..EncodeParams::default()
    };
    let data = encode_seekable(&image, &params, None, None);

    let file = TiffFile::parse(&data);
    let ifd = &file.ifds()[0];
    assert_eq!(file.entry_u32(ifd.entry(Tag::Compression.to_u16())), 8);

    // Each strip inflates on its own back to the packed rows.
    let mut first = Vec::new();
    flate2::read::ZlibDecoder::new(file.chunk(ifd, 0))
        .read_to_end(&mut first)
        .unwrap();
    assert_eq!(first, &samples[..21 * 8]);

    let mut second = Vec::new();
    flate2::read::ZlibDecoder::new(file.chunk(ifd, 1))
        .read_to_end(&mut second)
        .unwrap();
    assert_eq!(second, &samples[21 * 8..]);
}

#[test]
fn seekable_and_streaming_sinks_produce_identical_bytes() {
    let samples: Vec<u8> = (0..400).map(|i| (i / 3) as u8).collect();
    let image = MemoryImage::gray8(20, 20, samples).unwrap();
    let params = EncodeParams {
        compression: Compression::Deflate,
        ..EncodeParams::default()
    };

    let seeked = encode_seekable(&image, &params, None, None);

    let mut streamed = Vec::new();
    {
        let mut encoder = TiffEncoder::streaming(&mut streamed).unwrap();
        encoder.write_image(&image, &params).unwrap();
    }

    assert_eq!(seeked, streamed);
}

#[test]
fn streaming_sinks_reject_incremental_multipage_writes() {
    let image = MemoryImage::gray8(2, 2, vec![0; 4]).unwrap();
    let mut out = Vec::new();
    let mut encoder = TiffEncoder::streaming(&mut out).unwrap();
    encoder.write_image(&image, &EncodeParams::default()).unwrap();
    let err = encoder
        .write_image(&image, &EncodeParams::default())
        .unwrap_err();
    assert!(matches!(err, TiffError::Unseekable));
}

/// Stand-in fax codec with recognizable framing, standing where a real T.4 /
/// T.6 implementation would.
struct StubFax;

impl FaxEncoder for StubFax {
    fn encode_rle(&mut self, row: &[u8], _width: u32, out: &mut Vec<u8>) -> TiffResult<u32> {
        out.push(b'r');
        out.extend_from_slice(row);
        Ok(row.len() as u32 + 1)
    }

    fn encode_t4(
        &mut self,
        one_dimensional: bool,
        pad_eols: bool,
        chunk: &[u8],
        _row_bytes: usize,
        _width: u32,
        _height: u32,
        out: &mut Vec<u8>,
    ) -> TiffResult<u32> {
        assert!(!one_dimensional);
        out.push(if pad_eols { b'P' } else { b'4' });
        out.extend_from_slice(chunk);
        Ok(chunk.len() as u32 + 1)
    }

    fn encode_t6(
        &mut self,
        chunk: &[u8],
        _row_bytes: usize,
        _width: u32,
        _height: u32,
        out: &mut Vec<u8>,
    ) -> TiffResult<u32> {
        out.push(b'6');
        out.extend_from_slice(chunk);
        Ok(chunk.len() as u32 + 1)
    }
}

#[test]
fn group4_pages_carry_the_codec_output() {
    let rows = vec![0x81, 0x42, 0x24, 0x18, 0x18, 0x24, 0x42, 0x81];
    let image = MemoryImage::bilevel(8, 8, rows.clone()).unwrap();
    let params = EncodeParams {
        compression: Compression::Group4,
        reverse_fill_order: true,
        ..EncodeParams::default()
    };
    let data = encode_seekable(&image, &params, Some(Box::new(StubFax)), None);

    let file = TiffFile::parse(&data);
    let ifd = &file.ifds()[0];
    assert_eq!(file.entry_u32(ifd.entry(Tag::Compression.to_u16())), 4);
    assert_eq!(file.entry_u32(ifd.entry(Tag::T6Options.to_u16())), 0);
    assert_eq!(file.entry_u32(ifd.entry(Tag::FillOrder.to_u16())), 2);

    // One strip of eight rows, handed to the codec as one buffer.
    let mut expected = vec![b'6'];
    expected.extend_from_slice(&rows);
    assert_eq!(file.payload(ifd), expected);
}

#[test]
fn group3_one_dimensional_encodes_each_row() {
    let rows = vec![0xF0, 0x0F, 0xAA, 0x55];
    let image = MemoryImage::bilevel(8, 4, rows.clone()).unwrap();
    let params = EncodeParams {
        compression: Compression::Group3OneDimensional,
        ..EncodeParams::default()
    };
    let data = encode_seekable(&image, &params, Some(Box::new(StubFax)), None);

    let file = TiffFile::parse(&data);
    let ifd = &file.ifds()[0];
    assert_eq!(file.entry_u32(ifd.entry(Tag::Compression.to_u16())), 3);
    assert_eq!(file.entry_u32(ifd.entry(Tag::T4Options.to_u16())), 0);

    let mut expected = Vec::new();
    for row in &rows {
        expected.push(b'r');
        expected.push(*row);
    }
    assert_eq!(file.payload(ifd), expected);
}

#[test]
fn group3_two_dimensional_sets_t4_option_bits() {
    let image = MemoryImage::bilevel(8, 2, vec![0xFF, 0x00]).unwrap();
    let params = EncodeParams {
        compression: Compression::Group3TwoDimensional,
        t4_pad_eols: true,
        ..EncodeParams::default()
    };
    let data = encode_seekable(&image, &params, Some(Box::new(StubFax)), None);

    let file = TiffFile::parse(&data);
    let ifd = &file.ifds()[0];
    assert_eq!(file.entry_u32(ifd.entry(Tag::T4Options.to_u16())), 1 | 4);
    assert_eq!(file.payload(ifd), [b'P', 0xFF, 0x00]);
}

#[test]
fn missing_fax_codec_fails_before_any_page_bytes() {
    let image = MemoryImage::bilevel(8, 8, vec![0; 8]).unwrap();
    let params = EncodeParams {
        compression: Compression::Group4,
        ..EncodeParams::default()
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut encoder = TiffEncoder::new(&mut cursor).unwrap();
    let err = encoder.write_image(&image, &params).unwrap_err();
    assert!(matches!(
        err,
        TiffError::UnsupportedError(TiffUnsupportedError::CodecUnavailable(Compression::Group4))
    ));
    drop(encoder);
    assert_eq!(cursor.into_inner().len(), 8);
}

/// Stand-in JPEG codec writing a recognizable framed stream.
struct StubJpeg;

const STUB_TABLES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x04, 0xFF, 0xD9];

impl JpegEncoder for StubJpeg {
    fn encode_tile(
        &mut self,
        sink: &mut dyn Write,
        raster: &Raster,
        _params: &JpegParams,
    ) -> TiffResult<u64> {
        assert_eq!((raster.rect.x, raster.rect.y), (0, 0));
        let frame = [
            0xFF,
            0xD8,
            raster.rect.width as u8,
            raster.rect.height as u8,
            0xFF,
            0xD9,
        ];
        sink.write_all(&frame)?;
        Ok(frame.len() as u64)
    }

    fn write_tables(&mut self, out: &mut Vec<u8>, _params: &JpegParams) -> TiffResult<()> {
        out.extend_from_slice(STUB_TABLES);
        Ok(())
    }
}

#[test]
fn jpeg_pages_round_strips_and_store_tables() {
    let image = MemoryImage::rgb8(20, 20, vec![0x40; 1200]).unwrap();
    let params = EncodeParams {
        compression: Compression::Jpeg,
        jpeg: JpegParams {
            h_subsampling: vec![1, 2, 2],
            v_subsampling: vec![1, 2, 2],
            write_image_only: true,
            ..JpegParams::default()
        },
        jpeg_compress_rgb_to_ycbcr: true,
        ..EncodeParams::default()
    };
    let data = encode_seekable(&image, &params, None, Some(Box::new(StubJpeg)));

    let file = TiffFile::parse(&data);
    let ifd = &file.ifds()[0];
    assert_eq!(file.entry_u32(ifd.entry(Tag::Compression.to_u16())), 7);
    assert_eq!(
        file.entry_u32(ifd.entry(Tag::PhotometricInterpretation.to_u16())),
        6
    );
    assert_eq!(
        file.entry_u32s(ifd.entry(Tag::YCbCrSubSampling.to_u16())),
        [2, 2]
    );
    assert_eq!(file.entry_u32(ifd.entry(Tag::YCbCrPositioning.to_u16())), 1);
    let reference = file.entry_rationals(ifd.entry(Tag::ReferenceBlackWhite.to_u16()));
    assert_eq!(
        reference,
        [(0, 1), (255, 1), (128, 1), (255, 1), (128, 1), (255, 1)]
    );
    assert_eq!(file.entry_bytes(ifd.entry(Tag::JPEGTables.to_u16())), STUB_TABLES);

    // Strips round up to whole MCUs: 16 rows, then the 4-row remainder.
    assert_eq!(file.entry_u32(ifd.entry(Tag::RowsPerStrip.to_u16())), 16);
    let counts = file.entry_u32s(ifd.entry(Tag::StripByteCounts.to_u16()));
    assert_eq!(counts, [6, 6]);
    assert_eq!(file.chunk(ifd, 0), [0xFF, 0xD8, 20, 16, 0xFF, 0xD9]);
    assert_eq!(file.chunk(ifd, 1), [0xFF, 0xD8, 20, 4, 0xFF, 0xD9]);
}

#[test]
fn jpeg_without_tables_field_when_streams_are_standalone() {
    let image = MemoryImage::gray8(8, 8, vec![0; 64]).unwrap();
    let params = EncodeParams {
        compression: Compression::Jpeg,
        ..EncodeParams::default()
    };
    let data = encode_seekable(&image, &params, None, Some(Box::new(StubJpeg)));

    let file = TiffFile::parse(&data);
    let ifd = &file.ifds()[0];
    assert!(ifd.find(Tag::JPEGTables.to_u16()).is_none());
    assert!(ifd.find(Tag::YCbCrSubSampling.to_u16()).is_none());
    assert_eq!(file.entry_u32(ifd.entry(Tag::Compression.to_u16())), 7);
}

#[test]
fn compressed_multipage_chains_via_write_images() {
    let first = MemoryImage::gray8(16, 4, vec![0x11; 64]).unwrap();
    let second = MemoryImage::gray8(4, 4, vec![0x22; 16]).unwrap();
    let params = EncodeParams {
        compression: Compression::PackBits,
        ..EncodeParams::default()
    };

    let mut out = Vec::new();
    {
        let mut encoder = TiffEncoder::streaming(&mut out).unwrap();
        encoder
            .write_images(vec![
                (&first as &dyn ImageSource, params.clone()),
                (&second as &dyn ImageSource, params.clone()),
            ])
            .unwrap();
    }

    let file = TiffFile::parse(&out);
    let ifds = file.ifds();
    assert_eq!(ifds.len(), 2);
    assert_eq!(ifds[0].next, ifds[1].offset);
    assert_eq!(ifds[1].next, 0);
    // Each 16-byte run row compresses to two bytes.
    assert_eq!(&file.chunk(&ifds[0], 0)[..2], &[0xF1, 0x11]);
    assert_eq!(&file.chunk(&ifds[1], 0)[..2], &[0xFD, 0x22]);
}
