//! Writes one image as an IFD plus payload.
//!
//! The IFD precedes the payload on disk but references payload offsets, so a
//! page goes through one of three strategies: uncompressed data has fully
//! computable offsets and is written in a single forward pass; compressed
//! data on a seekable sink reserves the directory, writes the payload, then
//! seeks back and rewrites the directory with the real offsets and counts;
//! compressed data on a forward-only sink is spilled to a temporary file (or
//! memory) first so the directory can be written before the payload bytes.

use std::io::{self, Seek, SeekFrom, Write};

use log::{debug, warn};

use crate::error::{TiffError, TiffResult, TiffUnsupportedError};
use crate::image::{ImageSource, Rect};
use crate::tags::{FillOrder, Tag};

use super::classify::{self, ImageClass, ImageKind};
use super::compression::{deflate, packbits, with_jpeg_lock, Compression, FaxEncoder, JpegEncoder};
use super::field::{Field, FieldTable, FieldValue, Rational};
use super::layout::{plan_geometry, TileGeometry};
use super::packer::{pack_chunk, packed_row_bytes};
use super::writer::{Sink, TiffWriter};
use super::EncodeParams;

/// Largest payload buffered in memory when no spill file can be opened.
const MAX_MEMORY_SPILL: u64 = 64 << 20;

/// Write one page at the writer's current (even) offset.
///
/// With `chain_next` the directory's next-IFD pointer is set to the end of
/// this page, where the following page must begin; otherwise it is zero.
/// Returns the file position of the next-IFD pointer field so a later page
/// can still be linked in by patching.
pub(crate) fn write_page<'a, S: Sink>(
    writer: &mut TiffWriter<S>,
    image: &dyn ImageSource,
    params: &EncodeParams,
    fax: Option<&'a mut (dyn FaxEncoder + 'static)>,
    mut jpeg: Option<&'a mut (dyn JpegEncoder + 'static)>,
    chain_next: bool,
) -> TiffResult<u64> {
    let ifd_offset = writer.offset();
    debug_assert_eq!(ifd_offset % 2, 0);

    let bounds = image.bounds();
    let class = classify::classify(image.sample_model(), image.color_model(), params)?;
    classify::check_compression(&class, params)?;
    let geometry = plan_geometry(bounds, &class, params, image.preferred_tile_size())?;

    debug!(
        "page at {}: {}x{} {:?}, {} chunk(s) of {}x{}, {:?}",
        ifd_offset,
        bounds.width,
        bounds.height,
        class.kind,
        geometry.num_chunks(),
        geometry.tile_width,
        geometry.tile_height,
        params.compression,
    );

    // Abbreviated JPEG streams share their tables through the IFD.
    let jpeg_tables = if params.compression == Compression::Jpeg && params.jpeg.write_image_only {
        let encoder = jpeg
            .as_deref_mut()
            .ok_or(TiffUnsupportedError::CodecUnavailable(Compression::Jpeg))?;
        let mut tables = Vec::new();
        with_jpeg_lock(|| encoder.write_tables(&mut tables, &params.jpeg))?;
        Some(tables)
    } else {
        None
    };

    let mut fields = build_fields(&class, &geometry, params, bounds, jpeg_tables);
    let dir_size = u64::from(fields.size_on_disk());

    let mut payload_start = ifd_offset + dir_size;
    if params.compression == Compression::None {
        // Align deep uncompressed samples so readers can map them directly.
        let align = match class.bit_depth {
            32 => 4,
            16 => 2,
            _ => 1,
        };
        payload_start = payload_start.next_multiple_of(align);
    }

    let next_link_pos = ifd_offset + 2 + 12 * fields.len() as u64;

    if !params.compression.defers_byte_counts() {
        // Every offset is computable up front; single forward pass.
        let counts = geometry.byte_counts.clone();
        let offsets = cumulative_offsets(payload_start, &counts)?;
        let end = payload_start + geometry.total_payload();
        let padded_end = end + (end & 1);
        let next = if chain_next {
            u32::try_from(padded_end)?
        } else {
            0
        };

        set_chunk_fields(&mut fields, geometry.tiled, offsets, counts);
        fields.write_to(writer, next)?;
        for _ in (ifd_offset + dir_size)..payload_start {
            writer.write_u8(0)?;
        }

        let mut packed = Vec::with_capacity(geometry.bytes_per_tile as usize);
        for index in 0..geometry.num_chunks() {
            let rect = geometry.chunk_rect(bounds, index);
            let raster = image.get_tile(rect)?;
            let (chunk_w, chunk_rows) = geometry.chunk_dims(rect);
            pack_chunk(&raster, &class, chunk_w, chunk_rows, &mut packed);
            debug_assert_eq!(
                packed.len() as u64,
                u64::from(geometry.bytes_per_row) * u64::from(chunk_rows)
            );
            writer.write_bytes(&packed)?;
        }
        if end % 2 != 0 {
            writer.write_u8(0)?;
        }
        return Ok(next_link_pos);
    }

    let mut codec = ChunkCodec::select(params, fax, jpeg)?;
    let mut packed = Vec::with_capacity(geometry.bytes_per_tile as usize);
    let mut scratch = Vec::new();

    if writer.is_seekable() {
        // Reserve the directory, then come back with the real values.
        fields.write_to(writer, 0)?;

        let mut offsets = Vec::with_capacity(geometry.num_chunks() as usize);
        let mut counts = Vec::with_capacity(geometry.num_chunks() as usize);
        for index in 0..geometry.num_chunks() {
            let rect = geometry.chunk_rect(bounds, index);
            let raster = image.get_tile(rect)?;
            let (chunk_w, chunk_rows) = geometry.chunk_dims(rect);
            offsets.push(u32::try_from(writer.offset())?);
            let written = codec.encode_chunk(
                writer.inner_mut(),
                raster,
                &class,
                params,
                chunk_w,
                chunk_rows,
                &mut packed,
                &mut scratch,
            )?;
            writer.advance(written);
            counts.push(u32::try_from(written)?);
        }

        let end = writer.offset();
        if end % 2 != 0 {
            writer.write_u8(0)?;
        }
        let padded_end = writer.offset();
        let next = if chain_next {
            u32::try_from(padded_end)?
        } else {
            0
        };

        set_chunk_fields(&mut fields, geometry.tiled, offsets, counts);
        writer.seek_to(ifd_offset)?;
        fields.write_to(writer, next)?;
        writer.seek_to(padded_end)?;
        return Ok(next_link_pos);
    }

    // Forward-only sink: encode into a spill, then stream it out after the
    // directory.
    let mut spill = Spill::open(geometry.total_payload())?;
    let mut counts = Vec::with_capacity(geometry.num_chunks() as usize);
    for index in 0..geometry.num_chunks() {
        let rect = geometry.chunk_rect(bounds, index);
        let raster = image.get_tile(rect)?;
        let (chunk_w, chunk_rows) = geometry.chunk_dims(rect);
        let written = codec.encode_chunk(
            spill.writer(),
            raster,
            &class,
            params,
            chunk_w,
            chunk_rows,
            &mut packed,
            &mut scratch,
        )?;
        counts.push(u32::try_from(written)?);
    }

    let total: u64 = counts.iter().map(|&n| u64::from(n)).sum();
    let offsets = cumulative_offsets(payload_start, &counts)?;
    let end = payload_start + total;
    let padded_end = end + (end & 1);
    let next = if chain_next {
        u32::try_from(padded_end)?
    } else {
        0
    };

    set_chunk_fields(&mut fields, geometry.tiled, offsets, counts);
    fields.write_to(writer, next)?;
    spill.copy_to(writer)?;
    if end % 2 != 0 {
        writer.write_u8(0)?;
    }
    Ok(next_link_pos)
}

fn cumulative_offsets(start: u64, counts: &[u32]) -> TiffResult<Vec<u32>> {
    let mut offsets = Vec::with_capacity(counts.len());
    let mut at = start;
    for &count in counts {
        offsets.push(u32::try_from(at)?);
        at += u64::from(count);
    }
    Ok(offsets)
}

fn set_chunk_fields(fields: &mut FieldTable, tiled: bool, offsets: Vec<u32>, counts: Vec<u32>) {
    let (offsets_tag, counts_tag) = if tiled {
        (Tag::TileOffsets, Tag::TileByteCounts)
    } else {
        (Tag::StripOffsets, Tag::StripByteCounts)
    };
    fields.insert(Field::new(offsets_tag, FieldValue::Long(offsets)));
    fields.insert(Field::new(counts_tag, FieldValue::Long(counts)));
}

/// All tags of a page in their final shape, with zeroed offsets (and, when
/// compressed, zeroed counts) to be replaced once the payload is sized.
fn build_fields(
    class: &ImageClass,
    geometry: &TileGeometry,
    params: &EncodeParams,
    bounds: Rect,
    jpeg_tables: Option<Vec<u8>>,
) -> FieldTable {
    let bands = usize::from(class.bands);
    let mut fields = FieldTable::new();

    fields.insert(Field::new(
        Tag::ImageWidth,
        FieldValue::Long(vec![bounds.width]),
    ));
    fields.insert(Field::new(
        Tag::ImageLength,
        FieldValue::Long(vec![bounds.height]),
    ));
    fields.insert(Field::new(
        Tag::BitsPerSample,
        FieldValue::Short(vec![u16::from(class.bit_depth); bands]),
    ));
    fields.insert(Field::new(
        Tag::Compression,
        FieldValue::Short(vec![params.compression.method().to_u16()]),
    ));
    fields.insert(Field::new(
        Tag::PhotometricInterpretation,
        FieldValue::Short(vec![class.kind.photometric().to_u16()]),
    ));
    if params.reverse_fill_order && params.compression.is_fax() {
        fields.insert(Field::new(
            Tag::FillOrder,
            FieldValue::Short(vec![FillOrder::LeastSignificantFirst.to_u16()]),
        ));
    }

    let chunks = geometry.num_chunks() as usize;
    let initial_counts = if params.compression.defers_byte_counts() {
        vec![0u32; chunks]
    } else {
        geometry.byte_counts.clone()
    };
    if geometry.tiled {
        fields.insert(Field::new(
            Tag::TileWidth,
            FieldValue::Long(vec![geometry.tile_width]),
        ));
        fields.insert(Field::new(
            Tag::TileLength,
            FieldValue::Long(vec![geometry.tile_height]),
        ));
    } else {
        fields.insert(Field::new(
            Tag::RowsPerStrip,
            FieldValue::Long(vec![geometry.tile_height]),
        ));
    }
    set_chunk_fields(&mut fields, geometry.tiled, vec![0u32; chunks], initial_counts);

    fields.insert(Field::new(
        Tag::SamplesPerPixel,
        FieldValue::Short(vec![class.bands]),
    ));

    match params.compression {
        Compression::Group3OneDimensional => {
            fields.insert(Field::new(
                Tag::T4Options,
                FieldValue::Long(vec![if params.t4_pad_eols { 4 } else { 0 }]),
            ));
        }
        Compression::Group3TwoDimensional => {
            fields.insert(Field::new(
                Tag::T4Options,
                FieldValue::Long(vec![1 | if params.t4_pad_eols { 4 } else { 0 }]),
            ));
        }
        Compression::Group4 => {
            fields.insert(Field::new(Tag::T6Options, FieldValue::Long(vec![0])));
        }
        _ => {}
    }

    if let Some(palette) = &class.palette {
        fields.insert(Field::new(
            Tag::ColorMap,
            FieldValue::Short(color_map(palette, class.bit_depth)),
        ));
    }

    if !class.extra_samples.is_empty() {
        fields.insert(Field::new(
            Tag::ExtraSamples,
            FieldValue::Short(class.extra_samples.iter().map(|e| e.to_u16()).collect()),
        ));
    }

    fields.insert(Field::new(
        Tag::SampleFormat,
        FieldValue::Short(vec![class.sample_format.to_u16(); bands]),
    ));

    if let Some(tables) = jpeg_tables {
        fields.insert(Field::new(Tag::JPEGTables, FieldValue::Undefined(tables)));
    }

    if class.kind == ImageKind::YCbCr {
        fields.insert(Field::new(
            Tag::YCbCrSubSampling,
            FieldValue::Short(vec![
                u16::from(params.jpeg.max_horizontal_subsampling()),
                u16::from(params.jpeg.max_vertical_subsampling()),
            ]),
        ));
        fields.insert(Field::new(
            Tag::YCbCrPositioning,
            FieldValue::Short(vec![1]),
        ));
        fields.insert(Field::new(
            Tag::ReferenceBlackWhite,
            FieldValue::Rational(
                [0, 255, 128, 255, 128, 255]
                    .iter()
                    .map(|&n| Rational { n, d: 1 })
                    .collect(),
            ),
        ));
    }

    for field in &params.extra_fields {
        fields.insert_if_absent(field.clone());
    }

    fields
}

/// Expand an 8-bit palette into the 16-bit `ColorMap` layout: all reds, all
/// greens, all blues, each scaled to full range.
fn color_map(palette: &[[u8; 3]], bit_depth: u8) -> Vec<u16> {
    let size = 1usize << bit_depth;
    let mut map = vec![0u16; 3 * size];
    for (i, entry) in palette.iter().take(size).enumerate() {
        map[i] = u16::from(entry[0]) * 257;
        map[size + i] = u16::from(entry[1]) * 257;
        map[2 * size + i] = u16::from(entry[2]) * 257;
    }
    map
}

enum FaxMode {
    Rle,
    TwoDimensional,
    T6,
}

/// Per-page compression dispatch, holding any external codec for the page.
/// Only built for compressed pages; uncompressed data goes out directly.
enum ChunkCodec<'a> {
    PackBits,
    Deflate(u8),
    Fax(&'a mut (dyn FaxEncoder + 'static), FaxMode),
    Jpeg(&'a mut (dyn JpegEncoder + 'static)),
}

impl<'a> ChunkCodec<'a> {
    fn select(
        params: &EncodeParams,
        fax: Option<&'a mut (dyn FaxEncoder + 'static)>,
        jpeg: Option<&'a mut (dyn JpegEncoder + 'static)>,
    ) -> TiffResult<Self> {
        Ok(match params.compression {
            Compression::None => unreachable!("uncompressed pages bypass the chunk codec"),
            Compression::PackBits => ChunkCodec::PackBits,
            Compression::Deflate => ChunkCodec::Deflate(params.deflate_level),
            Compression::Group3OneDimensional => ChunkCodec::Fax(
                fax.ok_or(TiffUnsupportedError::CodecUnavailable(params.compression))?,
                FaxMode::Rle,
            ),
            Compression::Group3TwoDimensional => ChunkCodec::Fax(
                fax.ok_or(TiffUnsupportedError::CodecUnavailable(params.compression))?,
                FaxMode::TwoDimensional,
            ),
            Compression::Group4 => ChunkCodec::Fax(
                fax.ok_or(TiffUnsupportedError::CodecUnavailable(params.compression))?,
                FaxMode::T6,
            ),
            Compression::Jpeg => ChunkCodec::Jpeg(
                jpeg.ok_or(TiffUnsupportedError::CodecUnavailable(params.compression))?,
            ),
        })
    }

    /// Encode one chunk into `out`, returning the bytes written.
    #[allow(clippy::too_many_arguments)]
    fn encode_chunk(
        &mut self,
        out: &mut dyn Write,
        raster: crate::image::Raster,
        class: &ImageClass,
        params: &EncodeParams,
        chunk_w: u32,
        chunk_rows: u32,
        packed: &mut Vec<u8>,
        scratch: &mut Vec<u8>,
    ) -> TiffResult<u64> {
        if let ChunkCodec::Jpeg(encoder) = self {
            let raster = raster.translated_to_origin();
            return with_jpeg_lock(|| encoder.encode_tile(out, &raster, &params.jpeg));
        }

        pack_chunk(&raster, class, chunk_w, chunk_rows, packed);
        let row_bytes = packed_row_bytes(class, chunk_w) as usize;
        scratch.clear();
        match self {
            ChunkCodec::PackBits => {
                scratch.reserve(chunk_rows as usize * packbits::max_compressed_len(row_bytes));
                for row in packed.chunks(row_bytes) {
                    packbits::compress_row(row, scratch);
                }
            }
            ChunkCodec::Deflate(level) => {
                deflate::compress(packed, *level, scratch)?;
            }
            ChunkCodec::Fax(encoder, mode) => match mode {
                FaxMode::Rle => {
                    for row in packed.chunks(row_bytes) {
                        encoder.encode_rle(row, chunk_w, scratch)?;
                    }
                }
                FaxMode::TwoDimensional => {
                    encoder.encode_t4(
                        false,
                        params.t4_pad_eols,
                        packed,
                        row_bytes,
                        chunk_w,
                        chunk_rows,
                        scratch,
                    )?;
                }
                FaxMode::T6 => {
                    encoder.encode_t6(packed, row_bytes, chunk_w, chunk_rows, scratch)?;
                }
            },
            ChunkCodec::Jpeg(_) => unreachable!("handled above"),
        }
        out.write_all(scratch)?;
        Ok(scratch.len() as u64)
    }
}

/// Holding area for a page's compressed payload on a forward-only sink.
///
/// The temporary file comes from `tempfile::tempfile()`, which is unlinked at
/// creation, so it is reclaimed on every exit path including panics.
enum Spill {
    File(std::fs::File),
    Memory(Vec<u8>),
}

impl Spill {
    fn open(estimate: u64) -> TiffResult<Spill> {
        match tempfile::tempfile() {
            Ok(file) => Ok(Spill::File(file)),
            Err(err) => {
                if estimate > MAX_MEMORY_SPILL {
                    warn!("no spill file ({err}); payload of {estimate} bytes exceeds the memory spill limit");
                    return Err(TiffError::TempFileUnavailable);
                }
                warn!("no spill file ({err}); buffering payload in memory");
                let mut buffer = Vec::new();
                buffer
                    .try_reserve(estimate as usize)
                    .map_err(|_| TiffError::OutOfMemory)?;
                Ok(Spill::Memory(buffer))
            }
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Spill::File(file) => file,
            Spill::Memory(buffer) => buffer,
        }
    }

    fn copy_to<S: Sink>(self, writer: &mut TiffWriter<S>) -> TiffResult<()> {
        match self {
            Spill::File(mut file) => {
                file.seek(SeekFrom::Start(0))?;
                let copied = io::copy(&mut file, writer.inner_mut())?;
                writer.advance(copied);
            }
            Spill::Memory(buffer) => writer.write_bytes(&buffer)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_map_scales_to_full_range() {
        let map = color_map(&[[0, 0, 0], [255, 128, 1]], 8);
        assert_eq!(map.len(), 768);
        assert_eq!(map[1], 65535);
        assert_eq!(map[256 + 1], 128 * 257);
        assert_eq!(map[512 + 1], 257);
    }

    #[test]
    fn memory_spill_round_trips() {
        let mut spill = Spill::Memory(Vec::new());
        spill.writer().write_all(b"payload").unwrap();
        let mut out = Vec::new();
        {
            let mut writer = TiffWriter::new(
                super::super::writer::StreamSink::new(&mut out),
                super::super::writer::ByteOrder::LittleEndian,
            );
            spill.copy_to(&mut writer).unwrap();
            assert_eq!(writer.offset(), 7);
        }
        assert_eq!(out, b"payload");
    }

    #[test]
    fn file_spill_round_trips() {
        let mut spill = Spill::open(16).unwrap();
        spill.writer().write_all(b"0123456789").unwrap();
        let mut out = Vec::new();
        {
            let mut writer = TiffWriter::new(
                super::super::writer::StreamSink::new(&mut out),
                super::super::writer::ByteOrder::LittleEndian,
            );
            spill.copy_to(&mut writer).unwrap();
        }
        assert_eq!(out, b"0123456789");
    }
}
