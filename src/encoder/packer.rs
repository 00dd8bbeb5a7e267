//! Packs raster samples into TIFF's row-major byte layout.
//!
//! The packer is pure: it fills a caller-owned buffer and never touches the
//! sink. Sample bytes of 16- and 32-bit depths are serialized high byte first
//! regardless of the file's declared byte order; conformant readers follow
//! the declared order for tag data only after applying the same convention,
//! and pinning it keeps output bit-exact across both byte orders.

use crate::image::{Raster, Samples};
use crate::tags::SampleFormat;

use super::classify::ImageClass;

/// Bytes of one packed row at the given pixel width.
pub(crate) fn packed_row_bytes(class: &ImageClass, width: u32) -> u64 {
    let width = u64::from(width);
    let bands = u64::from(class.bands);
    match class.bit_depth {
        1 => width.div_ceil(8),
        4 => width.div_ceil(2),
        8 => width * bands,
        16 => width * bands * 2,
        _ => width * bands * 4,
    }
}

/// Pack a raster window into `out` as a `tile_rows x tile_width` chunk.
///
/// The raster may be smaller than the chunk (edge tiles, short last strips);
/// the remainder is zero-filled.
pub(crate) fn pack_chunk(
    raster: &Raster,
    class: &ImageClass,
    tile_width: u32,
    tile_rows: u32,
    out: &mut Vec<u8>,
) {
    let row_bytes = packed_row_bytes(class, tile_width) as usize;
    out.clear();
    out.resize(row_bytes * tile_rows as usize, 0);

    let width = raster.rect.width.min(tile_width);
    let rows = raster.rect.height.min(tile_rows);

    match class.bit_depth {
        1 => pack_bits(raster, width, rows, row_bytes, out),
        4 => pack_nibbles(raster, width, rows, row_bytes, out),
        8 => pack_bytes(raster, class, width, rows, row_bytes, out),
        16 => pack_shorts(raster, class, width, rows, row_bytes, out),
        _ => pack_longs(raster, class, width, rows, row_bytes, out),
    }
}

fn pack_bits(raster: &Raster, width: u32, rows: u32, row_bytes: usize, out: &mut [u8]) {
    let src_row_bytes = width.div_ceil(8) as usize;
    if let Samples::Bits { data, line_stride } = &raster.samples {
        // Bit-packed source with byte-aligned rows: copy rows verbatim.
        for row in 0..rows as usize {
            let src = &data[row * line_stride..row * line_stride + src_row_bytes];
            let dst = &mut out[row * row_bytes..row * row_bytes + src_row_bytes];
            dst.copy_from_slice(src);
            if width % 8 != 0 {
                // Trailing bits beyond the raster width are unspecified in
                // the source; clear them so output stays deterministic.
                dst[src_row_bytes - 1] &= 0xFFu8 << (8 - width % 8);
            }
        }
    } else {
        for row in 0..rows {
            for col in 0..width {
                let bit = (raster.sample_i32(col, row, 0) & 1) as u8;
                out[row as usize * row_bytes + (col / 8) as usize] |= bit << (7 - col % 8);
            }
        }
    }
}

fn pack_nibbles(raster: &Raster, width: u32, rows: u32, row_bytes: usize, out: &mut [u8]) {
    for row in 0..rows {
        for col in 0..width {
            let nibble = (raster.sample_i32(col, row, 0) & 0xF) as u8;
            let shift = if col % 2 == 0 { 4 } else { 0 };
            out[row as usize * row_bytes + (col / 2) as usize] |= nibble << shift;
        }
    }
}

fn pack_bytes(
    raster: &Raster,
    class: &ImageClass,
    width: u32,
    rows: u32,
    row_bytes: usize,
    out: &mut [u8],
) {
    let bands = usize::from(class.bands);
    match &raster.samples {
        Samples::Bytes {
            data,
            pixel_stride,
            line_stride,
        } if *pixel_stride == bands => {
            // Contiguous pixel-interleaved source: copy row ranges verbatim.
            let src_row_bytes = width as usize * bands;
            for row in 0..rows as usize {
                out[row * row_bytes..row * row_bytes + src_row_bytes]
                    .copy_from_slice(&data[row * line_stride..row * line_stride + src_row_bytes]);
            }
        }
        _ => {
            for row in 0..rows {
                for col in 0..width {
                    for band in 0..class.bands {
                        out[row as usize * row_bytes
                            + (col as usize * bands + usize::from(band))] =
                            raster.sample_i32(col, row, band) as u8;
                    }
                }
            }
        }
    }
}

fn pack_shorts(
    raster: &Raster,
    class: &ImageClass,
    width: u32,
    rows: u32,
    row_bytes: usize,
    out: &mut [u8],
) {
    let bands = usize::from(class.bands);
    for row in 0..rows {
        for col in 0..width {
            for band in 0..class.bands {
                let value = raster.sample_i32(col, row, band) as u16;
                let at = row as usize * row_bytes
                    + (col as usize * bands + usize::from(band)) * 2;
                out[at] = (value >> 8) as u8;
                out[at + 1] = value as u8;
            }
        }
    }
}

fn pack_longs(
    raster: &Raster,
    class: &ImageClass,
    width: u32,
    rows: u32,
    row_bytes: usize,
    out: &mut [u8],
) {
    let bands = usize::from(class.bands);
    for row in 0..rows {
        for col in 0..width {
            for band in 0..class.bands {
                let value = if class.sample_format == SampleFormat::IEEEFP {
                    raster.sample_f32(col, row, band).to_bits()
                } else {
                    raster.sample_i32(col, row, band) as u32
                };
                let at = row as usize * row_bytes
                    + (col as usize * bands + usize::from(band)) * 4;
                out[at..at + 4].copy_from_slice(&value.to_be_bytes());
            }
        }
    }
}
