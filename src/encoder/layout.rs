//! Strip and tile geometry planning.

use crate::error::{TiffError, TiffResult};
use crate::image::Rect;

use super::classify::ImageClass;
use super::compression::Compression;
use super::packer::packed_row_bytes;
use super::EncodeParams;

/// Rows per strip when the caller has not asked for anything else.
const DEFAULT_ROWS_PER_STRIP: u32 = 8;

/// Tile edge when neither the caller nor the source suggests one.
const DEFAULT_TILE_SIZE: u32 = 256;

/// Geometry of one page's payload chunks.
///
/// A striped page is treated as a single column of full-width tiles whose
/// last chunk may be short; a tiled page pads every chunk to full size.
#[derive(Clone, Debug)]
pub(crate) struct TileGeometry {
    pub tiled: bool,
    pub tile_width: u32,
    /// Chunk height; for strips this is the `RowsPerStrip` value.
    pub tile_height: u32,
    pub tiles_across: u32,
    pub tiles_down: u32,
    pub bytes_per_row: u32,
    pub bytes_per_tile: u32,
    /// Payload size per chunk. Exact for uncompressed data, replaced as
    /// chunks complete otherwise.
    pub byte_counts: Vec<u32>,
}

impl TileGeometry {
    pub fn num_chunks(&self) -> u32 {
        self.tiles_across * self.tiles_down
    }

    pub fn total_payload(&self) -> u64 {
        self.byte_counts.iter().map(|&n| u64::from(n)).sum()
    }

    /// Source region of the chunk at `index`, in row-major chunk order,
    /// clipped to the image bounds.
    pub fn chunk_rect(&self, bounds: Rect, index: u32) -> Rect {
        let tx = index % self.tiles_across;
        let ty = index / self.tiles_across;
        let x = bounds.x + tx * self.tile_width;
        let y = bounds.y + ty * self.tile_height;
        Rect {
            x,
            y,
            width: self.tile_width.min(bounds.x + bounds.width - x),
            height: self.tile_height.min(bounds.y + bounds.height - y),
        }
    }

    /// Packed dimensions of a chunk: tiles pad to full size, strips shrink
    /// with the image.
    pub fn chunk_dims(&self, rect: Rect) -> (u32, u32) {
        if self.tiled {
            (self.tile_width, self.tile_height)
        } else {
            (self.tile_width, rect.height)
        }
    }
}

fn round_up(value: u32, multiple: u32) -> u32 {
    value.div_ceil(multiple) * multiple
}

/// Plan the chunk grid and initial byte counts for one page.
pub(crate) fn plan_geometry(
    bounds: Rect,
    class: &ImageClass,
    params: &EncodeParams,
    source_tile_size: Option<(u32, u32)>,
) -> TiffResult<TileGeometry> {
    if bounds.width == 0 || bounds.height == 0 {
        return Err(TiffError::InvalidDimensions(bounds.width, bounds.height));
    }

    // JPEG chunks must cover whole MCUs.
    let (mcu_w, mcu_h) = if params.compression == Compression::Jpeg {
        (
            8 * u32::from(params.jpeg.max_horizontal_subsampling()),
            8 * u32::from(params.jpeg.max_vertical_subsampling()),
        )
    } else {
        (1, 1)
    };

    let geometry = if params.write_tiled {
        let (pref_w, pref_h) = source_tile_size.unwrap_or((DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE));
        let mut tile_width = if params.tile_width > 0 {
            params.tile_width
        } else {
            pref_w
        };
        let mut tile_height = if params.tile_height > 0 {
            params.tile_height
        } else {
            pref_h
        };
        tile_width = round_up(tile_width, mcu_w);
        tile_height = round_up(tile_height, mcu_h);

        let tiles_across = bounds.width.div_ceil(tile_width);
        let tiles_down = bounds.height.div_ceil(tile_height);
        let bytes_per_row = u32::try_from(packed_row_bytes(class, tile_width))?;
        let bytes_per_tile = bytes_per_row
            .checked_mul(tile_height)
            .ok_or(TiffError::IntSizeError)?;
        let byte_counts = vec![bytes_per_tile; (tiles_across * tiles_down) as usize];

        TileGeometry {
            tiled: true,
            tile_width,
            tile_height,
            tiles_across,
            tiles_down,
            bytes_per_row,
            bytes_per_tile,
            byte_counts,
        }
    } else {
        let requested = if params.tile_height > 0 {
            params.tile_height
        } else {
            DEFAULT_ROWS_PER_STRIP
        };
        let rows_per_strip = round_up(requested.min(bounds.height), mcu_h);
        let strips = bounds.height.div_ceil(rows_per_strip);
        let bytes_per_row = u32::try_from(packed_row_bytes(class, bounds.width))?;
        let bytes_per_strip = bytes_per_row
            .checked_mul(rows_per_strip)
            .ok_or(TiffError::IntSizeError)?;

        let mut byte_counts = vec![bytes_per_strip; strips as usize];
        let last_rows = bounds.height - (strips - 1) * rows_per_strip;
        if let Some(last) = byte_counts.last_mut() {
            *last = bytes_per_row * last_rows;
        }

        TileGeometry {
            tiled: false,
            tile_width: bounds.width,
            tile_height: rows_per_strip,
            tiles_across: 1,
            tiles_down: strips,
            bytes_per_row,
            bytes_per_tile: bytes_per_strip,
            byte_counts,
        }
    };

    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageSource, MemoryImage};

    fn gray8_class(width: u32, height: u32) -> ImageClass {
        let image = MemoryImage::gray8(width, height, vec![0; (width * height) as usize]).unwrap();
        super::super::classify::classify(
            image.sample_model(),
            image.color_model(),
            &EncodeParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn short_last_strip_truncates_its_byte_count() {
        let class = gray8_class(4, 10);
        let geometry = plan_geometry(
            Rect::new(0, 0, 4, 10),
            &class,
            &EncodeParams::default(),
            None,
        )
        .unwrap();
        assert_eq!(geometry.tile_height, 8);
        assert_eq!(geometry.num_chunks(), 2);
        assert_eq!(geometry.byte_counts, vec![32, 8]);
        assert_eq!(geometry.total_payload(), 40);
    }

    #[test]
    fn strips_never_exceed_the_image_height() {
        let class = gray8_class(7, 3);
        let geometry = plan_geometry(
            Rect::new(0, 0, 7, 3),
            &class,
            &EncodeParams::default(),
            None,
        )
        .unwrap();
        assert_eq!(geometry.tile_height, 3);
        assert_eq!(geometry.num_chunks(), 1);
    }

    #[test]
    fn tiled_pages_pad_every_chunk_to_full_size() {
        let class = gray8_class(10, 10);
        let params = EncodeParams {
            write_tiled: true,
            tile_width: 8,
            tile_height: 8,
            ..EncodeParams::default()
        };
        let geometry =
            plan_geometry(Rect::new(0, 0, 10, 10), &class, &params, None).unwrap();
        assert_eq!((geometry.tiles_across, geometry.tiles_down), (2, 2));
        assert_eq!(geometry.byte_counts, vec![64; 4]);
        let edge = geometry.chunk_rect(Rect::new(0, 0, 10, 10), 3);
        assert_eq!((edge.width, edge.height), (2, 2));
        assert_eq!(geometry.chunk_dims(edge), (8, 8));
    }

    #[test]
    fn jpeg_chunks_round_up_to_mcu_multiples() {
        let image = MemoryImage::rgb8(20, 20, vec![0; 1200]).unwrap();
        let mut params = EncodeParams {
            compression: Compression::Jpeg,
            ..EncodeParams::default()
        };
        params.jpeg.h_subsampling = vec![1, 2, 2];
        params.jpeg.v_subsampling = vec![1, 2, 2];
        let class = super::super::classify::classify(
            image.sample_model(),
            image.color_model(),
            &params,
        )
        .unwrap();

        let striped =
            plan_geometry(Rect::new(0, 0, 20, 20), &class, &params, None).unwrap();
        assert_eq!(striped.tile_height % 16, 0);

        let tiled_params = EncodeParams {
            write_tiled: true,
            tile_width: 20,
            tile_height: 20,
            ..params
        };
        let tiled =
            plan_geometry(Rect::new(0, 0, 20, 20), &class, &tiled_params, None).unwrap();
        assert_eq!(tiled.tile_width % 16, 0);
        assert_eq!(tiled.tile_height % 16, 0);
    }
}
