//! Contract for the external JPEG baseline encoder (TTN2 profile).

use std::io::Write;
use std::sync::Mutex;

use crate::error::TiffResult;
use crate::image::Raster;

/// Parameters forwarded to the JPEG encoder.
#[derive(Clone, Debug)]
pub struct JpegParams {
    /// Baseline quality, 1..=100.
    pub quality: u8,
    /// Horizontal subsample period per band; an empty vector means no
    /// subsampling. A period of 2 on the chroma bands yields 4:2:x.
    pub h_subsampling: Vec<u8>,
    /// Vertical subsample period per band.
    pub v_subsampling: Vec<u8>,
    /// Write abbreviated (tables-less) streams and put the tables into the
    /// `JPEGTables` field once.
    pub write_image_only: bool,
}

impl Default for JpegParams {
    fn default() -> Self {
        JpegParams {
            quality: 75,
            h_subsampling: Vec::new(),
            v_subsampling: Vec::new(),
            write_image_only: false,
        }
    }
}

impl JpegParams {
    pub(crate) fn max_horizontal_subsampling(&self) -> u8 {
        self.h_subsampling.iter().copied().max().unwrap_or(1).max(1)
    }

    pub(crate) fn max_vertical_subsampling(&self) -> u8 {
        self.v_subsampling.iter().copied().max().unwrap_or(1).max(1)
    }
}

/// A baseline JPEG bytestream encoder.
///
/// `encode_tile` writes the entire stream for one chunk directly into `sink`
/// and returns the number of bytes written; the raster it receives is
/// translated to origin (0, 0). When an RGB page is being converted to YCbCr
/// the raster arrives as RGB and the color conversion happens inside the
/// implementation.
pub trait JpegEncoder {
    fn encode_tile(
        &mut self,
        sink: &mut dyn Write,
        raster: &Raster,
        params: &JpegParams,
    ) -> TiffResult<u64>;

    /// Produce a tables-only stream for the `JPEGTables` field.
    fn write_tables(&mut self, out: &mut Vec<u8>, params: &JpegParams) -> TiffResult<()>;
}

// Some JPEG backends are not re-entrant; all invocations in this process go
// through one critical section.
static JPEG_ENCODE_LOCK: Mutex<()> = Mutex::new(());

pub(crate) fn with_jpeg_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = JPEG_ENCODE_LOCK
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f()
}
