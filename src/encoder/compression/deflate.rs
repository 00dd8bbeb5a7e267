//! Deflate (zlib) compression of packed chunks.

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression as FlateCompression};

use crate::error::TiffResult;

/// Compress one chunk's packed bytes, appending to `out`.
///
/// A fresh encoder per chunk gives each strip or tile an independent zlib
/// stream, which is what readers of Deflate-in-TIFF expect.
pub(crate) fn compress(bytes: &[u8], level: u8, out: &mut Vec<u8>) -> TiffResult<()> {
    let mut encoder = ZlibEncoder::new(out, FlateCompression::new(u32::from(level.min(9))));
    encoder.write_all(bytes)?;
    encoder.finish()?;
    Ok(())
}
