//! Encoding of baseline TIFF images.
//!
//! This crate serializes raster images into TIFF 6.0 baseline files,
//! including the Technical Note 2 JPEG-in-TIFF profile and the Adobe Deflate
//! extension. PackBits and Deflate compression are built in; CCITT fax and
//! JPEG bytestream encoders plug in through the contracts in
//! [`encoder::compression`].
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> - The TIFF specification

pub mod encoder;
mod error;
pub mod image;
pub mod tags;

pub use self::error::{
    ClassificationError, TiffError, TiffResult, TiffUnsupportedError,
};
