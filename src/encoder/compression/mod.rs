//! Per-chunk compression schemes and the contracts of external codecs.

use crate::tags::CompressionMethod;

pub(crate) mod deflate;
mod fax;
mod jpeg;
pub(crate) mod packbits;

pub use self::fax::FaxEncoder;
pub use self::jpeg::{JpegEncoder, JpegParams};

pub(crate) use self::jpeg::with_jpeg_lock;

/// Compression scheme applied to each strip or tile of a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// Packed bytes are written verbatim.
    #[default]
    None,
    /// TIFF 6.0 byte-oriented RLE, row by row.
    PackBits,
    /// Adobe Deflate (zlib streams per chunk).
    Deflate,
    /// CCITT T.4, one-dimensional (MH) coding per row.
    Group3OneDimensional,
    /// CCITT T.4 with two-dimensional (MR) coding.
    Group3TwoDimensional,
    /// CCITT T.6 (MMR).
    Group4,
    /// JPEG-in-TIFF per Technical Note 2.
    Jpeg,
}

impl Compression {
    /// Value of the `Compression` tag.
    pub fn method(self) -> CompressionMethod {
        match self {
            Compression::None => CompressionMethod::None,
            Compression::PackBits => CompressionMethod::PackBits,
            Compression::Deflate => CompressionMethod::Deflate,
            Compression::Group3OneDimensional | Compression::Group3TwoDimensional => {
                CompressionMethod::Fax3
            }
            Compression::Group4 => CompressionMethod::Fax4,
            Compression::Jpeg => CompressionMethod::ModernJPEG,
        }
    }

    pub(crate) fn is_fax(self) -> bool {
        matches!(
            self,
            Compression::Group3OneDimensional
                | Compression::Group3TwoDimensional
                | Compression::Group4
        )
    }

    /// Whether chunk byte counts are only known after encoding.
    pub(crate) fn defers_byte_counts(self) -> bool {
        self != Compression::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_tag_values() {
        assert_eq!(Compression::None.method().to_u16(), 1);
        assert_eq!(Compression::Group3OneDimensional.method().to_u16(), 3);
        assert_eq!(Compression::Group3TwoDimensional.method().to_u16(), 3);
        assert_eq!(Compression::Group4.method().to_u16(), 4);
        assert_eq!(Compression::Jpeg.method().to_u16(), 7);
        assert_eq!(Compression::Deflate.method().to_u16(), 8);
        assert_eq!(Compression::PackBits.method().to_u16(), 0x8005);
    }
}
