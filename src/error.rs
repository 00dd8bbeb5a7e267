use std::error::Error;
use std::fmt;
use std::io;

use crate::encoder::compression::Compression;
use crate::encoder::ImageKind;
use crate::image::SampleDataType;

/// Tiff error kinds.
#[derive(Debug)]
pub enum TiffError {
    /// The source image cannot be expressed as a baseline TIFF.
    ClassificationError(ClassificationError),

    /// The selected encoding parameters do not work together.
    UnsupportedError(TiffUnsupportedError),

    /// An I/O Error occurred while encoding the image.
    IoError(io::Error),

    /// A deferred-offset write was requested but the sink does not support
    /// random access.
    Unseekable,

    /// A compressed payload had to be spilled, no temporary file could be
    /// opened, and the payload is too large for an in-memory spill.
    TempFileUnavailable,

    /// An in-memory spill buffer could not be allocated.
    OutOfMemory,

    /// The image has a zero-sized dimension.
    InvalidDimensions(u32, u32),

    /// A sample buffer does not match the dimensions it was declared with.
    InvalidBufferSize {
        expected: usize,
        actual: usize,
    },

    /// An integer conversion to or from a platform size failed, either due to
    /// limits of the platform size or limits of the format.
    IntSizeError,
}

/// The source image failed validation during classification.
///
/// These surface before any byte is written for the page. The list of variants
/// may grow; matching against it exhaustively is not covered by interface
/// stability guarantees.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ClassificationError {
    /// Not all bands share one sample bit depth.
    HeterogeneousBitDepth(Vec<u8>),
    /// Sub-byte depths are only defined for single-band images.
    SubByteMultiband {
        bit_depth: u8,
        bands: u16,
    },
    /// The storage data type cannot hold samples of the declared depth.
    DataTypeDepthMismatch {
        data_type: SampleDataType,
        bit_depth: u8,
    },
    /// The sample storage handed to the encoder does not match the declared
    /// data type.
    UnsupportedDataType(SampleDataType),
    /// Indexed color requires byte sample storage.
    PaletteOnlyByte(SampleDataType),
    /// No conforming combination of photometric interpretation, depth, and
    /// band count exists for the image.
    UnsupportedImageKind,
}

impl fmt::Display for ClassificationError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use self::ClassificationError::*;
        match *self {
            HeterogeneousBitDepth(ref bits) => {
                write!(fmt, "Bands have differing bit depths: {:?}.", bits)
            }
            SubByteMultiband { bit_depth, bands } => write!(
                fmt,
                "{}-bit samples require a single band, got {}.",
                bit_depth, bands
            ),
            DataTypeDepthMismatch {
                data_type,
                bit_depth,
            } => write!(
                fmt,
                "Data type {:?} cannot hold {}-bit samples.",
                data_type, bit_depth
            ),
            UnsupportedDataType(data_type) => {
                write!(fmt, "Sample storage does not match data type {:?}.", data_type)
            }
            PaletteOnlyByte(data_type) => write!(
                fmt,
                "Palette images require byte samples, got {:?}.",
                data_type
            ),
            UnsupportedImageKind => write!(
                fmt,
                "No conforming photometric interpretation exists for the image."
            ),
        }
    }
}

/// The encoder does not support the requested combination of image and
/// parameters.
///
/// The list of variants may grow. Matching against this exhaustively is not
/// covered by interface stability guarantees.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TiffUnsupportedError {
    /// JPEG cannot encode palette images.
    JpegPalette,
    /// JPEG requires 8-bit grayscale, RGB, or YCbCr input.
    JpegUnsupportedKind(ImageKind),
    /// The compression scheme cannot encode this kind of image.
    IncompatibleCompression {
        compression: Compression,
        kind: ImageKind,
    },
    /// The compression scheme needs an external codec that has not been
    /// registered on the encoder.
    CodecUnavailable(Compression),
}

impl fmt::Display for TiffUnsupportedError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use self::TiffUnsupportedError::*;
        match *self {
            JpegPalette => write!(fmt, "JPEG compression of palette images is unsupported."),
            JpegUnsupportedKind(kind) => {
                write!(fmt, "JPEG compression of {:?} images is unsupported.", kind)
            }
            IncompatibleCompression { compression, kind } => write!(
                fmt,
                "Compression {:?} cannot encode {:?} images.",
                compression, kind
            ),
            CodecUnavailable(compression) => write!(
                fmt,
                "No codec registered for compression {:?}.",
                compression
            ),
        }
    }
}

impl fmt::Display for TiffError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            TiffError::ClassificationError(ref e) => write!(fmt, "Classification error: {}", e),
            TiffError::UnsupportedError(ref f) => write!(
                fmt,
                "The encoder does not support the requested combination: {}",
                f
            ),
            TiffError::IoError(ref e) => e.fmt(fmt),
            TiffError::Unseekable => write!(fmt, "The sink does not support random access"),
            TiffError::TempFileUnavailable => write!(
                fmt,
                "No temporary spill file could be opened and the payload exceeds the in-memory spill limit"
            ),
            TiffError::OutOfMemory => write!(fmt, "An in-memory spill buffer could not be allocated"),
            TiffError::InvalidDimensions(width, height) => {
                write!(fmt, "Invalid dimensions: {}x{}.", width, height)
            }
            TiffError::InvalidBufferSize { expected, actual } => write!(
                fmt,
                "Sample buffer has {} elements, expected {}.",
                actual, expected
            ),
            TiffError::IntSizeError => write!(fmt, "Platform or format size limits exceeded"),
        }
    }
}

impl Error for TiffError {
    fn cause(&self) -> Option<&dyn Error> {
        match *self {
            TiffError::IoError(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TiffError {
    fn from(err: io::Error) -> TiffError {
        TiffError::IoError(err)
    }
}

impl From<ClassificationError> for TiffError {
    fn from(err: ClassificationError) -> TiffError {
        TiffError::ClassificationError(err)
    }
}

impl From<TiffUnsupportedError> for TiffError {
    fn from(err: TiffUnsupportedError) -> TiffError {
        TiffError::UnsupportedError(err)
    }
}

impl From<std::num::TryFromIntError> for TiffError {
    fn from(_err: std::num::TryFromIntError) -> TiffError {
        TiffError::IntSizeError
    }
}

/// Result of an image encoding process
pub type TiffResult<T> = Result<T, TiffError>;
