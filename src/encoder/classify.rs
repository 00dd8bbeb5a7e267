//! Derives a conforming TIFF interpretation from a source's sample and color
//! models.

use crate::error::{ClassificationError, TiffResult, TiffUnsupportedError};
use crate::image::{AlphaMode, ColorModel, ColorSpace, SampleDataType, SampleModel};
use crate::tags::{ExtraSamples, PhotometricInterpretation, SampleFormat};

use super::compression::Compression;
use super::EncodeParams;

/// Internal classification of a source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageKind {
    BilevelWhiteZero,
    BilevelBlackZero,
    Gray,
    Palette,
    Rgb,
    Cmyk,
    YCbCr,
    CieLab,
    Generic,
}

impl ImageKind {
    pub fn photometric(self) -> PhotometricInterpretation {
        match self {
            ImageKind::BilevelWhiteZero => PhotometricInterpretation::WhiteIsZero,
            ImageKind::BilevelBlackZero | ImageKind::Gray | ImageKind::Generic => {
                PhotometricInterpretation::BlackIsZero
            }
            ImageKind::Palette => PhotometricInterpretation::RGBPalette,
            ImageKind::Rgb => PhotometricInterpretation::RGB,
            ImageKind::Cmyk => PhotometricInterpretation::CMYK,
            ImageKind::YCbCr => PhotometricInterpretation::YCbCr,
            ImageKind::CieLab => PhotometricInterpretation::CIELab,
        }
    }

    /// Color components implied by the kind, not counting extra samples.
    fn components(self) -> u16 {
        match self {
            ImageKind::BilevelWhiteZero
            | ImageKind::BilevelBlackZero
            | ImageKind::Gray
            | ImageKind::Palette
            | ImageKind::Generic => 1,
            ImageKind::Rgb | ImageKind::YCbCr | ImageKind::CieLab => 3,
            ImageKind::Cmyk => 4,
        }
    }
}

/// The classifier's verdict: everything the field builder and packer need to
/// know about the image.
#[derive(Clone, Debug)]
pub struct ImageClass {
    pub kind: ImageKind,
    pub bit_depth: u8,
    pub bands: u16,
    pub sample_format: SampleFormat,
    pub extra_samples: Vec<ExtraSamples>,
    /// Carried along for the `ColorMap` tag of palette pages.
    pub palette: Option<Vec<[u8; 3]>>,
}

impl ImageClass {
    /// Fax compressions encode exactly one one-bit band.
    pub fn is_fax_compatible(&self) -> bool {
        self.bit_depth == 1 && self.bands == 1
    }
}

fn is_black_white_palette(palette: &[[u8; 3]]) -> Option<ImageKind> {
    match palette {
        [[0, 0, 0], [255, 255, 255]] => Some(ImageKind::BilevelBlackZero),
        [[255, 255, 255], [0, 0, 0]] => Some(ImageKind::BilevelWhiteZero),
        _ => None,
    }
}

/// Classify a source image, validating it against what baseline TIFF can
/// express. Fails before any byte is written for the page.
pub(crate) fn classify(
    model: &SampleModel,
    color: Option<&ColorModel>,
    params: &EncodeParams,
) -> TiffResult<ImageClass> {
    let bands = model.bands;
    if model.bits_per_sample.is_empty()
        || model.bits_per_sample.len() != usize::from(bands)
        || model.bits_per_sample.windows(2).any(|w| w[0] != w[1])
    {
        return Err(ClassificationError::HeterogeneousBitDepth(model.bits_per_sample.clone()).into());
    }
    let bit_depth = model.bits_per_sample[0];

    if matches!(bit_depth, 1 | 4) && bands != 1 {
        return Err(ClassificationError::SubByteMultiband { bit_depth, bands }.into());
    }

    let depth_ok = match model.data_type {
        SampleDataType::Byte => matches!(bit_depth, 1 | 4 | 8),
        SampleDataType::Short | SampleDataType::UShort => bit_depth == 16,
        SampleDataType::Int | SampleDataType::Float => bit_depth == 32,
    };
    if !depth_ok {
        return Err(ClassificationError::DataTypeDepthMismatch {
            data_type: model.data_type,
            bit_depth,
        }
        .into());
    }

    let palette = color.and_then(|c| c.palette.as_ref());
    if palette.is_some() && model.data_type != SampleDataType::Byte {
        return Err(ClassificationError::PaletteOnlyByte(model.data_type).into());
    }

    let kind = match color {
        Some(c) => match &c.palette {
            Some(entries) => {
                if bands != 1 {
                    return Err(ClassificationError::UnsupportedImageKind.into());
                }
                if bit_depth == 1 && entries.len() == 2 {
                    is_black_white_palette(entries).unwrap_or(ImageKind::Palette)
                } else {
                    ImageKind::Palette
                }
            }
            None => match c.color_space {
                ColorSpace::Cmyk => ImageKind::Cmyk,
                ColorSpace::Gray => ImageKind::Gray,
                ColorSpace::Lab => ImageKind::CieLab,
                ColorSpace::Rgb => {
                    if params.compression == Compression::Jpeg
                        && params.jpeg_compress_rgb_to_ycbcr
                    {
                        ImageKind::YCbCr
                    } else {
                        ImageKind::Rgb
                    }
                }
                ColorSpace::YCbCr => ImageKind::YCbCr,
                ColorSpace::Other => ImageKind::Generic,
            },
        },
        None => {
            if bit_depth == 1 && bands == 1 {
                ImageKind::BilevelBlackZero
            } else {
                ImageKind::Generic
            }
        }
    };

    let components = kind.components();
    if bands < components {
        return Err(ClassificationError::UnsupportedImageKind.into());
    }

    let num_extra = bands - components;
    let mut extra_samples = vec![ExtraSamples::Unspecified; usize::from(num_extra)];
    if num_extra == 1 {
        if let Some(alpha) = color.and_then(|c| c.alpha) {
            extra_samples[0] = match alpha {
                AlphaMode::Premultiplied => ExtraSamples::AssociatedAlpha,
                AlphaMode::Unassociated => ExtraSamples::UnassociatedAlpha,
            };
        }
    }

    let sample_format = match model.data_type {
        SampleDataType::Byte | SampleDataType::UShort => SampleFormat::Uint,
        SampleDataType::Short | SampleDataType::Int => SampleFormat::Int,
        SampleDataType::Float => SampleFormat::IEEEFP,
    };

    // Bilevel kinds drop their synthetic two-entry colormap.
    let palette = if matches!(
        kind,
        ImageKind::BilevelBlackZero | ImageKind::BilevelWhiteZero
    ) {
        None
    } else {
        palette.cloned()
    };

    Ok(ImageClass {
        kind,
        bit_depth,
        bands,
        sample_format,
        extra_samples,
        palette,
    })
}

/// Validate the compression choice against the classified image.
pub(crate) fn check_compression(class: &ImageClass, params: &EncodeParams) -> TiffResult<()> {
    match params.compression {
        Compression::Group3OneDimensional
        | Compression::Group3TwoDimensional
        | Compression::Group4 => {
            if !class.is_fax_compatible() {
                return Err(TiffUnsupportedError::IncompatibleCompression {
                    compression: params.compression,
                    kind: class.kind,
                }
                .into());
            }
        }
        Compression::Jpeg => {
            if class.kind == ImageKind::Palette {
                return Err(TiffUnsupportedError::JpegPalette.into());
            }
            if !matches!(
                class.kind,
                ImageKind::Gray | ImageKind::Rgb | ImageKind::YCbCr
            ) || class.bit_depth != 8
            {
                return Err(TiffUnsupportedError::JpegUnsupportedKind(class.kind).into());
            }
        }
        Compression::None | Compression::PackBits | Compression::Deflate => {}
    }
    Ok(())
}
