//! The source-image contract consumed by the encoder.
//!
//! The encoder pulls rectangular windows of samples out of an [`ImageSource`]
//! one strip or tile at a time. Sources describe their storage through a
//! [`SampleModel`] and an optional [`ColorModel`]; the returned [`Raster`]
//! either exposes raw storage the packer can copy row-by-row or generic
//! band-interleaved samples.

use crate::error::{TiffError, TiffResult};

/// A rectangular region of pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    /// The same region expressed relative to its own origin.
    pub fn at_origin(self) -> Self {
        Rect {
            x: 0,
            y: 0,
            ..self
        }
    }
}

/// Storage type of one sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleDataType {
    Byte,
    Short,
    UShort,
    Int,
    Float,
}

/// Describes how samples of a source image are typed and sized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleModel {
    pub data_type: SampleDataType,
    pub bands: u16,
    /// Bit depth per band. All bands of a baseline TIFF share one depth.
    pub bits_per_sample: Vec<u8>,
}

impl SampleModel {
    /// Model with a uniform bit depth across `bands` bands.
    pub fn new(data_type: SampleDataType, bands: u16, bit_depth: u8) -> Self {
        SampleModel {
            data_type,
            bands,
            bits_per_sample: vec![bit_depth; usize::from(bands)],
        }
    }
}

/// Color space of a [`ColorModel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Gray,
    Rgb,
    YCbCr,
    Cmyk,
    Lab,
    Other,
}

impl ColorSpace {
    /// Number of color components, not counting extra samples.
    pub fn components(self) -> u16 {
        match self {
            ColorSpace::Gray => 1,
            ColorSpace::Rgb | ColorSpace::YCbCr | ColorSpace::Lab => 3,
            ColorSpace::Cmyk => 4,
            ColorSpace::Other => 1,
        }
    }
}

/// Interpretation of an alpha band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlphaMode {
    /// Color values are premultiplied by alpha.
    Premultiplied,
    /// Alpha is independent of the color values.
    Unassociated,
}

/// Describes how sample values map to colors.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorModel {
    pub color_space: ColorSpace,
    pub alpha: Option<AlphaMode>,
    /// RGB triples for indexed images.
    pub palette: Option<Vec<[u8; 3]>>,
}

impl ColorModel {
    pub fn new(color_space: ColorSpace) -> Self {
        ColorModel {
            color_space,
            alpha: None,
            palette: None,
        }
    }

    pub fn indexed(palette: Vec<[u8; 3]>) -> Self {
        ColorModel {
            color_space: ColorSpace::Rgb,
            alpha: None,
            palette: Some(palette),
        }
    }
}

/// Sample storage of a [`Raster`].
///
/// The `Bytes` and `Bits` variants describe raw storage that the packer can
/// copy row ranges out of verbatim when the strides line up; `Int` and
/// `Float` are the generic band-interleaved fallback.
#[derive(Clone, Debug)]
pub enum Samples {
    /// Band-interleaved samples widened to `i32`.
    Int(Vec<i32>),
    /// Band-interleaved IEEE 754 samples.
    Float(Vec<f32>),
    /// 8-bit component samples with explicit strides, band-interleaved by
    /// pixel.
    Bytes {
        data: Vec<u8>,
        pixel_stride: usize,
        line_stride: usize,
    },
    /// Single-band bit-packed rows, most significant bit leftmost, each row
    /// starting on a byte boundary.
    Bits {
        data: Vec<u8>,
        line_stride: usize,
    },
}

/// A window of samples pulled out of an [`ImageSource`].
#[derive(Clone, Debug)]
pub struct Raster {
    pub rect: Rect,
    pub bands: u16,
    pub samples: Samples,
}

impl Raster {
    /// Sample at (`col`, `row`) relative to the raster origin.
    pub fn sample_i32(&self, col: u32, row: u32, band: u16) -> i32 {
        let bands = usize::from(self.bands);
        match &self.samples {
            Samples::Int(data) => {
                data[(row as usize * self.rect.width as usize + col as usize) * bands
                    + usize::from(band)]
            }
            Samples::Float(data) => {
                data[(row as usize * self.rect.width as usize + col as usize) * bands
                    + usize::from(band)] as i32
            }
            Samples::Bytes {
                data,
                pixel_stride,
                line_stride,
            } => i32::from(
                data[row as usize * line_stride
                    + col as usize * pixel_stride
                    + usize::from(band)],
            ),
            Samples::Bits { data, line_stride } => {
                let byte = data[row as usize * line_stride + (col / 8) as usize];
                i32::from((byte >> (7 - col % 8)) & 1)
            }
        }
    }

    /// Floating point sample at (`col`, `row`) relative to the raster origin.
    pub fn sample_f32(&self, col: u32, row: u32, band: u16) -> f32 {
        match &self.samples {
            Samples::Float(data) => {
                data[(row as usize * self.rect.width as usize + col as usize)
                    * usize::from(self.bands)
                    + usize::from(band)]
            }
            _ => self.sample_i32(col, row, band) as f32,
        }
    }

    /// The same raster re-addressed so that its region starts at (0, 0).
    pub fn translated_to_origin(mut self) -> Self {
        self.rect = self.rect.at_origin();
        self
    }
}

/// A raster image the encoder can pull sample windows from.
pub trait ImageSource {
    fn bounds(&self) -> Rect;

    fn sample_model(&self) -> &SampleModel;

    fn color_model(&self) -> Option<&ColorModel>;

    /// Samples of the given region. `rect` always lies within [`bounds`].
    ///
    /// [`bounds`]: ImageSource::bounds
    fn get_tile(&self, rect: Rect) -> TiffResult<Raster>;

    /// The source's native tile grid, used as the default tile size when the
    /// caller requests a tiled file without dimensions.
    fn preferred_tile_size(&self) -> Option<(u32, u32)> {
        None
    }
}

/// An [`ImageSource`] over an owned sample buffer.
#[derive(Clone, Debug)]
pub struct MemoryImage {
    width: u32,
    height: u32,
    sample_model: SampleModel,
    color_model: Option<ColorModel>,
    samples: Samples,
}

impl MemoryImage {
    /// Wrap a full-image sample buffer.
    ///
    /// The buffer length must match the declared dimensions and model.
    pub fn new(
        width: u32,
        height: u32,
        sample_model: SampleModel,
        color_model: Option<ColorModel>,
        samples: Samples,
    ) -> TiffResult<Self> {
        let storage_ok = match &samples {
            Samples::Float(_) => sample_model.data_type == SampleDataType::Float,
            Samples::Bytes { .. } | Samples::Bits { .. } => {
                sample_model.data_type == SampleDataType::Byte
            }
            Samples::Int(_) => sample_model.data_type != SampleDataType::Float,
        };
        if !storage_ok {
            return Err(crate::error::ClassificationError::UnsupportedDataType(
                sample_model.data_type,
            )
            .into());
        }
        let pixels = width as usize * height as usize;
        let expected = match &samples {
            Samples::Int(_) | Samples::Float(_) => pixels * usize::from(sample_model.bands),
            Samples::Bytes { line_stride, .. } => height as usize * line_stride,
            Samples::Bits { line_stride, .. } => height as usize * line_stride,
        };
        let actual = match &samples {
            Samples::Int(data) => data.len(),
            Samples::Float(data) => data.len(),
            Samples::Bytes { data, .. } => data.len(),
            Samples::Bits { data, .. } => data.len(),
        };
        if actual < expected {
            return Err(TiffError::InvalidBufferSize { expected, actual });
        }
        Ok(MemoryImage {
            width,
            height,
            sample_model,
            color_model,
            samples,
        })
    }

    /// 8-bit grayscale from a row-major buffer.
    pub fn gray8(width: u32, height: u32, data: Vec<u8>) -> TiffResult<Self> {
        Self::new(
            width,
            height,
            SampleModel::new(SampleDataType::Byte, 1, 8),
            Some(ColorModel::new(ColorSpace::Gray)),
            Samples::Bytes {
                data,
                pixel_stride: 1,
                line_stride: width as usize,
            },
        )
    }

    /// 8-bit RGB from a row-major, pixel-interleaved buffer.
    pub fn rgb8(width: u32, height: u32, data: Vec<u8>) -> TiffResult<Self> {
        Self::new(
            width,
            height,
            SampleModel::new(SampleDataType::Byte, 3, 8),
            Some(ColorModel::new(ColorSpace::Rgb)),
            Samples::Bytes {
                data,
                pixel_stride: 3,
                line_stride: width as usize * 3,
            },
        )
    }

    /// 8-bit RGB with an alpha band.
    pub fn rgba8(width: u32, height: u32, data: Vec<u8>, alpha: AlphaMode) -> TiffResult<Self> {
        let mut color_model = ColorModel::new(ColorSpace::Rgb);
        color_model.alpha = Some(alpha);
        Self::new(
            width,
            height,
            SampleModel::new(SampleDataType::Byte, 4, 8),
            Some(color_model),
            Samples::Bytes {
                data,
                pixel_stride: 4,
                line_stride: width as usize * 4,
            },
        )
    }

    /// 16-bit grayscale.
    pub fn gray16(width: u32, height: u32, data: Vec<u16>) -> TiffResult<Self> {
        Self::new(
            width,
            height,
            SampleModel::new(SampleDataType::UShort, 1, 16),
            Some(ColorModel::new(ColorSpace::Gray)),
            Samples::Int(data.into_iter().map(i32::from).collect()),
        )
    }

    /// 32-bit floating point grayscale.
    pub fn gray_f32(width: u32, height: u32, data: Vec<f32>) -> TiffResult<Self> {
        Self::new(
            width,
            height,
            SampleModel::new(SampleDataType::Float, 1, 32),
            Some(ColorModel::new(ColorSpace::Gray)),
            Samples::Float(data),
        )
    }

    /// Bilevel image from bit-packed rows, MSB leftmost, rows byte-aligned.
    pub fn bilevel(width: u32, height: u32, data: Vec<u8>) -> TiffResult<Self> {
        Self::new(
            width,
            height,
            SampleModel::new(SampleDataType::Byte, 1, 1),
            None,
            Samples::Bits {
                data,
                line_stride: width.div_ceil(8) as usize,
            },
        )
    }

    /// 8-bit indexed image over an RGB palette.
    pub fn palette(
        width: u32,
        height: u32,
        indices: Vec<u8>,
        palette: Vec<[u8; 3]>,
    ) -> TiffResult<Self> {
        Self::new(
            width,
            height,
            SampleModel::new(SampleDataType::Byte, 1, 8),
            Some(ColorModel::indexed(palette)),
            Samples::Bytes {
                data: indices,
                pixel_stride: 1,
                line_stride: width as usize,
            },
        )
    }

    fn crop(&self, rect: Rect) -> Raster {
        let bands = usize::from(self.sample_model.bands);
        let w = rect.width as usize;
        let h = rect.height as usize;
        let samples = match &self.samples {
            Samples::Int(data) => {
                let mut out = Vec::with_capacity(w * h * bands);
                for row in 0..h {
                    let start = ((rect.y as usize + row) * self.width as usize
                        + rect.x as usize)
                        * bands;
                    out.extend_from_slice(&data[start..start + w * bands]);
                }
                Samples::Int(out)
            }
            Samples::Float(data) => {
                let mut out = Vec::with_capacity(w * h * bands);
                for row in 0..h {
                    let start = ((rect.y as usize + row) * self.width as usize
                        + rect.x as usize)
                        * bands;
                    out.extend_from_slice(&data[start..start + w * bands]);
                }
                Samples::Float(out)
            }
            Samples::Bytes {
                data,
                pixel_stride,
                line_stride,
            } => {
                let mut out = Vec::with_capacity(w * h * bands);
                for row in 0..h {
                    let start =
                        (rect.y as usize + row) * line_stride + rect.x as usize * pixel_stride;
                    out.extend_from_slice(&data[start..start + w * pixel_stride]);
                }
                Samples::Bytes {
                    data: out,
                    pixel_stride: *pixel_stride,
                    line_stride: w * pixel_stride,
                }
            }
            Samples::Bits { data, line_stride } => {
                if rect.x % 8 == 0 {
                    let row_bytes = rect.width.div_ceil(8) as usize;
                    let mut out = Vec::with_capacity(h * row_bytes);
                    for row in 0..h {
                        let start = (rect.y as usize + row) * line_stride + rect.x as usize / 8;
                        out.extend_from_slice(&data[start..start + row_bytes]);
                    }
                    Samples::Bits {
                        data: out,
                        line_stride: row_bytes,
                    }
                } else {
                    // The window starts mid-byte, so hand out individual bits.
                    let mut out = Vec::with_capacity(w * h);
                    for row in 0..h {
                        for col in 0..w {
                            let x = rect.x as usize + col;
                            let byte = data[(rect.y as usize + row) * line_stride + x / 8];
                            out.push(i32::from((byte >> (7 - x % 8)) & 1));
                        }
                    }
                    Samples::Int(out)
                }
            }
        };
        Raster {
            rect,
            bands: self.sample_model.bands,
            samples,
        }
    }
}

impl ImageSource for MemoryImage {
    fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    fn sample_model(&self) -> &SampleModel {
        &self.sample_model
    }

    fn color_model(&self) -> Option<&ColorModel> {
        self.color_model.as_ref()
    }

    fn get_tile(&self, rect: Rect) -> TiffResult<Raster> {
        Ok(self.crop(rect))
    }
}
