//! Encoding of TIFF files.
//!
//! A [`TiffEncoder`] writes the file header at construction and appends one
//! page per [`write_image`] call, chaining their IFDs. Construct it with
//! [`TiffEncoder::new`] over anything `Write + Seek`; for forward-only
//! outputs use [`TiffEncoder::streaming`], which spills compressed payloads
//! instead of seeking.
//!
//! ```no_run
//! use std::fs::File;
//! use tiff_baseline::encoder::{EncodeParams, TiffEncoder};
//! use tiff_baseline::image::MemoryImage;
//!
//! # fn main() -> tiff_baseline::TiffResult<()> {
//! let image = MemoryImage::gray8(100, 100, vec![0; 100 * 100])?;
//! let mut encoder = TiffEncoder::new(File::create("out.tif")?)?;
//! encoder.write_image(&image, &EncodeParams::default())?;
//! # Ok(())
//! # }
//! ```
//!
//! [`write_image`]: TiffEncoder::write_image

use std::io::{Seek, Write};

use crate::error::TiffResult;
use crate::image::ImageSource;

mod classify;
pub mod compression;
mod field;
mod layout;
mod packer;
mod page;
mod writer;

pub use self::classify::ImageKind;
pub use self::compression::{Compression, FaxEncoder, JpegEncoder, JpegParams};
pub use self::field::{Field, FieldTable, FieldValue, Rational, SRational};
pub use self::writer::{ByteOrder, SeekSink, Sink, StreamSink, TiffWriter};

/// Parameters controlling how a page is encoded.
#[derive(Clone, Debug)]
pub struct EncodeParams {
    /// Per-chunk compression scheme.
    pub compression: Compression,
    /// Deflate level, 0..=9.
    pub deflate_level: u8,
    /// Emit tile tags instead of strip tags.
    pub write_tiled: bool,
    /// Tile width; 0 inherits the source's preferred tile size.
    pub tile_width: u32,
    /// Tile height, or rows per strip when striped; 0 uses the default.
    pub tile_height: u32,
    /// Declare `FillOrder = 2`. The registered fax encoder is expected to
    /// emit its bits in that order.
    pub reverse_fill_order: bool,
    /// Pad T.4 EOL codes to byte boundaries.
    pub t4_pad_eols: bool,
    /// Parameters handed to the external JPEG encoder.
    pub jpeg: JpegParams,
    /// Hand RGB sources to JPEG unconverted and declare the page YCbCr; the
    /// color conversion happens inside the JPEG encoder.
    pub jpeg_compress_rgb_to_ycbcr: bool,
    /// Caller-supplied fields, merged into the IFD where their tag is not
    /// already taken.
    pub extra_fields: Vec<Field>,
}

impl Default for EncodeParams {
    fn default() -> Self {
        EncodeParams {
            compression: Compression::None,
            deflate_level: 6,
            write_tiled: false,
            tile_width: 0,
            tile_height: 0,
            reverse_fill_order: false,
            t4_pad_eols: false,
            jpeg: JpegParams::default(),
            jpeg_compress_rgb_to_ycbcr: false,
            extra_fields: Vec::new(),
        }
    }
}

/// TIFF encoder over a byte sink.
///
/// Pages are written strictly sequentially; each page owns the sink for its
/// duration. External fax and JPEG codecs are registered once per encoder.
pub struct TiffEncoder<S: Sink> {
    writer: TiffWriter<S>,
    fax: Option<Box<dyn FaxEncoder>>,
    jpeg: Option<Box<dyn JpegEncoder>>,
    /// Position of the last page's next-IFD pointer, still zero on disk.
    next_link: Option<u64>,
}

impl<W: Write + Seek> TiffEncoder<SeekSink<W>> {
    /// Little-endian encoder over a seekable writer.
    pub fn new(writer: W) -> TiffResult<Self> {
        Self::with_byte_order(writer, ByteOrder::LittleEndian)
    }

    pub fn with_byte_order(writer: W, order: ByteOrder) -> TiffResult<Self> {
        Self::start(SeekSink::new(writer), order)
    }
}

impl<W: Write> TiffEncoder<StreamSink<W>> {
    /// Little-endian encoder over a forward-only writer.
    ///
    /// Compressed payloads are staged in a spill (temporary file, or memory
    /// as a fallback) so the sink is only ever appended to. Multiple pages
    /// must go through [`write_images`] on such a sink, since appending a
    /// page later would require patching the previous IFD in place.
    ///
    /// [`write_images`]: TiffEncoder::write_images
    pub fn streaming(writer: W) -> TiffResult<Self> {
        Self::streaming_with_byte_order(writer, ByteOrder::LittleEndian)
    }

    pub fn streaming_with_byte_order(writer: W, order: ByteOrder) -> TiffResult<Self> {
        Self::start(StreamSink::new(writer), order)
    }
}

impl<S: Sink> TiffEncoder<S> {
    fn start(sink: S, order: ByteOrder) -> TiffResult<Self> {
        let mut writer = TiffWriter::new(sink, order);
        match order {
            ByteOrder::LittleEndian => writer.write_u16(0x4949)?, // "II"
            ByteOrder::BigEndian => writer.write_u16(0x4D4D)?,    // "MM"
        }
        writer.write_u16(42)?;
        writer.write_u32(8)?;
        Ok(TiffEncoder {
            writer,
            fax: None,
            jpeg: None,
            next_link: None,
        })
    }

    /// Register the CCITT encoder used for the T.4 and T.6 compressions.
    pub fn set_fax_encoder(&mut self, encoder: Box<dyn FaxEncoder>) {
        self.fax = Some(encoder);
    }

    /// Register the JPEG encoder used for TTN2 compression.
    pub fn set_jpeg_encoder(&mut self, encoder: Box<dyn JpegEncoder>) {
        self.jpeg = Some(encoder);
    }

    /// Point the previous page's next-IFD field at the current position.
    fn link_previous(&mut self) -> TiffResult<()> {
        if let Some(link) = self.next_link.take() {
            self.writer.pad_word_boundary()?;
            let here = self.writer.offset();
            self.writer.seek_to(link)?;
            self.writer.write_u32(u32::try_from(here)?)?;
            self.writer.seek_to(here)?;
        }
        Ok(())
    }

    /// Append one page.
    ///
    /// On a streaming sink only a single page can be written this way; use
    /// [`write_images`] for multi-page output there.
    ///
    /// [`write_images`]: TiffEncoder::write_images
    pub fn write_image(
        &mut self,
        image: &dyn ImageSource,
        params: &EncodeParams,
    ) -> TiffResult<()> {
        self.link_previous()?;
        let link = page::write_page(
            &mut self.writer,
            image,
            params,
            self.fax.as_deref_mut(),
            self.jpeg.as_deref_mut(),
            false,
        )?;
        self.next_link = Some(link);
        Ok(())
    }

    /// Append a sequence of pages in one pass.
    ///
    /// The IFD chain is emitted with lookahead, so this works on streaming
    /// sinks too: every page but the last points at its successor and the
    /// last page terminates the chain.
    pub fn write_images<'a, I>(&mut self, pages: I) -> TiffResult<()>
    where
        I: IntoIterator<Item = (&'a dyn ImageSource, EncodeParams)>,
    {
        self.link_previous()?;
        let mut pages = pages.into_iter().peekable();
        while let Some((image, params)) = pages.next() {
            let chain = pages.peek().is_some();
            let link = page::write_page(
                &mut self.writer,
                image,
                &params,
                self.fax.as_deref_mut(),
                self.jpeg.as_deref_mut(),
                chain,
            )?;
            if !chain {
                self.next_link = Some(link);
            }
        }
        Ok(())
    }

    /// Current position of the underlying sink.
    pub fn offset(&self) -> u64 {
        self.writer.offset()
    }

    /// Give back the sink. The file is complete as written; nothing is
    /// buffered in the encoder.
    pub fn into_inner(self) -> S {
        self.writer.into_inner()
    }
}
