use std::io::{self, Seek, SeekFrom, Write};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use crate::error::{TiffError, TiffResult};

/// Byte order of a TIFF stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// Random-access capability of an output, erased at encoder construction.
///
/// [`SeekSink`] patches deferred offsets in place; [`StreamSink`] reports
/// `Unseekable` so the page writer falls back to a spill strategy.
pub trait Sink: Write {
    fn seek_to(&mut self, pos: u64) -> TiffResult<()>;

    fn is_seekable(&self) -> bool;
}

/// Sink over a random-access writer.
pub struct SeekSink<W>(W);

impl<W: Write + Seek> SeekSink<W> {
    pub fn new(writer: W) -> Self {
        SeekSink(writer)
    }

    pub fn into_inner(self) -> W {
        self.0
    }
}

impl<W: Write> Write for SeekSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write + Seek> Sink for SeekSink<W> {
    fn seek_to(&mut self, pos: u64) -> TiffResult<()> {
        self.0.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn is_seekable(&self) -> bool {
        true
    }
}

/// Sink over a forward-only writer.
pub struct StreamSink<W>(W);

impl<W: Write> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        StreamSink(writer)
    }

    pub fn into_inner(self) -> W {
        self.0
    }
}

impl<W: Write> Write for StreamSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> Sink for StreamSink<W> {
    fn seek_to(&mut self, _pos: u64) -> TiffResult<()> {
        Err(TiffError::Unseekable)
    }

    fn is_seekable(&self) -> bool {
        false
    }
}

/// Write-only byte sink serializing primitives in a configured byte order.
///
/// The tracked `offset` is authoritative for the file pointer; layout
/// accounting relies on it matching the bytes actually emitted.
pub struct TiffWriter<W> {
    writer: W,
    order: ByteOrder,
    offset: u64,
}

impl<W: Write> TiffWriter<W> {
    pub fn new(writer: W, order: ByteOrder) -> Self {
        Self {
            writer,
            order,
            offset: 0,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The raw output, for codecs that write to the sink themselves.
    ///
    /// Callers must account for bytes written this way via [`advance`].
    ///
    /// [`advance`]: TiffWriter::advance
    pub(crate) fn inner_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub(crate) fn advance(&mut self, count: u64) {
        self.offset += count;
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), io::Error> {
        self.writer.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, n: u8) -> Result<(), io::Error> {
        self.writer.write_u8(n)?;
        self.offset += 1;
        Ok(())
    }

    pub fn write_i8(&mut self, n: i8) -> Result<(), io::Error> {
        self.writer.write_i8(n)?;
        self.offset += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, n: u16) -> Result<(), io::Error> {
        match self.order {
            ByteOrder::LittleEndian => self.writer.write_u16::<LittleEndian>(n)?,
            ByteOrder::BigEndian => self.writer.write_u16::<BigEndian>(n)?,
        }
        self.offset += 2;
        Ok(())
    }

    pub fn write_i16(&mut self, n: i16) -> Result<(), io::Error> {
        match self.order {
            ByteOrder::LittleEndian => self.writer.write_i16::<LittleEndian>(n)?,
            ByteOrder::BigEndian => self.writer.write_i16::<BigEndian>(n)?,
        }
        self.offset += 2;
        Ok(())
    }

    pub fn write_u32(&mut self, n: u32) -> Result<(), io::Error> {
        match self.order {
            ByteOrder::LittleEndian => self.writer.write_u32::<LittleEndian>(n)?,
            ByteOrder::BigEndian => self.writer.write_u32::<BigEndian>(n)?,
        }
        self.offset += 4;
        Ok(())
    }

    pub fn write_i32(&mut self, n: i32) -> Result<(), io::Error> {
        match self.order {
            ByteOrder::LittleEndian => self.writer.write_i32::<LittleEndian>(n)?,
            ByteOrder::BigEndian => self.writer.write_i32::<BigEndian>(n)?,
        }
        self.offset += 4;
        Ok(())
    }

    pub fn write_f32(&mut self, n: f32) -> Result<(), io::Error> {
        match self.order {
            ByteOrder::LittleEndian => self.writer.write_f32::<LittleEndian>(n)?,
            ByteOrder::BigEndian => self.writer.write_f32::<BigEndian>(n)?,
        }
        self.offset += 4;
        Ok(())
    }

    pub fn write_rational(&mut self, n: u32, d: u32) -> Result<(), io::Error> {
        self.write_u32(n)?;
        self.write_u32(d)
    }

    pub fn write_f64(&mut self, n: f64) -> Result<(), io::Error> {
        match self.order {
            ByteOrder::LittleEndian => self.writer.write_f64::<LittleEndian>(n)?,
            ByteOrder::BigEndian => self.writer.write_f64::<BigEndian>(n)?,
        }
        self.offset += 8;
        Ok(())
    }

    /// Pad with a zero byte so the next offset is word-aligned.
    pub fn pad_word_boundary(&mut self) -> Result<(), io::Error> {
        if self.offset % 2 != 0 {
            self.write_u8(0)?;
        }
        Ok(())
    }
}

impl<S: Sink> TiffWriter<S> {
    pub fn is_seekable(&self) -> bool {
        self.writer.is_seekable()
    }

    pub fn seek_to(&mut self, pos: u64) -> TiffResult<()> {
        self.writer.seek_to(pos)?;
        self.offset = pos;
        Ok(())
    }
}
