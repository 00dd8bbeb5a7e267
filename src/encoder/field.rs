//! IFD fields and the per-page field table.

use std::collections::BTreeMap;
use std::io::Write;

use crate::error::TiffResult;
use crate::tags::{Tag, Type};

use super::writer::TiffWriter;

/// Type to represent tiff values of type `RATIONAL`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rational {
    pub n: u32,
    pub d: u32,
}

/// Type to represent tiff values of type `SRATIONAL`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SRational {
    pub n: i32,
    pub d: i32,
}

/// The value of an IFD entry, one case per TIFF field type.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Byte(Vec<u8>),
    /// Strings are NUL-terminated on disk; a missing terminator is appended.
    /// Contents must be ASCII.
    Ascii(Vec<String>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<Rational>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<SRational>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl FieldValue {
    pub fn field_type(&self) -> Type {
        match self {
            FieldValue::Byte(_) => Type::BYTE,
            FieldValue::Ascii(_) => Type::ASCII,
            FieldValue::Short(_) => Type::SHORT,
            FieldValue::Long(_) => Type::LONG,
            FieldValue::Rational(_) => Type::RATIONAL,
            FieldValue::SByte(_) => Type::SBYTE,
            FieldValue::Undefined(_) => Type::UNDEFINED,
            FieldValue::SShort(_) => Type::SSHORT,
            FieldValue::SLong(_) => Type::SLONG,
            FieldValue::SRational(_) => Type::SRATIONAL,
            FieldValue::Float(_) => Type::FLOAT,
            FieldValue::Double(_) => Type::DOUBLE,
        }
    }

    fn type_size(&self) -> u32 {
        match self {
            FieldValue::Byte(_)
            | FieldValue::Ascii(_)
            | FieldValue::SByte(_)
            | FieldValue::Undefined(_) => 1,
            FieldValue::Short(_) | FieldValue::SShort(_) => 2,
            FieldValue::Long(_) | FieldValue::SLong(_) | FieldValue::Float(_) => 4,
            FieldValue::Rational(_) | FieldValue::SRational(_) | FieldValue::Double(_) => 8,
        }
    }

    /// Element count as written into the entry.
    ///
    /// For `Ascii` this is the on-disk byte count including NUL terminators,
    /// not the number of strings.
    pub fn count(&self) -> u32 {
        match self {
            FieldValue::Byte(v) => v.len() as u32,
            FieldValue::Ascii(strings) => strings
                .iter()
                .map(|s| s.len() as u32 + u32::from(!s.ends_with('\0')))
                .sum(),
            FieldValue::Short(v) => v.len() as u32,
            FieldValue::Long(v) => v.len() as u32,
            FieldValue::Rational(v) => v.len() as u32,
            FieldValue::SByte(v) => v.len() as u32,
            FieldValue::Undefined(v) => v.len() as u32,
            FieldValue::SShort(v) => v.len() as u32,
            FieldValue::SLong(v) => v.len() as u32,
            FieldValue::SRational(v) => v.len() as u32,
            FieldValue::Float(v) => v.len() as u32,
            FieldValue::Double(v) => v.len() as u32,
        }
    }

    /// Number of bytes the value occupies on disk.
    pub fn encoded_len(&self) -> u32 {
        self.count() * self.type_size()
    }

    /// Serialize the raw value in the writer's byte order.
    pub fn write<W: Write>(&self, writer: &mut TiffWriter<W>) -> TiffResult<()> {
        match self {
            FieldValue::Byte(v) | FieldValue::Undefined(v) => writer.write_bytes(v)?,
            FieldValue::Ascii(strings) => {
                for s in strings {
                    writer.write_bytes(s.as_bytes())?;
                    if !s.ends_with('\0') {
                        writer.write_u8(0)?;
                    }
                }
            }
            FieldValue::Short(v) => {
                for x in v {
                    writer.write_u16(*x)?;
                }
            }
            FieldValue::Long(v) => {
                for x in v {
                    writer.write_u32(*x)?;
                }
            }
            FieldValue::Rational(v) => {
                for x in v {
                    writer.write_rational(x.n, x.d)?;
                }
            }
            FieldValue::SByte(v) => {
                for x in v {
                    writer.write_i8(*x)?;
                }
            }
            FieldValue::SShort(v) => {
                for x in v {
                    writer.write_i16(*x)?;
                }
            }
            FieldValue::SLong(v) => {
                for x in v {
                    writer.write_i32(*x)?;
                }
            }
            FieldValue::SRational(v) => {
                for x in v {
                    writer.write_i32(x.n)?;
                    writer.write_i32(x.d)?;
                }
            }
            FieldValue::Float(v) => {
                for x in v {
                    writer.write_f32(*x)?;
                }
            }
            FieldValue::Double(v) => {
                for x in v {
                    writer.write_f64(*x)?;
                }
            }
        }
        Ok(())
    }
}

/// One IFD entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub tag: Tag,
    pub value: FieldValue,
}

impl Field {
    pub fn new(tag: Tag, value: FieldValue) -> Self {
        Field { tag, value }
    }

    /// Whether the value fits into the entry's 4-byte value slot.
    pub fn is_inline(&self) -> bool {
        self.value.encoded_len() <= 4
    }

    fn overflow_len(&self) -> u32 {
        let len = self.value.encoded_len();
        if len > 4 {
            // Overflow blocks are padded so every stored offset stays even.
            len + (len & 1)
        } else {
            0
        }
    }
}

/// Fields of one page, unique per tag and ordered ascending.
#[derive(Clone, Debug, Default)]
pub struct FieldTable {
    fields: BTreeMap<u16, Field>,
}

impl FieldTable {
    pub fn new() -> Self {
        FieldTable {
            fields: BTreeMap::new(),
        }
    }

    /// Insert a field, replacing any previous field with the same tag.
    pub fn insert(&mut self, field: Field) -> Option<Field> {
        self.fields.insert(field.tag.to_u16(), field)
    }

    /// Insert a field unless its tag is already present. Used when merging
    /// caller-supplied extra fields.
    pub fn insert_if_absent(&mut self, field: Field) -> bool {
        let key = field.tag.to_u16();
        if self.fields.contains_key(&key) {
            false
        } else {
            self.fields.insert(key, field);
            true
        }
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.fields.contains_key(&tag.to_u16())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Exact size of the directory on disk: entry count, entries, next-IFD
    /// pointer, and all overflow values (padded to even lengths).
    pub fn size_on_disk(&self) -> u32 {
        let overflow: u32 = self.fields.values().map(Field::overflow_len).sum();
        2 + 12 * self.fields.len() as u32 + 4 + overflow
    }

    /// Write the directory at the writer's current position.
    ///
    /// Emits exactly [`size_on_disk`] bytes; the layout planner depends on
    /// that equality.
    ///
    /// [`size_on_disk`]: FieldTable::size_on_disk
    pub(crate) fn write_to<W: Write>(
        &self,
        writer: &mut TiffWriter<W>,
        next_ifd: u32,
    ) -> TiffResult<()> {
        let base = writer.offset();
        writer.write_u16(u16::try_from(self.fields.len())?)?;

        let mut overflow_at = base + 2 + 12 * self.fields.len() as u64 + 4;
        for field in self.fields.values() {
            writer.write_u16(field.tag.to_u16())?;
            writer.write_u16(field.value.field_type().to_u16())?;
            writer.write_u32(field.value.count())?;
            let len = field.value.encoded_len();
            if len <= 4 {
                field.value.write(writer)?;
                for _ in len..4 {
                    writer.write_u8(0)?;
                }
            } else {
                writer.write_u32(u32::try_from(overflow_at)?)?;
                overflow_at += u64::from(field.overflow_len());
            }
        }
        writer.write_u32(next_ifd)?;

        for field in self.fields.values() {
            let len = field.value.encoded_len();
            if len > 4 {
                field.value.write(writer)?;
                if len % 2 != 0 {
                    writer.write_u8(0)?;
                }
            }
        }

        debug_assert_eq!(writer.offset() - base, u64::from(self.size_on_disk()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::writer::ByteOrder;

    #[test]
    fn ascii_count_includes_terminators() {
        let value = FieldValue::Ascii(vec!["abc".into(), "de\0".into()]);
        assert_eq!(value.count(), 7);
        assert_eq!(value.encoded_len(), 7);
    }

    #[test]
    fn table_orders_by_ascending_tag() {
        let mut table = FieldTable::new();
        table.insert(Field::new(Tag::SamplesPerPixel, FieldValue::Short(vec![3])));
        table.insert(Field::new(Tag::ImageWidth, FieldValue::Long(vec![2])));
        table.insert(Field::new(Tag::Compression, FieldValue::Short(vec![1])));
        let tags: Vec<u16> = table.iter().map(|f| f.tag.to_u16()).collect();
        assert_eq!(tags, [256, 259, 277]);
    }

    #[test]
    fn insert_if_absent_keeps_existing_field() {
        let mut table = FieldTable::new();
        table.insert(Field::new(Tag::ImageWidth, FieldValue::Long(vec![2])));
        assert!(!table.insert_if_absent(Field::new(Tag::ImageWidth, FieldValue::Long(vec![9]))));
        let field = table.iter().next().unwrap();
        assert_eq!(field.value, FieldValue::Long(vec![2]));
    }

    #[test]
    fn size_on_disk_matches_bytes_written() {
        let mut table = FieldTable::new();
        table.insert(Field::new(Tag::ImageWidth, FieldValue::Long(vec![100])));
        table.insert(Field::new(
            Tag::BitsPerSample,
            FieldValue::Short(vec![8, 8, 8]),
        ));
        table.insert(Field::new(
            Tag::ImageDescription,
            FieldValue::Ascii(vec!["hello".into()]),
        ));

        let mut buf = Vec::new();
        let mut writer = TiffWriter::new(&mut buf, ByteOrder::LittleEndian);
        table.write_to(&mut writer, 0).unwrap();
        assert_eq!(buf.len() as u32, table.size_on_disk());
        // Three entries, a 6-byte BitsPerSample overflow and a 6-byte string
        // overflow (5 characters plus terminator).
        assert_eq!(table.size_on_disk(), 2 + 12 * 3 + 4 + 6 + 6);
    }
}
