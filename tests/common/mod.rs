//! Minimal TIFF structure walker for checking encoder output.

#![allow(dead_code)]

pub struct TiffFile<'a> {
    pub data: &'a [u8],
    pub little_endian: bool,
}

pub struct Entry {
    pub tag: u16,
    pub type_: u16,
    pub count: u32,
    /// Absolute position of the entry's 4-byte value slot.
    pub value_slot: usize,
}

pub struct Ifd {
    pub offset: u32,
    pub entries: Vec<Entry>,
    pub next: u32,
}

impl Ifd {
    pub fn entry(&self, tag: u16) -> &Entry {
        self.find(tag)
            .unwrap_or_else(|| panic!("tag {} missing from IFD at {}", tag, self.offset))
    }

    pub fn find(&self, tag: u16) -> Option<&Entry> {
        self.entries.iter().find(|e| e.tag == tag)
    }
}

impl<'a> TiffFile<'a> {
    pub fn parse(data: &'a [u8]) -> Self {
        let little_endian = match &data[0..2] {
            b"II" => true,
            b"MM" => false,
            other => panic!("bad byte order marker {:?}", other),
        };
        let file = TiffFile {
            data,
            little_endian,
        };
        assert_eq!(file.u16_at(2), 42, "bad magic");
        file
    }

    pub fn u16_at(&self, at: usize) -> u16 {
        let bytes = [self.data[at], self.data[at + 1]];
        if self.little_endian {
            u16::from_le_bytes(bytes)
        } else {
            u16::from_be_bytes(bytes)
        }
    }

    pub fn u32_at(&self, at: usize) -> u32 {
        let bytes = [
            self.data[at],
            self.data[at + 1],
            self.data[at + 2],
            self.data[at + 3],
        ];
        if self.little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        }
    }

    pub fn first_ifd_offset(&self) -> u32 {
        self.u32_at(4)
    }

    /// All IFDs of the chain, in order.
    pub fn ifds(&self) -> Vec<Ifd> {
        let mut out = Vec::new();
        let mut at = self.first_ifd_offset();
        while at != 0 {
            let ifd = self.ifd_at(at);
            at = ifd.next;
            out.push(ifd);
            assert!(out.len() < 1000, "cycle in IFD chain");
        }
        out
    }

    pub fn ifd_at(&self, offset: u32) -> Ifd {
        assert_eq!(offset % 2, 0, "IFD offset {} is odd", offset);
        let base = offset as usize;
        let count = self.u16_at(base) as usize;
        let mut entries = Vec::with_capacity(count);
        let mut previous_tag = None;
        for i in 0..count {
            let at = base + 2 + 12 * i;
            let entry = Entry {
                tag: self.u16_at(at),
                type_: self.u16_at(at + 2),
                count: self.u32_at(at + 4),
                value_slot: at + 8,
            };
            if let Some(previous) = previous_tag {
                assert!(entry.tag > previous, "tags not strictly ascending");
            }
            previous_tag = Some(entry.tag);
            entries.push(entry);
        }
        Ifd {
            offset,
            entries,
            next: self.u32_at(base + 2 + 12 * count),
        }
    }

    fn type_size(type_: u16) -> usize {
        match type_ {
            1 | 2 | 6 | 7 => 1,
            3 | 8 => 2,
            4 | 9 | 11 => 4,
            5 | 10 | 12 => 8,
            other => panic!("unexpected field type {}", other),
        }
    }

    /// Position of the entry's value, following the offset when it overflows
    /// the inline slot.
    pub fn value_location(&self, entry: &Entry) -> usize {
        let total = entry.count as usize * Self::type_size(entry.type_);
        if total <= 4 {
            entry.value_slot
        } else {
            let at = self.u32_at(entry.value_slot);
            assert_eq!(at % 2, 0, "overflow value at odd offset {}", at);
            at as usize
        }
    }

    /// SHORT or LONG values widened to u32.
    pub fn entry_u32s(&self, entry: &Entry) -> Vec<u32> {
        let at = self.value_location(entry);
        (0..entry.count as usize)
            .map(|i| match entry.type_ {
                3 => u32::from(self.u16_at(at + 2 * i)),
                4 => self.u32_at(at + 4 * i),
                other => panic!("expected SHORT or LONG, got type {}", other),
            })
            .collect()
    }

    pub fn entry_u32(&self, entry: &Entry) -> u32 {
        assert_eq!(entry.count, 1);
        self.entry_u32s(entry)[0]
    }

    /// RATIONAL values as (numerator, denominator) pairs.
    pub fn entry_rationals(&self, entry: &Entry) -> Vec<(u32, u32)> {
        assert_eq!(entry.type_, 5);
        let at = self.value_location(entry);
        (0..entry.count as usize)
            .map(|i| (self.u32_at(at + 8 * i), self.u32_at(at + 8 * i + 4)))
            .collect()
    }

    /// Raw bytes of a BYTE, ASCII, or UNDEFINED entry.
    pub fn entry_bytes(&self, entry: &Entry) -> &'a [u8] {
        assert!(matches!(entry.type_, 1 | 2 | 7));
        let at = self.value_location(entry);
        &self.data[at..at + entry.count as usize]
    }

    /// Payload of a strip/tile chunk addressed by the offset and count tags.
    pub fn chunk(&self, ifd: &Ifd, index: usize) -> &'a [u8] {
        let (offsets_tag, counts_tag) = if ifd.find(322).is_some() {
            (324, 325)
        } else {
            (273, 279)
        };
        let offsets = self.entry_u32s(ifd.entry(offsets_tag));
        let counts = self.entry_u32s(ifd.entry(counts_tag));
        let at = offsets[index] as usize;
        &self.data[at..at + counts[index] as usize]
    }

    /// Concatenated payload of all chunks of the page.
    pub fn payload(&self, ifd: &Ifd) -> Vec<u8> {
        let offsets_tag = if ifd.find(322).is_some() { 324 } else { 273 };
        let n = ifd.entry(offsets_tag).count as usize;
        let mut out = Vec::new();
        for i in 0..n {
            out.extend_from_slice(self.chunk(ifd, i));
        }
        out
    }
}
