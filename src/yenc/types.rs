use super::checksum::Checksum;

/// yEnc header from =ybegin line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YencHeader {
    /// Original filename
    pub name: String,
    /// Total size of the logical file in bytes
    pub size: u64,
    /// Declared line length (typically 128)
    pub line: u32,
    /// Part number, 0 for a single-part file
    pub part: u32,
}

/// yEnc part header from =ypart line (for multi-part files)
#[derive(Debug, Clone, Default)]
pub struct YencPart {
    /// 1-based offset of the first byte of this part in the logical file
    pub begin: u64,
    /// 1-based offset of the last byte of this part (inclusive)
    pub end: u64,
    pub(crate) checksum: Checksum,
}

impl YencPart {
    /// Number of bytes this part declares to contribute (`end - begin + 1`)
    pub fn len(&self) -> u64 {
        if self.end < self.begin {
            return 0;
        }
        self.end - self.begin + 1
    }

    /// Whether the declared range is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 0-based offset of this part in the logical file
    pub fn offset(&self) -> u64 {
        self.begin.saturating_sub(1)
    }

    /// CRC32 of the bytes decoded for this part
    pub fn crc32(&self) -> u32 {
        self.checksum.value()
    }
}

/// yEnc trailer from =yend line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YencEnd {
    /// Size of decoded data in bytes
    pub size: u64,
    /// Echo of the part number
    pub part: u32,
    /// Declared `crc32`, if present and parseable
    pub crc32: Option<u32>,
    /// Declared `pcrc32`, if present and parseable
    pub pcrc32: Option<u32>,
}

/// Metadata collected while decoding one yEnc unit
#[derive(Debug, Clone, Default)]
pub struct Meta {
    /// Parsed =ybegin line
    pub header: YencHeader,
    /// Parsed =ypart line, present iff `header.part > 0`
    pub part: Option<YencPart>,
    /// Parsed =yend line
    pub footer: YencEnd,
    pub(crate) checksum: Checksum,
}

impl Meta {
    /// CRC32 of every byte decoded by the call
    pub fn crc32(&self) -> u32 {
        self.checksum.value()
    }

    /// Number of bytes decoded by the call
    pub fn decoded_len(&self) -> u64 {
        self.checksum.len()
    }

    /// Check if this unit is one part of a multi-part file
    pub fn is_multipart(&self) -> bool {
        self.header.part > 0
    }
}

/// Complete yEnc decoded result
#[derive(Debug, Clone, Default)]
pub struct YencDecoded {
    /// Decoded binary data
    pub data: Vec<u8>,
    /// Header, part and trailer information
    pub meta: Meta,
}
