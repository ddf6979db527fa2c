use std::io::BufRead;

use tracing::{debug, trace};

use crate::error::{ChecksumScope, Result, Section, YencError};

use super::types::{Meta, YencDecoded, YencPart};

/// yEnc escape character
pub const ESCAPE: u8 = b'=';

/// Options for the yEnc protocol decoder
///
/// # Example
/// ```
/// use yenc_pool::yenc::DecodeOptions;
///
/// let input = b"=ybegin line=128 size=1 name=a.bin\r\nk\r\n=yend size=1\r\n";
/// let decoded = DecodeOptions::strict().decode(input).unwrap();
/// assert_eq!(decoded.data, b"A");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodeOptions {
    /// Reject unparseable numeric attributes instead of reading them as zero
    pub strict: bool,
}

impl DecodeOptions {
    /// Lenient options: unparseable numbers are read as zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict options: unparseable numbers fail with [`YencError::InvalidNumber`]
    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Decode one yEnc unit held in memory
    pub fn decode(&self, input: &[u8]) -> Result<YencDecoded> {
        self.decode_reader(input)
    }

    /// Decode one yEnc unit read line by line from `reader`
    ///
    /// Lines before `=ybegin` are skipped, so a raw article body with headers
    /// can be passed as is. Checksum mismatches are reported as
    /// [`YencError::ChecksumMismatch`] carrying the decoded bytes.
    pub fn decode_reader<R: BufRead>(&self, mut reader: R) -> Result<YencDecoded> {
        let mut meta = Meta::default();
        let mut line = Vec::new();

        find_marker(&mut reader, &mut line, Section::Begin)?;
        Section::Begin.parse(&mut meta, &String::from_utf8_lossy(&line), self.strict)?;

        // If multipart, then header.part > 0
        if meta.header.part > 0 {
            find_marker(&mut reader, &mut line, Section::Part)?;
            Section::Part.parse(&mut meta, &String::from_utf8_lossy(&line), self.strict)?;
        }

        trace!(
            name = %meta.header.name,
            part = meta.header.part,
            "Parsed yEnc header"
        );

        let mut data = Vec::new();
        let end_marker = Section::End.marker().as_bytes();

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                return Err(YencError::MissingMarker {
                    marker: Section::End.marker(),
                });
            }

            let body = trim_line_end(&line);

            if body.starts_with(end_marker) {
                Section::End.parse(&mut meta, &String::from_utf8_lossy(body), self.strict)?;
                break;
            }

            let start = data.len();
            decode_line(body, &mut data);

            let decoded = &data[start..];
            meta.checksum.update(decoded);
            if let Some(part) = meta.part.as_mut() {
                part.checksum.update(decoded);
            }
        }

        verify(YencDecoded { data, meta })
    }
}

/// Decode yEnc encoded data with lenient options
///
/// # Arguments
/// * `input` - yEnc encoded data as bytes including =ybegin, data lines, and =yend
///
/// # Example
/// ```
/// let input = b"=ybegin line=128 size=4 name=test.txt\r\n~\x8f\x9d\x9e\r\n=yend size=4 crc32=784dd132\r\n";
/// let decoded = yenc_pool::yenc::decode(input).unwrap();
/// assert_eq!(decoded.data, b"Test");
/// assert_eq!(decoded.meta.header.name, "test.txt");
/// ```
pub fn decode(input: &[u8]) -> Result<YencDecoded> {
    DecodeOptions::default().decode(input)
}

/// Decode yEnc data from a buffered reader with lenient options
pub fn decode_reader<R: BufRead>(reader: R) -> Result<YencDecoded> {
    DecodeOptions::default().decode_reader(reader)
}

/// Decode a single yEnc encoded line, appending to `output`
///
/// yEnc decoding: output = (input - 42) mod 256
/// Escape sequences: =X means (X - 64 - 42) mod 256
///
/// An escape character at the very end of the line has nothing to unescape
/// and is dropped.
pub fn decode_line(line: &[u8], output: &mut Vec<u8>) {
    let mut bytes = line.iter().copied();

    while let Some(token) = bytes.next() {
        let token = match token {
            b'\n' => continue,
            ESCAPE => match bytes.next() {
                Some(escaped) => escaped.wrapping_sub(64),
                None => break,
            },
            token => token,
        };
        output.push(token.wrapping_sub(42));
    }
}

/// Read lines until one starts with the marker of `section`, leaving it in `line`
fn find_marker<R: BufRead>(reader: &mut R, line: &mut Vec<u8>, section: Section) -> Result<()> {
    let marker = section.marker().as_bytes();

    loop {
        line.clear();
        if reader.read_until(b'\n', line)? == 0 {
            return Err(YencError::MissingMarker {
                marker: section.marker(),
            });
        }

        if line.len() > marker.len() && line.starts_with(marker) {
            return Ok(());
        }
    }
}

/// Strip trailing <CR><LF>
fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b'\r' && b != b'\n')
        .map_or(0, |i| i + 1);
    &line[..end]
}

/// Compare declared checksums against the accumulators
///
/// `pcrc32` falls back to the whole-buffer checksum when there is no =ypart
/// section. When both fail, the `pcrc32` mismatch is reported.
fn verify(decoded: YencDecoded) -> Result<YencDecoded> {
    let meta = &decoded.meta;
    let mut mismatch = None;

    if let Some(expected) = meta.footer.crc32 {
        let actual = meta.crc32();
        if expected != actual {
            mismatch = Some((ChecksumScope::Whole, expected, actual));
        }
    }

    if let Some(expected) = meta.footer.pcrc32 {
        let actual = meta.part.as_ref().map_or_else(|| meta.crc32(), YencPart::crc32);
        if expected != actual {
            mismatch = Some((ChecksumScope::Part, expected, actual));
        }
    }

    match mismatch {
        None => Ok(decoded),
        Some((scope, expected, actual)) => {
            debug!(
                name = %meta.header.name,
                part = meta.header.part,
                "yEnc {} mismatch: expected {:08x}, got {:08x}",
                scope,
                expected,
                actual
            );
            Err(YencError::ChecksumMismatch {
                scope,
                expected,
                actual,
                partial: Some(Box::new(decoded)),
            })
        }
    }
}
