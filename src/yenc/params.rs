use std::str::FromStr;

use crate::error::{Result, Section, YencError};

use super::types::{Meta, YencPart};

impl Section {
    /// Parse the `key=value` attributes of a marker line into `meta`
    ///
    /// `line` is the whole line, marker included. `=ybegin` and `=ypart` reject
    /// unknown keys; `=yend` ignores them.
    ///
    /// Format: =ybegin line=128 size=123456 name=file.bin [part=1 total=5]
    ///         =ypart begin=1 end=123456
    ///         =yend size=123456 [part=1] [pcrc32=abcd1234] [crc32=abcd1234]
    pub(crate) fn parse(self, meta: &mut Meta, line: &str, strict: bool) -> Result<()> {
        let rest = line.get(self.marker().len()..).unwrap_or_default();

        if self == Section::Part {
            meta.part = Some(YencPart::default());
        }

        for (key, value) in split_attributes(rest) {
            self.apply(meta, key, value, strict)?;
        }

        Ok(())
    }

    fn apply(self, meta: &mut Meta, key: &str, value: &str, strict: bool) -> Result<()> {
        match (self, key.to_ascii_lowercase().as_str()) {
            (Section::Begin, "name") => meta.header.name = value.to_string(),
            (Section::Begin, "size") => meta.header.size = number(key, value, strict)?,
            (Section::Begin, "part") => meta.header.part = number(key, value, strict)?,
            (Section::Begin, "line") => meta.header.line = number(key, value, strict)?,
            // Accepted so multi-part headers parse, not used for decoding
            (Section::Begin, "total") => {}
            (Section::Part, "begin") => {
                meta.part.get_or_insert_with(YencPart::default).begin =
                    number(key, value, strict)?
            }
            (Section::Part, "end") => {
                meta.part.get_or_insert_with(YencPart::default).end = number(key, value, strict)?
            }
            (Section::End, "size") => meta.footer.size = number(key, value, strict)?,
            (Section::End, "part") => meta.footer.part = number(key, value, strict)?,
            (Section::End, "crc32") => meta.footer.crc32 = hex(key, value, strict)?,
            (Section::End, "pcrc32") => meta.footer.pcrc32 = hex(key, value, strict)?,
            (Section::End, _) => {}
            (section, _) => {
                return Err(YencError::UnknownAttribute {
                    section,
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Split the attribute part of a marker line into `(key, value)` pairs
///
/// Values end at the next space. Tokens without `=` are skipped.
fn split_attributes(rest: &str) -> Vec<(&str, &str)> {
    let mut attributes = Vec::new();
    let mut remaining = rest.trim();

    while !remaining.is_empty() {
        let (token, tail) = remaining.split_once(' ').unwrap_or((remaining, ""));

        if let Some((key, value)) = token.split_once('=') {
            attributes.push((key, value.trim()));
        }

        remaining = tail.trim_start();
    }

    attributes
}

/// Parse a decimal attribute; unparseable values become zero unless `strict`
fn number<T: FromStr + Default>(key: &str, value: &str, strict: bool) -> Result<T> {
    match value.trim().parse() {
        Ok(n) => Ok(n),
        Err(_) if strict => Err(YencError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        }),
        Err(_) => Ok(T::default()),
    }
}

/// Parse a hex checksum; unparseable values are dropped unless `strict`
fn hex(key: &str, value: &str, strict: bool) -> Result<Option<u32>> {
    match u64::from_str_radix(value.trim(), 16) {
        Ok(crc) => Ok(Some(crc as u32)),
        Err(_) if strict => Err(YencError::InvalidNumber {
            key: key.to_string(),
            value: value.to_string(),
        }),
        Err(_) => Ok(None),
    }
}
