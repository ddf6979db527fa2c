//! yEnc decoding and decoder pool error types

use std::fmt;
use thiserror::Error;

use crate::yenc::YencDecoded;

/// Which checksum accumulator a `crc32`/`pcrc32` comparison ran against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumScope {
    /// `crc32` from the `=yend` line, checked against every byte decoded by the call
    Whole,
    /// `pcrc32` from the `=yend` line, checked against the bytes of this part
    Part,
}

impl fmt::Display for ChecksumScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumScope::Whole => f.write_str("crc32"),
            ChecksumScope::Part => f.write_str("pcrc32"),
        }
    }
}

/// yEnc header section an attribute was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// `=ybegin` line
    Begin,
    /// `=ypart` line
    Part,
    /// `=yend` line
    End,
}

impl Section {
    /// Marker token that starts a line of this section
    pub fn marker(self) -> &'static str {
        match self {
            Section::Begin => "=ybegin",
            Section::Part => "=ypart",
            Section::End => "=yend",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// yEnc protocol and decoder pool errors
#[derive(Error, Debug)]
pub enum YencError {
    /// Input ended before the required marker line was found
    #[error("Malformed yEnc stream: no {marker} line before end of input")]
    MissingMarker {
        /// Marker token that was never seen
        marker: &'static str,
    },

    /// Unrecognized `key=value` attribute in a `=ybegin` or `=ypart` line
    #[error("Unknown yEnc attribute in {section}: {key}")]
    UnknownAttribute {
        /// Section the key appeared in
        section: Section,
        /// The offending key, as written
        key: String,
    },

    /// Numeric attribute failed to parse (strict mode only)
    #[error("Invalid value for yEnc attribute {key}: {value:?}")]
    InvalidNumber {
        /// Attribute name
        key: String,
        /// Raw value
        value: String,
    },

    /// Declared checksum differs from the checksum of the decoded bytes
    ///
    /// The decoded bytes are still available through [`YencError::take_partial`].
    #[error("CRC check failed for {scope} (header crc: {expected:08x}) != (decoded hash: {actual:08x})")]
    ChecksumMismatch {
        /// Which checksum failed
        scope: ChecksumScope,
        /// Value declared on the `=yend` line
        expected: u32,
        /// Value computed over the decoded bytes
        actual: u32,
        /// Everything decoded before the mismatch was detected
        partial: Option<Box<YencDecoded>>,
    },

    /// Decoded parts cannot be assembled into one file
    #[error("Assembly error: {0}")]
    Assembly(String),

    /// IO error while reading encoded input
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested worker count exceeds what the machine can run in parallel
    #[error("max workers ({requested}) cannot exceed available parallelism ({available})")]
    TooManyWorkers {
        /// Requested worker count
        requested: usize,
        /// `std::thread::available_parallelism()`
        available: usize,
    },

    /// Invalid decoder configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Pool operation called in the wrong lifecycle state
    #[error("Invalid state: {0}")]
    Lifecycle(&'static str),
}

impl YencError {
    /// Take the partially decoded result out of a checksum mismatch
    ///
    /// Returns `None` for every other error kind, or if it was already taken.
    pub fn take_partial(&mut self) -> Option<YencDecoded> {
        match self {
            YencError::ChecksumMismatch { partial, .. } => partial.take().map(|p| *p),
            _ => None,
        }
    }

    /// Whether this error still allows the decoded bytes to be delivered
    pub fn is_checksum_mismatch(&self) -> bool {
        matches!(self, YencError::ChecksumMismatch { .. })
    }
}

/// Result type alias using YencError
pub type Result<T> = std::result::Result<T, YencError>;
