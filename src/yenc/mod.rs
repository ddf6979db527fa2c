//! yEnc binary decoding for Usenet
//!
//! yEnc is a binary-to-text encoding scheme designed specifically for Usenet.
//! Every byte is shifted by 42, and the few results that would break a text
//! line are escaped with `=` and shifted by a further 64.
//!
//! Reference: http://www.yenc.org/yenc-draft.1.3.txt

pub mod assembler;
pub mod checksum;
pub mod decode;
mod params;
pub mod types;

pub use assembler::YencAssembler;
pub use checksum::Checksum;
pub use decode::{DecodeOptions, decode, decode_line, decode_reader};
pub use types::{Meta, YencDecoded, YencEnd, YencHeader, YencPart};
