#![doc = include_str!("../README.md")]

mod config;
mod error;
/// Decode job envelope and inbound job queue
pub mod job;
mod pool;
/// yEnc binary decoding for Usenet
pub mod yenc;

pub use config::{DEFAULT_QUEUE_CAPACITY, DecoderConfig, available_parallelism};
pub use error::{ChecksumScope, Result, Section, YencError};
pub use job::{Data, JobReceiver, JobSender, decode_data, job_queue};
pub use pool::{Decoder, PoolStats};
pub use yenc::{
    DecodeOptions, Meta, YencAssembler, YencDecoded, YencEnd, YencHeader, YencPart, decode,
    decode_line, decode_reader,
};
