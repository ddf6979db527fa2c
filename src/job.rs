//! Decode job envelope passed through the decoder pool

use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{Result, YencError};
use crate::yenc::{DecodeOptions, Meta, YencDecoded};

/// Sending half of an inbound job queue
pub type JobSender = mpsc::Sender<Data>;

/// Receiving half of an inbound job queue, handed to [`crate::Decoder::new`]
pub type JobReceiver = mpsc::Receiver<Data>;

/// A yEnc decode job and, once processed, its result
///
/// `content` holds the encoded bytes on submission and the decoded bytes on
/// completion. A job whose `error` is a checksum mismatch still carries the
/// decoded bytes and metadata; check `error` before trusting `content`.
#[derive(Debug, Default)]
pub struct Data {
    /// Encoded input, replaced by decoded output
    pub content: Vec<u8>,
    /// Populated once the job has been decoded
    pub meta: Option<Meta>,
    /// Set when decoding failed or a checksum did not match
    pub error: Option<YencError>,
}

impl Data {
    /// Create a new job from encoded bytes
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            meta: None,
            error: None,
        }
    }

    /// Check if the job decoded without any error
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.meta.is_some()
    }

    /// Part number from the =ybegin line, if decoded
    pub fn part_number(&self) -> Option<u32> {
        self.meta.as_ref().map(|m| m.header.part)
    }

    /// Convert a processed job into a decode result
    pub fn into_result(self) -> Result<YencDecoded> {
        if let Some(err) = self.error {
            return Err(err);
        }
        match self.meta {
            Some(meta) => Ok(YencDecoded {
                data: self.content,
                meta,
            }),
            None => Err(YencError::Lifecycle("job has not been decoded")),
        }
    }
}

/// Decode a job in place
///
/// On success `content` becomes the decoded bytes. On a checksum mismatch the
/// decoded bytes and metadata are stored as well and the error is kept. Any
/// other error leaves `content` empty and `meta` unset.
pub fn decode_data(mut data: Data, options: &DecodeOptions) -> Data {
    let input = std::mem::take(&mut data.content);

    match options.decode(&input) {
        Ok(decoded) => {
            data.content = decoded.data;
            data.meta = Some(decoded.meta);
            data.error = None;
        }
        Err(mut err) => {
            if let Some(partial) = err.take_partial() {
                data.content = partial.data;
                data.meta = Some(partial.meta);
            } else {
                data.meta = None;
            }
            trace!("Decode job failed: {}", err);
            data.error = Some(err);
        }
    }

    data
}

/// Create a bounded inbound job queue
pub fn job_queue(capacity: usize) -> (JobSender, JobReceiver) {
    mpsc::channel(capacity.max(1))
}
