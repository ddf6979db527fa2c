//! Decoder pool configuration

use std::num::NonZeroUsize;

use crate::error::{Result, YencError};
use crate::yenc::DecodeOptions;

/// Default capacity of a job queue created with [`DecoderConfig::job_queue`]
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Number of workers the machine can run in parallel
///
/// Falls back to 1 when the platform cannot tell.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Decoder pool configuration
///
/// # Example
///
/// ```
/// use yenc_pool::DecoderConfig;
///
/// // One worker per core, lenient header parsing
/// let config = DecoderConfig::all_cores();
///
/// // Two workers, strict numeric parsing
/// let config = DecoderConfig::new(2).with_strict(true);
/// assert!(config.strict);
/// ```
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderConfig {
    /// Number of workers, at most [`available_parallelism`]
    pub workers: usize,

    /// Capacity of job queues created with [`DecoderConfig::job_queue`]
    #[cfg_attr(feature = "serde", serde(default = "default_queue_capacity"))]
    pub queue_capacity: usize,

    /// Reject unparseable numeric header values instead of reading them as zero
    ///
    /// Default: `false`
    #[cfg_attr(feature = "serde", serde(default))]
    pub strict: bool,
}

#[cfg(feature = "serde")]
fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::all_cores()
    }
}

impl DecoderConfig {
    /// Create a configuration with `workers` workers
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            strict: false,
        }
    }

    /// Create a configuration with one worker per available core
    pub fn all_cores() -> Self {
        Self::new(available_parallelism())
    }

    /// Set the job queue capacity
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Enable or disable strict numeric parsing
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Decode options derived from this configuration
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            strict: self.strict,
        }
    }

    /// Create a job queue sized by `queue_capacity`
    pub fn job_queue(&self) -> (crate::JobSender, crate::JobReceiver) {
        crate::job::job_queue(self.queue_capacity)
    }

    /// Check the configuration against the current machine
    ///
    /// # Errors
    ///
    /// Returns [`YencError::TooManyWorkers`] if `workers` exceeds the available
    /// parallelism, and [`YencError::Config`] for a zero worker count or queue
    /// capacity.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(YencError::Config("worker count must be at least 1".to_string()));
        }

        let available = available_parallelism();
        if self.workers > available {
            return Err(YencError::TooManyWorkers {
                requested: self.workers,
                available,
            });
        }

        if self.queue_capacity == 0 {
            return Err(YencError::Config("queue capacity must be at least 1".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let config = DecoderConfig::new(1);
        assert_eq!(config.workers, 1);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(!config.strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_all_cores_is_valid() {
        let config = DecoderConfig::default();
        assert_eq!(config.workers, available_parallelism());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = DecoderConfig::new(1)
            .with_queue_capacity(8)
            .with_strict(true);
        assert_eq!(config.queue_capacity, 8);
        assert!(config.decode_options().strict);
    }

    #[test]
    fn test_too_many_workers() {
        let available = available_parallelism();
        let err = DecoderConfig::new(available * 2).validate().unwrap_err();
        match err {
            YencError::TooManyWorkers {
                requested,
                available: reported,
            } => {
                assert_eq!(requested, available * 2);
                assert_eq!(reported, available);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(matches!(
            DecoderConfig::new(0).validate(),
            Err(YencError::Config(_))
        ));
        assert!(matches!(
            DecoderConfig::new(1).with_queue_capacity(0).validate(),
            Err(YencError::Config(_))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_defaults() {
        let config: DecoderConfig = serde_json::from_str(r#"{"workers": 1}"#).unwrap();
        assert_eq!(config, DecoderConfig::new(1));

        let json = serde_json::to_string(&config.clone().with_strict(true)).unwrap();
        let back: DecoderConfig = serde_json::from_str(&json).unwrap();
        assert!(back.strict);
    }
}
