use crc32fast::Hasher;

/// Incremental CRC32 (IEEE) accumulator
///
/// Fed with decoded bytes as each body line is processed; the running value
/// can be read at any point without consuming the accumulator.
#[derive(Debug, Clone, Default)]
pub struct Checksum {
    hasher: Hasher,
    len: u64,
}

impl Checksum {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed decoded bytes
    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.len += bytes.len() as u64;
    }

    /// CRC32 of everything fed so far
    pub fn value(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Number of bytes fed so far
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether nothing has been fed yet
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consume the accumulator and return the final CRC32
    pub fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}
