use std::collections::BTreeMap;

use crate::job::Data;
use crate::{Result, YencError};

use super::types::{YencDecoded, YencPart};

/// Multi-part yEnc file assembler
///
/// Collects decoded parts in any order and writes each one at its `=ypart`
/// offset. Completion is judged by byte coverage of the declared file size,
/// since the `total` attribute is not tracked.
///
/// # Example
/// ```ignore
/// let mut assembler = YencAssembler::new();
///
/// // Add parts as they come off the decoder pool
/// assembler.add_part(decoded_part2)?;
/// assembler.add_part(decoded_part1)?;
///
/// if assembler.is_complete() {
///     let file = assembler.assemble()?;
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct YencAssembler {
    /// Expected filename
    filename: Option<String>,
    /// Expected total file size
    total_size: Option<u64>,
    /// Collected parts indexed by part number
    parts: BTreeMap<u32, YencDecoded>,
    /// Sum of the lengths of collected parts
    received_bytes: u64,
}

impl YencAssembler {
    /// Create a new multi-part assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a completed job from the decoder pool
    ///
    /// Jobs that carry an error or no metadata are rejected.
    pub fn add_data(&mut self, data: Data) -> Result<()> {
        if let Some(err) = data.error {
            return Err(YencError::Assembly(format!("Cannot add failed job: {}", err)));
        }
        let meta = data
            .meta
            .ok_or_else(|| YencError::Assembly("Job has not been decoded".to_string()))?;

        self.add_part(YencDecoded {
            data: data.content,
            meta,
        })
    }

    /// Add a decoded part to the assembler
    ///
    /// # Errors
    /// Returns an error if:
    /// - The part is not a multi-part unit
    /// - The part has inconsistent metadata
    /// - The decoded length does not match the part range
    /// - The part overlaps with an existing part
    pub fn add_part(&mut self, decoded: YencDecoded) -> Result<()> {
        let meta = &decoded.meta;
        let part_num = meta.header.part;

        let Some(range) = meta.part.as_ref().filter(|_| meta.is_multipart()) else {
            return Err(YencError::Assembly(
                "Cannot add single-part file to multi-part assembler".to_string(),
            ));
        };

        if range.begin == 0 || range.begin > range.end || range.end > meta.header.size {
            return Err(YencError::Assembly(format!(
                "Part {} range {}-{} is not within total size {}",
                part_num, range.begin, range.end, meta.header.size
            )));
        }

        match (&self.filename, self.total_size) {
            (Some(name), Some(size)) => {
                if name != &meta.header.name {
                    return Err(YencError::Assembly(format!(
                        "Inconsistent filename: expected {}, got {}",
                        name, meta.header.name
                    )));
                }
                if size != meta.header.size {
                    return Err(YencError::Assembly(format!(
                        "Inconsistent total size: expected {}, got {}",
                        size, meta.header.size
                    )));
                }
            }
            _ => {
                self.filename = Some(meta.header.name.clone());
                self.total_size = Some(meta.header.size);
            }
        }

        if range.len() != decoded.data.len() as u64 {
            return Err(YencError::Assembly(format!(
                "Part {} data length {} doesn't match range {}-{} (expected {})",
                part_num,
                decoded.data.len(),
                range.begin,
                range.end,
                range.len()
            )));
        }

        if self.parts.contains_key(&part_num) {
            return Err(YencError::Assembly(format!(
                "Part {} already added",
                part_num
            )));
        }

        self.check_overlap(part_num, range)?;

        self.received_bytes += range.len();
        self.parts.insert(part_num, decoded);

        Ok(())
    }

    /// Check if a new part's byte range overlaps with any existing part.
    fn check_overlap(&self, part_num: u32, range: &YencPart) -> Result<()> {
        for (existing_num, existing) in &self.parts {
            if let Some(existing_range) = &existing.meta.part {
                let overlaps =
                    !(range.end < existing_range.begin || range.begin > existing_range.end);
                if overlaps {
                    return Err(YencError::Assembly(format!(
                        "Part {} range ({}-{}) overlaps with part {} range ({}-{})",
                        part_num,
                        range.begin,
                        range.end,
                        existing_num,
                        existing_range.begin,
                        existing_range.end
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check if the collected parts cover the whole file
    pub fn is_complete(&self) -> bool {
        self.total_size
            .is_some_and(|size| self.received_bytes == size)
    }

    /// Get the number of parts received
    pub fn parts_received(&self) -> usize {
        self.parts.len()
    }

    /// Get the number of bytes still missing
    pub fn missing_bytes(&self) -> u64 {
        self.total_size
            .map_or(0, |size| size.saturating_sub(self.received_bytes))
    }

    /// Get expected filename
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get expected total size
    pub fn expected_size(&self) -> Option<u64> {
        self.total_size
    }

    /// Assemble all parts into final file data
    pub fn assemble(&self) -> Result<Vec<u8>> {
        if !self.is_complete() {
            return Err(YencError::Assembly(format!(
                "Cannot assemble: missing {} bytes",
                self.missing_bytes()
            )));
        }

        let mut result = vec![0u8; self.received_bytes as usize];

        for decoded in self.parts.values() {
            if let Some(range) = &decoded.meta.part {
                let begin = range.offset() as usize;
                let slot = result
                    .get_mut(begin..begin + decoded.data.len())
                    .ok_or_else(|| {
                        YencError::Assembly(format!(
                            "Part {} range {}-{} is outside the assembled file",
                            decoded.meta.header.part, range.begin, range.end
                        ))
                    })?;
                slot.copy_from_slice(&decoded.data);
            }
        }

        Ok(result)
    }
}
