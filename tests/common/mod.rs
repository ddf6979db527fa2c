//! Shared fixtures for integration tests
//!
//! Encoding is not part of the library; this is a minimal yEnc encoder used
//! to build test input.

#![allow(dead_code)]

/// Part information: (part, total_parts, begin, end, total_file_size)
pub type PartInfo = (u32, u32, u64, u64, u64);

/// Encode `data` as one yEnc unit
///
/// Multi-part units get a `pcrc32` trailer, single-part units a `crc32` one.
pub fn encode(data: &[u8], filename: &str, line_length: usize, part_info: Option<PartInfo>) -> Vec<u8> {
    let mut output = Vec::new();

    match part_info {
        Some((part, total_parts, begin, end, total_file_size)) => {
            output.extend_from_slice(
                format!(
                    "=ybegin part={} total={} line={} size={} name={}\r\n",
                    part, total_parts, line_length, total_file_size, filename
                )
                .as_bytes(),
            );
            output.extend_from_slice(format!("=ypart begin={} end={}\r\n", begin, end).as_bytes());
        }
        None => {
            output.extend_from_slice(
                format!(
                    "=ybegin line={} size={} name={}\r\n",
                    line_length,
                    data.len(),
                    filename
                )
                .as_bytes(),
            );
        }
    }

    output.extend_from_slice(&encode_body(data, line_length));

    let crc32 = crc32fast::hash(data);
    let trailer = match part_info {
        Some((part, ..)) => format!("=yend size={} part={} pcrc32={:08x}\r\n", data.len(), part, crc32),
        None => format!("=yend size={} crc32={:08x}\r\n", data.len(), crc32),
    };
    output.extend_from_slice(trailer.as_bytes());

    output
}

/// Encode data lines only, escaping NUL, LF, CR and '='
pub fn encode_body(data: &[u8], line_length: usize) -> Vec<u8> {
    let mut output = Vec::new();
    let mut line_len = 0;

    for &byte in data {
        let encoded = byte.wrapping_add(42);

        if matches!(encoded, 0x00 | b'\n' | b'\r' | b'=') || (line_len == 0 && encoded == b'.') {
            output.push(b'=');
            output.push(encoded.wrapping_add(64));
            line_len += 2;
        } else {
            output.push(encoded);
            line_len += 1;
        }

        if line_len >= line_length {
            output.extend_from_slice(b"\r\n");
            line_len = 0;
        }
    }

    if line_len > 0 {
        output.extend_from_slice(b"\r\n");
    }

    output
}

/// Re-encode decoded bytes the way the body was encoded, for round-trip checks
pub fn reencode_lines(data: &[u8], line_length: usize) -> Vec<u8> {
    encode_body(data, line_length)
}

/// Deterministic pseudo-random test payload covering every byte value
pub fn payload(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2654435761).wrapping_add(1);
    (0..len)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state as u8) ^ (i as u8)
        })
        .collect()
}

/// Split `data` into `parts` yEnc units with 1-based `=ypart` ranges
pub fn encode_multipart(data: &[u8], filename: &str, parts: usize) -> Vec<Vec<u8>> {
    let total = data.len() as u64;
    let chunk = data.len().div_ceil(parts);

    data.chunks(chunk)
        .enumerate()
        .map(|(i, slice)| {
            let begin = (i * chunk) as u64 + 1;
            let end = begin + slice.len() as u64 - 1;
            encode(
                slice,
                filename,
                128,
                Some(((i + 1) as u32, parts as u32, begin, end, total)),
            )
        })
        .collect()
}
