//! LZ4 compression of the clip-name block.

use crate::types::error::{MotionError, MotionResult};

/// Encode clip names as length-prefixed UTF-8 and compress with LZ4 (size prepended).
pub fn compress_names(names: &[String]) -> Vec<u8> {
    let mut raw = Vec::new();
    for name in names {
        raw.extend_from_slice(&(name.len() as u32).to_le_bytes());
        raw.extend_from_slice(name.as_bytes());
    }
    lz4_flex::compress_prepend_size(&raw)
}

/// Decompress a name block and split it into `count` names.
pub fn decompress_names(data: &[u8], count: usize) -> MotionResult<Vec<String>> {
    let raw = lz4_flex::decompress_size_prepended(data)
        .map_err(|e| MotionError::Compression(e.to_string()))?;

    let mut names = Vec::with_capacity(count.min(raw.len() / 4));
    let mut pos = 0usize;
    for _ in 0..count {
        let len_bytes = raw
            .get(pos..pos + 4)
            .ok_or(MotionError::Corrupt(pos as u64))?;
        let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
            as usize;
        pos += 4;
        let bytes = raw
            .get(pos..pos + len)
            .ok_or(MotionError::Corrupt(pos as u64))?;
        let name =
            String::from_utf8(bytes.to_vec()).map_err(|e| MotionError::Compression(e.to_string()))?;
        names.push(name);
        pos += len;
    }
    if pos != raw.len() {
        return Err(MotionError::Corrupt(pos as u64));
    }
    Ok(names)
}
