//! Spill segment header and metadata.
//!
//! Layout:
//! [ magic: u32 ][ version: u16 ][ codec: u8 ][ reserved: u8 ]
//! [ rows: u32 ][ uncompressed_len: u64 ][ compressed_len: u64 ]
//! [ payload bytes … ]
//!
//! The payload is the JSON-encoded row vector, compressed with `codec`.
//! A blake3 checksum over (header || payload) is kept in `SegmentMeta`.

use serde::{Deserialize, Serialize};

use logq_core::id::SpillId;

use super::Codec;
use crate::error::{Error, Result};

pub const MAGIC: u32 = 0x4C4F_4751; // "LOGQ"
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 4 + 8 + 8;

/// Largest segment we agree to decode; guards against corrupt lengths.
pub const MAX_SEGMENT_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentHeader {
    pub codec: Codec,
    pub rows: u32,
    pub uncompressed_len: u64,
    pub compressed_len: u64,
}

impl SegmentHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        out[4..6].copy_from_slice(&VERSION.to_le_bytes());
        out[6] = self.codec as u8;
        // out[7] reserved
        out[8..12].copy_from_slice(&self.rows.to_le_bytes());
        out[12..20].copy_from_slice(&self.uncompressed_len.to_le_bytes());
        out[20..28].copy_from_slice(&self.compressed_len.to_le_bytes());
        out
    }

    pub fn from_bytes(name: &SegmentName, bytes: &[u8]) -> Result<Self> {
        let corrupt = |reason: &str| Error::Corrupt {
            segment: name.0.clone(),
            reason: reason.to_string(),
        };
        if bytes.len() < HEADER_LEN {
            return Err(corrupt("short header"));
        }
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let u32_at = |i: usize| {
            let mut b = [0u8; 4];
            b.copy_from_slice(&bytes[i..i + 4]);
            u32::from_le_bytes(b)
        };
        let u64_at = |i: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[i..i + 8]);
            u64::from_le_bytes(b)
        };

        if u32_at(0) != MAGIC || u16_at(4) != VERSION {
            return Err(corrupt("bad magic/version"));
        }
        let header = Self {
            codec: Codec::from_u8(bytes[6])?,
            rows: u32_at(8),
            uncompressed_len: u64_at(12),
            compressed_len: u64_at(20),
        };
        if header.uncompressed_len > MAX_SEGMENT_BYTES || header.compressed_len > MAX_SEGMENT_BYTES
        {
            return Err(corrupt("segment length over limit"));
        }
        Ok(header)
    }
}

/// Storage-relative name of a segment: `spill<id>_seg<seq>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentName(pub String);

impl SegmentName {
    pub fn new(id: SpillId, seq: u32) -> Self {
        SegmentName(format!("spill{}_seg{}", id.get(), seq))
    }
}

/// What the owner of a spilled segment keeps in memory to read it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub name: SegmentName,
    pub path: String,
    pub codec: Codec,
    pub rows: u32,
    pub compressed_len: u64,
    pub checksum: [u8; 32],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_bytes_roundtrip() {
        let name = SegmentName::new(SpillId::new(3), 1);
        let h = SegmentHeader {
            codec: Codec::None,
            rows: 10,
            uncompressed_len: 100,
            compressed_len: 100,
        };
        let back = SegmentHeader::from_bytes(&name, &h.to_bytes()).unwrap();
        assert_eq!(back, h);
        assert_eq!(name.0, "spill3_seg1");
    }

    #[test]
    fn rejects_garbage() {
        let name = SegmentName::new(SpillId::new(1), 0);
        assert!(SegmentHeader::from_bytes(&name, &[0u8; HEADER_LEN]).is_err());
        assert!(SegmentHeader::from_bytes(&name, &[0u8; 3]).is_err());
    }
}
