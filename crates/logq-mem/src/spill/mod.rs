//! Spill manager: writes row vectors to temporary storage and reads them back.
//!
//! Used by `RowBuffer` when a batch grows past its memory threshold and by
//! `sort` for its sorted runs.

pub mod codec;
pub mod segment;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use logq_core::id::SpillId;
use logq_core::row::Row;

use crate::error::{Error, Result};

pub use codec::Codec;
pub use segment::{SegmentHeader, SegmentMeta, SegmentName, HEADER_LEN};

/// Byte storage for spill segments.
///
/// Implemented by `logq-io::FsStorage` (local directory) and
/// `logq-io::MemoryStorage` (tests).
pub trait SpillStorage: Send + Sync {
    /// Write bytes to a path. Creates parent directories if needed.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Read up to `len` bytes starting at `offset`.
    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Delete a path. Idempotent.
    fn delete(&self, path: &str) -> Result<()>;

    /// List all paths under a prefix.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Writes/reads row segments and tracks which ones are still live.
pub struct SpillManager {
    storage: Box<dyn SpillStorage>,
    codec: Codec,
    root_dir: String,
    next_spill: AtomicU64,
    live: HashMap<SegmentName, SegmentMeta>,
}

impl SpillManager {
    pub fn new(storage: Box<dyn SpillStorage>, codec: Codec, root_dir: impl Into<String>) -> Self {
        Self {
            storage,
            codec,
            root_dir: root_dir.into(),
            next_spill: AtomicU64::new(1),
            live: HashMap::new(),
        }
    }

    pub fn root_dir(&self) -> &str {
        &self.root_dir
    }

    /// Fresh id for one spilling owner (a buffer or a sort).
    pub fn next_spill_id(&self) -> SpillId {
        SpillId::new(self.next_spill.fetch_add(1, Ordering::Relaxed))
    }

    /// Serialize, compress and persist `rows` as segment `seq` of `spill_id`.
    pub fn write_rows(&mut self, rows: &[Row], spill_id: SpillId, seq: u32) -> Result<SegmentMeta> {
        let plain = serde_json::to_vec(rows)?;
        let payload = self.codec.compress(&plain)?;
        let header = SegmentHeader {
            codec: self.codec,
            rows: rows.len() as u32,
            uncompressed_len: plain.len() as u64,
            compressed_len: payload.len() as u64,
        };
        let header_bytes = header.to_bytes();

        let mut hasher = blake3::Hasher::new();
        hasher.update(&header_bytes);
        hasher.update(&payload);
        let checksum: [u8; 32] = hasher.finalize().into();

        let name = SegmentName::new(spill_id, seq);
        let path = format!("{}/{}.seg", self.root_dir, name.0);

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(&header_bytes);
        bytes.extend_from_slice(&payload);
        self.storage.write(&path, &bytes)?;

        tracing::debug!(segment = %name.0, rows = rows.len(), bytes = bytes.len(), "spilled rows");

        let meta = SegmentMeta {
            name: name.clone(),
            path,
            codec: self.codec,
            rows: header.rows,
            compressed_len: header.compressed_len,
            checksum,
        };
        self.live.insert(name, meta.clone());
        Ok(meta)
    }

    /// Read a segment back, verifying its checksum.
    pub fn read_rows(&self, meta: &SegmentMeta) -> Result<Vec<Row>> {
        let total = HEADER_LEN + meta.compressed_len as usize;
        let bytes = self.storage.read_range(&meta.path, 0, total)?;
        if bytes.len() != total {
            return Err(Error::Corrupt {
                segment: meta.name.0.clone(),
                reason: format!("expected {total} bytes, read {}", bytes.len()),
            });
        }

        let computed: [u8; 32] = blake3::hash(&bytes).into();
        if computed != meta.checksum {
            return Err(Error::Corrupt {
                segment: meta.name.0.clone(),
                reason: "checksum mismatch".into(),
            });
        }

        let header = SegmentHeader::from_bytes(&meta.name, &bytes[..HEADER_LEN])?;
        let plain = header.codec.decompress(&bytes[HEADER_LEN..])?;
        let rows: Vec<Row> = serde_json::from_slice(&plain)?;
        if rows.len() != header.rows as usize {
            return Err(Error::Corrupt {
                segment: meta.name.0.clone(),
                reason: format!("header says {} rows, payload has {}", header.rows, rows.len()),
            });
        }
        Ok(rows)
    }

    /// Delete a segment. Unknown names are ignored.
    pub fn delete_segment(&mut self, name: &SegmentName) -> Result<()> {
        if let Some(meta) = self.live.remove(name) {
            self.storage.delete(&meta.path)?;
        }
        Ok(())
    }

    /// Number of segments written and not yet deleted.
    pub fn live_segments(&self) -> usize {
        self.live.len()
    }

    /// Paths currently present under the spill root (debugging/tests).
    pub fn list_files(&self) -> Result<Vec<String>> {
        self.storage.list(&self.root_dir)
    }
}


#[cfg(test)]
mod tests {
    use super::test_storage::MapStorage;
    use super::*;
    use logq_core::value::Value;

    fn rows(n: i64) -> Vec<Row> {
        (0..n).map(|i| Row::from_raw(format!("{i} host{i}")).with("n", i)).collect()
    }

    #[test]
    fn write_read_delete() {
        let mut mgr = SpillManager::new(Box::new(MapStorage::default()), Codec::None, "/spill");
        let id = mgr.next_spill_id();
        let meta = mgr.write_rows(&rows(5), id, 0).unwrap();
        assert_eq!(meta.rows, 5);
        assert_eq!(mgr.live_segments(), 1);

        let back = mgr.read_rows(&meta).unwrap();
        assert_eq!(back.len(), 5);
        assert_eq!(back[3].get("n"), Some(&Value::Int(3)));
        assert_eq!(back[3].raw(), Some("3 host3"));

        mgr.delete_segment(&meta.name).unwrap();
        assert_eq!(mgr.live_segments(), 0);
        assert!(mgr.list_files().unwrap().is_empty());
    }

    #[test]
    fn detects_tampering() {
        let storage = MapStorage::default();
        let mut mgr = SpillManager::new(Box::new(storage), Codec::None, "/spill");
        let id = mgr.next_spill_id();
        let mut meta = mgr.write_rows(&rows(2), id, 0).unwrap();
        meta.checksum[0] ^= 0xff;
        assert!(matches!(mgr.read_rows(&meta), Err(Error::Corrupt { .. })));
    }
}
