//! Storage adapters implementing `logq_mem::SpillStorage`.
//!
//! - `fs`: local directory (default).
//! - `memory`: process-local map, selected with a `memory://` spill dir.

mod fs;
mod memory;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

use logq_core::config::EngineConfig;
use logq_mem::{Codec, SpillManager, SpillStorage};

use crate::error::{Error, Result};

/// Scheme prefix selecting the in-memory spill backend.
pub const MEMORY_SCHEME: &str = "memory://";

/// Pick the spill backend from `spill_dir`.
pub fn build_storage(spill_dir: &str) -> Box<dyn SpillStorage> {
    if spill_dir.starts_with(MEMORY_SCHEME) {
        Box::new(MemoryStorage::new())
    } else {
        Box::new(FsStorage::new())
    }
}

/// Spill manager for one query, rooted at `<spill_dir>/<query_tag>`.
pub fn build_spill_manager(cfg: &EngineConfig, query_tag: &str) -> Result<SpillManager> {
    let codec = Codec::from_name(&cfg.spill_codec).map_err(|e| Error::Config(e.to_string()))?;
    let root = format!("{}/{}", cfg.spill_dir.trim_end_matches('/'), query_tag);
    tracing::debug!(root = %root, codec = ?codec, "spill manager ready");
    Ok(SpillManager::new(build_storage(&cfg.spill_dir), codec, root))
}
