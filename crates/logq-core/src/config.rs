//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Memory cap (in bytes) for rows held by buffers and reducers of one query.
    pub mem_cap_bytes: usize,

    /// A row buffer spills its in-memory rows once they exceed this many bytes.
    pub buffer_spill_threshold_bytes: usize,

    /// Rows per sorted run before `sort` spills a run to storage.
    pub sort_run_rows: usize,

    /// Rows per batch handed from `table` downstream. `0` or `1` pushes rows
    /// one at a time.
    pub batch_size: usize,

    /// Directory for spill segments.
    pub spill_dir: String,

    /// Spill codec name: `none`, `zstd`, or `lz4`.
    pub spill_codec: String,

    /// Field treated as event time for rows coming out of `table`.
    pub date_column: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mem_cap_bytes: 256 * 1024 * 1024, // 256 MiB default
            buffer_spill_threshold_bytes: 8 * 1024 * 1024,
            sort_run_rows: 50_000,
            batch_size: 0,
            spill_dir: "/tmp/logq-spill".to_string(),
            spill_codec: "none".to_string(),
            date_column: "_time".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `LOGQ_MEM_CAP_BYTES`: memory cap in bytes
    /// - `LOGQ_BUFFER_SPILL_THRESHOLD_BYTES`: buffer spill threshold
    /// - `LOGQ_SORT_RUN_ROWS`: rows per sorted run
    /// - `LOGQ_BATCH_SIZE`: source batch size
    /// - `LOGQ_SPILL_DIR`: spill directory
    /// - `LOGQ_SPILL_CODEC`: spill codec
    /// - `LOGQ_DATE_COLUMN`: event-time field name
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_parse::<usize>("LOGQ_MEM_CAP_BYTES") {
            cfg.mem_cap_bytes = v;
        }
        if let Some(v) = env_parse::<usize>("LOGQ_BUFFER_SPILL_THRESHOLD_BYTES") {
            cfg.buffer_spill_threshold_bytes = v;
        }
        if let Some(v) = env_parse::<usize>("LOGQ_SORT_RUN_ROWS") {
            cfg.sort_run_rows = v;
        }
        if let Some(v) = env_parse::<usize>("LOGQ_BATCH_SIZE") {
            cfg.batch_size = v;
        }
        if let Ok(s) = std::env::var("LOGQ_SPILL_DIR") {
            cfg.spill_dir = s;
        }
        if let Ok(s) = std::env::var("LOGQ_SPILL_CODEC") {
            cfg.spill_codec = s;
        }
        if let Ok(s) = std::env::var("LOGQ_DATE_COLUMN") {
            cfg.date_column = s;
        }

        cfg
    }

    /// Reject settings that would make buffers or sort runs degenerate.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;
        if self.mem_cap_bytes == 0 {
            return Err(Error::Config("mem_cap_bytes must be > 0".into()));
        }
        if self.sort_run_rows == 0 {
            return Err(Error::Config("sort_run_rows must be > 0".into()));
        }
        if self.date_column.trim().is_empty() {
            return Err(Error::Config("date_column must not be empty".into()));
        }
        match self.spill_codec.as_str() {
            "none" | "zstd" | "lz4" => Ok(()),
            other => Err(Error::Config(format!("unknown spill codec '{other}'"))),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}
