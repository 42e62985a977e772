//! Result writers.

pub mod jsonl;
