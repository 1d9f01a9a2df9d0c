//! File pipeline: parse, fan out to workers, fan outcomes back in.
//!
//! ## Structure
//!
//! - [`orchestrator`] - [`FileLoader`](orchestrator::FileLoader), which runs
//!   one file through the pipeline.
//! - [`producer`] - line reader feeding the record queue.
//! - [`stats`] - per-file counters and the error-rate verdict.

pub mod orchestrator;
pub mod producer;
pub mod stats;
