//! Loader internals.
//!
//! ## Structure
//!
//! - [`config`] - CLI/env configuration and the destination map.
//! - [`store`] - memcached client and the per-address client registry.
//! - [`service`] - record encoding and writing.
//! - [`pool`] - insert workers sharing one record queue.
//! - [`pipeline`] - per-file producer/pool/drain orchestration.
//! - [`disposition`] - renaming handled files.
//! - [`runner`] - file discovery and the per-file loop.
//! - [`selftest`] - `--test` protobuf round trip.
//! - [`telemetry`] - logging and optional metrics.

pub mod config;
pub mod disposition;
pub mod pipeline;
pub mod pool;
pub mod runner;
pub mod selftest;
pub mod service;
pub mod store;
pub mod telemetry;
