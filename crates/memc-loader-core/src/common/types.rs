//! # Loader Types and Defaults
//!
//! This module defines the record type that flows through the loader pipeline
//! together with the defaults shared by the binary and its tests.
//!
//! ## Overview
//!
//! - [`AppsInstalled`] - one validated line of an `apps-installed` file
//! - [`DEFAULT_WORKERS`], [`DEFAULT_BATCH_SIZE`] - pool sizing defaults
//! - [`DEFAULT_MEMC_TIMEOUT`] - per-operation memcached timeout
//! - [`NORMAL_ERR_RATE`] - highest error rate still reported as acceptable
//! - [`HANDLED_MARKER`] - prefix given to a file's name once it is handled

use core::time::Duration;

/// Default number of concurrent insert workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default number of queued records per worker. The record and outcome
/// queues are each sized `workers * batch_size`.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default connect/read/write timeout applied to every memcached operation.
pub const DEFAULT_MEMC_TIMEOUT: Duration = Duration::from_secs(3);

/// Error rate (`errors / processed`) below which a file load is considered
/// acceptable.
pub const NORMAL_ERR_RATE: f64 = 0.01;

/// Character prepended to a file name to mark it as handled.
pub const HANDLED_MARKER: char = '.';

/// One validated installation event.
///
/// An `AppsInstalled` is only ever produced by
/// [`parse_apps_installed`](crate::parse_apps_installed): both identifiers are
/// non-empty and both coordinates parsed. `apps` may be empty.
#[derive(Clone, Debug, PartialEq)]
pub struct AppsInstalled {
    pub dev_type: String,
    pub dev_id: String,
    pub lat: f64,
    pub lon: f64,
    pub apps: Vec<u32>,
}

impl AppsInstalled {
    /// Returns the memcached key for this record: `"<dev_type>:<dev_id>"`.
    ///
    /// Colons inside `dev_id` are not escaped, so `("idfa", "a:b")` and a
    /// hypothetical `("idfa:a", "b")` share a key.
    pub fn key(&self) -> String {
        format!("{}:{}", self.dev_type, self.dev_id)
    }
}
