//! Destination stores and the per-address client registry.
//!
//! ## Structure
//!
//! - [`Store`] - a key-value destination accepting unconditional writes.
//! - [`memcache`] - [`MemcacheClient`](memcache::MemcacheClient), the
//!   memcached text-protocol implementation of [`Store`].
//! - [`registry`] - [`ClientRegistry`](registry::ClientRegistry), one cached
//!   client per destination address.

pub mod memcache;
pub mod registry;

use memc_loader_core::Result;

/// A key-value destination.
///
/// `put` issues exactly one write attempt. Implementations enforce their own
/// per-operation timeout and surface it as an error.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;
}
