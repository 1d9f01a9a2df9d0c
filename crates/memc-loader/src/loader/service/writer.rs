use crate::loader::{store::registry::ClientRegistry, telemetry};
use memc_loader_core::{AppsInstalled, UserApps, encode_record};
use std::sync::Arc;

/// Encodes records and writes them to their destination.
///
/// In dry-run mode the would-be key and payload are logged and the write is
/// reported as successful without touching the [`ClientRegistry`].
pub struct RecordWriter {
    registry: Arc<ClientRegistry>,
    dry_run: bool,
}

impl RecordWriter {
    pub const fn new(registry: Arc<ClientRegistry>, dry_run: bool) -> Self {
        Self { registry, dry_run }
    }

    /// Writes `record` to the store at `addr`.
    ///
    /// Returns `true` when the value was stored (or, in dry-run mode, when it
    /// encoded). Encode and write failures are logged and yield `false`; the
    /// write is never retried.
    pub async fn insert(&self, addr: &str, record: &AppsInstalled) -> bool {
        let key = record.key();
        let packed = match encode_record(record) {
            Ok(packed) => packed,
            Err(e) => {
                tracing::error!(%key, "Failed to marshal UserApps: {e}");
                return false;
            }
        };

        if self.dry_run {
            tracing::info!(addr, %key, value = ?UserApps::from(record), "Dry run write");
            return true;
        }

        let client = self.registry.get_client(addr);
        match client.put(&key, &packed).await {
            Ok(()) => true,
            Err(e) => {
                telemetry::increment_write_errors();
                tracing::warn!(addr, %key, "Failed to set: {e}");
                false
            }
        }
    }
}
