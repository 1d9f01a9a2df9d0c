use crate::loader::{config::DestinationMap, service::writer::RecordWriter};
use memc_loader_core::AppsInstalled;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Receiving end of the record queue, shared by every worker of a pool.
pub type SharedRecords = Arc<Mutex<mpsc::Receiver<AppsInstalled>>>;

/// Worker task that turns queued records into outcomes.
///
/// Each iteration takes one record off the shared queue, resolves its
/// destination and writes it through the [`RecordWriter`]. Exactly one
/// outcome is sent per record taken: `false` for an unknown device type or
/// a failed write, `true` otherwise.
///
/// The loop ends only when the record queue is closed and drained, i.e.
/// every sender is gone and no buffered record is left.
///
/// # Arguments
///
/// - `worker_id`: Numeric identifier for this worker (used for logs).
/// - `records`: Shared receiver of parsed records.
/// - `outcomes`: Sender for per-record outcomes.
/// - `destinations`: Device type to memcached address mapping.
/// - `writer`: Encodes and writes a record to its destination.
pub async fn worker_loop(
    worker_id: usize,
    records: SharedRecords,
    outcomes: mpsc::Sender<bool>,
    destinations: Arc<DestinationMap>,
    writer: Arc<RecordWriter>,
) {
    tracing::debug!("w{worker_id}: started");

    loop {
        let next = records.lock().await.recv().await;
        let Some(record) = next else {
            break;
        };

        let ok = match destinations.resolve(&record.dev_type) {
            Some(addr) => writer.insert(addr, &record).await,
            None => {
                tracing::warn!(dev_type = %record.dev_type, "Unknown device type");
                false
            }
        };

        if outcomes.send(ok).await.is_err() {
            tracing::error!("w{worker_id}: outcome queue closed early");
            break;
        }
    }

    tracing::debug!("w{worker_id}: stopped");
}
