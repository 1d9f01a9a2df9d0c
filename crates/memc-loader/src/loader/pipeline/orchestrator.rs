//! Per-file load pipeline.
//!
//! A file moves through `Opening -> Streaming -> Draining -> Finalized`:
//!
//! - **Opening**: open the file and wrap it in a gzip decoder. Any failure
//!   here finalizes the file with zero processed and zero errors.
//! - **Streaming**: a blocking producer parses lines into the bounded record
//!   queue, a [`WorkerPool`] turns records into outcomes on the bounded
//!   outcome queue, and a closer task shuts the outcome queue once every
//!   worker has exited.
//! - **Draining**: the caller's task folds outcomes into [`FileStats`] until
//!   the outcome queue closes.
//! - **Finalized**: the producer's count of rejected lines is added to the
//!   errors and the stats are returned.
//!
//! Both queues hold `workers * batch_size` items, which bounds memory: the
//! producer blocks on a full record queue and workers block on a full
//! outcome queue.

use super::{producer::produce, stats::FileStats};
use crate::loader::{
    config::{DestinationMap, LoaderConfig},
    pool::manager::WorkerPool,
    service::writer::RecordWriter,
    store::registry::ClientRegistry,
    telemetry,
};
use flate2::read::MultiGzDecoder;
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
    sync::Arc,
};
use tokio::sync::mpsc;

/// Read buffer for the decompressed stream.
const READ_BUFFER_BYTES: usize = 64 * 1024;

/// Runs the load pipeline for one file at a time.
pub struct FileLoader {
    workers: usize,
    queue_capacity: usize,
    destinations: Arc<DestinationMap>,
    writer: Arc<RecordWriter>,
}

impl FileLoader {
    pub fn new(
        workers: usize,
        queue_capacity: usize,
        destinations: DestinationMap,
        writer: RecordWriter,
    ) -> Self {
        Self {
            workers,
            queue_capacity,
            destinations: Arc::new(destinations),
            writer: Arc::new(writer),
        }
    }

    /// Builds a loader from the runtime configuration, writing through
    /// `registry`.
    pub fn from_config(config: &LoaderConfig, registry: Arc<ClientRegistry>) -> Self {
        Self::new(
            config.workers,
            config.queue_capacity,
            config.destinations.clone(),
            RecordWriter::new(registry, config.dry_run),
        )
    }

    /// Loads one gzipped TSV file and returns its statistics.
    ///
    /// Never fails: a file that cannot be opened or decompressed yields
    /// `FileStats::default()`.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub async fn process_file(&self, path: &Path) -> FileStats {
        let owned = path.to_path_buf();
        let opened = tokio::task::spawn_blocking(move || open_gzip(&owned))
            .await
            .unwrap_or_else(|e| Err(io::Error::other(e)));
        let reader = match opened {
            Ok(reader) => reader,
            Err(e) => {
                tracing::error!("Failed to open: {e}");
                return FileStats::default();
            }
        };

        tracing::info!("Processing {}", path.display());
        let stats = self.process_reader(reader).await;
        tracing::info!(
            "Done {}: processed={} errors={}",
            path.display(),
            stats.processed,
            stats.errors
        );
        stats
    }

    /// Runs the streaming and draining stages over already decompressed
    /// lines.
    pub async fn process_reader<R>(&self, reader: R) -> FileStats
    where
        R: BufRead + Send + 'static,
    {
        let (record_tx, record_rx) = mpsc::channel(self.queue_capacity);
        let (outcome_tx, mut outcome_rx) = mpsc::channel(self.queue_capacity);

        let pool = WorkerPool::spawn(
            self.workers,
            record_rx,
            &outcome_tx,
            &self.destinations,
            &self.writer,
        );
        tracing::debug!(workers = pool.len(), capacity = self.queue_capacity, "Pool started");

        let producer = tokio::task::spawn_blocking(move || produce(reader, record_tx));
        let closer = pool.close_when_done(outcome_tx);

        let mut stats = FileStats::default();
        while let Some(ok) = outcome_rx.recv().await {
            stats.record(ok);
        }

        let rejected = match producer.await {
            Ok(rejected) => rejected,
            Err(e) => {
                tracing::error!("Producer terminated abnormally: {e}");
                0
            }
        };
        if let Err(e) = closer.await {
            tracing::error!("Pool closer terminated abnormally: {e}");
        }

        telemetry::increment_records_processed(stats.processed);
        telemetry::increment_records_failed(stats.errors);
        telemetry::increment_lines_rejected(rejected);

        stats.errors += rejected;
        stats
    }
}

/// Opens `path` as a (possibly multi-member) gzip stream.
///
/// The first block is decompressed eagerly so that a missing or corrupt gzip
/// header is reported here rather than as a mid-stream read error. Blocks,
/// so callers on the runtime go through `spawn_blocking`.
fn open_gzip(path: &Path) -> io::Result<BufReader<MultiGzDecoder<File>>> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_BYTES, MultiGzDecoder::new(file));
    reader.fill_buf()?;
    Ok(reader)
}
