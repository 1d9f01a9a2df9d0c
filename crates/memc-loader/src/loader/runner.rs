//! Run driver: discover input files and push each one through the pipeline.
//!
//! Files are processed strictly one at a time. Every discovered file is
//! renamed with the handled marker after processing, whatever its verdict;
//! a failed rename is logged and does not affect the statistics.

use super::{
    disposition::mark_handled,
    pipeline::{
        orchestrator::FileLoader,
        stats::{FileStats, Verdict},
    },
    telemetry,
};
use anyhow::Context;
use glob::MatchOptions;
use memc_loader_core::NORMAL_ERR_RATE;
use std::{
    path::{Path, PathBuf},
    time::Instant,
};

/// Totals over every file of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files: usize,
    pub processed: u64,
    pub errors: u64,
}

/// Expands `pattern` into the list of files to load.
///
/// Wildcards never match a leading `.`, so files handled by an earlier run
/// are not picked up again; only a pattern naming such a file literally
/// (e.g. `data/.a.tsv.gz`) finds it. Unreadable entries are logged and
/// skipped.
///
/// # Errors
///
/// Fails if `pattern` is not a valid glob.
pub fn discover(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let paths = glob::glob_with(pattern, options)
        .with_context(|| format!("Failed to glob files with {pattern:?}"))?;

    Ok(paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Skipping unreadable path: {e}");
                None
            }
        })
        .collect())
}

/// Loads every file matching `pattern`.
///
/// # Errors
///
/// Fails only if `pattern` is not a valid glob.
pub async fn run(pattern: &str, loader: &FileLoader) -> anyhow::Result<RunSummary> {
    let files = discover(pattern)?;
    tracing::info!(pattern, files = files.len(), "Discovered input files");

    let mut summary = RunSummary::default();
    for path in &files {
        let stats = handle_file(path, loader).await;
        summary.files += 1;
        summary.processed += stats.processed;
        summary.errors += stats.errors;
    }

    Ok(summary)
}

/// Processes one file, reports its verdict and marks it handled.
pub async fn handle_file(path: &Path, loader: &FileLoader) -> FileStats {
    let start = Instant::now();
    let stats = loader.process_file(path).await;
    report(&stats);

    match mark_handled(path) {
        Ok(target) => tracing::debug!("Renamed {} to {}", path.display(), target.display()),
        Err(e) => tracing::error!("Failed to rename {}: {e}", path.display()),
    }

    telemetry::increment_files_handled();
    telemetry::record_file_duration(start.elapsed().as_millis() as f64);
    stats
}

/// Logs the verdict for `stats` and returns it.
fn report(stats: &FileStats) -> Verdict {
    let verdict = stats.verdict();
    match verdict {
        Verdict::Empty => {}
        Verdict::Acceptable { rate } => tracing::info!(
            "Acceptable error rate ({rate:.4}). Successfully loaded {} records",
            stats.processed
        ),
        Verdict::HighErrorRate { rate } => {
            tracing::error!("High error rate ({rate:.4} > {NORMAL_ERR_RATE:.4}). Failed load");
        }
    }
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{
        pipeline::orchestrator::tests::{loader, write_gz},
        service::writer::tests::MemoryStore,
    };
    use std::sync::Arc;

    fn pattern(dir: &Path) -> String {
        dir.join("*.tsv.gz").to_string_lossy().into_owned()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn every_discovered_file_is_marked_handled_once() {
        let dir = tempfile::tempdir().unwrap();
        write_gz(dir.path(), "good.tsv.gz", "idfa\ta\t1\t2\t3\ngaid\tb\t1\t2\t3\n");
        write_gz(dir.path(), "noisy.tsv.gz", "idfa\ta\t1\t2\t3\nbroken\n");
        write_gz(dir.path(), "blank.tsv.gz", "\n");
        std::fs::write(dir.path().join("corrupt.tsv.gz"), b"not gzip").unwrap();
        std::fs::write(dir.path().join("other.txt"), b"ignored").unwrap();

        let store = Arc::new(MemoryStore::default());
        let summary = run(&pattern(dir.path()), &loader(2, &store, false)).await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                files: 4,
                processed: 3,
                errors: 1
            }
        );
        for name in ["good", "noisy", "blank", "corrupt"] {
            assert!(dir.path().join(format!(".{name}.tsv.gz")).exists(), "{name}");
            assert!(!dir.path().join(format!("{name}.tsv.gz")).exists(), "{name}");
        }
        assert!(dir.path().join("other.txt").exists());
    }

    #[tokio::test]
    async fn handled_files_are_not_discovered_again() {
        let dir = tempfile::tempdir().unwrap();
        write_gz(dir.path(), "a.tsv.gz", "idfa\ta\t1\t2\t3\n");

        let store = Arc::new(MemoryStore::default());
        let loader = loader(1, &store, false);
        assert_eq!(run(&pattern(dir.path()), &loader).await.unwrap().files, 1);
        assert_eq!(run(&pattern(dir.path()), &loader).await.unwrap().files, 0);
        assert!(dir.path().join(".a.tsv.gz").exists());
    }

    #[test]
    fn wildcards_skip_handled_files_but_literal_names_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".a.tsv.gz"), b"x").unwrap();
        std::fs::write(dir.path().join("b.tsv.gz"), b"x").unwrap();

        let found = discover(&pattern(dir.path())).unwrap();
        assert_eq!(found, vec![dir.path().join("b.tsv.gz")]);

        let wildcard_dot = dir.path().join(".*.tsv.gz");
        assert!(discover(&wildcard_dot.to_string_lossy()).unwrap().is_empty());

        let literal = dir.path().join(".a.tsv.gz");
        assert_eq!(discover(&literal.to_string_lossy()).unwrap(), vec![literal]);
    }

    fn lines(ok: usize, bad: usize) -> String {
        let mut contents: String = (0..ok).map(|i| format!("idfa\tdev{i}\t1\t2\t{i}\n")).collect();
        contents.extend((0..bad).map(|i| format!("broken{i}\n")));
        contents
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn one_error_per_hundred_processed_is_a_high_error_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gz(dir.path(), "edge.tsv.gz", &lines(100, 1));
        let store = Arc::new(MemoryStore::default());

        let stats = handle_file(&path, &loader(4, &store, false)).await;

        assert_eq!(stats, FileStats { processed: 100, errors: 1 });
        assert_eq!(report(&stats), Verdict::HighErrorRate { rate: 0.01 });
        assert!(dir.path().join(".edge.tsv.gz").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn one_error_per_hundred_and_one_processed_is_acceptable() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gz(dir.path(), "ok.tsv.gz", &lines(101, 1));
        let store = Arc::new(MemoryStore::default());

        let stats = handle_file(&path, &loader(4, &store, false)).await;

        assert_eq!(stats, FileStats { processed: 101, errors: 1 });
        assert!(matches!(report(&stats), Verdict::Acceptable { rate } if rate < NORMAL_ERR_RATE));
    }

    #[test]
    fn empty_stats_report_nothing() {
        assert_eq!(report(&FileStats::default()), Verdict::Empty);
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(discover("data/[*.tsv.gz").is_err());
    }
}
