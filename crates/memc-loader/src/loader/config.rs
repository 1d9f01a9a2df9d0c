use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use memc_loader_core::{DEFAULT_BATCH_SIZE, DEFAULT_MEMC_TIMEOUT, DEFAULT_WORKERS};
use std::collections::HashMap;

/// Runtime configuration for the `memc-loader` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first), with defaults matching a local four-instance
/// memcached setup.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "memc-loader",
    version,
    about = "Loads gzipped apps-installed TSV files into memcached"
)]
pub struct CliArgs {
    /// Run the protobuf round-trip self test on built-in samples and exit.
    #[arg(short, long, default_value_t = false)]
    pub test: bool,

    /// Parse and encode everything but log the writes instead of sending
    /// them to memcached.
    ///
    /// Environment variable: `DRY_RUN`
    #[arg(long = "dry", env = "DRY_RUN", default_value_t = false)]
    pub dry_run: bool,

    /// Glob pattern selecting the input files.
    ///
    /// Files whose name already starts with `.` have been handled by a
    /// previous run and are not matched by the default pattern.
    ///
    /// Environment variable: `PATTERN`
    #[arg(long, env = "PATTERN", default_value_t = String::from("./data/appsinstalled/*.tsv.gz"))]
    pub pattern: String,

    /// memcached address for `idfa` records.
    ///
    /// Environment variable: `IDFA_ADDR`
    #[arg(long, env = "IDFA_ADDR", default_value_t = String::from("127.0.0.1:33013"))]
    pub idfa: String,

    /// memcached address for `gaid` records.
    ///
    /// Environment variable: `GAID_ADDR`
    #[arg(long, env = "GAID_ADDR", default_value_t = String::from("127.0.0.1:33014"))]
    pub gaid: String,

    /// memcached address for `adid` records.
    ///
    /// Environment variable: `ADID_ADDR`
    #[arg(long, env = "ADID_ADDR", default_value_t = String::from("127.0.0.1:33015"))]
    pub adid: String,

    /// memcached address for `dvid` records.
    ///
    /// Environment variable: `DVID_ADDR`
    #[arg(long, env = "DVID_ADDR", default_value_t = String::from("127.0.0.1:33016"))]
    pub dvid: String,

    /// Number of concurrent insert workers.
    ///
    /// Environment variable: `WORKERS`
    #[arg(long, env = "WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Records buffered per worker. The record and outcome queues each hold
    /// `workers * batch_size` items, which bounds memory while the producer
    /// stays ahead of the pool.
    ///
    /// Environment variable: `BATCH_SIZE`
    #[arg(long, env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Connect/read/write timeout for each memcached operation, in seconds.
    ///
    /// Environment variable: `MEMC_TIMEOUT_SECS`
    #[arg(long = "timeout-secs", env = "MEMC_TIMEOUT_SECS", default_value_t = DEFAULT_MEMC_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
}

/// Static mapping from device type to memcached address.
///
/// Immutable for the duration of a run. Unknown device types, and device
/// types mapped to an empty address, resolve to `None`.
#[derive(Debug, Clone, Default)]
pub struct DestinationMap {
    addrs: HashMap<String, String>,
}

impl DestinationMap {
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            addrs: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the address responsible for `dev_type`, if any.
    pub fn resolve(&self, dev_type: &str) -> Option<&str> {
        self.addrs
            .get(dev_type)
            .map(String::as_str)
            .filter(|addr| !addr.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub self_test: bool,
    pub dry_run: bool,
    pub pattern: String,
    pub destinations: DestinationMap,
    pub workers: usize,
    pub batch_size: usize,
    pub queue_capacity: usize,
    pub timeout: Duration,
}

impl TryFrom<CliArgs> for LoaderConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.workers == 0 {
            bail!("WORKERS must be greater than 0");
        }

        if args.batch_size == 0 {
            bail!("BATCH_SIZE must be greater than 0");
        }

        if args.timeout_secs == 0 {
            bail!("MEMC_TIMEOUT_SECS must be greater than 0");
        }

        let queue_capacity = args
            .workers
            .checked_mul(args.batch_size)
            .ok_or_else(|| anyhow::anyhow!("Overflow in queue_capacity computation"))?;

        let destinations = DestinationMap::new([
            ("idfa", args.idfa),
            ("gaid", args.gaid),
            ("adid", args.adid),
            ("dvid", args.dvid),
        ]);

        Ok(Self {
            self_test: args.test,
            dry_run: args.dry_run,
            pattern: args.pattern,
            destinations,
            workers: args.workers,
            batch_size: args.batch_size,
            queue_capacity,
            timeout: Duration::from_secs(args.timeout_secs),
        })
    }
}
