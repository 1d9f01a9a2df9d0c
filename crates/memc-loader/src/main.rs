#![doc = include_str!("../README.md")]

mod loader;

use clap::Parser;
use loader::{
    config::{CliArgs, LoaderConfig},
    pipeline::orchestrator::FileLoader,
    runner::run,
    selftest::run_self_test,
    store::registry::ClientRegistry,
    telemetry::init_telemetry,
};
use std::sync::Arc;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = LoaderConfig::try_from(args)?;

    let providers = init_telemetry()?;

    if config.self_test {
        let res = run_self_test();
        providers.shutdown();
        return res;
    }

    log_startup_info(&config);

    let registry = Arc::new(ClientRegistry::memcache(config.timeout));
    let loader = FileLoader::from_config(&config, Arc::clone(&registry));

    let res = run(&config.pattern, &loader).await;
    if let Ok(summary) = &res {
        tracing::info!(
            files = summary.files,
            processed = summary.processed,
            errors = summary.errors,
            connections = registry.len(),
            "Run complete"
        );
    }

    providers.shutdown();
    res.map(|_| ())
}

fn log_startup_info(config: &LoaderConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting loader with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting loader on {} with {} workers, batch size {}{}",
            config.pattern,
            config.workers,
            config.batch_size,
            if config.dry_run { " (dry run)" } else { "" }
        );
    }
}
