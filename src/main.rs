use clap::Parser;
use tracing::Level;
use vector_loader::config::LoaderConfig;
use vector_loader::progress::TracingObserver;
use vector_loader::{pipeline, QdrantClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LoaderConfig::parse();
    let level = if config.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    tracing::info!("🚀 Vector loader {} starting", vector_loader::VERSION);
    config.log_summary();

    let timeout = config.request_timeout();
    let open = || QdrantClient::new(&config.host, config.port, timeout);

    match pipeline::run(&config.file, &config.run_options(), open, &TracingObserver).await {
        Ok(summary) => {
            tracing::info!(
                "✅ Loaded {} vectors (dim {}) into '{}' in {} batches, {:.0}ms total",
                summary.total_uploaded,
                summary.dimensionality,
                summary.collection,
                summary.batches,
                summary.metrics.total_ms()
            );
            if let Some(rate) = summary.metrics.throughput_vectors_per_sec {
                tracing::info!("Upload throughput: {:.0} vectors/s", rate);
            }
            if let Some(path) = &config.report {
                summary.export_to_file(path)?;
            }
            Ok(())
        }
        Err(e) => {
            let stage = e.stage();
            tracing::error!("❌ Run failed at stage '{}': {:#}", stage, anyhow::Error::new(e));
            std::process::exit(1);
        }
    }
}
