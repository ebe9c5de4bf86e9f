use anyhow::{Context, Result};
use clap::Parser;
use logseq_compiler::util::display_path;
use logseq_compiler::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = cli.config();
    let summary = logseq_compiler::compile(&config).with_context(|| {
        format!(
            "failed to compile {} into {}",
            display_path(&config.graph_json),
            display_path(&config.destination)
        )
    })?;

    tracing::info!(
        "{} documents written, {} assets copied",
        summary.written,
        summary.assets
    );
    Ok(())
}
