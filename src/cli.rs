use std::path::PathBuf;

use clap::Parser;

use crate::config::CompileConfig;

/// logseq-compiler - Compile a Logseq graph export into a Hugo site
///
/// # Quick Reference
///
/// ```bash
/// # Export the graph from Logseq as JSON, then:
/// logseq-compiler graph.json ~/logseq/assets site/content
///
/// # Publish everything not marked `public:: false`
/// logseq-compiler graph.json ~/logseq/assets site/content --assume-public
///
/// # Per-record decisions
/// logseq-compiler graph.json ~/logseq/assets site/content --verbose
/// ```
///
/// ## Visibility
///
/// A page or block is published when it carries `public:: true`, or inherits
/// it from its parent. Every reference to an unpublished node is rendered as
/// `[redacted](-)`.
///
/// ## Destination
///
/// Everything in DESTINATION except `files/` is deleted before writing.
///
/// ## Environment Variables
///
/// - `LOGSEQ_ASSUME_PUBLIC`: `1`, `true` or `yes` enables `--assume-public`
/// - `RUST_LOG`: log filter (overrides `--verbose`)
///
#[derive(Parser, Debug)]
#[command(name = "logseq-compiler")]
#[command(version = "0.1.0")]
#[command(about = "Compile a Logseq JSON graph export into Hugo-ready Markdown")]
pub struct Cli {
    /// Logseq graph exported as JSON
    #[arg(value_name = "GRAPH_JSON")]
    pub graph_json: PathBuf,

    /// The graph's assets folder
    #[arg(value_name = "ASSETS_DIR")]
    pub assets_dir: PathBuf,

    /// Hugo content directory to write into
    #[arg(value_name = "DESTINATION")]
    pub destination: PathBuf,

    /// Treat pages without a `public` property as public
    #[arg(long)]
    pub assume_public: bool,

    /// Log per-record decisions
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Build the run configuration from the parsed arguments
    pub fn config(&self) -> CompileConfig {
        CompileConfig::new(
            self.graph_json.clone(),
            self.assets_dir.clone(),
            self.destination.clone(),
            self.assume_public,
        )
    }
}
