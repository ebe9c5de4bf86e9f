pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod graph;
pub mod hierarchy;
pub mod markdown;
pub mod node;
pub mod rewrite;
pub mod util;
pub mod visibility;

use std::time::Instant;

use tracing::info;

pub use cli::Cli;
pub use config::CompileConfig;
pub use error::{CompilerError, GraphLoadError, Result};
pub use export::{ExportDocument, Exporter};
pub use graph::Graph;
pub use hierarchy::Hierarchy;
pub use node::{Node, NodeId, PropertyValue};
pub use rewrite::Rewriter;
pub use visibility::{Publicity, VisibilityPolicy};

/// Counts reported by a finished compile run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileSummary {
    pub nodes: usize,
    pub public: usize,
    pub documents: usize,
    pub written: usize,
    pub assets: usize,
}

/// Compile a graph export into the destination directory
///
/// Every derived map is computed before the destination is touched, so a
/// graph that fails to load leaves the previous output in place.
pub fn compile(config: &CompileConfig) -> Result<CompileSummary> {
    let started = Instant::now();

    let graph = Graph::load(&config.graph_json)?;
    let publicity = Publicity::propagate(&graph, config.policy());
    let hierarchy = Hierarchy::resolve(&graph, &publicity);
    let documents = Exporter::new(&graph, &publicity, &hierarchy).documents()?;

    export::prepare_destination(&config.destination)?;
    let written = export::write_documents(&config.destination, &documents)?;

    let mut assets: Vec<String> = Vec::new();
    for name in documents.iter().flat_map(|doc| doc.assets.iter()) {
        if !assets.contains(name) {
            assets.push(name.clone());
        }
    }
    let copied = export::copy_assets(&config.assets_dir, &config.destination, &assets)?;

    let summary = CompileSummary {
        nodes: graph.len(),
        public: graph.nodes().filter(|n| publicity.is_public(n.id)).count(),
        documents: documents.len(),
        written,
        assets: copied,
    };
    info!("Compiled graph in {:.2?}: {:?}", started.elapsed(), summary);
    Ok(summary)
}
