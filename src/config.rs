//! Run configuration
//!
//! Collects the three paths of a compile run and the "assume public" switch.
//! The switch can also be turned on through the `LOGSEQ_ASSUME_PUBLIC`
//! environment variable.

use std::path::PathBuf;

use crate::constants as C;
use crate::visibility::VisibilityPolicy;

/// Configuration of one compile run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileConfig {
    /// Logseq JSON graph export
    pub graph_json: PathBuf,
    /// The graph's `assets` folder
    pub assets_dir: PathBuf,
    /// Hugo content directory to write into
    pub destination: PathBuf,
    /// Treat nodes without a `public` property as public
    pub assume_public: bool,
}

impl CompileConfig {
    /// Create a configuration, honouring the environment override
    pub fn new(
        graph_json: PathBuf,
        assets_dir: PathBuf,
        destination: PathBuf,
        assume_public: bool,
    ) -> Self {
        // Treat empty strings as unset
        let env = std::env::var(C::ENV_ASSUME_PUBLIC)
            .ok()
            .filter(|s| !s.is_empty());

        Self {
            graph_json: normalize(graph_json),
            assets_dir: normalize(assets_dir),
            destination: normalize(destination),
            assume_public: resolve_assume_public(assume_public, env.as_deref()),
        }
    }

    /// Default-visibility rule for this run
    pub fn policy(&self) -> VisibilityPolicy {
        VisibilityPolicy::from_assume_public(self.assume_public)
    }
}

/// The command-line flag wins; otherwise a truthy environment value enables
/// assume-public mode
fn resolve_assume_public(flag: bool, env: Option<&str>) -> bool {
    flag || env.map(is_truthy).unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Canonicalize existing paths without UNC prefixes on Windows
fn normalize(path: PathBuf) -> PathBuf {
    dunce::canonicalize(&path).unwrap_or(path)
}
