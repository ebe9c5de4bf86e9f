//! Error types for logseq-compiler
//!
//! Only fatal conditions are errors. Dropped records, dangling references and
//! cyclic chains degrade to partial results and are logged instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompilerError {
    /// The graph could not be loaded at all
    #[error("graph load failure: {0}")]
    GraphLoad(#[source] GraphLoadError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("front matter serialization failed: {0}")]
    FrontMatter(#[from] serde_yaml::Error),

    #[error("invalid export path: {0}")]
    InvalidPath(String),
}

/// Underlying cause of a graph load failure
#[derive(Error, Debug)]
pub enum GraphLoadError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("graph JSON must be a list of records, found {0}")]
    NotARecordList(&'static str),
}

impl From<GraphLoadError> for CompilerError {
    fn from(err: GraphLoadError) -> Self {
        CompilerError::GraphLoad(err)
    }
}

impl CompilerError {
    /// Wrap an I/O error with the path it happened at
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompilerError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompilerError>;
