//! Hugo export
//!
//! Builds one [`ExportDocument`] per visible node (showable and public) and
//! writes the documents, plus the assets they reference, under the
//! destination directory.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::constants as C;
use crate::error::{CompilerError, Result};
use crate::graph::Graph;
use crate::hierarchy::Hierarchy;
use crate::markdown;
use crate::node::{Node, NodeId};
use crate::rewrite::Rewriter;
use crate::util;
use crate::visibility::Publicity;

/// One Hugo page to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub id: NodeId,
    /// Export path without leading slash, e.g. `graph/my-page`
    pub path: String,
    pub title: String,
    /// Rewritten body text
    pub body: String,
    pub front_matter: Mapping,
    /// Written to the destination root instead of its export path
    pub is_home: bool,
    /// Asset file names referenced by this node
    pub assets: Vec<String>,
}

impl ExportDocument {
    /// File location relative to the destination directory
    pub fn relative_file(&self) -> String {
        if self.is_home {
            C::INDEX_FILENAME.to_string()
        } else {
            format!("{}/{}", self.path, C::INDEX_FILENAME)
        }
    }

    /// Front matter block followed by the body
    pub fn render(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.front_matter)?;
        Ok(format!("---\n{}---\n\n{}\n", yaml, self.body))
    }
}

/// Builds export documents from the resolved graph
pub struct Exporter<'a> {
    graph: &'a Graph,
    publicity: &'a Publicity,
    hierarchy: &'a Hierarchy,
    rewriter: Rewriter<'a>,
}

impl<'a> Exporter<'a> {
    pub fn new(graph: &'a Graph, publicity: &'a Publicity, hierarchy: &'a Hierarchy) -> Self {
        Self {
            graph,
            publicity,
            hierarchy,
            rewriter: Rewriter::new(graph, publicity, hierarchy),
        }
    }

    /// A node gets a document when it is showable and public
    pub fn is_visible(&self, node: &Node) -> bool {
        node.is_showable() && self.publicity.is_public(node.id)
    }

    /// Documents for every visible node, in source order
    pub fn documents(&self) -> Result<Vec<ExportDocument>> {
        let started = Instant::now();

        let documents = self
            .graph
            .nodes()
            .filter(|node| self.is_visible(node))
            .map(|node| self.document(node))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Built {} documents from {} nodes in {:.2?}",
            documents.len(),
            self.graph.len(),
            started.elapsed()
        );
        Ok(documents)
    }

    /// Build the document of one node
    pub fn document(&self, node: &Node) -> Result<ExportDocument> {
        let path = self.hierarchy.export_path(node.id).ok_or_else(|| {
            CompilerError::InvalidPath(format!("node {} has no export path", node.id))
        })?;

        let title = self.rewriter.display_text(node);
        let body = self.rewriter.rewrite_node(node);
        let front_matter = self.front_matter(node, &title)?;

        let mut assets = node
            .text
            .as_deref()
            .map(markdown::extract_asset_names)
            .unwrap_or_default();
        if node.is_page() {
            if let Some(image) = node.properties.get(C::PROP_IMAGE).and_then(|v| v.as_str()) {
                if let Some(name) = image_asset_name(image) {
                    if !assets.iter().any(|known| known == name) {
                        assets.push(name.to_string());
                    }
                }
            }
        }

        Ok(ExportDocument {
            id: node.id,
            path: path.to_string(),
            title,
            body,
            front_matter,
            is_home: node.is_page() && node.is_home(),
            assets,
        })
    }

    fn front_matter(&self, node: &Node, title: &str) -> Result<Mapping> {
        let mut fm = Mapping::new();

        for (key, value) in &node.properties {
            let key = C::RENAMED_PROPERTIES
                .iter()
                .find(|(reserved, _)| *reserved == key.as_str())
                .map(|(_, renamed)| *renamed)
                .unwrap_or(key.as_str());
            set(&mut fm, key, serde_yaml::to_value(value)?);
        }

        set(&mut fm, C::FM_TITLE, Value::String(title.to_string()));

        let backlinks: Vec<Value> = self
            .graph
            .backlinks_of(node.id)
            .iter()
            .filter(|id| self.publicity.is_public(**id))
            .filter_map(|id| self.path_value(*id))
            .collect();
        if !backlinks.is_empty() {
            set(&mut fm, C::FM_BACKLINKS, Value::Sequence(backlinks));
        }

        let aliases: Vec<Value> = self
            .graph
            .aliases_of(node.id)
            .iter()
            .filter_map(|id| self.path_value(*id))
            .collect();
        if !aliases.is_empty() {
            set(&mut fm, C::FM_ALIASES, Value::Sequence(aliases));
        }

        if let Some(namespace) = self.graph.namespace_of(node) {
            if let Some(path) = self.path_value(namespace.id) {
                set(&mut fm, C::FM_NAMESPACE, path);
            }
        }

        let links: Vec<Value> = self
            .graph
            .links_of(node.id)
            .iter()
            .filter_map(|id| {
                if self.publicity.is_public(*id) {
                    self.path_value(*id)
                } else {
                    Some(Value::String(C::REDACTED_PATH.to_string()))
                }
            })
            .collect();
        if !links.is_empty() {
            set(&mut fm, C::FM_LINKS, Value::Sequence(links));
        }

        set(&mut fm, C::FM_COLLAPSED, Value::Bool(node.is_collapsed));
        let kind = if node.is_page() { "page" } else { "block" };
        set(&mut fm, C::FM_TYPE, Value::String(kind.to_string()));
        let weight = self.hierarchy.weight(node.id) as u64;
        set(&mut fm, C::FM_WEIGHT, Value::Number(weight.into()));

        if let Some(date) = node.created_at.and_then(rfc3339) {
            set(&mut fm, C::FM_DATE, Value::String(date));
        }
        if let Some(lastmod) = node.updated_at.and_then(rfc3339) {
            set(&mut fm, C::FM_LASTMOD, Value::String(lastmod));
        }

        Ok(fm)
    }

    fn path_value(&self, id: NodeId) -> Option<Value> {
        self.hierarchy
            .export_path(id)
            .map(|path| Value::String(path.to_string()))
    }
}

fn set(fm: &mut Mapping, key: &str, value: Value) {
    fm.insert(Value::String(key.to_string()), value);
}

/// Milliseconds since the epoch as an RFC 3339 timestamp
fn rfc3339(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.to_rfc3339())
}

/// Asset file named by an `image` property
fn image_asset_name(value: &str) -> Option<&str> {
    markdown::asset_name(value).or_else(|| {
        value
            .trim()
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty() && *name != "..")
    })
}

/// Empty the destination, keeping only the preserved `files` entry
///
/// Creates the destination when missing. Returns the number of removed
/// entries.
pub fn prepare_destination(destination: &Path) -> Result<usize> {
    fs::create_dir_all(destination).map_err(|e| CompilerError::io(destination, e))?;

    let mut removed = 0;
    let entries = fs::read_dir(destination).map_err(|e| CompilerError::io(destination, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CompilerError::io(destination, e))?;
        if entry.file_name() == C::PRESERVED_FOLDER {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| CompilerError::io(&path, e))?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| CompilerError::io(&path, e))?;
        } else {
            fs::remove_file(&path).map_err(|e| CompilerError::io(&path, e))?;
        }
        removed += 1;
    }

    info!(
        "Prepared destination {} ({} entries removed)",
        util::display_path(destination),
        removed
    );
    Ok(removed)
}

/// Write every document under the destination
///
/// A document whose file was already written by an earlier document is
/// skipped. Returns the number of files written.
pub fn write_documents(destination: &Path, documents: &[ExportDocument]) -> Result<usize> {
    let started = Instant::now();
    let mut written = HashSet::new();

    for document in documents {
        let relative = document.relative_file();
        let target = util::secure_path(destination, &relative)
            .map_err(|e| CompilerError::InvalidPath(format!("{}: {}", relative, e)))?;

        if !written.insert(target.clone()) {
            warn!(id = document.id, path = %relative, "duplicate export path, skipping");
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| CompilerError::io(parent, e))?;
        }
        fs::write(&target, document.render()?).map_err(|e| CompilerError::io(&target, e))?;
        debug!(id = document.id, path = %relative, "written");
    }

    info!(
        "Wrote {} documents in {:.2?}",
        written.len(),
        started.elapsed()
    );
    Ok(written.len())
}

/// Copy the named assets into the site's assets folder
///
/// Missing source files are skipped with a warning. Returns the number of
/// files copied.
pub fn copy_assets(assets_dir: &Path, destination: &Path, names: &[String]) -> Result<usize> {
    let target_dir = destination.join(C::ASSETS_FOLDER);
    let mut copied = 0;

    for name in names {
        let source = util::secure_path(assets_dir, name)
            .map_err(|e| CompilerError::InvalidPath(format!("{}: {}", name, e)))?;
        if !source.is_file() {
            warn!(asset = %name, "referenced asset not found");
            continue;
        }

        let target = util::secure_path(&target_dir, name)
            .map_err(|e| CompilerError::InvalidPath(format!("{}: {}", name, e)))?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| CompilerError::io(parent, e))?;
        }
        fs::copy(&source, &target).map_err(|e| CompilerError::io(&source, e))?;
        copied += 1;
    }

    info!("Copied {} of {} referenced assets", copied, names.len());
    Ok(copied)
}
