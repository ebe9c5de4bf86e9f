//! Graph loading and adjacency building
//!
//! Loads the flat record list exported by Logseq and indexes the resulting
//! nodes by id. Adjacency (children, backlinks, links, aliases) only contains
//! edges whose target exists; dangling references are dropped silently.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{GraphLoadError, Result};
use crate::node::{Node, NodeId};

/// The loaded, immutable node graph
#[derive(Debug, Default)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    /// Ids in source order (first occurrence)
    order: Vec<NodeId>,
    /// Resolved parent → children, `None` holds the parentless nodes
    children: HashMap<Option<NodeId>, Vec<NodeId>>,
    backlinks: HashMap<NodeId, Vec<NodeId>>,
    links: HashMap<NodeId, Vec<NodeId>>,
    aliases: HashMap<NodeId, Vec<NodeId>>,
}

impl Graph {
    /// Read and build a graph from a JSON export file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading graph JSON from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|source| GraphLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Build a graph from the text of a JSON export
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).map_err(GraphLoadError::Json)?;
        Self::from_value(value)
    }

    /// Build a graph from an already decoded JSON export
    ///
    /// The top-level value must be an array. Entries that are not objects, or
    /// lack the identity keys, are dropped.
    pub fn from_value(value: Value) -> Result<Self> {
        let records = match value {
            Value::Array(records) => records,
            other => return Err(GraphLoadError::NotARecordList(json_kind(&other)).into()),
        };

        let total = records.len();
        let nodes: Vec<Node> = records
            .iter()
            .filter_map(Value::as_object)
            .filter_map(Node::from_record)
            .collect();
        info!("{} valid records out of {}", nodes.len(), total);

        Ok(Self::from_nodes(nodes))
    }

    /// Index nodes and build the adjacency maps
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut graph = Graph::default();

        for node in nodes {
            let id = node.id;
            if graph.nodes.insert(id, node).is_some() {
                warn!(id, "duplicate record id, keeping the later record");
            } else {
                graph.order.push(id);
            }
        }

        graph.build_adjacency();
        graph
    }

    fn build_adjacency(&mut self) {
        let mut dangling = 0usize;

        for id in &self.order {
            let node = &self.nodes[id];

            match node.parent_id {
                None => self.children.entry(None).or_default().push(node.id),
                Some(parent) if self.nodes.contains_key(&parent) => {
                    self.children.entry(Some(parent)).or_default().push(node.id)
                }
                Some(parent) => {
                    debug!(id = node.id, parent, "parent does not exist");
                    dangling += 1;
                }
            }

            // A target the parent already links or inherits is not a backlink
            let inherited: &[NodeId] = node
                .parent_id
                .and_then(|parent| self.nodes.get(&parent))
                .map(|parent| parent.inherited_ref_ids.as_slice())
                .unwrap_or(&[]);

            for target in &node.outbound_ref_ids {
                if !self.nodes.contains_key(target) {
                    dangling += 1;
                    continue;
                }
                let links = self.links.entry(node.id).or_default();
                if links.contains(target) {
                    continue;
                }
                links.push(*target);
                if !inherited.contains(target) {
                    self.backlinks.entry(*target).or_default().push(node.id);
                }
            }

            for alias in &node.alias_ids {
                if !self.nodes.contains_key(alias) {
                    dangling += 1;
                    continue;
                }
                let aliases = self.aliases.entry(node.id).or_default();
                if !aliases.contains(alias) {
                    aliases.push(*alias);
                }
            }
        }

        if dangling > 0 {
            debug!("dropped {} dangling edges", dangling);
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in source order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.order.iter().map(move |id| &self.nodes[id])
    }

    /// Children of a node, or the parentless nodes for `None`
    pub fn children_of(&self, parent: Option<NodeId>) -> &[NodeId] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes whose outbound references include `id`
    pub fn backlinks_of(&self, id: NodeId) -> &[NodeId] {
        self.backlinks.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Existing outbound references of `id`, in source order
    pub fn links_of(&self, id: NodeId) -> &[NodeId] {
        self.links.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Existing alias nodes of `id`
    pub fn aliases_of(&self, id: NodeId) -> &[NodeId] {
        self.aliases.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The parent node, if it exists
    pub fn parent_of(&self, node: &Node) -> Option<&Node> {
        node.parent_id.and_then(|id| self.nodes.get(&id))
    }

    /// The namespace parent node, if it exists
    pub fn namespace_of(&self, node: &Node) -> Option<&Node> {
        node.namespace_parent_id.and_then(|id| self.nodes.get(&id))
    }

    /// Starting points of the tree: parentless nodes, then nodes whose
    /// declared parent does not exist
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots = self.children_of(None).to_vec();
        roots.extend(self.nodes().filter_map(|node| match node.parent_id {
            Some(parent) if !self.nodes.contains_key(&parent) => Some(node.id),
            _ => None,
        }));
        roots
    }

    /// Group every node by its declared parent id, in source order
    ///
    /// Unlike [`Graph::children_of`] this keeps groups for parents that do not
    /// exist, so every node belongs to exactly one group.
    pub fn sibling_groups(&self) -> Vec<(Option<NodeId>, Vec<NodeId>)> {
        let mut index: HashMap<Option<NodeId>, usize> = HashMap::new();
        let mut groups: Vec<(Option<NodeId>, Vec<NodeId>)> = Vec::new();

        for node in self.nodes() {
            let slot = *index.entry(node.parent_id).or_insert_with(|| {
                groups.push((node.parent_id, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(node.id);
        }

        groups
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
