//! Hierarchy resolution
//!
//! Orders siblings through their left-sibling chains, walks ancestor chains,
//! and builds the canonical export path of every node.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::constants as C;
use crate::graph::Graph;
use crate::node::{Node, NodeId};
use crate::visibility::Publicity;

/// Sibling positions and export paths for a whole graph
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    sibling_index: HashMap<NodeId, usize>,
    export_paths: HashMap<NodeId, String>,
}

impl Hierarchy {
    /// Resolve sibling order and export paths for every node
    pub fn resolve(graph: &Graph, publicity: &Publicity) -> Self {
        let started = Instant::now();

        let sibling_index = sibling_indices(graph);
        let export_paths = graph
            .nodes()
            .map(|node| (node.id, export_path(graph, publicity, node.id)))
            .collect();

        info!(
            "Resolved hierarchy for {} nodes in {:.2?}",
            graph.len(),
            started.elapsed()
        );

        Self {
            sibling_index,
            export_paths,
        }
    }

    /// Zero-based position among siblings
    pub fn sibling_index(&self, id: NodeId) -> Option<usize> {
        self.sibling_index.get(&id).copied()
    }

    /// One-based ordering weight used by the site generator
    pub fn weight(&self, id: NodeId) -> usize {
        self.sibling_index(id).unwrap_or(0) + 1
    }

    /// Canonical export path, e.g. `graph/my-page/<uuid>`
    pub fn export_path(&self, id: NodeId) -> Option<&str> {
        self.export_paths.get(&id).map(String::as_str)
    }
}

/// Compute the sibling index of every node, group by group
pub fn sibling_indices(graph: &Graph) -> HashMap<NodeId, usize> {
    let mut indices = HashMap::with_capacity(graph.len());

    for (parent, ids) in graph.sibling_groups() {
        let group: Vec<&Node> = ids.iter().filter_map(|id| graph.get(*id)).collect();
        let ordered = order_siblings(&group);
        if ordered.len() != group.len() {
            warn!(?parent, "sibling ordering lost nodes");
        }
        indices.extend(ordered);
    }

    indices
}

/// Order one sibling group by following left-sibling chains
///
/// Chain heads are nodes whose left sibling is absent or outside the group.
/// Each chain is walked rightwards from its head; nodes left over by a cycle
/// or a duplicated left sibling are appended in group order. Every node of
/// the group receives exactly one index in `0..group.len()`.
pub fn order_siblings(group: &[&Node]) -> Vec<(NodeId, usize)> {
    let members: HashSet<NodeId> = group.iter().map(|node| node.id).collect();

    // left sibling id → the node sitting right of it
    let mut right_of: HashMap<NodeId, NodeId> = HashMap::new();
    for node in group {
        if let Some(left) = node.left_sibling_id.filter(|left| members.contains(left)) {
            if right_of.contains_key(&left) {
                debug!(left, node = node.id, "two siblings share a left sibling");
                continue;
            }
            right_of.insert(left, node.id);
        }
    }

    let mut visited: HashSet<NodeId> = HashSet::with_capacity(group.len());
    let mut ordered = Vec::with_capacity(group.len());

    let heads = group.iter().filter(|node| match node.left_sibling_id {
        None => true,
        Some(left) => !members.contains(&left),
    });

    for head in heads {
        let mut current = Some(head.id);
        while let Some(id) = current {
            if !visited.insert(id) {
                break;
            }
            ordered.push((id, ordered.len()));
            current = right_of.get(&id).copied();
        }
    }

    if ordered.len() < group.len() {
        debug!(
            "{} siblings not reachable from a chain head",
            group.len() - ordered.len()
        );
        for node in group {
            if visited.insert(node.id) {
                ordered.push((node.id, ordered.len()));
            }
        }
    }

    ordered
}

/// Ancestor chain of a node, root first and ending with the node itself
///
/// Stops at a missing parent. A revisited id ends the walk, so cycles yield a
/// finite chain.
pub fn ancestors(graph: &Graph, id: NodeId) -> Vec<NodeId> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current = graph.get(id);

    while let Some(node) = current {
        if !visited.insert(node.id) {
            debug!(id, "parent cycle detected");
            break;
        }
        chain.push(node.id);
        current = graph.parent_of(node);
    }

    chain.reverse();
    chain
}

/// Export path of a node: the notes folder followed by the path component of
/// every ancestor and of the node itself
pub fn export_path(graph: &Graph, publicity: &Publicity, id: NodeId) -> String {
    let mut segments = vec![C::NOTES_FOLDER.to_string()];
    segments.extend(
        ancestors(graph, id)
            .into_iter()
            .filter_map(|ancestor| graph.get(ancestor))
            .map(|node| node.path_component(publicity)),
    );
    segments.join("/")
}
