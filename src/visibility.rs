//! Visibility propagation
//!
//! Computes the effective public/private state of every node in one top-down
//! pass. The resulting [`Publicity`] map is built once per run and passed to
//! everything that renders paths or content.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::{debug, info};

use crate::graph::Graph;
use crate::node::NodeId;

/// Default rule for root nodes without an explicit `public` property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityPolicy {
    /// Only nodes marked `public:: true` (or below one) are public
    #[default]
    ExplicitOnly,
    /// Everything is public unless marked `public:: false`
    AssumePublic,
}

impl VisibilityPolicy {
    pub fn from_assume_public(assume_public: bool) -> Self {
        if assume_public {
            VisibilityPolicy::AssumePublic
        } else {
            VisibilityPolicy::ExplicitOnly
        }
    }

    fn default_visibility(self) -> bool {
        matches!(self, VisibilityPolicy::AssumePublic)
    }
}

/// Effective visibility of every node reachable from a root
#[derive(Debug, Clone, Default)]
pub struct Publicity {
    states: HashMap<NodeId, bool>,
}

impl Publicity {
    /// Propagate visibility from every root down the parent tree
    ///
    /// A node's own `public` property wins; otherwise it inherits its parent's
    /// state; roots without the property fall back to the policy default.
    /// Nodes only reachable through a parent cycle are never visited and read
    /// as private.
    pub fn propagate(graph: &Graph, policy: VisibilityPolicy) -> Self {
        let started = Instant::now();
        let mut states = HashMap::with_capacity(graph.len());
        let mut visited: HashSet<NodeId> = HashSet::with_capacity(graph.len());

        // Reverse so that the first root is processed first
        let mut stack: Vec<(NodeId, Option<bool>)> =
            graph.roots().into_iter().rev().map(|id| (id, None)).collect();

        while let Some((id, inherited)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = graph.get(id) else {
                continue;
            };

            let effective = node
                .visibility_flag()
                .or(inherited)
                .unwrap_or_else(|| policy.default_visibility());
            states.insert(id, effective);

            for child in graph.children_of(Some(id)).iter().rev() {
                stack.push((*child, Some(effective)));
            }
        }

        let unreached = graph.len() - states.len();
        if unreached > 0 {
            debug!("{} nodes unreachable from any root, treated as private", unreached);
        }
        info!(
            "Computed visibility for {} nodes ({} public) in {:.2?}",
            states.len(),
            states.values().filter(|public| **public).count(),
            started.elapsed()
        );

        Self { states }
    }

    /// Whether a node is public; unknown ids are private
    pub fn is_public(&self, id: NodeId) -> bool {
        self.states.get(&id).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(json: &str) -> Graph {
        Graph::from_json_str(json).unwrap()
    }

    #[test]
    fn test_child_inherits_public_page() {
        let g = graph(
            r#"[
                {"db/id": 1, "block/uuid": "p1", "block/name": "p1", "block/properties": {"public": true}},
                {"db/id": 2, "block/uuid": "b1", "block/parent": {"db/id": 1}, "block/page": {"db/id": 1}}
            ]"#,
        );
        let publicity = Publicity::propagate(&g, VisibilityPolicy::ExplicitOnly);
        assert!(publicity.is_public(1));
        assert!(publicity.is_public(2));
    }

    #[test]
    fn test_explicit_flag_overrides_parent() {
        let g = graph(
            r#"[
                {"db/id": 1, "block/uuid": "p1", "block/properties": {"public": "true"}},
                {"db/id": 2, "block/uuid": "b2", "block/parent": {"db/id": 1}, "block/properties": {"public": "false"}},
                {"db/id": 3, "block/uuid": "b3", "block/parent": {"db/id": 2}},
                {"db/id": 4, "block/uuid": "b4", "block/parent": {"db/id": 3}, "block/properties": {"public": true}}
            ]"#,
        );
        let publicity = Publicity::propagate(&g, VisibilityPolicy::ExplicitOnly);
        assert!(publicity.is_public(1));
        assert!(!publicity.is_public(2));
        assert!(!publicity.is_public(3));
        assert!(publicity.is_public(4));
    }

    #[test]
    fn test_root_default_follows_policy() {
        let g = graph(r#"[{"db/id": 1, "block/uuid": "p3", "block/name": "p3"}]"#);
        let explicit = Publicity::propagate(&g, VisibilityPolicy::ExplicitOnly);
        assert_eq!(explicit.len(), 1);
        assert!(!explicit.is_public(1));
        assert!(Publicity::propagate(&g, VisibilityPolicy::AssumePublic).is_public(1));
    }

    #[test]
    fn test_assume_public_respects_explicit_false() {
        let g = graph(
            r#"[
                {"db/id": 1, "block/uuid": "p1", "block/properties": {"public": false}},
                {"db/id": 2, "block/uuid": "b2", "block/parent": {"db/id": 1}}
            ]"#,
        );
        let publicity = Publicity::propagate(&g, VisibilityPolicy::AssumePublic);
        assert!(!publicity.is_public(1));
        assert!(!publicity.is_public(2));
    }

    #[test]
    fn test_parent_cycle_is_not_visited() {
        let g = graph(
            r#"[
                {"db/id": 1, "block/uuid": "p1", "block/properties": {"public": true}},
                {"db/id": 2, "block/uuid": "b2", "block/parent": {"db/id": 3}},
                {"db/id": 3, "block/uuid": "b3", "block/parent": {"db/id": 2}}
            ]"#,
        );
        let publicity = Publicity::propagate(&g, VisibilityPolicy::AssumePublic);
        assert_eq!(publicity.len(), 1);
        assert!(!publicity.is_public(2));
        assert!(!publicity.is_public(3));
    }

    #[test]
    fn test_every_reachable_node_defined_once() {
        let g = graph(
            r#"[
                {"db/id": 1, "block/uuid": "p1"},
                {"db/id": 2, "block/uuid": "b2", "block/parent": {"db/id": 1}},
                {"db/id": 3, "block/uuid": "b3", "block/parent": {"db/id": 1}},
                {"db/id": 4, "block/uuid": "b4", "block/parent": {"db/id": 2}},
                {"db/id": 5, "block/uuid": "b5", "block/parent": {"db/id": 404}}
            ]"#,
        );
        let publicity = Publicity::propagate(&g, VisibilityPolicy::AssumePublic);
        assert_eq!(publicity.len(), g.len());
        assert!(publicity.is_public(5));
    }
}
