//! Core graph data structures.
//!
//! A graph consists of:
//!
//! - **Nodes**: async processing units that receive the full state and return
//!   a partial update
//! - **Edges**: direct or selector-driven transitions between nodes
//! - **Channels**: per-field merge rules applied when folding a node's
//!   partial update into the accumulated state
//! - **Entry point**: the single node where execution begins
//!
//! ```text
//!            ┌──────────────┐   direct    ┌──────────────┐
//!  entry ───▶│ validate     │────────────▶│ analyze      │
//!            └──────────────┘             └──────┬───────┘
//!                                                │ conditional
//!                                   "retry" ◀────┴────▶ "done"
//! ```
//!
//! Most callers build graphs through [`StateGraph`](crate::StateGraph)
//! rather than assembling a [`Graph`] by hand.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::state::ChannelSpec;

/// Node identifier, unique within a graph.
pub type NodeId = String;

/// Special node identifier for graph termination.
///
/// An edge to `END` marks its source as terminal. A node with no outgoing
/// edges at all is equally terminal; `END` just makes the intent explicit.
pub const END: &str = "__end__";

/// Node executor function type.
///
/// Receives the current state as a JSON object and returns a *partial* state:
/// a JSON object holding only the fields the node wants to update. The
/// executor must never mutate shared state; the engine clones state into each
/// invocation.
pub type NodeExecutor = Arc<
    dyn Fn(serde_json::Value) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>>
        + Send
        + Sync,
>;

/// Selector function for conditional edges.
///
/// Inspects the merged state after the source node completes and returns a
/// branch label, which is resolved to a target node through the edge's
/// branch map.
pub type EdgeSelector = Arc<dyn Fn(&serde_json::Value) -> String + Send + Sync>;

/// Node specification: a name plus its executor.
#[derive(Clone)]
pub struct NodeSpec {
    /// Human-readable name, used in logs and errors.
    pub name: NodeId,
    /// Async state-transform function.
    pub executor: NodeExecutor,
}

impl Debug for NodeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSpec")
            .field("name", &self.name)
            .field("executor", &"<function>")
            .finish()
    }
}

/// Edge type defining transitions between nodes.
#[derive(Clone)]
pub enum Edge {
    /// Unconditional transition to a single node.
    Direct(NodeId),

    /// Selector-driven transition.
    ///
    /// After the source node completes, the selector is evaluated against the
    /// merged state and must return one of the labels in `branches`. An
    /// unmapped label fails the run with
    /// [`GraphError::UnroutableState`](crate::error::GraphError::UnroutableState).
    Conditional {
        /// Routes the merged state to a branch label.
        selector: EdgeSelector,
        /// Map of branch labels to target nodes, used for validation and routing.
        branches: HashMap<String, NodeId>,
    },
}

impl Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Direct(to) => f.debug_tuple("Direct").field(to).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("selector", &"<function>")
                .field("branches", branches)
                .finish(),
        }
    }
}

/// Underlying graph structure: nodes, edges, channels, entry point.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    /// All nodes mapped by their unique names.
    pub nodes: HashMap<NodeId, NodeSpec>,
    /// Outgoing edges per source node.
    pub edges: HashMap<NodeId, Vec<Edge>>,
    /// Entry point; `None` until `set_entry` is called.
    pub entry: Option<NodeId>,
    /// Per-field merge policy table.
    pub channels: HashMap<String, ChannelSpec>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the graph structure for correctness.
    ///
    /// Checks that an entry point is set and registered, that every edge
    /// endpoint and conditional branch target is a registered node (or
    /// [`END`]), and that every registered node is reachable from the entry.
    pub fn validate(&self) -> Result<()> {
        let entry = self.entry.as_ref().ok_or(GraphError::NoEntryPoint)?;
        if !self.nodes.contains_key(entry) {
            return Err(GraphError::unknown_node(entry, "entry point"));
        }

        for (from, edges) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::unknown_node(from, "edge source"));
            }
            for edge in edges {
                match edge {
                    Edge::Direct(to) => {
                        if to != END && !self.nodes.contains_key(to) {
                            return Err(GraphError::unknown_node(
                                to,
                                format!("edge from '{from}'"),
                            ));
                        }
                    }
                    Edge::Conditional { branches, .. } => {
                        for (label, to) in branches {
                            if to != END && !self.nodes.contains_key(to) {
                                return Err(GraphError::unknown_node(
                                    to,
                                    format!("branch '{label}' of '{from}'"),
                                ));
                            }
                        }
                    }
                }
            }
        }

        self.check_reachability(entry)
    }

    fn check_reachability(&self, entry: &NodeId) -> Result<()> {
        let mut visited = std::collections::HashSet::new();
        let mut stack = vec![entry.clone()];
        while let Some(node) = stack.pop() {
            if !visited.insert(node.clone()) {
                continue;
            }
            for edge in self.edges.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
                match edge {
                    Edge::Direct(to) => {
                        if to != END {
                            stack.push(to.clone());
                        }
                    }
                    Edge::Conditional { branches, .. } => {
                        for to in branches.values() {
                            if to != END {
                                stack.push(to.clone());
                            }
                        }
                    }
                }
            }
        }

        for name in self.nodes.keys() {
            if !visited.contains(name) {
                return Err(GraphError::UnreachableNode(name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_spec(name: &str) -> NodeSpec {
        NodeSpec {
            name: name.to_string(),
            executor: Arc::new(|_| Box::pin(async { Ok(serde_json::json!({})) })),
        }
    }

    #[test]
    fn empty_graph_has_no_entry() {
        let graph = Graph::new();
        assert!(matches!(graph.validate(), Err(GraphError::NoEntryPoint)));
    }

    #[test]
    fn validates_linear_graph() {
        let mut graph = Graph::new();
        graph.nodes.insert("a".into(), noop_spec("a"));
        graph.nodes.insert("b".into(), noop_spec("b"));
        graph.edges.insert("a".into(), vec![Edge::Direct("b".into())]);
        graph.edges.insert("b".into(), vec![Edge::Direct(END.into())]);
        graph.entry = Some("a".into());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn rejects_dangling_edge_target() {
        let mut graph = Graph::new();
        graph.nodes.insert("a".into(), noop_spec("a"));
        graph
            .edges
            .insert("a".into(), vec![Edge::Direct("missing".into())]);
        graph.entry = Some("a".into());
        assert!(matches!(
            graph.validate(),
            Err(GraphError::UnknownNode { node, .. }) if node == "missing"
        ));
    }

    #[test]
    fn rejects_unreachable_node() {
        let mut graph = Graph::new();
        graph.nodes.insert("a".into(), noop_spec("a"));
        graph.nodes.insert("orphan".into(), noop_spec("orphan"));
        graph.entry = Some("a".into());
        assert!(matches!(
            graph.validate(),
            Err(GraphError::UnreachableNode(node)) if node == "orphan"
        ));
    }
}
