//! Compiled, executable graph.
//!
//! A [`CompiledGraph`] is produced by [`StateGraph::compile`](crate::StateGraph::compile)
//! after structural validation. Execution is sequential: run the current
//! node, fold its partial update into the accumulated state through the
//! channel table, then follow the node's edge to pick the next node.

use serde_json::Value;
use tracing::{debug, error, instrument, trace};

use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph, NodeId, END};
use crate::state::apply_update;

/// Default maximum number of node executions per run.
///
/// Validation cannot rule out runtime cycles through conditional edges, so
/// the walk is bounded; exceeding the bound fails with
/// [`GraphError::StepLimitExceeded`].
pub const DEFAULT_STEP_LIMIT: usize = 100;

/// A validated graph ready for execution.
#[derive(Clone, Debug)]
pub struct CompiledGraph {
    graph: Graph,
    step_limit: usize,
}

impl CompiledGraph {
    pub(crate) fn new(graph: Graph) -> Self {
        Self {
            graph,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Override the step limit for this graph.
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Execute the graph to completion and return the final state.
    ///
    /// Starts at the entry point and walks until a node with no outgoing
    /// edges, an edge to [`END`], or the step limit. Node failures and
    /// routing failures abort the run; the state accumulated so far is
    /// dropped with the error.
    #[instrument(skip(self, state), fields(steps))]
    pub async fn invoke(&self, state: Value) -> Result<Value> {
        // entry is guaranteed Some by compile-time validation
        let mut current = match self.graph.entry.clone() {
            Some(entry) => entry,
            None => return Err(GraphError::NoEntryPoint),
        };
        let mut state = state;
        let mut steps = 0usize;

        loop {
            if steps >= self.step_limit {
                error!(limit = self.step_limit, "step limit exceeded");
                return Err(GraphError::StepLimitExceeded {
                    limit: self.step_limit,
                });
            }
            steps += 1;

            let node = self
                .graph
                .nodes
                .get(&current)
                .ok_or_else(|| GraphError::unknown_node(&current, "execution"))?;

            trace!(node = %current, step = steps, "executing node");
            let update = (node.executor)(state.clone()).await.map_err(|e| match e {
                err @ GraphError::NodeExecution { .. } => err,
                other => GraphError::node_execution(&current, other.to_string()),
            })?;
            state = apply_update(&self.graph.channels, state, update);

            match self.next_node(&current, &state)? {
                Some(next) => {
                    trace!(from = %current, to = %next, "transition");
                    current = next;
                }
                None => break,
            }
        }

        debug!(steps, "graph run complete");
        tracing::Span::current().record("steps", steps);
        Ok(state)
    }

    /// Resolve the node to run after `current`, or `None` when terminal.
    fn next_node(&self, current: &NodeId, state: &Value) -> Result<Option<NodeId>> {
        let edges = match self.graph.edges.get(current) {
            Some(edges) if !edges.is_empty() => edges,
            _ => return Ok(None),
        };

        // first matching edge wins; direct edges always match
        for edge in edges {
            match edge {
                Edge::Direct(to) => {
                    return if to == END {
                        Ok(None)
                    } else {
                        Ok(Some(to.clone()))
                    };
                }
                Edge::Conditional { selector, branches } => {
                    let label = selector(state);
                    let target =
                        branches
                            .get(&label)
                            .ok_or_else(|| GraphError::UnroutableState {
                                node: current.clone(),
                                label: label.clone(),
                            })?;
                    return if target == END {
                        Ok(None)
                    } else {
                        Ok(Some(target.clone()))
                    };
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StateGraph;
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn linear_pipeline_merges_updates_in_order() {
        let mut graph = StateGraph::new();
        graph
            .add_node("first", |_| {
                Box::pin(async { Ok(json!({"a": 1, "shared": "first"})) })
            })
            .add_node("second", |_| {
                Box::pin(async { Ok(json!({"b": 2, "shared": "second"})) })
            })
            .add_edge("first", "second")
            .add_edge("second", END)
            .set_entry_point("first");

        let result = graph.compile().unwrap().invoke(json!({})).await.unwrap();
        assert_eq!(result["a"], 1);
        assert_eq!(result["b"], 2);
        assert_eq!(result["shared"], "second");
    }

    #[tokio::test]
    async fn conditional_edge_routes_by_label() {
        let mut graph = StateGraph::new();
        let branches = HashMap::from([
            ("left".to_string(), "left".to_string()),
            ("right".to_string(), "right".to_string()),
        ]);
        graph
            .add_node("start", |_| Box::pin(async { Ok(json!({})) }))
            .add_node("left", |_| Box::pin(async { Ok(json!({"took": "left"})) }))
            .add_node("right", |_| {
                Box::pin(async { Ok(json!({"took": "right"})) })
            })
            .add_conditional_edges(
                "start",
                |state| state["direction"].as_str().unwrap_or("left").to_string(),
                branches,
            )
            .add_edge("left", END)
            .add_edge("right", END)
            .set_entry_point("start");
        let compiled = graph.compile().unwrap();

        let result = compiled.invoke(json!({"direction": "right"})).await.unwrap();
        assert_eq!(result["took"], "right");

        let result = compiled.invoke(json!({})).await.unwrap();
        assert_eq!(result["took"], "left");
    }

    #[tokio::test]
    async fn unmapped_label_fails_the_run() {
        let mut graph = StateGraph::new();
        let branches = HashMap::from([("known".to_string(), END.to_string())]);
        graph
            .add_node("start", |_| Box::pin(async { Ok(json!({})) }))
            .add_conditional_edges("start", |_| "surprise".to_string(), branches)
            .set_entry_point("start");

        let err = graph.compile().unwrap().invoke(json!({})).await.unwrap_err();
        assert!(matches!(
            err,
            GraphError::UnroutableState { node, label } if node == "start" && label == "surprise"
        ));
    }

    #[tokio::test]
    async fn node_without_edges_is_terminal() {
        let mut graph = StateGraph::new();
        graph
            .add_node("only", |_| Box::pin(async { Ok(json!({"done": true})) }))
            .set_entry_point("only");

        let result = graph.compile().unwrap().invoke(json!({})).await.unwrap();
        assert_eq!(result["done"], true);
    }

    #[tokio::test]
    async fn node_failure_aborts_with_node_name() {
        let mut graph = StateGraph::new();
        graph
            .add_node("boom", |_| {
                Box::pin(async { Err(GraphError::node_execution("boom", "exploded")) })
            })
            .set_entry_point("boom");

        let err = graph.compile().unwrap().invoke(json!({})).await.unwrap_err();
        assert!(matches!(
            err,
            GraphError::NodeExecution { node, .. } if node == "boom"
        ));
    }

    #[tokio::test]
    async fn cycle_hits_step_limit() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", |_| Box::pin(async { Ok(json!({})) }))
            .add_node("b", |_| Box::pin(async { Ok(json!({})) }))
            .add_edge("a", "b")
            .add_edge("b", "a")
            .set_entry_point("a");

        let compiled = graph.compile().unwrap().with_step_limit(10);
        let err = compiled.invoke(json!({})).await.unwrap_err();
        assert!(matches!(err, GraphError::StepLimitExceeded { limit: 10 }));
    }
}
