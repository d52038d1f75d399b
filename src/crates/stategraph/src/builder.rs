//! High-level graph builder.
//!
//! [`StateGraph`] is the recommended way to assemble a graph: chainable
//! `add_node` / `add_edge` / `add_conditional_edges` / `add_channel` calls,
//! followed by [`compile`](StateGraph::compile) which validates the structure
//! and returns an executable [`CompiledGraph`].
//!
//! Structural mistakes made while building (duplicate node names, a second
//! entry point) are recorded and reported by `compile()` rather than panicking
//! mid-chain; nothing is silently dropped.
//!
//! # Example
//!
//! ```rust
//! use stategraph::{StateGraph, ChannelType, END};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), stategraph::GraphError> {
//! let mut graph = StateGraph::new();
//! graph
//!     .add_node("greet", |state| {
//!         Box::pin(async move {
//!             let name = state["name"].as_str().unwrap_or("world").to_string();
//!             Ok(json!({ "greeting": format!("hello, {name}") }))
//!         })
//!     })
//!     .add_edge("greet", END)
//!     .set_entry_point("greet");
//!
//! let compiled = graph.compile()?;
//! let result = compiled.invoke(json!({"name": "graph"})).await?;
//! assert_eq!(result["greeting"], "hello, graph");
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::compiled::CompiledGraph;
use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph, NodeExecutor, NodeId, NodeSpec};
use crate::state::{ChannelSpec, ChannelType, ReducerFn};

/// Builder for state graphs.
#[derive(Default)]
pub struct StateGraph {
    graph: Graph,
    /// Structural errors recorded during building, surfaced by `compile()`.
    build_errors: Vec<GraphError>,
}

impl StateGraph {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node.
    ///
    /// The executor receives the full state as a JSON object and returns a
    /// partial update. Registering the same name twice is recorded as
    /// [`GraphError::DuplicateNode`] and fails `compile()`.
    pub fn add_node<F>(&mut self, id: impl Into<NodeId>, executor: F) -> &mut Self
    where
        F: Fn(serde_json::Value) -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>>
            + Send
            + Sync
            + 'static,
    {
        let id = id.into();
        if self.graph.nodes.contains_key(&id) {
            self.build_errors.push(GraphError::DuplicateNode(id));
            return self;
        }
        let spec = NodeSpec {
            name: id.clone(),
            executor: Arc::new(executor) as NodeExecutor,
        };
        self.graph.nodes.insert(id, spec);
        self
    }

    /// Add an unconditional edge between two nodes.
    ///
    /// `to` may be [`END`](crate::graph::END) to mark `from` as terminal.
    /// Endpoints are validated at `compile()` time.
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        self.graph
            .edges
            .entry(from.into())
            .or_default()
            .push(Edge::Direct(to.into()));
        self
    }

    /// Add a selector-driven conditional edge.
    ///
    /// After `from` completes, `selector` is evaluated against the merged
    /// state and must return one of the labels in `branches`. Branch targets
    /// are validated at `compile()` time; an unmapped label at run time fails
    /// with [`GraphError::UnroutableState`].
    pub fn add_conditional_edges<F>(
        &mut self,
        from: impl Into<NodeId>,
        selector: F,
        branches: HashMap<String, NodeId>,
    ) -> &mut Self
    where
        F: Fn(&serde_json::Value) -> String + Send + Sync + 'static,
    {
        self.graph.edges.entry(from.into()).or_default().push(Edge::Conditional {
            selector: Arc::new(selector),
            branches,
        });
        self
    }

    /// Declare the merge policy for a state field.
    pub fn add_channel(
        &mut self,
        name: impl Into<String>,
        channel_type: ChannelType,
        reducer: Option<ReducerFn>,
    ) -> &mut Self {
        let name = name.into();
        self.graph.channels.insert(
            name.clone(),
            ChannelSpec {
                name,
                channel_type,
                reducer,
            },
        );
        self
    }

    /// Set the entry point for execution.
    ///
    /// Exactly one entry point is allowed; a second call is recorded as
    /// [`GraphError::EntryPointAlreadySet`]. Compiling without an entry point
    /// fails with [`GraphError::NoEntryPoint`].
    pub fn set_entry_point(&mut self, node: impl Into<NodeId>) -> &mut Self {
        let node = node.into();
        match &self.graph.entry {
            Some(existing) => self.build_errors.push(GraphError::EntryPointAlreadySet {
                existing: existing.clone(),
                new: node,
            }),
            None => self.graph.entry = Some(node),
        }
        self
    }

    /// Validate the graph and produce an executable handle.
    ///
    /// Surfaces any error recorded during building, then checks entry point,
    /// edge endpoints, conditional branch targets, and reachability.
    /// Compilation is expected once per workflow instance, not per run.
    pub fn compile(mut self) -> Result<CompiledGraph> {
        if !self.build_errors.is_empty() {
            return Err(self.build_errors.remove(0));
        }
        self.graph.validate()?;
        Ok(CompiledGraph::new(self.graph))
    }
}
