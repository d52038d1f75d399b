//! Sequential state-graph execution engine.
//!
//! `stategraph` runs directed graphs of async nodes over a shared JSON state.
//! Each node receives the full state and returns a partial update; the engine
//! folds updates into the accumulated state through a per-field channel table
//! and follows direct or conditional edges until the graph terminates.
//!
//! The crate also carries the small shared vocabulary the workflows above it
//! need: chat [`messages`], the provider-agnostic [`llm`] interface, and the
//! exponential-backoff [`retry`] policy.
//!
//! # Quick start
//!
//! ```rust
//! use stategraph::{StateGraph, END};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), stategraph::GraphError> {
//! let mut graph = StateGraph::new();
//! graph
//!     .add_node("double", |state| {
//!         Box::pin(async move {
//!             let n = state["n"].as_i64().unwrap_or(0);
//!             Ok(json!({"n": n * 2}))
//!         })
//!     })
//!     .add_edge("double", END)
//!     .set_entry_point("double");
//!
//! let result = graph.compile()?.invoke(json!({"n": 21})).await?;
//! assert_eq!(result["n"], 42);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod compiled;
pub mod error;
pub mod graph;
pub mod llm;
pub mod messages;
pub mod retry;
pub mod state;

pub use builder::StateGraph;
pub use compiled::{CompiledGraph, DEFAULT_STEP_LIMIT};
pub use error::{GraphError, Result};
pub use graph::{Edge, EdgeSelector, Graph, NodeExecutor, NodeId, NodeSpec, END};
pub use llm::{ChatError, ChatModel, ChatRequest, ChatResponse};
pub use messages::{Message, MessageRole};
pub use retry::RetryPolicy;
pub use state::{apply_update, ChannelSpec, ChannelType, ReducerFn};
