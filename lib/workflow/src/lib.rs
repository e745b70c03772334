//! Workflow execution engine for mediaflow.
//!
//! A workflow is a DAG of nodes, each bound to a plugin. This crate provides:
//!
//! - **Graph Model**: nodes and edges in a petgraph `DiGraph`
//! - **Scheduling**: deterministic topological order with cycle detection
//! - **Routing**: fan-in of upstream outputs into each node's inputs
//! - **Plugins**: the plugin contract, config schemas and the registry
//! - **Execution**: durable per-node steps and the run controller

pub mod config;
pub mod controller;
pub mod edge;
pub mod error;
pub mod execution;
pub mod executor;
pub mod graph;
pub mod media;
pub mod node;
pub mod plugin;
pub mod registry;
pub mod resolver;
pub mod router;
pub mod scheduler;
pub mod store;
pub mod trigger;

pub use config::{ConfigSchema, PluginConfig};
pub use controller::{IgnoreReason, RunController, RunOutcome};
pub use edge::WorkflowEdge;
pub use error::{ConfigValidationError, EngineError, GraphError, PluginResolutionError};
pub use execution::{RunPatch, RunState, StepOutput, StepPatch, StepState, WorkflowRun, WorkflowStep};
pub use executor::StepExecutor;
pub use graph::WorkflowGraph;
pub use media::{MediaFile, MediaType};
pub use node::{NodeId, WorkflowNode};
pub use plugin::{ExecutorKind, Plugin, PluginContext, PluginDescriptor, PluginError, PluginOutput};
pub use registry::{PluginRegistry, PluginRegistryBuilder, RegistryError};
pub use router::ResultsByNode;
pub use store::{InMemoryRunStore, RunStore, StoreError};
pub use trigger::{TriggerEvent, WORKFLOW_REQUESTED_EVENT};
