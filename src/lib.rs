//! # Graphdoc: Reference Documentation for Introspectable Node Graphs
//!
//! Graphdoc generates reference documentation for a large, introspectable
//! object graph hosted inside an interactive application with a single-thread
//! affinity rule: everything that touches the graph/widget subsystem runs on
//! one designated thread, while discovery and I/O stay on a background
//! worker.
//!
//! ## Core Concepts
//!
//! - **Source objects**: classes and graph-owning assets, held by weak handle
//!   and revalidated before every use
//! - **Enumerators**: lazy, finite producers of source objects from one
//!   provenance (native module or content path)
//! - **Affinity dispatch**: synchronous message-channel marshalling of owned
//!   work units to the designated thread
//! - **Artifact generation**: deterministic node snapshots plus structured
//!   metadata extraction per node
//! - **Aggregation**: one class record per class, no matter how many source
//!   objects resolve to it, serialized to a JSON document tree
//!
//! The pipeline is cancellable (cooperatively, at object boundaries) and
//! resilient to partial failure: a node that fails capture or extraction is
//! skipped with a warning, never aborting its task.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use graphdoc::dispatch::AffinityDispatcher;
//! use graphdoc::events::EventEmitter;
//! use graphdoc::processor::{GenTask, TaskProcessor};
//! use graphdoc::reflection::{ClassShape, FunctionShape, ObjectRegistry};
//! use graphdoc::render::FlatRenderer;
//! use graphdoc::settings::GenerationSettings;
//! use graphdoc::spawner::HostGraph;
//!
//! let mut registry = ObjectRegistry::new();
//! registry.register_class(
//!     ClassShape::new("Widget")
//!         .in_module("Core")
//!         .with_function(FunctionShape::new("Refresh")),
//! );
//! let host = Arc::new(HostGraph::new(registry));
//!
//! let mut settings = GenerationSettings::new("Project Docs");
//! settings.native_modules.push("Core".into());
//!
//! // Inline dispatch: no separate affinity thread, everything in place.
//! let mut processor = TaskProcessor::new(
//!     host,
//!     AffinityDispatcher::inline(),
//!     Arc::new(FlatRenderer),
//!     EventEmitter::disconnected(),
//!     settings.clone(),
//! );
//! let outcome = processor.run_task(&GenTask::from_settings(&settings));
//! println!("{outcome:?}");
//! ```
//!
//! For interactive hosts, spawn an [`dispatch::AffinityThread`], hand its
//! dispatcher to the processor, and move the processor onto its worker with
//! [`processor::TaskProcessor::spawn`]; queue tasks through the returned
//! handle and cancel the current one through its
//! [`processor::CancelHandle`].

pub mod dispatch;
pub mod document;
pub mod enumeration;
pub mod events;
pub mod generator;
pub mod instance;
pub mod processor;
pub mod reflection;
pub mod render;
pub mod serializer;
pub mod settings;
pub mod sitegen;
pub mod spawner;
pub mod telemetry;
pub mod types;
