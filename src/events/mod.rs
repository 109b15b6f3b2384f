//! Event bus: task lifecycle notifications fanned out to pluggable sinks.
//!
//! The worker emits structured [`Event`]s through an [`EventEmitter`]; a
//! listener thread owned by the [`EventBus`] forwards each event to every
//! registered [`EventSink`]. Replaces in-UI toast notifications with an
//! output-agnostic seam.

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::{EmitterError, EventBus, EventEmitter};
pub use event::{Event, TaskEvent, TaskStatus};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
