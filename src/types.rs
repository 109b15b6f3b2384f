//! Core identity types for the documentation pipeline.
//!
//! These closed enums replace subclass-hierarchy tests: spawners and node
//! instances are classified by *kind*, and exclusion policy is a structural
//! match over these kinds rather than an `is-a` walk.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifies a spawner by what it represents, independent of the node class
/// it will produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnerKind {
    /// Spawns a call to a reflected function.
    Function,
    /// Spawns an event entry point.
    Event,
    /// Spawns a variable get/set accessor.
    Variable,
    /// Spawns a delegate binding.
    Delegate,
    /// Spawns a node bound to a specific object instance.
    Bound,
    /// Spawns a component binding.
    Component,
}

impl fmt::Display for SpawnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpawnerKind::Function => "function",
            SpawnerKind::Event => "event",
            SpawnerKind::Variable => "variable",
            SpawnerKind::Delegate => "delegate",
            SpawnerKind::Bound => "bound",
            SpawnerKind::Component => "component",
        };
        write!(f, "{label}")
    }
}

/// Classifies the node instance a spawner produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClassKind {
    /// Calls a reflected function on a target.
    CallFunction,
    /// An event entry point.
    Event,
    /// A runtime-checked type conversion.
    DynamicCast,
    /// A cross-object message dispatch.
    Message,
    /// An event bound to a specific component instance.
    ComponentBoundEvent,
    /// A variable accessor.
    VariableAccess,
}

impl fmt::Display for NodeClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NodeClassKind::CallFunction => "call-function",
            NodeClassKind::Event => "event",
            NodeClassKind::DynamicCast => "dynamic-cast",
            NodeClassKind::Message => "message",
            NodeClassKind::ComponentBoundEvent => "component-bound-event",
            NodeClassKind::VariableAccess => "variable-access",
        };
        write!(f, "{label}")
    }
}

/// Declared access level of a reflected member.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    #[default]
    Public,
    Protected,
    Private,
}

impl AccessLevel {
    /// The string tag emitted into flag lists.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            AccessLevel::Public => "Public",
            AccessLevel::Protected => "Protected",
            AccessLevel::Private => "Private",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Direction of a pin on a node instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    Input,
    Output,
}

impl PinDirection {
    /// Default display name for unnamed execution pins.
    #[must_use]
    pub fn exec_default_name(&self) -> &'static str {
        match self {
            PinDirection::Input => "In",
            PinDirection::Output => "Out",
        }
    }
}
