//! Transient node instances.
//!
//! A [`NodeInstance`] is the visual representation of one documentable unit,
//! produced by a spawner on the affinity thread. Ownership transfers to the
//! worker for the duration of artifact generation and the instance is dropped
//! when the worker is done with it; it must never be read after its backing
//! source object has been invalidated.

use std::sync::Weak;

use crate::reflection::ClassShape;
use crate::types::{NodeClassKind, PinDirection};

/// One pin on a node instance.
///
/// `name` and `type_text` are the structured accessors; `hover_text` is the
/// composed tooltip the schema would show, which the generator parses as a
/// fallback description source.
#[derive(Clone, Debug)]
pub struct Pin {
    pub direction: PinDirection,
    pub name: String,
    pub type_text: String,
    pub hover_text: String,
    pub hidden: bool,
    pub is_exec: bool,
    /// Target pin whose default value is a self reference.
    pub is_self_target: bool,
    /// Set before snapshot capture so the default-value box is not drawn.
    pub default_value_ignored: bool,
}

impl Pin {
    pub fn new(direction: PinDirection, name: impl Into<String>, type_text: impl Into<String>) -> Self {
        Self {
            direction,
            name: name.into(),
            type_text: type_text.into(),
            hover_text: String::new(),
            hidden: false,
            is_exec: false,
            is_self_target: false,
            default_value_ignored: false,
        }
    }

    /// An execution pin; unnamed, named `In`/`Out` at extraction time.
    pub fn exec(direction: PinDirection) -> Self {
        let mut pin = Self::new(direction, "", "Exec");
        pin.is_exec = true;
        pin
    }

    #[must_use]
    pub fn with_hover_text(mut self, hover_text: impl Into<String>) -> Self {
        self.hover_text = hover_text.into();
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn self_target(mut self) -> Self {
        self.is_self_target = true;
        self
    }
}

/// Compose the tooltip the graph schema builds for a pin: name line, type
/// line, a blank line, then the description. The generator's fallback parser
/// depends on this exact layout.
pub fn compose_hover_text(name: &str, type_text: &str, description: &str) -> String {
    format!("{name}\n{type_text}\n\n{description}")
}

/// Reference from a node back to the reflected callable it wraps.
#[derive(Clone, Debug)]
pub struct TargetFunction {
    pub declaring_class: Weak<ClassShape>,
    pub function_name: String,
}

/// A transient visual representation of one documentable unit.
#[derive(Clone, Debug)]
pub struct NodeInstance {
    pub node_class: NodeClassKind,
    pub short_title: String,
    pub full_title: String,
    pub tooltip: String,
    pub category: String,
    /// Stable identifier used for deterministic image naming.
    pub doc_id: String,
    pub pins: Vec<Pin>,
    /// Present when the node wraps a function call; its declaring class is
    /// authoritative for class association.
    pub target_function: Option<TargetFunction>,
}

impl NodeInstance {
    /// Visible pins in the given direction, in declaration order.
    pub fn visible_pins(&self, direction: PinDirection) -> impl Iterator<Item = &Pin> {
        self.pins
            .iter()
            .filter(move |p| p.direction == direction && !p.hidden)
    }
}

/// Split an identifier into a friendly display name: `GetActorLocation`
/// becomes `Get Actor Location`.
#[must_use]
pub fn friendly_name(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len() + 4);
    let mut prev_lower = false;
    for ch in identifier.chars() {
        if ch == '_' {
            if !out.ends_with(' ') && !out.is_empty() {
                out.push(' ');
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            out.push(' ');
        }
        out.push(ch);
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendly_name_splits_camel_case() {
        assert_eq!(friendly_name("GetActorLocation"), "Get Actor Location");
        assert_eq!(friendly_name("SpawnActor"), "Spawn Actor");
        assert_eq!(friendly_name("Spawn_Actor"), "Spawn Actor");
        assert_eq!(friendly_name("X"), "X");
    }

    #[test]
    fn hover_text_layout_is_name_type_blank_description() {
        let text = compose_hover_text("Scale", "Float", "Uniform scale factor.");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Scale"));
        assert_eq!(lines.next(), Some("Float"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("Uniform scale factor."));
    }
}
