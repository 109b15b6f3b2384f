//! Per-node artifact generation: snapshot capture plus metadata extraction.
//!
//! Node instantiation and rendering are affinity-constrained and go through
//! the dispatcher with owned inputs; metadata extraction runs on the worker
//! against the owned instance the affinity thread handed back.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::dispatch::{AffinityDispatcher, DispatchError};
use crate::document::{NodeRecord, PinRecord};
use crate::instance::NodeInstance;
use crate::reflection::{ClassShape, SourceObject};
use crate::render::{ALPHA_BOOST, CANVAS_SIZE, CaptureError, NodeRenderer, write_png};
use crate::spawner::Spawner;
use crate::types::PinDirection;

/// Emitted in place of an empty pin description so downstream templates can
/// tell "no comment" from missing data.
pub const NO_COMMENTS: &str = "$no_comments";

#[derive(Debug, Error, Diagnostic)]
pub enum GenerateError {
    #[error("spawner for {class} produced no usable node")]
    #[diagnostic(
        code(graphdoc::generator::spawn),
        help("The backing class was likely collected between discovery and spawn.")
    )]
    Spawn { class: String },

    #[error("metadata extraction failed for {node}: {reason}")]
    #[diagnostic(code(graphdoc::generator::metadata))]
    Metadata { node: String, reason: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Per-node scratch record produced by snapshot capture.
#[derive(Clone, Debug)]
pub struct ProcessingState {
    /// Image path relative to the class's document page.
    pub relative_image_path: String,
    pub image_file_name: String,
    /// Cleaned class identifier the node document attaches under.
    pub class_id: String,
    pub class_name: String,
}

/// Drives snapshot capture and document extraction for one node at a time.
pub struct DocGenerator {
    dispatcher: AffinityDispatcher,
    renderer: Arc<dyn NodeRenderer>,
    intermediate_dir: PathBuf,
}

impl DocGenerator {
    pub fn new(
        dispatcher: AffinityDispatcher,
        renderer: Arc<dyn NodeRenderer>,
        intermediate_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dispatcher,
            renderer,
            intermediate_dir: intermediate_dir.into(),
        }
    }

    pub fn intermediate_dir(&self) -> &PathBuf {
        &self.intermediate_dir
    }

    /// Instantiate the spawner's node on the affinity thread and take
    /// ownership of the result. `context` is the graph context class the node
    /// is placed under, when the task names one.
    pub fn spawn_node(
        &self,
        spawner: &Spawner,
        context: Option<&Arc<ClassShape>>,
    ) -> Result<NodeInstance, GenerateError> {
        let class_name = spawner
            .declaring_class
            .upgrade()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "<collected>".to_string());
        let work = spawner.clone();
        let ctx = context.cloned();
        let node = self.dispatcher.run(move || work.invoke(ctx.as_deref()))?;
        node.ok_or(GenerateError::Spawn { class: class_name })
    }

    /// Capture a raster snapshot of `node` under the class's image directory.
    ///
    /// Rendering happens on the affinity thread against an owned copy of the
    /// node with self-reference default values hidden; alpha boost and PNG
    /// encoding run on the worker.
    pub fn capture_node_image(
        &self,
        node: &NodeInstance,
        class: &ClassShape,
    ) -> Result<ProcessingState, GenerateError> {
        let class_id = class_doc_id(&class.name);
        let file_name = format!("nd_img_{}.png", sanitize_file_name(&node.doc_id));
        let class_dir = self.intermediate_dir.join("img").join(&class_id);
        fs::create_dir_all(&class_dir).map_err(|source| CaptureError::Io {
            path: class_dir.display().to_string(),
            source,
        })?;

        let mut render_copy = node.clone();
        for pin in &mut render_copy.pins {
            if pin.is_self_target {
                pin.default_value_ignored = true;
            }
        }
        let renderer = Arc::clone(&self.renderer);
        let mut buffer = self
            .dispatcher
            .run(move || renderer.render(&render_copy, CANVAS_SIZE, CANVAS_SIZE))??;
        buffer.boost_alpha(ALPHA_BOOST);
        write_png(&class_dir.join(&file_name), &buffer)?;

        Ok(ProcessingState {
            relative_image_path: format!("../img/{class_id}/{file_name}"),
            image_file_name: file_name,
            class_id,
            class_name: class.name.clone(),
        })
    }

    /// Assemble the per-node document from the owned instance.
    pub fn extract_node_docs(
        &self,
        node: &NodeInstance,
        state: &ProcessingState,
    ) -> Result<NodeRecord, GenerateError> {
        if node.short_title.trim().is_empty() {
            return Err(GenerateError::Metadata {
                node: node.doc_id.clone(),
                reason: "node has no title".to_string(),
            });
        }
        Ok(NodeRecord {
            docs_name: sanitize_file_name(&node.doc_id),
            class_id: state.class_id.clone(),
            class_name: state.class_name.clone(),
            short_title: node.short_title.trim().to_string(),
            full_title: strip_target_clause(&node.full_title),
            description: strip_target_clause(&node.tooltip),
            category: node.category.clone(),
            img_path: state.relative_image_path.clone(),
            inputs: pin_records(node, PinDirection::Input),
            outputs: pin_records(node, PinDirection::Output),
        })
    }
}

/// The class a node instance belongs to: the declaring class of the function
/// it calls when it wraps one, otherwise the source object's own class (or
/// the generated class of a graph asset).
#[must_use]
pub fn map_to_associated_class(
    node: &NodeInstance,
    source: &SourceObject,
) -> Option<Arc<ClassShape>> {
    node.target_function
        .as_ref()
        .and_then(|target| target.declaring_class.upgrade())
        .or_else(|| source.direct_class())
}

fn pin_records(node: &NodeInstance, direction: PinDirection) -> Vec<PinRecord> {
    node.visible_pins(direction)
        .map(|pin| {
            let name = if pin.name.is_empty() && pin.is_exec {
                direction.exec_default_name().to_string()
            } else {
                pin.name.clone()
            };
            let description = parse_hover_description(&pin.hover_text);
            PinRecord {
                name,
                type_name: pin.type_text.clone(),
                description: if description.is_empty() {
                    NO_COMMENTS.to_string()
                } else {
                    description
                },
            }
        })
        .collect()
}

/// Pull the description out of a pin's composed hover text.
///
/// Layout is name-line, type-line, then the description after any blank
/// lines. Name and type come from the structured accessors instead, so this
/// only ever contributes the description, which keeps the pipeline robust
/// against hover-text format drift.
#[must_use]
pub fn parse_hover_description(hover_text: &str) -> String {
    let mut lines = hover_text.lines();
    if lines.next().is_none() {
        return String::new();
    }
    if lines.next().is_none() {
        return String::new();
    }
    let rest: Vec<&str> = lines.skip_while(|l| l.trim().is_empty()).collect();
    rest.join("\n").trim_end().to_string()
}

/// Drop the trailing "Target is …" clause appended to titles and tooltips of
/// target-bearing nodes.
#[must_use]
pub fn strip_target_clause(text: &str) -> String {
    match text.find("Target is ") {
        Some(0) => String::new(),
        Some(idx) => text[..idx].trim_end().to_string(),
        None => text.trim_end().to_string(),
    }
}

/// Cleaned class identifier for document and image paths: skeleton-class
/// prefix and generated-class suffix are stripped.
#[must_use]
pub fn class_doc_id(class_name: &str) -> String {
    let name = class_name.strip_prefix("SKEL_").unwrap_or(class_name);
    let name = name.strip_suffix("_C").unwrap_or(name);
    name.to_string()
}

/// Restrict a node identifier to filesystem-safe characters.
#[must_use]
pub fn sanitize_file_name(identifier: &str) -> String {
    identifier
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hover_description_skips_name_type_and_blanks() {
        let hover = "Scale\nFloat\n\nUniform scale factor.";
        assert_eq!(parse_hover_description(hover), "Uniform scale factor.");
        assert_eq!(parse_hover_description("Name\nType"), "");
        assert_eq!(parse_hover_description(""), "");
    }

    #[test]
    fn target_clause_is_stripped_from_titles_and_tooltips() {
        assert_eq!(
            strip_target_clause("Get Velocity\nTarget is Actor"),
            "Get Velocity"
        );
        assert_eq!(strip_target_clause("Target is Actor"), "");
        assert_eq!(strip_target_clause("Plain tooltip"), "Plain tooltip");
    }

    #[test]
    fn class_doc_id_strips_skeleton_and_generated_markers() {
        assert_eq!(class_doc_id("SKEL_Widget_C"), "Widget");
        assert_eq!(class_doc_id("Widget_C"), "Widget");
        assert_eq!(class_doc_id("Widget"), "Widget");
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("A/B:C Node"), "A_B_C_Node");
        assert_eq!(sanitize_file_name("Plain_Name-1"), "Plain_Name-1");
    }
}
