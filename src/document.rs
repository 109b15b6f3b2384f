//! Output document tree: per-class records, node documents, and the
//! append-only aggregation store they land in.
//!
//! Field names follow the persisted wire shape consumed by the external site
//! generator, hence the camelCase renames.

use std::fs;
use std::path::Path;

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DocumentError {
    #[error("failed to write document {path}")]
    #[diagnostic(
        code(graphdoc::document::io),
        help("Check that the output directory exists and is writable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize document tree")]
    #[diagnostic(code(graphdoc::document::json))]
    Json(#[from] serde_json::Error),
}

/// One pin as it appears in a node document.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PinRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub description: String,
}

/// One documented node, attached to the class record it resolves to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeRecord {
    #[serde(rename = "docsName")]
    pub docs_name: String,
    #[serde(rename = "classId")]
    pub class_id: String,
    #[serde(rename = "className")]
    pub class_name: String,
    #[serde(rename = "shortTitle")]
    pub short_title: String,
    #[serde(rename = "fullTitle")]
    pub full_title: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "imgPath")]
    pub img_path: String,
    pub inputs: Vec<PinRecord>,
    pub outputs: Vec<PinRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub flags: Vec<String>,
    pub description: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParamRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub description: String,
    pub flags: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionRecord {
    pub name: String,
    pub description: String,
    pub flags: Vec<String>,
    #[serde(rename = "returnType")]
    pub return_type: String,
    pub parameters: Vec<ParamRecord>,
}

/// The serialized documentation unit for one class: its own reflected shape
/// plus every node document resolved to it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassRecord {
    #[serde(rename = "className")]
    pub class_name: String,
    /// Ancestors ordered root first, ending at the immediate parent.
    #[serde(rename = "classHierarchy")]
    pub class_hierarchy: Vec<String>,
    pub path: String,
    pub properties: Vec<PropertyRecord>,
    pub functions: Vec<FunctionRecord>,
    pub nodes: Vec<NodeRecord>,
}

/// Class identities already serialized, so a class reachable from many source
/// objects is emitted exactly once. Matching is case-insensitive.
#[derive(Debug, Default)]
pub struct ProcessedSet {
    seen: FxHashSet<String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `class_name`; returns `false` if it was already present.
    pub fn insert(&mut self, class_name: &str) -> bool {
        self.seen.insert(class_name.to_ascii_lowercase())
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.seen.contains(&class_name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn reset(&mut self) {
        self.seen.clear();
    }
}

/// Ordered, append-only collection of class records for one pipeline
/// session. Explicitly reset between runs; never process-global.
#[derive(Debug, Default)]
pub struct AggregationStore {
    records: Vec<ClassRecord>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ClassRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ClassRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total node documents across all class records.
    pub fn node_count(&self) -> usize {
        self.records.iter().map(|r| r.nodes.len()).sum()
    }

    pub fn find(&self, class_id: &str) -> Option<&ClassRecord> {
        self.records
            .iter()
            .find(|r| r.class_name.eq_ignore_ascii_case(class_id))
    }

    /// Append a node document to the record whose class name matches
    /// `class_id` (case-insensitive). Returns `false` when no record matches.
    pub fn attach_node(&mut self, class_id: &str, node: NodeRecord) -> bool {
        match self
            .records
            .iter_mut()
            .find(|r| r.class_name.eq_ignore_ascii_case(class_id))
        {
            Some(record) => {
                record.nodes.push(node);
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// The intermediate dump consumed by the site generator's
    /// `-fromintermediate` mode.
    pub fn to_intermediate_json(&self) -> Result<Value, DocumentError> {
        Ok(json!({ "classes": serde_json::to_value(&self.records)? }))
    }

    /// The final per-run payload keyed by node documents.
    pub fn to_document_json(&self) -> Result<Value, DocumentError> {
        Ok(json!({ "nodes": serde_json::to_value(&self.records)? }))
    }

    /// Write a document tree as pretty-printed JSON.
    pub fn persist(path: &Path, document: &Value) -> Result<(), DocumentError> {
        let text = serde_json::to_string_pretty(document)?;
        fs::write(path, text).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
