//! Walks a class shape into a [`ClassRecord`].
//!
//! Only members declared directly on the class are emitted; inherited members
//! live on the ancestor's own record. Boolean flags and metadata entries are
//! flattened into unordered string-tag lists, one fixed table per member
//! kind.

use crate::document::{ClassRecord, FunctionRecord, ParamRecord, PropertyRecord};
use crate::reflection::{
    ClassShape, FunctionShape, META_CLASS_FILTER, MetadataMap, ParamShape, PropertyShape,
};

/// Default return type when a callable declares no return parameter.
const VOID_RETURN: &str = "void";

/// Serialize one class: name, full ancestor chain (root first), output path,
/// declared properties, and declared callables. Node documents are attached
/// later as source objects resolve to the class.
#[must_use]
pub fn serialize_class(class: &ClassShape) -> ClassRecord {
    ClassRecord {
        class_name: class.name.clone(),
        class_hierarchy: class.ancestor_chain(),
        path: class_path(class),
        properties: class.properties.iter().map(property_record).collect(),
        functions: class.functions.iter().map(function_record).collect(),
        nodes: Vec::new(),
    }
}

/// Output path for a class: `Classes/<filter>` where the filter comes from
/// the class's `ClassFilter` metadata, defaulting to `Default`.
#[must_use]
pub fn class_path(class: &ClassShape) -> String {
    let filter = class.metadata_value(META_CLASS_FILTER).unwrap_or("Default");
    format!("Classes/{filter}")
}

fn metadata_tags(metadata: &MetadataMap, tags: &mut Vec<String>) {
    for (key, value) in metadata {
        if value.is_empty() {
            tags.push(key.clone());
        } else {
            tags.push(format!("{key} = {value}"));
        }
    }
}

fn property_record(property: &PropertyShape) -> PropertyRecord {
    let mut flags = Vec::new();
    metadata_tags(&property.metadata, &mut flags);
    flags.push(property.access.tag().to_string());
    let f = property.flags;
    if f.editor_only {
        flags.push("EditorOnly".to_string());
    }
    if f.read_only {
        flags.push("ReadOnly".to_string());
    }
    if f.deprecated {
        flags.push("Deprecated".to_string());
    }
    if f.expose_on_spawn {
        flags.push("ExposeOnSpawn".to_string());
    }
    if f.config {
        flags.push("Config".to_string());
    }
    if f.save_game {
        flags.push("SaveGame".to_string());
    }
    PropertyRecord {
        name: property.name.clone(),
        type_name: property.type_name.clone(),
        flags,
        description: property.description.clone(),
    }
}

fn param_record(param: &ParamShape) -> ParamRecord {
    let mut flags = vec!["Parm".to_string()];
    if param.flags.const_param {
        flags.push("ConstParm".to_string());
    }
    if param.flags.reference {
        flags.push("ReferenceParm".to_string());
    }
    if param.flags.out {
        flags.push("OutParm".to_string());
    }
    if param.flags.return_param {
        flags.push("ReturnParm".to_string());
    }
    ParamRecord {
        name: param.name.clone(),
        type_name: param.decorated_type(),
        description: param.description.clone(),
        flags,
    }
}

fn function_record(function: &FunctionShape) -> FunctionRecord {
    let mut flags = Vec::new();
    flags.push(function.access.tag().to_string());
    let f = function.flags;
    if f.sealed {
        flags.push("Sealed".to_string());
    } else {
        flags.push("Virtual".to_string());
    }
    if f.static_fn {
        flags.push("Static".to_string());
    }
    if f.const_fn {
        flags.push("Const".to_string());
    }
    if f.event {
        flags.push("Event".to_string());
    }
    if f.callable {
        flags.push("Callable".to_string());
    }
    if f.pure {
        flags.push("Pure".to_string());
    }

    // The return parameter is singled out into returnType; everything else
    // stays in the parameter list.
    let return_type = function
        .return_param()
        .map(ParamShape::decorated_type)
        .unwrap_or_else(|| VOID_RETURN.to_string());
    let parameters = function
        .params
        .iter()
        .filter(|p| !p.is_return())
        .map(param_record)
        .collect();

    FunctionRecord {
        name: function.name.clone(),
        description: function.description.clone(),
        flags,
        return_type,
        parameters,
    }
}
