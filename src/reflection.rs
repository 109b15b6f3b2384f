//! The introspectable object graph the pipeline documents.
//!
//! The host application owns every documentable entity; the pipeline only
//! ever holds [`Weak`] handles and must revalidate liveness before use, since
//! an entity may be collected between discovery and processing. The
//! [`ObjectRegistry`] stands in for the host's object database: it owns the
//! [`Arc`]s and answers the prepass queries enumerators run at construction.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};

use crate::types::AccessLevel;

/// Metadata key marking an object as excluded from documentation.
pub const META_NOT_DOCUMENTED: &str = "NotDocumented";
/// Metadata key marking a function as excluded from documentation.
pub const META_EXCLUDE_FROM_DOCS: &str = "ExcludeFromDocs";
/// Metadata key overriding the category segment of a class output path.
pub const META_CLASS_FILTER: &str = "ClassFilter";
/// Metadata key for a node's menu category.
pub const META_CATEGORY: &str = "Category";

pub type MetadataMap = FxHashMap<String, String>;

/// Per-class state flags mirrored from the host's class table.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ClassFlags {
    /// Marked deprecated; skipped at prepass.
    pub deprecated: bool,
    /// A newer compiled version exists; skipped at prepass.
    pub superseded: bool,
    /// A semi-compiled skeleton that only exists inside the editor.
    pub skeleton: bool,
}

/// Boolean flags on a declared property, mapped to string tags at
/// serialization time.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct PropertyFlags {
    pub editor_only: bool,
    pub read_only: bool,
    pub expose_on_spawn: bool,
    pub config: bool,
    pub save_game: bool,
    pub deprecated: bool,
}

/// A field declared directly on a class (inherited fields are not repeated).
#[derive(Clone, Debug)]
pub struct PropertyShape {
    pub name: String,
    pub type_name: String,
    pub description: String,
    pub access: AccessLevel,
    pub flags: PropertyFlags,
    pub metadata: MetadataMap,
}

impl PropertyShape {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            description: String::new(),
            access: AccessLevel::Public,
            flags: PropertyFlags::default(),
            metadata: MetadataMap::default(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_access(mut self, access: AccessLevel) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Boolean flags on a declared parameter.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ParamFlags {
    pub const_param: bool,
    pub reference: bool,
    pub out: bool,
    pub return_param: bool,
    pub required: bool,
}

/// A parameter of a reflected callable.
#[derive(Clone, Debug)]
pub struct ParamShape {
    pub name: String,
    pub type_name: String,
    pub description: String,
    pub flags: ParamFlags,
}

impl ParamShape {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            description: String::new(),
            flags: ParamFlags::default(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ParamFlags) -> Self {
        self.flags = flags;
        self
    }

    /// The declared type decorated with const/reference qualifiers, as it
    /// appears in emitted signatures.
    #[must_use]
    pub fn decorated_type(&self) -> String {
        let mut ty = self.type_name.clone();
        if self.flags.const_param {
            if self.flags.reference || self.flags.out {
                ty.push('&');
            }
            ty = format!("const {ty}");
        }
        ty
    }

    /// Whether this parameter carries the callable's return value.
    #[must_use]
    pub fn is_return(&self) -> bool {
        self.flags.return_param || self.name == "ReturnValue"
    }
}

/// Qualifier flags on a reflected callable.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct FunctionFlags {
    /// Event entry point (events carry no access specifier requirements).
    pub event: bool,
    /// Invokable from the graph.
    pub callable: bool,
    /// No side effects; spawned without execution pins.
    pub pure: bool,
    pub static_fn: bool,
    pub const_fn: bool,
    /// Sealed (non-overridable); everything else is emitted as `Virtual`.
    pub sealed: bool,
}

/// A callable declared directly on a class.
#[derive(Clone, Debug)]
pub struct FunctionShape {
    pub name: String,
    /// Raw tooltip text; may contain `@param` / `@return` lines.
    pub description: String,
    pub access: AccessLevel,
    pub flags: FunctionFlags,
    pub metadata: MetadataMap,
    pub params: Vec<ParamShape>,
}

impl FunctionShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            access: AccessLevel::Public,
            flags: FunctionFlags {
                callable: true,
                ..FunctionFlags::default()
            },
            metadata: MetadataMap::default(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_access(mut self, access: AccessLevel) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: FunctionFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_param(mut self, param: ParamShape) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The return parameter, if the callable declares one.
    #[must_use]
    pub fn return_param(&self) -> Option<&ParamShape> {
        self.params.iter().find(|p| p.is_return())
    }
}

/// The reflected shape of one class: identity, inheritance link, and the
/// members declared directly on it.
#[derive(Debug)]
pub struct ClassShape {
    pub name: String,
    /// Declaring native module, when the class is native.
    pub module: Option<String>,
    parent: Option<Weak<ClassShape>>,
    pub flags: ClassFlags,
    pub metadata: MetadataMap,
    pub properties: Vec<PropertyShape>,
    pub functions: Vec<FunctionShape>,
}

impl ClassShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: None,
            parent: None,
            flags: ClassFlags::default(),
            metadata: MetadataMap::default(),
            properties: Vec::new(),
            functions: Vec::new(),
        }
    }

    #[must_use]
    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Link to an already-registered parent. Parents are registered before
    /// children, which makes the ancestor chain acyclic by construction.
    #[must_use]
    pub fn with_parent(mut self, parent: &Arc<ClassShape>) -> Self {
        self.parent = Some(Arc::downgrade(parent));
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ClassFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, property: PropertyShape) -> Self {
        self.properties.push(property);
        self
    }

    #[must_use]
    pub fn with_function(mut self, function: FunctionShape) -> Self {
        self.functions.push(function);
        self
    }

    pub fn has_metadata(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Ancestor names ordered root first, ending at the immediate parent.
    ///
    /// Stops at the first expired parent handle, so a partially torn-down
    /// hierarchy yields a truncated (never cyclic) chain.
    #[must_use]
    pub fn ancestor_chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut cursor = self.parent.clone();
        while let Some(weak) = cursor {
            let Some(parent) = weak.upgrade() else { break };
            chain.insert(0, parent.name.clone());
            cursor = parent.parent.clone();
        }
        chain
    }
}

/// Kind of a graph-owning asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    Standard,
    /// Animation graphs are never documented.
    Animation,
}

/// A content asset that owns a node graph and a generated class.
#[derive(Debug)]
pub struct GraphAsset {
    pub name: String,
    /// Content path the asset lives under, e.g. `/Game/Gameplay`.
    pub path: String,
    pub kind: AssetKind,
    pub generated_class: Weak<ClassShape>,
}

impl GraphAsset {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        generated_class: &Arc<ClassShape>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: AssetKind::Standard,
            generated_class: Arc::downgrade(generated_class),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: AssetKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Stable identity of a source object, used for object-level dedupe across
/// enumerators.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub(crate) fn class(name: &str) -> Self {
        Self(format!("class:{name}"))
    }

    pub(crate) fn asset(path: &str, name: &str) -> Self {
        Self(format!("asset:{path}/{name}"))
    }
}

/// A discoverable entity eligible for documentation. The pipeline holds weak
/// handles only; [`SourceObject::is_alive`] must be consulted after every
/// thread hop.
#[derive(Clone, Debug)]
pub enum SourceObject {
    Class(Weak<ClassShape>),
    Asset(Weak<GraphAsset>),
}

impl SourceObject {
    #[must_use]
    pub fn key(&self) -> Option<ObjectKey> {
        match self {
            SourceObject::Class(weak) => weak.upgrade().map(|c| ObjectKey::class(&c.name)),
            SourceObject::Asset(weak) => {
                weak.upgrade().map(|a| ObjectKey::asset(&a.path, &a.name))
            }
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        match self {
            SourceObject::Class(weak) => weak.strong_count() > 0,
            SourceObject::Asset(weak) => weak.strong_count() > 0,
        }
    }

    /// The class this object maps to directly: the class itself, or the
    /// asset's generated class.
    #[must_use]
    pub fn direct_class(&self) -> Option<Arc<ClassShape>> {
        match self {
            SourceObject::Class(weak) => weak.upgrade(),
            SourceObject::Asset(weak) => weak.upgrade().and_then(|a| a.generated_class.upgrade()),
        }
    }

    /// Whether this object is a graph-owning asset (as opposed to a native
    /// class). Several exclusion rules only apply in an asset context.
    #[must_use]
    pub fn is_asset(&self) -> bool {
        matches!(self, SourceObject::Asset(_))
    }

    /// Whether this object is an animation-graph asset.
    #[must_use]
    pub fn is_animation_asset(&self) -> bool {
        match self {
            SourceObject::Asset(weak) => weak
                .upgrade()
                .is_some_and(|a| a.kind == AssetKind::Animation),
            SourceObject::Class(_) => false,
        }
    }
}

/// Owns every registered shape and answers prepass queries.
///
/// Registration order matters only in that parents must precede children
/// (see [`ClassShape::with_parent`]).
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    classes: Vec<Arc<ClassShape>>,
    assets: Vec<Arc<GraphAsset>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_class(&mut self, class: ClassShape) -> Arc<ClassShape> {
        let arc = Arc::new(class);
        self.classes.push(Arc::clone(&arc));
        arc
    }

    pub fn register_asset(&mut self, asset: GraphAsset) -> Arc<GraphAsset> {
        let arc = Arc::new(asset);
        self.assets.push(Arc::clone(&arc));
        arc
    }

    /// Drop the registry's strong handle to a class, simulating host-side
    /// collection. Pipeline-held weak handles expire.
    pub fn evict_class(&mut self, name: &str) {
        self.classes.retain(|c| c.name != name);
    }

    pub fn evict_asset(&mut self, name: &str) {
        self.assets.retain(|a| a.name != name);
    }

    pub fn all_classes(&self) -> &[Arc<ClassShape>] {
        &self.classes
    }

    pub fn all_assets(&self) -> &[Arc<GraphAsset>] {
        &self.assets
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.classes
            .iter()
            .any(|c| c.module.as_deref() == Some(module))
    }

    pub fn has_content_root(&self, path: &str) -> bool {
        self.assets.iter().any(|a| a.path.starts_with(path))
    }

    pub fn find_class(&self, name: &str) -> Option<&Arc<ClassShape>> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Prepass query: native classes declared by `module`, excluding
    /// deprecated, superseded, and skeleton classes.
    #[must_use]
    pub fn classes_in_module(&self, module: &str) -> Vec<Weak<ClassShape>> {
        self.classes
            .iter()
            .filter(|c| c.module.as_deref() == Some(module))
            .filter(|c| !c.flags.deprecated && !c.flags.superseded && !c.flags.skeleton)
            .map(Arc::downgrade)
            .collect()
    }

    /// Prepass query: graph assets under a content path, excluding animation
    /// graphs.
    #[must_use]
    pub fn assets_under_path(&self, path: &str) -> Vec<Weak<GraphAsset>> {
        self.assets
            .iter()
            .filter(|a| a.path.starts_with(path))
            .filter(|a| a.kind != AssetKind::Animation)
            .map(Arc::downgrade)
            .collect()
    }
}
