//! Spawner descriptors and the documentability policy.
//!
//! A [`Spawner`] is a capability descriptor: given a source object it can
//! produce a [`NodeInstance`] on the affinity thread. Exclusion is decided by
//! structural matches over [`SpawnerKind`] and [`NodeClassKind`] plus a small
//! access-flag predicate, not by type hierarchy tests.

use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, Weak};

use crate::instance::{NodeInstance, Pin, TargetFunction, compose_hover_text, friendly_name};
use crate::reflection::{
    ClassShape, FunctionShape, META_CATEGORY, META_EXCLUDE_FROM_DOCS, ObjectKey, ObjectRegistry,
    SourceObject,
};
use crate::types::{AccessLevel, NodeClassKind, PinDirection, SpawnerKind};

/// Spawner kinds that never produce documentable nodes.
const EXCLUDED_SPAWNER_KINDS: [SpawnerKind; 4] = [
    SpawnerKind::Variable,
    SpawnerKind::Delegate,
    SpawnerKind::Bound,
    SpawnerKind::Component,
];

/// Spawner kinds additionally excluded when the source is a graph-owning
/// asset.
const ASSET_ONLY_EXCLUDED_SPAWNER_KINDS: [SpawnerKind; 1] = [SpawnerKind::Event];

/// Node classes whose instances are never documented.
const EXCLUDED_NODE_CLASSES: [NodeClassKind; 3] = [
    NodeClassKind::DynamicCast,
    NodeClassKind::Message,
    NodeClassKind::ComponentBoundEvent,
];

/// A factory able to produce a node instance for one source object.
#[derive(Clone, Debug)]
pub struct Spawner {
    pub kind: SpawnerKind,
    pub node_class: NodeClassKind,
    pub declaring_class: Weak<ClassShape>,
    /// Owned copy of the backing callable, when the spawner is
    /// function-backed.
    pub function: Option<FunctionShape>,
}

impl Spawner {
    pub fn for_function(declaring_class: &Arc<ClassShape>, function: &FunctionShape) -> Self {
        let (kind, node_class) = if function.flags.event {
            (SpawnerKind::Event, NodeClassKind::Event)
        } else {
            (SpawnerKind::Function, NodeClassKind::CallFunction)
        };
        Self {
            kind,
            node_class,
            declaring_class: Arc::downgrade(declaring_class),
            function: Some(function.clone()),
        }
    }

    pub fn for_variable(declaring_class: &Arc<ClassShape>) -> Self {
        Self {
            kind: SpawnerKind::Variable,
            node_class: NodeClassKind::VariableAccess,
            declaring_class: Arc::downgrade(declaring_class),
            function: None,
        }
    }

    /// Instantiate the node this spawner describes. Must run on the affinity
    /// thread; the returned instance is an owned handle the caller releases
    /// when artifact generation is done.
    ///
    /// `context` is the class whose graph the node is notionally placed in.
    /// When it is the declaring class or one of its descendants, the target
    /// pin defaults to a self reference and is hidden.
    ///
    /// Returns `None` when the declaring class has been collected or the
    /// spawner has nothing to instantiate.
    #[must_use]
    pub fn invoke(&self, context: Option<&ClassShape>) -> Option<NodeInstance> {
        let class = self.declaring_class.upgrade()?;
        match &self.function {
            Some(function) => Some(build_function_node(
                self.node_class,
                &class,
                function,
                context,
            )),
            None => Some(build_variable_node(&class)),
        }
    }
}

/// Whether a graph context class satisfies the target pin implicitly: the
/// context is the declaring class itself or descends from it.
fn context_owns_target(context: &ClassShape, declaring: &str) -> bool {
    context.name.eq_ignore_ascii_case(declaring)
        || context
            .ancestor_chain()
            .iter()
            .any(|ancestor| ancestor.eq_ignore_ascii_case(declaring))
}

fn build_function_node(
    node_class: NodeClassKind,
    class: &Arc<ClassShape>,
    function: &FunctionShape,
    context: Option<&ClassShape>,
) -> NodeInstance {
    let display = friendly_name(&function.name);
    let class_display = friendly_name(&class.name);
    let is_event = function.flags.event;
    let has_target = !function.flags.static_fn && !is_event;

    let mut pins = Vec::new();
    if !function.flags.pure {
        if !is_event {
            pins.push(Pin::exec(PinDirection::Input));
        }
        pins.push(Pin::exec(PinDirection::Output));
    }
    if has_target {
        let type_text = format!("{} Object Reference", class_display);
        let mut pin = Pin::new(PinDirection::Input, "Target", &type_text)
            .with_hover_text(compose_hover_text(
                "Target",
                &type_text,
                "The object to call this function on.",
            ))
            .self_target();
        if context.is_some_and(|ctx| context_owns_target(ctx, &class.name)) {
            pin = pin.hidden();
        }
        pins.push(pin);
    }
    for param in &function.params {
        if param.is_return() {
            let name = "Return Value";
            pins.push(
                Pin::new(PinDirection::Output, name, &param.type_name).with_hover_text(
                    compose_hover_text(name, &param.type_name, &param.description),
                ),
            );
            continue;
        }
        let direction = if param.flags.out {
            PinDirection::Output
        } else {
            PinDirection::Input
        };
        let name = friendly_name(&param.name);
        pins.push(
            Pin::new(direction, &name, &param.type_name).with_hover_text(compose_hover_text(
                &name,
                &param.type_name,
                &param.description,
            )),
        );
    }

    let mut full_title = display.clone();
    let mut tooltip = function.description.clone();
    if has_target {
        full_title.push_str(&format!("\nTarget is {class_display}"));
        if tooltip.is_empty() {
            tooltip = format!("Target is {class_display}");
        } else {
            tooltip.push_str(&format!("\n\nTarget is {class_display}"));
        }
    }

    NodeInstance {
        node_class,
        short_title: display.clone(),
        full_title,
        tooltip,
        category: function
            .metadata
            .get(META_CATEGORY)
            .cloned()
            .unwrap_or_else(|| "Default".to_string()),
        doc_id: format!("{}_{}", class.name, function.name),
        pins,
        target_function: Some(TargetFunction {
            declaring_class: Arc::downgrade(class),
            function_name: function.name.clone(),
        }),
    }
}

fn build_variable_node(class: &Arc<ClassShape>) -> NodeInstance {
    let display = friendly_name(&class.name);
    NodeInstance {
        node_class: NodeClassKind::VariableAccess,
        short_title: display.clone(),
        full_title: display.clone(),
        tooltip: String::new(),
        category: "Variables".to_string(),
        doc_id: format!("{}_Variable", class.name),
        pins: Vec::new(),
        target_function: None,
    }
}

/// Documentability policy for a spawner.
///
/// Excluded outright: variable, delegate, bound, and component spawners.
/// Event spawners are excluded only in a graph-owning-asset context. Nodes of
/// dynamic-cast, message, or component-bound-event classes are excluded.
/// Function-backed spawners require public or protected access unless the
/// function is an event (custom events carry no access specifier), and must
/// not carry the exclude-from-docs marker.
#[must_use]
pub fn is_spawner_documentable(spawner: &Spawner, asset_context: bool) -> bool {
    if EXCLUDED_SPAWNER_KINDS.contains(&spawner.kind) {
        return false;
    }
    if asset_context && ASSET_ONLY_EXCLUDED_SPAWNER_KINDS.contains(&spawner.kind) {
        return false;
    }
    if EXCLUDED_NODE_CLASSES.contains(&spawner.node_class) {
        return false;
    }
    if let Some(function) = &spawner.function {
        let access_ok = matches!(
            function.access,
            AccessLevel::Public | AccessLevel::Protected
        );
        if !function.flags.event && !access_ok {
            return false;
        }
        if function.metadata.contains_key(META_EXCLUDE_FROM_DOCS) {
            return false;
        }
    }
    true
}

/// Lookup table from source objects to the spawners that can represent them,
/// mirroring the host's action database.
#[derive(Debug, Default)]
pub struct ActionIndex {
    actions: FxHashMap<ObjectKey, Vec<Spawner>>,
}

impl ActionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive spawners for every registered class and asset: one per
    /// callable, one variable spawner per property, and the generated-class
    /// callables for assets.
    #[must_use]
    pub fn build(registry: &ObjectRegistry) -> Self {
        let mut index = Self::new();
        for class in registry.all_classes() {
            let key = ObjectKey::class(&class.name);
            for function in &class.functions {
                index.push(key.clone(), Spawner::for_function(class, function));
            }
            for _property in &class.properties {
                index.push(key.clone(), Spawner::for_variable(class));
            }
        }
        for asset in registry.all_assets() {
            let key = ObjectKey::asset(&asset.path, &asset.name);
            if let Some(generated) = asset.generated_class.upgrade() {
                for function in &generated.functions {
                    index.push(key.clone(), Spawner::for_function(&generated, function));
                }
            }
        }
        index
    }

    fn push(&mut self, key: ObjectKey, spawner: Spawner) {
        self.actions.entry(key).or_default().push(spawner);
    }

    /// Attach an extra spawner to a live source object.
    pub fn insert_for(&mut self, source: &SourceObject, spawner: Spawner) {
        if let Some(key) = source.key() {
            self.push(key, spawner);
        }
    }

    /// All spawners registered for a live source object, in registration
    /// order. Empty when the object is dead or has no actions.
    #[must_use]
    pub fn for_object(&self, source: &SourceObject) -> Vec<Spawner> {
        source
            .key()
            .and_then(|key| self.actions.get(&key).cloned())
            .unwrap_or_default()
    }
}

/// The affinity-owned host state the pipeline reads through dispatched work
/// units: the object registry plus the action database built over it.
///
/// The registry sits behind a lock so the host can collect objects while a
/// session runs; pipeline-held weak handles expire accordingly.
#[derive(Debug)]
pub struct HostGraph {
    registry: RwLock<ObjectRegistry>,
    actions: ActionIndex,
}

impl HostGraph {
    pub fn new(registry: ObjectRegistry) -> Self {
        let actions = ActionIndex::build(&registry);
        Self {
            registry: RwLock::new(registry),
            actions,
        }
    }

    pub fn with_actions(registry: ObjectRegistry, actions: ActionIndex) -> Self {
        Self {
            registry: RwLock::new(registry),
            actions,
        }
    }

    pub fn registry(&self) -> RwLockReadGuard<'_, ObjectRegistry> {
        self.registry.read().unwrap()
    }

    pub fn actions(&self) -> &ActionIndex {
        &self.actions
    }

    /// Drop the host's strong handle to a class, as host-side collection
    /// would between discovery and processing.
    pub fn evict_class(&self, name: &str) {
        self.registry.write().unwrap().evict_class(name);
    }

    /// Drop the host's strong handle to an asset.
    pub fn evict_asset(&self, name: &str) {
        self.registry.write().unwrap().evict_asset(name);
    }
}
