mod common;

use std::sync::Arc;

use graphdoc::reflection::{ClassShape, FunctionFlags, FunctionShape, ObjectRegistry};
use graphdoc::spawner::{Spawner, is_spawner_documentable};
use graphdoc::types::{AccessLevel, PinDirection};

use common::fixtures::callable;

fn class_with(function: FunctionShape) -> Arc<ClassShape> {
    let mut registry = ObjectRegistry::new();
    registry.register_class(ClassShape::new("Widget").in_module("Core").with_function(function))
}

#[test]
fn variable_spawners_are_never_documentable() {
    let class = class_with(callable("Do"));
    let spawner = Spawner::for_variable(&class);
    assert!(!is_spawner_documentable(&spawner, false));
    assert!(!is_spawner_documentable(&spawner, true));
}

#[test]
fn event_spawners_are_excluded_only_in_asset_context() {
    let function = FunctionShape::new("OnHit").with_flags(FunctionFlags {
        event: true,
        callable: true,
        ..FunctionFlags::default()
    });
    let class = class_with(function.clone());
    let spawner = Spawner::for_function(&class, &function);
    assert!(is_spawner_documentable(&spawner, false));
    assert!(!is_spawner_documentable(&spawner, true));
}

#[test]
fn private_functions_are_excluded_unless_event() {
    let private_fn = callable("Hidden").with_access(AccessLevel::Private);
    let class = class_with(private_fn.clone());
    let spawner = Spawner::for_function(&class, &private_fn);
    assert!(!is_spawner_documentable(&spawner, false));

    let private_event = FunctionShape::new("OnSecret")
        .with_access(AccessLevel::Private)
        .with_flags(FunctionFlags {
            event: true,
            ..FunctionFlags::default()
        });
    let class = class_with(private_event.clone());
    let spawner = Spawner::for_function(&class, &private_event);
    assert!(is_spawner_documentable(&spawner, false));
}

#[test]
fn exclude_from_docs_metadata_wins_over_access() {
    let function = callable("Internal").with_metadata("ExcludeFromDocs", "");
    let class = class_with(function.clone());
    let spawner = Spawner::for_function(&class, &function);
    assert!(!is_spawner_documentable(&spawner, false));
}

#[test]
fn instance_function_nodes_carry_exec_and_target_pins() {
    let function = callable("GetVelocity");
    let class = class_with(function.clone());
    let spawner = Spawner::for_function(&class, &function);
    let node = spawner.invoke(None).expect("class is alive");

    let inputs: Vec<_> = node.visible_pins(PinDirection::Input).collect();
    let outputs: Vec<_> = node.visible_pins(PinDirection::Output).collect();
    assert!(inputs.iter().any(|p| p.is_exec));
    assert!(outputs.iter().any(|p| p.is_exec));
    assert!(inputs.iter().any(|p| p.is_self_target && p.name == "Target"));
    assert!(outputs.iter().any(|p| p.name == "Return Value"));
    assert!(node.full_title.contains("Target is Widget"));
    assert!(node.target_function.is_some());
}

#[test]
fn pure_function_nodes_have_no_exec_pins() {
    let function = callable("IsEnabled").with_flags(FunctionFlags {
        callable: true,
        pure: true,
        ..FunctionFlags::default()
    });
    let class = class_with(function.clone());
    let spawner = Spawner::for_function(&class, &function);
    let node = spawner.invoke(None).expect("class is alive");
    assert!(node.pins.iter().all(|p| !p.is_exec));
}

#[test]
fn context_descending_from_the_declaring_class_hides_the_target_pin() {
    let mut registry = ObjectRegistry::new();
    let function = callable("GetVelocity");
    let widget = registry.register_class(
        ClassShape::new("Widget")
            .in_module("Core")
            .with_function(function.clone()),
    );
    let gizmo = registry.register_class(ClassShape::new("Gizmo").with_parent(&widget));
    let spawner = Spawner::for_function(&widget, &function);

    // A descendant context satisfies the target implicitly.
    let node = spawner.invoke(Some(&gizmo)).expect("class is alive");
    assert!(
        node.visible_pins(PinDirection::Input)
            .all(|p| p.name != "Target")
    );
    assert!(node.pins.iter().any(|p| p.name == "Target" && p.hidden));

    // An unrelated context leaves the target pin visible.
    let unrelated = ClassShape::new("Other");
    let node = spawner.invoke(Some(&unrelated)).expect("class is alive");
    assert!(
        node.visible_pins(PinDirection::Input)
            .any(|p| p.name == "Target")
    );
}

#[test]
fn spawners_for_collected_classes_yield_nothing() {
    let spawner = {
        let mut registry = ObjectRegistry::new();
        let class =
            registry.register_class(ClassShape::new("Gone").with_function(callable("Do")));
        let spawner = Spawner::for_function(&class, &class.functions[0]);
        registry.evict_class("Gone");
        drop(class);
        spawner
    };
    assert!(spawner.invoke(None).is_none());
}
