mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use graphdoc::dispatch::AffinityDispatcher;
use graphdoc::document::ClassRecord;
use graphdoc::events::{EventBus, EventEmitter, MemorySink, TaskStatus};
use graphdoc::processor::{GenTask, TaskOutcome, TaskProcessor};
use graphdoc::reflection::{ClassFlags, ClassShape, GraphAsset, ObjectRegistry};
use graphdoc::render::{FlatRenderer, NodeRenderer};
use graphdoc::spawner::HostGraph;

use common::fixtures::{
    CancellingRenderer, EvictingRenderer, FailingRenderer, callable, class_with_function,
    test_settings, write_stub_tool,
};

fn make_processor(
    registry: ObjectRegistry,
    renderer: Arc<dyn NodeRenderer>,
    dir: &Path,
) -> TaskProcessor {
    TaskProcessor::new(
        Arc::new(HostGraph::new(registry)),
        AffinityDispatcher::inline(),
        renderer,
        EventEmitter::disconnected(),
        test_settings(dir),
    )
}

#[test]
fn scenario_zero_sources_fails_with_no_output_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    // The module exists but its only class is filtered at prepass.
    registry.register_class(ClassShape::new("Old").in_module("Core").with_flags(ClassFlags {
        deprecated: true,
        ..ClassFlags::default()
    }));
    let mut processor = make_processor(registry, Arc::new(FlatRenderer), dir.path());

    let outcome = processor.run_task(&GenTask::new("Docs").with_module("Core"));
    assert_eq!(
        outcome,
        TaskOutcome::Failed {
            reason: "no nodes found".to_string()
        }
    );
    assert!(!dir.path().join("intermediate").join("classes.json").exists());
    assert!(!dir.path().join("site").join("nodes.json").exists());
    assert!(processor.store().is_empty());
}

#[test]
fn scenario_failed_capture_skips_the_node_but_not_the_task() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    registry.register_class(
        ClassShape::new("Gadget")
            .in_module("Core")
            .with_function(callable("Good"))
            .with_function(callable("BadCapture")),
    );
    let renderer = Arc::new(FailingRenderer {
        fail_marker: "BadCapture".to_string(),
    });
    let mut processor = make_processor(registry, renderer, dir.path());

    let outcome = processor.run_task(&GenTask::new("Docs").with_module("Core"));
    assert_eq!(outcome, TaskOutcome::Success { nodes: 1 });

    let record = processor.store().find("Gadget").expect("class record");
    assert_eq!(record.nodes.len(), 1);
    assert_eq!(record.nodes[0].docs_name, "Gadget_Good");
    assert!(
        dir.path()
            .join("intermediate/img/Gadget/nd_img_Gadget_Good.png")
            .exists()
    );
    assert!(
        !dir.path()
            .join("intermediate/img/Gadget/nd_img_Gadget_BadCapture.png")
            .exists()
    );
}

#[test]
fn scenario_two_objects_resolving_to_one_class_share_a_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    let foo = registry.register_class(
        ClassShape::new("Foo")
            .in_module("Core")
            .with_function(callable("Do")),
    );
    registry.register_asset(GraphAsset::new("FooAsset", "/Game/Stuff", &foo));
    let mut processor = make_processor(registry, Arc::new(FlatRenderer), dir.path());

    let task = GenTask::new("Docs")
        .with_module("Core")
        .with_content_path("/Game");
    let outcome = processor.run_task(&task);
    assert_eq!(outcome, TaskOutcome::Success { nodes: 2 });

    // ProcessedSet idempotence: one record, both node documents on it.
    assert_eq!(processor.store().len(), 1);
    let record = processor.store().find("Foo").expect("class record");
    assert_eq!(record.nodes.len(), 2);
}

#[test]
fn scenario_excluded_function_is_documented_as_class_member_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    registry.register_class(
        ClassShape::new("Widget")
            .in_module("Core")
            .with_function(callable("Visible"))
            .with_function(callable("Hidden").with_metadata("ExcludeFromDocs", "")),
    );
    let mut processor = make_processor(registry, Arc::new(FlatRenderer), dir.path());

    let outcome = processor.run_task(&GenTask::new("Docs").with_module("Core"));
    assert_eq!(outcome, TaskOutcome::Success { nodes: 1 });

    let record = processor.store().find("Widget").expect("class record");
    // Both callables appear in the reflected shape...
    assert_eq!(record.functions.len(), 2);
    // ...but the excluded one never becomes a node.
    assert!(record.nodes.iter().all(|n| !n.docs_name.contains("Hidden")));
}

#[test]
fn not_documented_classes_are_skipped_entirely() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    registry.register_class(class_with_function("Plain", "Core", "Do"));
    registry.register_class(
        ClassShape::new("Secret")
            .in_module("Core")
            .with_metadata("NotDocumented", "")
            .with_function(callable("Do")),
    );
    let mut processor = make_processor(registry, Arc::new(FlatRenderer), dir.path());

    let outcome = processor.run_task(&GenTask::new("Docs").with_module("Core"));
    assert_eq!(outcome, TaskOutcome::Success { nodes: 1 });
    assert!(processor.store().find("Plain").is_some());
    assert!(processor.store().find("Secret").is_none());
}

#[test]
fn objects_reencountered_across_enumerators_are_noops() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    registry.register_class(class_with_function("Gadget", "Core", "Do"));
    let mut processor = make_processor(registry, Arc::new(FlatRenderer), dir.path());

    let task = GenTask::new("Docs").with_module("Core").with_module("Core");
    let outcome = processor.run_task(&task);
    assert_eq!(outcome, TaskOutcome::Success { nodes: 1 });
    assert_eq!(processor.store().len(), 1);
}

#[test]
fn session_state_persists_across_tasks_until_reset() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    registry.register_class(class_with_function("Gadget", "Core", "Do"));
    let mut processor = make_processor(registry, Arc::new(FlatRenderer), dir.path());
    let task = GenTask::new("Docs").with_module("Core");

    assert_eq!(processor.run_task(&task), TaskOutcome::Success { nodes: 1 });
    // Same session: the object is already processed, so nothing new emerges.
    assert_eq!(
        processor.run_task(&task),
        TaskOutcome::Failed {
            reason: "no nodes found".to_string()
        }
    );
    processor.reset();
    assert_eq!(processor.run_task(&task), TaskOutcome::Success { nodes: 1 });
}

#[test]
fn cancellation_stops_within_one_in_flight_node() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    for i in 0..6 {
        registry.register_class(class_with_function(&format!("C{i}"), "Core", "Do"));
    }
    let renderer = CancellingRenderer::new();
    let mut processor = make_processor(registry, renderer.clone(), dir.path());
    renderer.arm(processor.cancel_handle());

    let outcome = processor.run_task(&GenTask::new("Docs").with_module("Core"));
    assert_eq!(outcome, TaskOutcome::Cancelled);
    // The node whose render fired the cancel still completed; nothing after
    // it started.
    assert_eq!(processor.store().node_count(), 1);
}

#[test]
fn persisted_document_round_trips_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    let foo = registry.register_class(
        ClassShape::new("Foo")
            .in_module("Core")
            .with_function(callable("Do")),
    );
    registry.register_asset(GraphAsset::new("FooAsset", "/Game/Stuff", &foo));
    registry.register_class(class_with_function("Bar", "Core", "Work"));
    let mut processor = make_processor(registry, Arc::new(FlatRenderer), dir.path());

    let task = GenTask::new("Docs")
        .with_module("Core")
        .with_content_path("/Game");
    assert!(matches!(
        processor.run_task(&task),
        TaskOutcome::Success { .. }
    ));

    let text = fs::read_to_string(dir.path().join("intermediate/classes.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let parsed: Vec<ClassRecord> = serde_json::from_value(value["classes"].clone()).unwrap();
    assert_eq!(parsed.as_slice(), processor.store().records());

    // The final document tree lands under the output directory.
    let text = fs::read_to_string(dir.path().join("site/nodes.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let parsed: Vec<ClassRecord> = serde_json::from_value(value["nodes"].clone()).unwrap();
    assert_eq!(parsed.as_slice(), processor.store().records());
}

#[test]
fn context_class_threads_into_spawning_and_hides_target_pins() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    let widget = registry.register_class(
        ClassShape::new("Widget")
            .in_module("Core")
            .with_function(callable("Do")),
    );
    // Gizmo descends from Widget but is not enumerated itself.
    registry.register_class(ClassShape::new("Gizmo").with_parent(&widget));
    let mut processor = make_processor(registry, Arc::new(FlatRenderer), dir.path());

    let mut task = GenTask::new("Docs").with_module("Core");
    task.context_class = Some("Gizmo".to_string());
    assert_eq!(processor.run_task(&task), TaskOutcome::Success { nodes: 1 });
    let record = processor.store().find("Widget").expect("class record");
    assert!(record.nodes[0].inputs.iter().all(|p| p.name != "Target"));

    // Without a context the target pin is documented.
    processor.reset();
    let task = GenTask::new("Docs").with_module("Core");
    assert_eq!(processor.run_task(&task), TaskOutcome::Success { nodes: 1 });
    let record = processor.store().find("Widget").expect("class record");
    assert!(record.nodes[0].inputs.iter().any(|p| p.name == "Target"));
}

#[test]
fn objects_collected_mid_run_are_skipped_without_aborting() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    registry.register_class(class_with_function("Alpha", "Core", "Do"));
    registry.register_class(class_with_function("Beta", "Core", "Do"));

    // Alpha's render evicts Beta, so Beta is dead by the time it is dequeued.
    let renderer = EvictingRenderer::new("Beta");
    let host = Arc::new(HostGraph::new(registry));
    renderer.arm(Arc::clone(&host));
    let mut processor = TaskProcessor::new(
        host,
        AffinityDispatcher::inline(),
        renderer,
        EventEmitter::disconnected(),
        test_settings(dir.path()),
    );

    let outcome = processor.run_task(&GenTask::new("Docs").with_module("Core"));
    assert_eq!(outcome, TaskOutcome::Success { nodes: 1 });
    assert!(processor.store().find("Alpha").is_some());
    assert!(processor.store().find("Beta").is_none());
}

#[test]
fn successful_task_hands_off_to_the_site_generator_and_preview() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    registry.register_class(class_with_function("Gadget", "Core", "Do"));
    let tool = write_stub_tool(dir.path(), "#!/bin/sh\necho \"rendering $@\"\nexit 0\n");

    let bus = EventBus::new();
    let sink = MemorySink::new();
    bus.add_sink(Box::new(sink.clone()));

    let mut processor = TaskProcessor::new(
        Arc::new(HostGraph::new(registry)),
        AffinityDispatcher::inline(),
        Arc::new(FlatRenderer),
        bus.emitter(),
        test_settings(dir.path()),
    )
    .with_site_generator(&tool);

    let mut task = GenTask::new("Docs").with_module("Core");
    task.start_preview_server = true;
    // Inline dispatch runs the detached hand-off in place, so the subprocess
    // has finished by the time the task returns.
    assert_eq!(processor.run_task(&task), TaskOutcome::Success { nodes: 1 });

    drop(processor);
    drop(bus);
    let events = sink.snapshot();
    let scopes: Vec<&str> = events
        .iter()
        .filter(|e| e.task_status().is_none())
        .map(|e| e.scope_label())
        .collect();
    assert!(scopes.contains(&"sitegen"));
    assert!(scopes.contains(&"preview"));
}

#[test]
fn spawned_worker_runs_queued_tasks_and_reports_lifecycle_events() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ObjectRegistry::new();
    registry.register_class(class_with_function("Gadget", "Core", "Do"));

    let bus = EventBus::new();
    let sink = MemorySink::new();
    bus.add_sink(Box::new(sink.clone()));

    let processor = TaskProcessor::new(
        Arc::new(HostGraph::new(registry)),
        AffinityDispatcher::inline(),
        Arc::new(FlatRenderer),
        bus.emitter(),
        test_settings(dir.path()),
    );
    let handle = processor.spawn().expect("worker spawns");
    handle
        .queue_task(GenTask::new("Docs").with_module("Core"))
        .unwrap();
    let processor = handle.shutdown().expect("worker hands the processor back");
    assert_eq!(processor.store().node_count(), 1);

    drop(processor);
    drop(bus);
    let statuses: Vec<TaskStatus> = sink
        .snapshot()
        .iter()
        .filter_map(|e| e.task_status().cloned())
        .collect();
    assert_eq!(
        statuses,
        vec![
            TaskStatus::Queued,
            TaskStatus::Running,
            TaskStatus::Succeeded { nodes: 1 }
        ]
    );
}
