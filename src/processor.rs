//! The worker-thread state machine driving the whole pipeline.
//!
//! A [`TaskProcessor`] owns one task at a time: it builds the enumerators,
//! pulls candidate objects, marshals spawner discovery and node instantiation
//! to the affinity thread, runs artifact generation, and aggregates output.
//! Per-node failures are logged and skipped; only initialization failure and
//! zero results abort a task. Cancellation is cooperative and polled at
//! object and spawner boundaries, so an in-flight node always completes.
//!
//! Dedupe and aggregation state are scoped to the processor session: they
//! survive across tasks within one session (incremental catalogs) and are
//! cleared by [`TaskProcessor::reset`], never implicitly.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

use crate::dispatch::AffinityDispatcher;
use crate::document::{AggregationStore, DocumentError, ProcessedSet};
use crate::enumeration::{
    CompositeEnumerator, ContentPathEnumerator, EnumerationError, NativeModuleEnumerator,
    SourceEnumerator,
};
use crate::events::{Event, EventEmitter, TaskStatus};
use crate::generator::{DocGenerator, GenerateError, map_to_associated_class};
use crate::reflection::{ClassShape, META_NOT_DOCUMENTED, ObjectKey, SourceObject};
use crate::render::NodeRenderer;
use crate::serializer;
use crate::settings::GenerationSettings;
use crate::sitegen::{SiteGenRequest, run_site_generator};
use crate::spawner::{HostGraph, Spawner, is_spawner_documentable};

#[derive(Debug, Error, Diagnostic)]
pub enum QueueError {
    #[error("worker thread is no longer accepting tasks")]
    #[diagnostic(
        code(graphdoc::processor::worker_gone),
        help("The worker was shut down; spawn a new processor to queue more tasks.")
    )]
    WorkerGone,
}

/// Phases a running task moves through, surfaced in trace output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskPhase {
    EnumeratingSources,
    EnumeratingObjects,
    EnumeratingSpawners,
    GeneratingNode,
    Aggregating,
}

impl std::fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TaskPhase::EnumeratingSources => "enumerating-sources",
            TaskPhase::EnumeratingObjects => "enumerating-objects",
            TaskPhase::EnumeratingSpawners => "enumerating-spawners",
            TaskPhase::GeneratingNode => "generating-node",
            TaskPhase::Aggregating => "aggregating",
        };
        write!(f, "{label}")
    }
}

/// Immutable generation request. Queued FIFO; becomes current when the
/// worker picks it up and is discarded after completion or cancellation.
#[derive(Clone, Debug)]
pub struct GenTask {
    pub title: String,
    pub native_modules: Vec<String>,
    pub content_paths: Vec<String>,
    pub context_class: Option<String>,
    pub start_preview_server: bool,
}

impl GenTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            native_modules: Vec::new(),
            content_paths: Vec::new(),
            context_class: None,
            start_preview_server: false,
        }
    }

    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.native_modules.push(module.into());
        self
    }

    #[must_use]
    pub fn with_content_path(mut self, path: impl Into<String>) -> Self {
        self.content_paths.push(path.into());
        self
    }

    pub fn from_settings(settings: &GenerationSettings) -> Self {
        Self {
            title: settings.title.clone(),
            native_modules: settings.native_modules.clone(),
            content_paths: settings.content_paths.clone(),
            context_class: settings.context_class.clone(),
            start_preview_server: settings.start_preview_server,
        }
    }
}

/// Terminal result of one task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    Success { nodes: usize },
    Failed { reason: String },
    Cancelled,
}

/// Cooperative cancellation flag for the current task. Cloneable and safe to
/// trigger from any thread.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

enum WorkerMsg {
    Task(GenTask),
    Shutdown,
}

/// Owns the session state and runs tasks to completion, one at a time.
pub struct TaskProcessor {
    host: Arc<HostGraph>,
    dispatcher: AffinityDispatcher,
    generator: DocGenerator,
    emitter: EventEmitter,
    settings: GenerationSettings,
    site_generator: Option<PathBuf>,
    processed_classes: ProcessedSet,
    processed_objects: FxHashSet<ObjectKey>,
    store: AggregationStore,
    cancel: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl TaskProcessor {
    pub fn new(
        host: Arc<HostGraph>,
        dispatcher: AffinityDispatcher,
        renderer: Arc<dyn NodeRenderer>,
        emitter: EventEmitter,
        settings: GenerationSettings,
    ) -> Self {
        let generator = DocGenerator::new(
            dispatcher.clone(),
            renderer,
            settings.intermediate_dir.clone(),
        );
        Self {
            host,
            dispatcher,
            generator,
            emitter,
            settings,
            site_generator: None,
            processed_classes: ProcessedSet::new(),
            processed_objects: FxHashSet::default(),
            store: AggregationStore::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Configure the external site-generator executable invoked after each
    /// successful task.
    #[must_use]
    pub fn with_site_generator(mut self, tool: impl Into<PathBuf>) -> Self {
        self.site_generator = Some(tool.into());
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancel),
        }
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    /// Clear session-scoped dedupe and aggregation state between runs.
    pub fn reset(&mut self) {
        self.processed_classes.reset();
        self.processed_objects.clear();
        self.store.reset();
    }

    /// Run one task to completion on the calling thread.
    pub fn run_task(&mut self, task: &GenTask) -> TaskOutcome {
        let span = info_span!("task", title = %task.title);
        let _guard = span.enter();

        // Rearm: a cancel issued against a previous task must not leak into
        // this one.
        self.cancel.store(false, Ordering::SeqCst);
        let _ = self
            .emitter
            .emit(Event::task(&task.title, TaskStatus::Running));

        debug!(phase = %TaskPhase::EnumeratingSources, "phase");
        let context = self.resolve_context(task);
        let mut queue = match self.build_enumerators(task) {
            Ok(queue) => queue,
            Err(err) => {
                error!(error = %err, "enumeration prepass failed");
                return self.finish_failed(task, err.to_string());
            }
        };

        let mut nodes_generated = 0usize;
        for enumerator in &mut queue {
            debug!(phase = %TaskPhase::EnumeratingObjects, "phase");
            loop {
                if self.cancel.load(Ordering::SeqCst) {
                    info!("task cancelled");
                    let _ = self
                        .emitter
                        .emit(Event::task(&task.title, TaskStatus::Cancelled));
                    return TaskOutcome::Cancelled;
                }
                let Some(source) = enumerator.next() else {
                    break;
                };
                debug!(
                    progress = enumerator.estimate_progress(),
                    "object dequeued"
                );
                nodes_generated += self.process_object(&source, context.as_ref());
            }
        }

        debug!(phase = %TaskPhase::Aggregating, "phase");
        if nodes_generated == 0 {
            warn!("no nodes found");
            return self.finish_failed(task, "no nodes found".to_string());
        }
        if let Err(err) = self.persist_documents() {
            error!(error = %err, "failed to persist document tree");
            return self.finish_failed(task, err.to_string());
        }
        self.launch_site_generator(task);
        if task.start_preview_server {
            let _ = self.emitter.emit(Event::diagnostic(
                "preview",
                format!(
                    "preview server requested for {}",
                    self.settings.output_dir.display()
                ),
            ));
        }

        info!(nodes = nodes_generated, "task succeeded");
        let _ = self.emitter.emit(Event::task(
            &task.title,
            TaskStatus::Succeeded {
                nodes: nodes_generated,
            },
        ));
        TaskOutcome::Success {
            nodes: nodes_generated,
        }
    }

    fn finish_failed(&self, task: &GenTask, reason: String) -> TaskOutcome {
        let _ = self.emitter.emit(Event::task(
            &task.title,
            TaskStatus::Failed {
                reason: reason.clone(),
            },
        ));
        TaskOutcome::Failed { reason }
    }

    /// Resolve the graph context class named by the task, if any. An unknown
    /// name degrades to contextless spawning.
    fn resolve_context(&self, task: &GenTask) -> Option<Arc<ClassShape>> {
        let name = task.context_class.as_deref()?;
        let context = self.host.registry().find_class(name).cloned();
        if context.is_none() {
            warn!(context = name, "context class not found; spawning without context");
        }
        context
    }

    /// One composite per provenance kind, queued in task order. A failed
    /// prepass aborts the whole task.
    fn build_enumerators(
        &self,
        task: &GenTask,
    ) -> Result<Vec<Box<dyn SourceEnumerator>>, EnumerationError> {
        let registry = self.host.registry();
        let mut queue: Vec<Box<dyn SourceEnumerator>> = Vec::new();
        if !task.native_modules.is_empty() {
            let inner = task
                .native_modules
                .iter()
                .map(|module| NativeModuleEnumerator::new(&registry, module))
                .collect::<Result<Vec<_>, _>>()?;
            queue.push(Box::new(CompositeEnumerator::new(inner)));
        }
        if !task.content_paths.is_empty() {
            let inner = task
                .content_paths
                .iter()
                .map(|path| ContentPathEnumerator::new(&registry, path))
                .collect::<Result<Vec<_>, _>>()?;
            queue.push(Box::new(CompositeEnumerator::new(inner)));
        }
        Ok(queue)
    }

    /// Process one candidate object; returns how many nodes it contributed.
    fn process_object(&mut self, source: &SourceObject, context: Option<&Arc<ClassShape>>) -> usize {
        if !source.is_alive() {
            warn!("source object collected between discovery and use; skipping");
            return 0;
        }
        if source.is_animation_asset() {
            return 0;
        }
        let Some(key) = source.key() else {
            return 0;
        };
        // Object-level dedupe: re-encountering an object across enumerators
        // is a no-op.
        if !self.processed_objects.insert(key) {
            return 0;
        }

        // A directly documentable class is serialized up front, spawners or
        // not.
        if let Some(class) = source.direct_class() {
            self.serialize_class_once(&class);
        }

        debug!(phase = %TaskPhase::EnumeratingSpawners, "phase");
        let host = Arc::clone(&self.host);
        let lookup = source.clone();
        let spawners = match self.dispatcher.run(move || host.actions().for_object(&lookup)) {
            Ok(spawners) => spawners,
            Err(err) => {
                warn!(error = %err, "spawner lookup failed; skipping object");
                return 0;
            }
        };
        if spawners.is_empty() {
            return 0;
        }

        let asset_context = source.is_asset();
        let mut generated = 0;
        for spawner in spawners {
            if self.cancel.load(Ordering::SeqCst) {
                break;
            }
            if !is_spawner_documentable(&spawner, asset_context) {
                continue;
            }
            debug!(phase = %TaskPhase::GeneratingNode, "phase");
            match self.generate_node(&spawner, source, context) {
                Ok(true) => generated += 1,
                Ok(false) => {}
                Err(err) => warn!(error = %err, "node skipped"),
            }
        }
        generated
    }

    /// Drive one admissible spawner through spawn, capture, and extraction.
    /// `Ok(false)` means the node was excluded, not failed.
    fn generate_node(
        &mut self,
        spawner: &Spawner,
        source: &SourceObject,
        context: Option<&Arc<ClassShape>>,
    ) -> Result<bool, GenerateError> {
        let node = self.generator.spawn_node(spawner, context)?;
        let Some(class) = map_to_associated_class(&node, source) else {
            return Err(GenerateError::Metadata {
                node: node.doc_id.clone(),
                reason: "no associated class".to_string(),
            });
        };
        if class.has_metadata(META_NOT_DOCUMENTED) {
            return Ok(false);
        }
        // The class record must exist before a node document can attach.
        if !self.serialize_class_once(&class) {
            return Ok(false);
        }
        let state = self.generator.capture_node_image(&node, &class)?;
        let record = self.generator.extract_node_docs(&node, &state)?;
        if !self.store.attach_node(&state.class_name, record) {
            return Err(GenerateError::Metadata {
                node: node.doc_id.clone(),
                reason: format!("no class record for {}", state.class_name),
            });
        }
        Ok(true)
    }

    /// Serialize a class exactly once per session. Returns `false` when the
    /// class is marked not-documented.
    fn serialize_class_once(&mut self, class: &Arc<ClassShape>) -> bool {
        if class.has_metadata(META_NOT_DOCUMENTED) {
            return false;
        }
        if !self.processed_classes.insert(&class.name) {
            return true;
        }
        self.store.push(serializer::serialize_class(class));
        true
    }

    /// Write the intermediate class dump and the final node document tree.
    fn persist_documents(&self) -> Result<(), DocumentError> {
        let dir = self.generator.intermediate_dir();
        fs::create_dir_all(dir).map_err(|source| DocumentError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let dump = dir.join("classes.json");
        AggregationStore::persist(&dump, &self.store.to_intermediate_json()?)?;

        let out = &self.settings.output_dir;
        fs::create_dir_all(out).map_err(|source| DocumentError::Io {
            path: out.display().to_string(),
            source,
        })?;
        let document = out.join("nodes.json");
        AggregationStore::persist(&document, &self.store.to_document_json()?)?;
        info!(path = %document.display(), "document tree persisted");
        Ok(())
    }

    /// Detached hand-off to the external site generator, so the worker is
    /// free to exit without waiting on the subprocess.
    fn launch_site_generator(&self, task: &GenTask) {
        let Some(tool) = &self.site_generator else {
            return;
        };
        let mut request = SiteGenRequest::from_settings(tool.clone(), &self.settings);
        request.name = task.title.clone();
        let emitter = self.emitter.clone();
        self.dispatcher.run_detached(move || {
            match run_site_generator(&request) {
                Ok(outcome) if outcome.is_success() => {
                    let _ = emitter.emit(Event::diagnostic("sitegen", "site generation finished"));
                }
                Ok(outcome) => {
                    // Non-zero exit: logged, task still counts as complete.
                    warn!(?outcome, "site generator reported errors");
                    let _ = emitter.emit(Event::diagnostic(
                        "sitegen",
                        format!("site generator reported errors: {outcome:?}"),
                    ));
                }
                Err(err) => {
                    warn!(error = %err, "site generator failed to run");
                    let _ = emitter.emit(Event::diagnostic("sitegen", err.to_string()));
                }
            }
        });
    }

    /// Move the processor onto a dedicated worker thread and return a handle
    /// for queueing tasks against it.
    pub fn spawn(mut self) -> std::io::Result<ProcessorHandle> {
        let (tx, rx) = flume::unbounded::<WorkerMsg>();
        let cancel = Arc::clone(&self.cancel);
        let running = Arc::clone(&self.running);
        let emitter = self.emitter.clone();
        let join = std::thread::Builder::new()
            .name("graphdoc-worker".into())
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        WorkerMsg::Task(task) => {
                            self.running.store(true, Ordering::SeqCst);
                            let outcome = self.run_task(&task);
                            self.running.store(false, Ordering::SeqCst);
                            debug!(?outcome, task = %task.title, "task finished");
                        }
                        WorkerMsg::Shutdown => break,
                    }
                }
                self
            })?;
        Ok(ProcessorHandle {
            tx,
            cancel,
            running,
            emitter,
            join: Some(join),
        })
    }
}

/// Handle to a spawned worker. Tasks queue FIFO; the worker runs them
/// strictly serially.
pub struct ProcessorHandle {
    tx: flume::Sender<WorkerMsg>,
    cancel: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    emitter: EventEmitter,
    join: Option<JoinHandle<TaskProcessor>>,
}

impl ProcessorHandle {
    pub fn queue_task(&self, task: GenTask) -> Result<(), QueueError> {
        let _ = self
            .emitter
            .emit(Event::task(&task.title, TaskStatus::Queued));
        self.tx
            .send(WorkerMsg::Task(task))
            .map_err(|_| QueueError::WorkerGone)
    }

    /// Cancellation handle for the current task. Queued tasks still run.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancel),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Finish queued tasks, stop the worker, and hand the processor back for
    /// inspection.
    pub fn shutdown(mut self) -> Option<TaskProcessor> {
        let _ = self.tx.send(WorkerMsg::Shutdown);
        self.join.take().and_then(|join| join.join().ok())
    }
}

impl Drop for ProcessorHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(WorkerMsg::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
