//! Shared fixtures: registries, class shapes, and instrumented renderers.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use graphdoc::instance::NodeInstance;
use graphdoc::processor::CancelHandle;
use graphdoc::reflection::{ClassShape, FunctionShape, ParamFlags, ParamShape, PropertyShape};
use graphdoc::render::{CaptureError, FlatRenderer, NodeRenderer, PixelBuffer};
use graphdoc::settings::GenerationSettings;
use graphdoc::spawner::HostGraph;

/// A documentable callable with one input parameter and a return value.
pub fn callable(name: &str) -> FunctionShape {
    FunctionShape::new(name)
        .with_description(format!("{name} does work."))
        .with_param(ParamShape::new("Amount", "Float").with_description("How much."))
        .with_param(ParamShape::new("ReturnValue", "Boolean").with_flags(ParamFlags {
            return_param: true,
            ..ParamFlags::default()
        }))
}

/// A class in `module` with a single documentable callable named `fn_name`.
pub fn class_with_function(name: &str, module: &str, fn_name: &str) -> ClassShape {
    ClassShape::new(name)
        .in_module(module)
        .with_property(PropertyShape::new("Enabled", "Boolean").with_description("On or off."))
        .with_function(callable(fn_name))
}

/// Settings rooted under a scratch directory.
pub fn test_settings(dir: &Path) -> GenerationSettings {
    let mut settings = GenerationSettings::new("Test Docs");
    settings.output_dir = dir.join("site");
    settings.intermediate_dir = dir.join("intermediate");
    settings.project_dir = dir.to_path_buf();
    settings
}

/// Write an executable shell script standing in for an external tool.
pub fn write_stub_tool(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("sitegen.sh");
    fs::write(&path, body).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Renders normally except for nodes whose identifier contains the marker.
pub struct FailingRenderer {
    pub fail_marker: String,
}

impl NodeRenderer for FailingRenderer {
    fn render(
        &self,
        node: &NodeInstance,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, CaptureError> {
        if node.doc_id.contains(&self.fail_marker) {
            return Err(CaptureError::RenderFailed {
                node: node.doc_id.clone(),
                reason: "fixture failure".to_string(),
            });
        }
        FlatRenderer.render(node, width, height)
    }
}

/// Renders normally but fires a cancel after every render, to exercise
/// bounded-latency cancellation mid-task.
pub struct CancellingRenderer {
    handle: OnceLock<CancelHandle>,
}

impl CancellingRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            handle: OnceLock::new(),
        })
    }

    /// Wire up the cancel handle once the processor exists.
    pub fn arm(&self, handle: CancelHandle) {
        let _ = self.handle.set(handle);
    }
}

impl NodeRenderer for CancellingRenderer {
    fn render(
        &self,
        node: &NodeInstance,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, CaptureError> {
        let out = FlatRenderer.render(node, width, height);
        if let Some(handle) = self.handle.get() {
            handle.cancel();
        }
        out
    }
}

/// Renders normally but evicts the named class from the host after every
/// render, simulating host-side collection mid-task.
pub struct EvictingRenderer {
    host: OnceLock<Arc<HostGraph>>,
    victim: String,
}

impl EvictingRenderer {
    pub fn new(victim: &str) -> Arc<Self> {
        Arc::new(Self {
            host: OnceLock::new(),
            victim: victim.to_string(),
        })
    }

    /// Wire up the host once it exists.
    pub fn arm(&self, host: Arc<HostGraph>) {
        let _ = self.host.set(host);
    }
}

impl NodeRenderer for EvictingRenderer {
    fn render(
        &self,
        node: &NodeInstance,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, CaptureError> {
        let out = FlatRenderer.render(node, width, height);
        if let Some(host) = self.host.get() {
            host.evict_class(&self.victim);
        }
        out
    }
}
