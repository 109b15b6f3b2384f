//! Snapshot capture seam.
//!
//! The pipeline needs raster snapshots of node instances but deliberately does
//! not own the rendering technology: [`NodeRenderer`] is the seam, and the
//! built-in [`FlatRenderer`] is a deterministic placeholder good enough for
//! documentation output and tests. Buffers are linear RGBA in `f32` so the
//! alpha boost composes before quantisation.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;

use crate::instance::NodeInstance;
use crate::types::PinDirection;

/// Capture canvas edge, in pixels. Snapshots are taken at maximum visual
/// detail on a fixed square canvas.
pub const CANVAS_SIZE: u32 = 1024;

/// Fixed multiplier applied to every alpha sample before quantisation,
/// clamped to 1.0.
pub const ALPHA_BOOST: f32 = 2.0;

#[derive(Debug, Error, Diagnostic)]
pub enum CaptureError {
    #[error("snapshot render failed for {node}: {reason}")]
    #[diagnostic(
        code(graphdoc::render::capture),
        help("The node is skipped; the task continues with the next spawner.")
    )]
    RenderFailed { node: String, reason: String },

    #[error("renderer produced an empty buffer for {node}")]
    #[diagnostic(code(graphdoc::render::empty_capture))]
    EmptyCapture { node: String },

    #[error("failed to write snapshot {path}")]
    #[diagnostic(code(graphdoc::render::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode snapshot {path}")]
    #[diagnostic(code(graphdoc::render::encode))]
    Encode {
        path: String,
        #[source]
        source: png::EncodingError,
    },
}

/// An owned linear RGBA pixel buffer, interleaved, row-major.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; (width as usize) * (height as usize) * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        let o = self.offset(x, y);
        [self.data[o], self.data[o + 1], self.data[o + 2], self.data[o + 3]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [f32; 4]) {
        let o = self.offset(x, y);
        self.data[o..o + 4].copy_from_slice(&rgba);
    }

    /// Fill a rectangle, clipped to the buffer bounds.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, rgba: [f32; 4]) {
        let x1 = (x + w).min(self.width);
        let y1 = (y + h).min(self.height);
        for py in y..y1 {
            for px in x..x1 {
                self.set_pixel(px, py, rgba);
            }
        }
    }

    /// Multiply every alpha sample by `factor`, clamping to 1.0.
    pub fn boost_alpha(&mut self, factor: f32) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk[3] = (chunk[3] * factor).min(1.0);
        }
    }

    /// Quantise to 8-bit RGBA for encoding.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }
}

/// Produces a raster snapshot of one node instance. Implementations must be
/// callable from the affinity thread; the buffer they return is owned and
/// crosses back to the worker.
pub trait NodeRenderer: Send + Sync {
    fn render(&self, node: &NodeInstance, width: u32, height: u32)
    -> Result<PixelBuffer, CaptureError>;
}

/// Deterministic built-in renderer: a title band tinted from the node title,
/// one row per visible pin, inputs on the left and outputs on the right.
/// Identical nodes always produce identical pixels.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatRenderer;

const BACKGROUND: [f32; 4] = [0.09, 0.09, 0.11, 0.5];
const INPUT_TINT: [f32; 4] = [0.18, 0.32, 0.18, 0.5];
const OUTPUT_TINT: [f32; 4] = [0.18, 0.22, 0.36, 0.5];
const TITLE_BAND: u32 = 48;
const PIN_ROW: u32 = 24;

fn title_tint(title: &str) -> [f32; 4] {
    // FNV-1a over the title bytes keeps the tint stable across runs.
    let mut hash: u32 = 0x811c_9dc5;
    for b in title.bytes() {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    let r = 0.25 + ((hash & 0xff) as f32 / 255.0) * 0.5;
    let g = 0.25 + (((hash >> 8) & 0xff) as f32 / 255.0) * 0.5;
    let b = 0.25 + (((hash >> 16) & 0xff) as f32 / 255.0) * 0.5;
    [r, g, b, 0.5]
}

impl NodeRenderer for FlatRenderer {
    fn render(
        &self,
        node: &NodeInstance,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::EmptyCapture {
                node: node.doc_id.clone(),
            });
        }
        let mut buffer = PixelBuffer::new(width, height);
        buffer.fill_rect(0, 0, width, height, BACKGROUND);
        buffer.fill_rect(0, 0, width, TITLE_BAND, title_tint(&node.full_title));

        let half = width / 2;
        let mut y = TITLE_BAND;
        for _pin in node.visible_pins(PinDirection::Input) {
            buffer.fill_rect(0, y, half, PIN_ROW, INPUT_TINT);
            y += PIN_ROW;
        }
        let mut y = TITLE_BAND;
        for _pin in node.visible_pins(PinDirection::Output) {
            buffer.fill_rect(half, y, width - half, PIN_ROW, OUTPUT_TINT);
            y += PIN_ROW;
        }
        Ok(buffer)
    }
}

/// Encode a buffer as 8-bit RGBA PNG at `path`.
pub fn write_png(path: &Path, buffer: &PixelBuffer) -> Result<(), CaptureError> {
    let display = path.display().to_string();
    let file = File::create(path).map_err(|source| CaptureError::Io {
        path: display.clone(),
        source,
    })?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), buffer.width(), buffer.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .map_err(|source| CaptureError::Encode {
            path: display.clone(),
            source,
        })?;
    writer
        .write_image_data(&buffer.to_rgba8())
        .map_err(|source| CaptureError::Encode {
            path: display,
            source,
        })
}
