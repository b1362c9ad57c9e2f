//! A dirty-tracked terminal rendering pipeline for reflective e-paper displays.
//!
//! Translates a logical character grid (`matrix`) into minimal, waveform-aware
//! pixel updates (`render`, `epaper`) on a layered memory surface (`display`),
//! batching and merging regions to keep the number of physical e-paper refreshes
//! low while staying visually responsive via a low-quality draft pass followed by
//! a high-quality promotion pass.

pub mod backend;
pub mod color;
pub mod config;
pub mod display;
pub mod epaper;
pub mod error;
pub mod geometry;
pub mod matrix;
pub mod pacing;
pub mod render;
pub mod style;

pub use backend::{
    CommitRequest, DisplayBackend, Event, EventSource, GlyphBitmap, GlyphMetrics, GlyphProvider,
    Key, PollMode,
};
pub use color::{Color, ColorLayout, Palette, Rgba};
pub use config::RendererConfig;
pub use display::merger::RectangleMerger;
pub use display::{DrawMode, Layer, MemoryDisplay};
pub use epaper::{grayscale_to_rgba, FramebufferDisplay, MaskOp, OutputOp, UpdateMode};
pub use error::DisplayError;
pub use geometry::{Point, Rect};
pub use matrix::{Cell, CellUpdate, Matrix};
pub use pacing::FramePacer;
pub use render::{MatrixRenderer, RenderCell};
pub use style::{CellStyle, Underline};
