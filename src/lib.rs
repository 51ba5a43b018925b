// this_file: src/lib.rs
//! Quotecard - renders quotation cards
//!
//! A card is a background photo scaled to the canvas, a translucent overlay,
//! a greedily wrapped quote centered line by line, and an attribution line
//! beneath it, encoded as JPEG.
//!
//! This library provides:
//! - Font loading and measurement with the fontations stack
//! - Line wrapping and layout planning behind a pluggable measurer
//! - Compositing and glyph rasterization
//! - Remote (Unsplash) and local photo sources
//! - Batch rendering via JSON job specifications
//! - A small HTTP endpoint

pub mod batch;
pub mod compose;
pub mod config;
pub mod encode;
pub mod error;
pub mod font_loader;
pub mod fonts;
pub mod layout;
pub mod logging;
pub mod measure;
pub mod rasterize;
pub mod security;
pub mod server;
pub mod source;
pub mod wrap;

// Re-export commonly used types
pub use batch::{parse_batch_spec, BatchRunner, BatchSpec, JobResult};
pub use compose::{Compositor, QuoteRenderer, RasterSurface, RenderSettings};
pub use config::Config;
pub use encode::{Encoder, JpegEncoder};
pub use error::{Error, Result};
pub use fonts::{FontLibrary, FontSpec, FontWeight};
pub use layout::{DrawInstruction, LayoutBox, LayoutPlan, Quote};
pub use measure::TextMeasurer;
pub use rasterize::{GlyphPainter, TextPainter};
pub use source::{build_source, ImageSource, SourceImage};
pub use wrap::{wrap_text, LineWrapper};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
