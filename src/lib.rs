//! Halftone — a GPU halftone effect engine.
//!
//! An input photograph is cropped to a power-of-two tile, summarized into a
//! CPU summed-area table, and turned into a field of size-modulated dots by
//! a two-pass wgpu pipeline. See [`gpu::HalftoneProcessor`] for the engine
//! surface and [`cli`] for the headless front end.

pub mod cli;
pub mod gpu;
pub mod logger;
pub mod params;
pub mod sat;
pub mod source;

pub use gpu::{HalftoneProcessor, ShaderSources, render_halftone};
pub use params::{HalftoneParams, RenderStage};
pub use source::SourceImage;
