// ============================================================================
// GPU MODULE — the halftone rendering pipeline
// ============================================================================
//
// Architecture:
//   context.rs   — wgpu Device, Queue, adapter init + float-texture gate
//   shaders.rs   — all WGSL shader source (inline strings)
//   passes.rs    — the two hot-swappable pass pipelines + uniform contracts
//   blit.rs      — fixed present/normalize programs for stage display
//   resources.rs — tile-size-keyed texture set, crop + SAT upload, readback
//   processor.rs — top-level HalftoneProcessor orchestrator
// ============================================================================

pub mod blit;
pub mod context;
pub mod passes;
pub mod processor;
pub mod resources;
pub mod shaders;

pub use context::GpuContext;
pub use processor::{HalftoneProcessor, render_halftone};
pub use shaders::ShaderSources;
