// ============================================================================
// GPU CONTEXT — wgpu Device, Queue, and adapter initialization
// ============================================================================

use std::sync::Arc;

/// Texture format of the SAT table and the Pass-1 target. The whole pipeline
/// hinges on this format being renderable, which is checked at construction.
pub const FLOAT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Format of the output surface the final composite is rendered into and
/// read back from.
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Holds the core wgpu resources shared by the halftone processor.
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_name: String,
    /// Maximum texture dimension supported by this device.
    pub max_texture_dim: u32,
}

impl GpuContext {
    /// Attempt to create a GPU context. Tries hardware first, then falls
    /// back to a software rasterizer (`force_fallback_adapter`) so rendering
    /// still works without a real GPU.
    ///
    /// Returns `None` when no adapter is available or when the adapter
    /// cannot render into float textures — the pipeline writes its dot field
    /// into an `Rgba32Float` attachment, so that capability is a hard
    /// precondition, not something the render path can recover from.
    pub fn new() -> Option<Self> {
        if let Some(ctx) = pollster::block_on(Self::new_async(false)) {
            return Some(ctx);
        }
        eprintln!("[GPU] Hardware adapter unavailable — trying software fallback");
        pollster::block_on(Self::new_async(true))
    }

    async fn new_async(force_fallback: bool) -> Option<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None, // headless — offscreen targets only
                force_fallback_adapter: force_fallback,
            })
            .await?;

        // Float-texture capability gate.
        let float_features = adapter.get_texture_format_features(FLOAT_FORMAT);
        if !float_features
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        {
            eprintln!("[GPU] Adapter cannot render to Rgba32Float — unsupported environment");
            return None;
        }

        let adapter_name = adapter.get_info().name.clone();
        let limits = adapter.limits();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("halftone GPU"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits {
                        max_texture_dimension_2d: limits.max_texture_dimension_2d,
                        ..wgpu::Limits::downlevel_defaults()
                    },
                },
                None,
            )
            .await
            .ok()?;

        Some(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name,
            max_texture_dim: limits.max_texture_dimension_2d,
        })
    }

    /// Check if a texture of the given dimensions can be created.
    pub fn supports_size(&self, width: u32, height: u32) -> bool {
        width <= self.max_texture_dim && height <= self.max_texture_dim
    }

    /// Submit a single encoder's commands.
    pub fn submit_one(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}
