// ============================================================================
// PASS PIPELINES — the two hot-swappable halftone passes
// ============================================================================
//
// Pass 1 renders the dot field into the offscreen float target; Pass 2
// samples that target and composites over the background color. Both are
// compiled from caller-supplied (or default) WGSL sources and can be
// replaced at runtime via `HalftoneProcessor::reload_shaders`.
//
// Everything program-generation-dependent — pipelines, bind group layouts,
// uniform buffers — lives in one `PassPipelines` struct that is built
// atomically and swapped wholesale, so handles from different generations
// can never be mixed.

use bytemuck::{Pod, Zeroable};

use super::context::{FLOAT_FORMAT, OUTPUT_FORMAT};
use super::shaders::ShaderSources;

/// Uniform block consumed by the Pass-1 fragment stage. Field order and
/// padding are the wire contract with replacement shader sources.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Pass1Uniforms {
    pub size: f32,
    pub size_p1: f32,
    pub step1: f32,
    pub step2: f32,
    pub area1: f32,
    pub area2: f32,
    pub radius_scale1: f32,
    pub radius_scale2: f32,
    pub field_scale: f32,
    pub blend_value: f32,
    pub offset2: f32,
    pub contrast: f32,
    pub contrast_only_luma: u32,
    pub neighbor_radius1: i32,
    pub neighbor_radius2: i32,
    pub _pad: u32,
}

/// Uniform block consumed by the Pass-2 fragment stage. The vec3 colors are
/// 16-byte aligned in WGSL, so each shares its slot with the following f32.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Pass2Uniforms {
    pub bg_color: [f32; 3],
    pub field_scale: f32,
    pub mono_color: [f32; 3],
    pub threshold: f32,
    pub soft: f32,
    pub soft_fineness: f32,
    pub use_color_blend: f32,
    pub luma_to_alpha: u32,
    pub luma_to_alpha_edge0: f32,
    pub luma_to_alpha_edge1: f32,
    pub _pad: [f32; 2],
}

/// Vertex layout of the shared full-screen quad: one vec2 clip-space
/// attribute at location 0 (`a_position`).
pub const QUAD_VERTEX_ATTRS: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![0 => Float32x2];

pub fn quad_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: 8,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &QUAD_VERTEX_ATTRS,
    }
}

/// One generation of compiled pass programs and their resolved handles.
pub struct PassPipelines {
    pub pass1: wgpu::RenderPipeline,
    pub pass2: wgpu::RenderPipeline,
    pub pass1_bgl: wgpu::BindGroupLayout,
    pub pass2_bgl: wgpu::BindGroupLayout,
    pub pass1_uniforms: wgpu::Buffer,
    pub pass2_uniforms: wgpu::Buffer,
}

impl PassPipelines {
    /// Compile both passes from `sources`. Returns `None` on any WGSL
    /// compile or pipeline validation error (caught via an error scope)
    /// without touching device state the caller still relies on — the
    /// caller keeps its previous generation on failure.
    pub fn compile(device: &wgpu::Device, sources: &ShaderSources) -> Option<Self> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let built = Self::build(device, sources);
        let error = pollster::block_on(device.pop_error_scope());
        if let Some(e) = error {
            eprintln!("[GPU] pass shader compile failed: {}", e);
            return None;
        }
        Some(built)
    }

    fn build(device: &wgpu::Device, sources: &ShaderSources) -> Self {
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("halftone_vertex"),
            source: wgpu::ShaderSource::Wgsl(sources.vertex.as_str().into()),
        });
        let fs1 = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("halftone_pass1_fs"),
            source: wgpu::ShaderSource::Wgsl(sources.fragment_pass1.as_str().into()),
        });
        let fs2 = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("halftone_pass2_fs"),
            source: wgpu::ShaderSource::Wgsl(sources.fragment_pass2.as_str().into()),
        });

        // Pass 1: uniforms + the SAT texture. The SAT is fetched with
        // textureLoad (exact integer lookups), so no sampler is bound.
        let pass1_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pass1_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        // Pass 2: uniforms + the Pass-1 float target + a nearest sampler.
        let pass2_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pass2_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let pass1_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pass1_pipeline_layout"),
            bind_group_layouts: &[&pass1_bgl],
            push_constant_ranges: &[],
        });
        let pass2_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pass2_pipeline_layout"),
            bind_group_layouts: &[&pass2_bgl],
            push_constant_ranges: &[],
        });

        let pass1 = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pass1_pipeline"),
            layout: Some(&pass1_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: "vs_main",
                buffers: &[quad_vertex_layout()],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fs1,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: FLOAT_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
        });

        let pass2 = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("pass2_pipeline"),
            layout: Some(&pass2_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: "vs_main",
                buffers: &[quad_vertex_layout()],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fs2,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: OUTPUT_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
        });

        let pass1_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pass1_uniform_buf"),
            size: std::mem::size_of::<Pass1Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let pass2_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pass2_uniform_buf"),
            size: std::mem::size_of::<Pass2Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pass1,
            pass2,
            pass1_bgl,
            pass2_bgl,
            pass1_uniforms,
            pass2_uniforms,
        }
    }

    /// Release the uniform buffers. Pipelines and layouts have no explicit
    /// destroy in wgpu; they are freed when the handles drop.
    pub fn destroy(&self) {
        self.pass1_uniforms.destroy();
        self.pass2_uniforms.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The WGSL uniform structs are 16-byte-aligned; a size drift here would
    // corrupt every uniform past the drift point.
    #[test]
    fn uniform_struct_sizes_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<Pass1Uniforms>(), 64);
        assert_eq!(std::mem::size_of::<Pass2Uniforms>(), 64);
    }
}
