// ============================================================================
// BLIT STAGE — fixed programs that present a texture on the output surface
// ============================================================================
//
// Two WGSL programs (plain copy and SAT-normalizing copy), created once at
// processor construction and never hot-reloaded. WebGPU samplers are
// pipeline-visible state rather than per-texture state, so the plain copy
// exists as two pipeline flavors over the same source: a filtering one for
// the Rgba8Unorm source texture (linear) and a non-filtering one for the
// float Pass-1 target (nearest).

use bytemuck::{Pod, Zeroable};

use super::context::OUTPUT_FORMAT;
use super::passes::quad_vertex_layout;
use super::shaders;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct BlitUniforms {
    flip_y: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct BlitSatUniforms {
    scale: f32,
    flip_y: f32,
    _pad: [f32; 2],
}

pub struct BlitPipelines {
    plain_filtered: wgpu::RenderPipeline,
    plain_raw: wgpu::RenderPipeline,
    sat: wgpu::RenderPipeline,
    bgl_filtered: wgpu::BindGroupLayout,
    bgl_raw: wgpu::BindGroupLayout,
    bgl_sat: wgpu::BindGroupLayout,
    blit_uniforms: wgpu::Buffer,
    sat_uniforms: wgpu::Buffer,
}

impl BlitPipelines {
    pub fn new(device: &wgpu::Device) -> Self {
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::BLIT_SHADER.into()),
        });
        let sat_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit_sat_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::BLIT_SAT_SHADER.into()),
        });

        let bgl_filtered = Self::bind_group_layout(device, "blit_bgl_filtered", true);
        let bgl_raw = Self::bind_group_layout(device, "blit_bgl_raw", false);
        let bgl_sat = Self::bind_group_layout(device, "blit_sat_bgl", false);

        let plain_filtered =
            Self::pipeline(device, "blit_filtered_pipeline", &blit_shader, &bgl_filtered);
        let plain_raw = Self::pipeline(device, "blit_raw_pipeline", &blit_shader, &bgl_raw);
        let sat = Self::pipeline(device, "blit_sat_pipeline", &sat_shader, &bgl_sat);

        let blit_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("blit_uniform_buf"),
            size: std::mem::size_of::<BlitUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sat_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("blit_sat_uniform_buf"),
            size: std::mem::size_of::<BlitSatUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            plain_filtered,
            plain_raw,
            sat,
            bgl_filtered,
            bgl_raw,
            bgl_sat,
            blit_uniforms,
            sat_uniforms,
        }
    }

    fn bind_group_layout(
        device: &wgpu::Device,
        label: &str,
        filtered: bool,
    ) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
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
                        sample_type: wgpu::TextureSampleType::Float {
                            filterable: filtered,
                        },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(if filtered {
                        wgpu::SamplerBindingType::Filtering
                    } else {
                        wgpu::SamplerBindingType::NonFiltering
                    }),
                    count: None,
                },
            ],
        })
    }

    fn pipeline(
        device: &wgpu::Device,
        label: &str,
        shader: &wgpu::ShaderModule,
        bgl: &wgpu::BindGroupLayout,
    ) -> wgpu::RenderPipeline {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[bgl],
            push_constant_ranges: &[],
        });
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: shader,
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
                module: shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: OUTPUT_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
        })
    }

    /// Copy `tex` to `target`. `filtered` picks the pipeline flavor and must
    /// match the sampler: true for the linear-sampled source texture, false
    /// for float textures with the nearest sampler.
    #[allow(clippy::too_many_arguments)]
    pub fn encode_plain(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        tex: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        quad: &wgpu::Buffer,
        filtered: bool,
        flip_y: bool,
    ) {
        let uniforms = BlitUniforms {
            flip_y: if flip_y { 1.0 } else { 0.0 },
            _pad: [0.0; 3],
        };
        queue.write_buffer(&self.blit_uniforms, 0, bytemuck::bytes_of(&uniforms));

        let (pipeline, bgl) = if filtered {
            (&self.plain_filtered, &self.bgl_filtered)
        } else {
            (&self.plain_raw, &self.bgl_raw)
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit_bg"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.blit_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(tex),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Self::draw(encoder, "blit_pass", target, pipeline, &bind_group, quad);
    }

    /// Copy the float SAT to `target`, scaling its raw prefix-sum magnitudes
    /// by `scale` into displayable [0,1] range.
    #[allow(clippy::too_many_arguments)]
    pub fn encode_sat(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        tex: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        quad: &wgpu::Buffer,
        scale: f32,
        flip_y: bool,
    ) {
        let uniforms = BlitSatUniforms {
            scale,
            flip_y: if flip_y { 1.0 } else { 0.0 },
            _pad: [0.0; 2],
        };
        queue.write_buffer(&self.sat_uniforms, 0, bytemuck::bytes_of(&uniforms));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blit_sat_bg"),
            layout: &self.bgl_sat,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.sat_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(tex),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        Self::draw(encoder, "blit_sat_pass", target, &self.sat, &bind_group, quad);
    }

    fn draw(
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        target: &wgpu::TextureView,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        quad: &wgpu::Buffer,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, quad.slice(..));
        pass.draw(0..6, 0..1);
    }

    /// Release the uniform buffers.
    pub fn destroy(&self) {
        self.blit_uniforms.destroy();
        self.sat_uniforms.destroy();
    }
}
