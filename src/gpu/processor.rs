// ============================================================================
// HALFTONE PROCESSOR — top-level pipeline orchestrator
// ============================================================================
//
// One render call walks the whole pipeline synchronously on the calling
// thread: derive the tile size → make the GPU object set match it → crop +
// build/reuse the SAT → run Pass 1 → either blit an intermediate buffer
// (debug stages) or run Pass 2 and read the composite back. The SAT rebuild
// is skipped when the same (image identity, tile size) pair was rendered by
// the previous call — the only memoized computation in the engine.
//
// Not safe for concurrent renders: GPU object identity and the cache key are
// mutated in place, which `&mut self` enforces.

use image::RgbaImage;

use crate::log_info;
use crate::params::{FIELD_SCALE, HalftoneParams, NEIGHBOR_SIZE, RenderStage, hex_to_rgb};
use crate::sat::{clamp_granularity, step_for, tile_exponent, tile_size_for};
use crate::source::SourceImage;

use super::context::GpuContext;
use super::passes::{Pass1Uniforms, Pass2Uniforms, PassPipelines};
use super::blit::BlitPipelines;
use super::resources::TileResources;

use wgpu::util::DeviceExt;

pub struct HalftoneProcessor {
    ctx: GpuContext,
    passes: PassPipelines,
    blits: BlitPipelines,
    quad: wgpu::Buffer,
    res: TileResources,
    last_image_id: Option<u64>,
    last_size: u32,
    disposed: bool,
}

impl HalftoneProcessor {
    /// Create a processor from the given pass sources. Returns `None` when
    /// no adapter with renderable float textures is available or when the
    /// supplied sources fail to compile.
    pub fn create(sources: &super::ShaderSources) -> Option<Self> {
        let ctx = GpuContext::new()?;
        let blits = BlitPipelines::new(&ctx.device);
        let passes = PassPipelines::compile(&ctx.device, sources)?;

        let quad = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad_buf"),
                contents: bytemuck::cast_slice::<f32, u8>(&[
                    -1.0, -1.0, 1.0, -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0, 1.0,
                ]),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let res = TileResources::new(&ctx.device);
        log_info!("halftone processor ready on {}", ctx.adapter_name);

        Some(Self {
            ctx,
            passes,
            blits,
            quad,
            res,
            last_image_id: None,
            last_size: 0,
            disposed: false,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.ctx.adapter_name
    }

    /// Whether the previous render call left a reusable SAT for this image.
    /// Exposed for tests; the render path applies the same check.
    pub fn sat_cached_for(&self, image: &SourceImage) -> bool {
        self.last_image_id == Some(image.id())
            && self.last_size == tile_size_for(image.width(), image.height())
    }

    /// Render one frame. Returns the presented surface as an RGBA image of
    /// `tile_size` × `tile_size`, or `None` for a zero-sized input or a
    /// resource failure.
    pub fn render(
        &mut self,
        image: &SourceImage,
        params: &HalftoneParams,
        stage: RenderStage,
    ) -> Option<RgbaImage> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }

        let size = tile_size_for(image.width(), image.height());
        let exp = tile_exponent(size);
        let n1 = clamp_granularity(params.n, exp);
        let n2 = clamp_granularity(params.n2, exp);
        let step1 = step_for(exp, n1);
        let step2 = step_for(exp, n2);

        if !self.res.ensure_size(&self.ctx, size) {
            self.last_image_id = None;
            return None;
        }

        let sat_cache_hit = self.last_image_id == Some(image.id()) && self.last_size == size;
        if !sat_cache_hit {
            self.res.ensure_source_crop(image);
            self.res.rebuild_sat(&self.ctx.queue);
            self.last_image_id = Some(image.id());
            self.last_size = size;
        }

        let device = &self.ctx.device;
        let queue = &self.ctx.queue;
        let output_view = self.res.output_view()?;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("halftone_encoder"),
        });

        match stage {
            RenderStage::Source => {
                self.res.upload_source(queue);
                self.blits.encode_plain(
                    device,
                    queue,
                    &mut encoder,
                    output_view,
                    self.res.source_view()?,
                    &self.res.sampler_linear,
                    &self.quad,
                    true,
                    false,
                );
            }
            RenderStage::Sat => {
                let scale = 1.0 / (size as f32 * size as f32 * 255.0);
                self.blits.encode_sat(
                    device,
                    queue,
                    &mut encoder,
                    output_view,
                    self.res.sat_view()?,
                    &self.res.sampler_nearest,
                    &self.quad,
                    scale,
                    false,
                );
            }
            RenderStage::Pass1 | RenderStage::Final => {
                self.encode_pass1(&mut encoder, params, size, step1, step2, n1, n2)?;
                if stage == RenderStage::Pass1 {
                    self.blits.encode_plain(
                        device,
                        queue,
                        &mut encoder,
                        output_view,
                        self.res.pass1_view()?,
                        &self.res.sampler_nearest,
                        &self.quad,
                        false,
                        false,
                    );
                } else {
                    self.encode_pass2(&mut encoder, params)?;
                }
            }
        }

        self.ctx.submit_one(encoder);

        let pixels = self.res.readback_output(&self.ctx)?;
        RgbaImage::from_raw(size, size, pixels)
    }

    fn encode_pass1(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        params: &HalftoneParams,
        size: u32,
        step1: u32,
        step2: u32,
        n1: u32,
        n2: u32,
    ) -> Option<()> {
        let gap = params.gap_percent / 100.0;
        let neighbor_radius = (NEIGHBOR_SIZE - 1) / 2;
        let radius_scale = |step: u32| params.base_scale * 1.5 * step as f32 * (1.0 - gap) * 0.5;

        let uniforms = Pass1Uniforms {
            size: size as f32,
            size_p1: (size + 1) as f32,
            step1: step1 as f32,
            step2: step2 as f32,
            area1: (step1 * step1) as f32 * 255.0,
            area2: (step2 * step2) as f32 * 255.0,
            radius_scale1: radius_scale(step1),
            radius_scale2: radius_scale(step2),
            field_scale: FIELD_SCALE,
            blend_value: params.blend_value,
            offset2: params.offset2,
            contrast: params.contrast,
            contrast_only_luma: params.contrast_only_luma as u32,
            // A single giant cell has no neighbors to blend.
            neighbor_radius1: if n1 == 0 { 0 } else { neighbor_radius },
            neighbor_radius2: if n2 == 0 { 0 } else { neighbor_radius },
            _pad: 0,
        };
        self.ctx
            .queue
            .write_buffer(&self.passes.pass1_uniforms, 0, bytemuck::bytes_of(&uniforms));

        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pass1_bg"),
            layout: &self.passes.pass1_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.passes.pass1_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(self.res.sat_view()?),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pass1"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.res.pass1_view()?,
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
        pass.set_pipeline(&self.passes.pass1);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..6, 0..1);
        drop(pass);

        Some(())
    }

    fn encode_pass2(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        params: &HalftoneParams,
    ) -> Option<()> {
        let bg = hex_to_rgb(&params.bg_color);
        let mono = hex_to_rgb(&params.mono_color);

        let uniforms = Pass2Uniforms {
            bg_color: bg,
            field_scale: FIELD_SCALE,
            mono_color: mono,
            threshold: params.threshold,
            soft: params.soft,
            soft_fineness: params.soft_fineness,
            use_color_blend: params.use_color_blend,
            luma_to_alpha: params.luma_to_alpha as u32,
            luma_to_alpha_edge0: params.luma_to_alpha_edge0,
            luma_to_alpha_edge1: params.luma_to_alpha_edge1,
            _pad: [0.0; 2],
        };
        self.ctx
            .queue
            .write_buffer(&self.passes.pass2_uniforms, 0, bytemuck::bytes_of(&uniforms));

        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pass2_bg"),
            layout: &self.passes.pass2_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.passes.pass2_uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(self.res.pass1_view()?),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.res.sampler_nearest),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pass2"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.res.output_view()?,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: bg[0] as f64,
                        g: bg[1] as f64,
                        b: bg[2] as f64,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.passes.pass2);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..6, 0..1);
        drop(pass);

        Some(())
    }

    /// Swap in replacement Pass-1/Pass-2 sources. The blit programs are
    /// fixed and unaffected. On any compile failure the previous pipelines
    /// stay active and this returns false; on success every resolved handle
    /// (pipelines, layouts, uniform buffers) is rebuilt against the new
    /// generation before the next render.
    pub fn reload_shaders(&mut self, sources: &super::ShaderSources) -> bool {
        match PassPipelines::compile(&self.ctx.device, sources) {
            Some(new_passes) => {
                self.passes.destroy();
                self.passes = new_passes;
                log_info!("pass shaders reloaded");
                true
            }
            None => {
                crate::log_warn!("shader reload failed; keeping previous programs");
                false
            }
        }
    }

    /// Tear down every GPU resource. Dropping the processor does the same;
    /// this form just makes the release point explicit.
    pub fn dispose(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.res.destroy();
        self.passes.destroy();
        self.blits.destroy();
        self.quad.destroy();
    }
}

impl Drop for HalftoneProcessor {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// One-shot convenience: create a processor, render the final stage once,
/// and tear everything down again.
pub fn render_halftone(
    image: &SourceImage,
    params: &HalftoneParams,
    sources: &super::ShaderSources,
) -> Option<RgbaImage> {
    let mut processor = HalftoneProcessor::create(sources)?;
    let result = processor.render(image, params, RenderStage::Final);
    processor.dispose();
    result
}
