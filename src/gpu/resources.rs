// ============================================================================
// TILE RESOURCES — GPU object set keyed by the current tile size
// ============================================================================
//
// Every texture the pipeline touches is owned here and sized from one
// number: the power-of-two tile size derived from the current image. When
// that number changes the whole set is destroyed and reallocated — objects
// are never partially resized. The CPU-side crop buffer and SAT scratch
// buffer persist across calls and only ever grow.

use crate::sat::build_sat_rgb_into;
use crate::source::{SourceImage, crop_centered_into};

use super::context::{FLOAT_FORMAT, GpuContext, OUTPUT_FORMAT};

pub struct TileResources {
    size: u32,
    sat_tex: Option<wgpu::Texture>,
    sat_view: Option<wgpu::TextureView>,
    pass1_tex: Option<wgpu::Texture>,
    pass1_view: Option<wgpu::TextureView>,
    source_tex: Option<wgpu::Texture>,
    source_view: Option<wgpu::TextureView>,
    output_tex: Option<wgpu::Texture>,
    output_view: Option<wgpu::TextureView>,
    /// Linear + clamp, for resampling the source crop.
    pub sampler_linear: wgpu::Sampler,
    /// Nearest + clamp, for exact lookups into the float textures.
    pub sampler_nearest: wgpu::Sampler,
    /// Centered square crop of the current image, tightly packed RGBA8.
    crop_pixels: Vec<u8>,
    /// Reused CPU staging for the SAT floats; grown, never shrunk.
    sat_scratch: Vec<f32>,
    /// Cached readback staging buffer (size, not contents, is reused).
    staging: Option<(wgpu::Buffer, u64)>,
}

impl TileResources {
    pub fn new(device: &wgpu::Device) -> Self {
        let clamp = wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        };
        let sampler_linear = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sampler_linear"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..clamp.clone()
        });
        let sampler_nearest = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sampler_nearest"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..clamp
        });

        Self {
            size: 0,
            sat_tex: None,
            sat_view: None,
            pass1_tex: None,
            pass1_view: None,
            source_tex: None,
            source_view: None,
            output_tex: None,
            output_view: None,
            sampler_linear,
            sampler_nearest,
            crop_pixels: Vec::new(),
            sat_scratch: Vec::new(),
            staging: None,
        }
    }

    /// Currently provisioned tile size, 0 before the first render.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Make the GPU object set consistent with `size`, idempotently: a
    /// matching size is a no-op, anything else tears down every texture and
    /// reallocates the full set. Returns false (with nothing allocated) when
    /// the device cannot provide the requested dimensions.
    pub fn ensure_size(&mut self, ctx: &GpuContext, size: u32) -> bool {
        if size == self.size && self.sat_tex.is_some() {
            return true;
        }
        self.destroy_textures();
        self.size = 0;

        let p1 = size + 1;
        if !ctx.supports_size(p1, p1) {
            eprintln!(
                "[GPU] tile size {} exceeds device limit {}",
                size, ctx.max_texture_dim
            );
            return false;
        }
        let device = &ctx.device;

        let tex_2d = |label: &str, dim: u32, format: wgpu::TextureFormat, usage| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: dim,
                    height: dim,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
        };

        // SAT: float, uploaded from the CPU, fetched with exact lookups.
        let sat_tex = tex_2d(
            "sat_tex",
            p1,
            FLOAT_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        // Pass-1 target: float render attachment, sampled by Pass 2.
        let pass1_tex = tex_2d(
            "pass1_tex",
            size,
            FLOAT_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        // Source crop: plain RGBA8, linear-sampled.
        let source_tex = tex_2d(
            "source_tex",
            size,
            OUTPUT_FORMAT,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        // Output surface: rendered into by Pass 2 / the blits, read back.
        let output_tex = tex_2d(
            "output_tex",
            size,
            OUTPUT_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );

        self.sat_view = Some(sat_tex.create_view(&wgpu::TextureViewDescriptor::default()));
        self.pass1_view = Some(pass1_tex.create_view(&wgpu::TextureViewDescriptor::default()));
        self.source_view = Some(source_tex.create_view(&wgpu::TextureViewDescriptor::default()));
        self.output_view = Some(output_tex.create_view(&wgpu::TextureViewDescriptor::default()));
        self.sat_tex = Some(sat_tex);
        self.pass1_tex = Some(pass1_tex);
        self.source_tex = Some(source_tex);
        self.output_tex = Some(output_tex);

        let sat_len = (p1 as usize) * (p1 as usize) * 4;
        if self.sat_scratch.len() < sat_len {
            self.sat_scratch.resize(sat_len, 0.0);
        }

        self.size = size;
        true
    }

    pub fn sat_view(&self) -> Option<&wgpu::TextureView> {
        self.sat_view.as_ref()
    }

    pub fn pass1_view(&self) -> Option<&wgpu::TextureView> {
        self.pass1_view.as_ref()
    }

    pub fn source_view(&self) -> Option<&wgpu::TextureView> {
        self.source_view.as_ref()
    }

    pub fn output_view(&self) -> Option<&wgpu::TextureView> {
        self.output_view.as_ref()
    }

    /// Refresh the CPU crop buffer with the centered square of `image`.
    pub fn ensure_source_crop(&mut self, image: &SourceImage) {
        crop_centered_into(image.pixels(), self.size, &mut self.crop_pixels);
    }

    /// Build the SAT from the current crop and upload it. Assumes
    /// `ensure_size` and `ensure_source_crop` have run for this tile size.
    pub fn rebuild_sat(&mut self, queue: &wgpu::Queue) {
        let size = self.size as usize;
        let p1 = size + 1;
        let sat_len = p1 * p1 * 4;
        build_sat_rgb_into(&self.crop_pixels, size, &mut self.sat_scratch[..sat_len]);

        let Some(sat_tex) = self.sat_tex.as_ref() else {
            return;
        };
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: sat_tex,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&self.sat_scratch[..sat_len]),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(p1 as u32 * 16),
                rows_per_image: Some(p1 as u32),
            },
            wgpu::Extent3d {
                width: p1 as u32,
                height: p1 as u32,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Upload the current crop to the source texture (source-stage display).
    pub fn upload_source(&self, queue: &wgpu::Queue) {
        let Some(source_tex) = self.source_tex.as_ref() else {
            return;
        };
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: source_tex,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &self.crop_pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.size * 4),
                rows_per_image: Some(self.size),
            },
            wgpu::Extent3d {
                width: self.size,
                height: self.size,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Read the output surface back as tightly packed RGBA bytes.
    pub fn readback_output(&mut self, ctx: &GpuContext) -> Option<Vec<u8>> {
        let output_tex = self.output_tex.as_ref()?;
        let device = &ctx.device;
        let size = self.size;

        let bytes_per_row = aligned_bytes_per_row(size);
        let buffer_size = (bytes_per_row * size) as u64;

        // Reuse the cached staging buffer when it is large enough.
        let need_new = match &self.staging {
            Some((_, sz)) if *sz >= buffer_size => false,
            _ => true,
        };
        if need_new {
            if let Some((old, _)) = self.staging.take() {
                old.destroy();
            }
            let new_buf = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("readback_staging"),
                size: buffer_size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.staging = Some((new_buf, buffer_size));
        }
        let staging = &self.staging.as_ref()?.0;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: output_tex,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(size),
                },
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
        ctx.submit_one(encoder);

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                eprintln!("[GPU] readback map error: {:?}", e);
                return None;
            }
            Err(e) => {
                eprintln!("[GPU] readback channel error: {:?}", e);
                return None;
            }
        }

        let mapped = slice.get_mapped_range();
        let tight_row = (size * 4) as usize;
        let mut result = Vec::with_capacity(tight_row * size as usize);
        for y in 0..size as usize {
            let start = y * bytes_per_row as usize;
            result.extend_from_slice(&mapped[start..start + tight_row]);
        }
        drop(mapped);
        staging.unmap();

        Some(result)
    }

    /// Destroy every tile-sized texture, views first. Idempotent.
    pub fn destroy_textures(&mut self) {
        self.sat_view = None;
        self.pass1_view = None;
        self.source_view = None;
        self.output_view = None;
        for tex in [
            self.sat_tex.take(),
            self.pass1_tex.take(),
            self.source_tex.take(),
            self.output_tex.take(),
        ]
        .into_iter()
        .flatten()
        {
            tex.destroy();
        }
    }

    /// Full teardown: textures plus the staging buffer. CPU buffers are
    /// plain Vecs and free with the struct.
    pub fn destroy(&mut self) {
        self.destroy_textures();
        if let Some((buf, _)) = self.staging.take() {
            buf.destroy();
        }
        self.size = 0;
    }
}

pub(crate) fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (unaligned + align - 1) / align * align
}
