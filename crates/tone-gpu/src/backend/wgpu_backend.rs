//! wgpu backend implementation.
//!
//! Two render pipelines (duotone, tritone) sharing one vertex stage. The
//! visible surface is an offscreen RGBA8 texture the host presents or
//! copies; wgpu's framebuffer origin is top-left, so readbacks are
//! [`RowOrder::TopDown`].

use std::collections::HashMap;
use std::sync::Arc;

use tone_core::{flip_rows, RowOrder, Size, SourceImage, ToneConfig, ToneMode};
use tracing::{debug, trace};
use wgpu::util::DeviceExt;

use super::{RenderBackend, RenderLimits, Target, TargetId};
use crate::shaders;
use crate::uniforms::{DrawUniforms, DuotoneUniform, GeometryUniform, TritoneUniform};
use crate::{RenderError, RenderResult};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// =============================================================================
// Resources
// =============================================================================

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: Size,
}

impl GpuTexture {
    fn new(device: &wgpu::Device, size: Size, usage: wgpu::TextureUsages, label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view, size }
    }

    fn render_target(device: &wgpu::Device, size: Size, label: &str) -> Self {
        Self::new(
            device,
            size,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::TEXTURE_BINDING,
            label,
        )
    }
}

fn extent(size: Size) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}

struct Pipelines {
    duotone: wgpu::RenderPipeline,
    tritone: wgpu::RenderPipeline,
}

impl Pipelines {
    fn get(&self, mode: ToneMode) -> &wgpu::RenderPipeline {
        match mode {
            ToneMode::Duotone => &self.duotone,
            ToneMode::Tritone => &self.tritone,
        }
    }
}

// =============================================================================
// WgpuBackend
// =============================================================================

/// wgpu implementation of [`RenderBackend`].
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipelines: Pipelines,
    sampler: wgpu::Sampler,
    limits: RenderLimits,
    texture: Option<GpuTexture>,
    surface: Option<GpuTexture>,
    targets: HashMap<TargetId, GpuTexture>,
    next_id: u64,
}

impl WgpuBackend {
    /// True if an adapter can be found on this machine.
    pub fn is_available() -> bool {
        pollster::block_on(find_adapter()).is_some()
    }

    /// Creates a backend on the preferred adapter, blocking.
    pub fn new() -> RenderResult<Self> {
        pollster::block_on(Self::new_async())
    }

    /// Creates a backend on the preferred adapter.
    pub async fn new_async() -> RenderResult<Self> {
        let adapter = find_adapter().await.ok_or(RenderError::NoAdapter)?;

        let adapter_limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("tone_gpu_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter_limits.clone()),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            }, None)
            .await
            .map_err(|e| RenderError::DeviceCreation(e.to_string()))?;

        let info = adapter.get_info();
        debug!(adapter = %info.name, backend = ?info.backend, "wgpu device created");

        let limits = RenderLimits {
            max_texture_dim: device.limits().max_texture_dimension_2d,
            available_memory: memory_budget(&info, adapter_limits.max_buffer_size),
        };

        let pipelines = Pipelines {
            duotone: create_pipeline(&device, ToneMode::Duotone),
            tritone: create_pipeline(&device, ToneMode::Tritone),
        };

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("source_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            pipelines,
            sampler,
            limits,
            texture: None,
            surface: None,
            targets: HashMap::new(),
            next_id: 1,
        })
    }

    /// Texture backing the visible surface, for presentation by the host.
    pub fn surface_texture(&self) -> Option<&wgpu::Texture> {
        self.surface.as_ref().map(|s| &s.texture)
    }

    /// Device shared with the host.
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Queue shared with the host.
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    fn target_texture(&self, target: Target) -> RenderResult<&GpuTexture> {
        match target {
            Target::Surface => self
                .surface
                .as_ref()
                .ok_or_else(|| RenderError::OperationFailed("surface not configured".into())),
            Target::Offscreen(id) => self.targets.get(&id).ok_or(RenderError::UnknownTarget(id)),
        }
    }

    fn params_buffer(&self, config: &ToneConfig) -> wgpu::Buffer {
        let contents = match config {
            ToneConfig::Duotone(p) => bytemuck::bytes_of(&DuotoneUniform::from(p)).to_vec(),
            ToneConfig::Tritone(p) => bytemuck::bytes_of(&TritoneUniform::from(p)).to_vec(),
        };
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tone_params_uniform"),
            contents: &contents,
            usage: wgpu::BufferUsages::UNIFORM,
        })
    }
}

fn create_pipeline(device: &wgpu::Device, mode: ToneMode) -> wgpu::RenderPipeline {
    let label = format!("{mode}_pipeline");
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&label),
        source: wgpu::ShaderSource::Wgsl(shaders::program_source(mode).into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: None, // Auto layout
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        multiview: None,
        cache: None,
    })
}

impl RenderBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn limits(&self) -> &RenderLimits {
        &self.limits
    }

    fn readback_order(&self) -> RowOrder {
        RowOrder::TopDown
    }

    fn upload_texture(&mut self, image: &SourceImage, flip_y: bool) -> RenderResult<()> {
        let size = image.size();
        self.limits.check(size)?;

        let flipped;
        let data = if flip_y {
            flipped = flip_rows(image.pixels(), size.width, size.height, 4)?;
            &flipped[..]
        } else {
            image.pixels()
        };

        let tex = GpuTexture::new(
            &self.device,
            size,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            "source_texture",
        );
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            extent(size),
        );

        // Replaced wholesale; the old texture drops here.
        self.texture = Some(tex);
        debug!(%size, flip_y, "texture uploaded");
        Ok(())
    }

    fn release_texture(&mut self) {
        if let Some(tex) = self.texture.take() {
            tex.texture.destroy();
            debug!("texture released");
        }
    }

    fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    fn configure_surface(&mut self, size: Size) -> RenderResult<()> {
        self.limits.check(size)?;
        if self.surface.as_ref().map(|s| s.size) != Some(size) {
            if let Some(old) = self.surface.take() {
                old.texture.destroy();
            }
            self.surface = Some(GpuTexture::render_target(&self.device, size, "surface"));
        }
        Ok(())
    }

    fn surface_size(&self) -> Option<Size> {
        self.surface.as_ref().map(|s| s.size)
    }

    fn create_target(&mut self, size: Size) -> RenderResult<TargetId> {
        self.limits.check(size)?;
        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.targets.insert(id, GpuTexture::render_target(&self.device, size, "offscreen_target"));
        debug!(%id, %size, "target created");
        Ok(id)
    }

    fn destroy_target(&mut self, id: TargetId) {
        if let Some(t) = self.targets.remove(&id) {
            t.texture.destroy();
            debug!(%id, "target destroyed");
        }
    }

    fn target_count(&self) -> usize {
        self.targets.len()
    }

    fn draw(&mut self, target: Target, uniforms: &DrawUniforms) -> RenderResult<()> {
        let source = self.texture.as_ref().ok_or(RenderError::NoTexture)?;
        let dst = self.target_texture(target)?;
        trace!(?target, mode = %uniforms.mode(), size = %dst.size, "wgpu draw");

        let geometry = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("geometry_uniform"),
            contents: bytemuck::bytes_of(&GeometryUniform::from(uniforms)),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let params = self.params_buffer(&uniforms.config);

        let pipeline = self.pipelines.get(uniforms.mode());
        let layout = pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tone_bind_group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&source.view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&self.sampler) },
                wgpu::BindGroupEntry { binding: 2, resource: geometry.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: params.as_entire_binding() },
            ],
        });

        let vp_w = uniforms.viewport.width.min(dst.size.width);
        let vp_h = uniforms.viewport.height.min(dst.size.height);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("draw_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tone_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &dst.view,
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
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_viewport(0.0, 0.0, vp_w as f32, vp_h as f32, 0.0, 1.0);
            pass.draw(0..6, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn read_pixels(&mut self, target: Target) -> RenderResult<Vec<u8>> {
        let src = self.target_texture(target)?;
        let Size { width, height } = src.size;

        let unpadded = 4 * width;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback_encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &src.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            extent(src.size),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        // Map and read
        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| { let _ = tx.send(r); });
        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| RenderError::OperationFailed("Map channel closed".into()))?
            .map_err(|e| RenderError::OperationFailed(format!("Map failed: {e}")))?;

        let mapped = slice.get_mapped_range();
        let mut out = Vec::with_capacity((unpadded * height) as usize);
        for row in mapped.chunks_exact(padded as usize) {
            out.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(mapped);
        staging.unmap();

        Ok(out)
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        self.release_texture();
        if let Some(surface) = self.surface.take() {
            surface.texture.destroy();
        }
        for (_, t) in self.targets.drain() {
            t.texture.destroy();
        }
    }
}

/// Environment override for [`memory_budget`], in MiB.
const MEMORY_ENV: &str = "TONE_GPU_MEMORY_MB";

async fn find_adapter() -> Option<wgpu::Adapter> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..Default::default()
        })
        .await
}

/// Bytes of texture memory the backend may allocate.
///
/// wgpu does not report VRAM; the largest buffer an adapter accepts is the
/// closest proxy. Integrated and software adapters share system memory and
/// get a smaller ceiling.
fn memory_budget(info: &wgpu::AdapterInfo, max_buffer_size: u64) -> u64 {
    if let Some(mib) = std::env::var(MEMORY_ENV).ok().and_then(|v| v.trim().parse::<u64>().ok()) {
        return mib << 20;
    }
    let ceiling: u64 = match info.device_type {
        wgpu::DeviceType::DiscreteGpu | wgpu::DeviceType::VirtualGpu => 8 << 30,
        _ => 2 << 30,
    };
    max_buffer_size.clamp(256 << 20, ceiling)
}
