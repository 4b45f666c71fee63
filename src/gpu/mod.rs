//! GPU plumbing: device setup, data textures, read-back, and the render passes.
//!
//! The passes in this module are owned and sequenced by [`FlowField`](crate::FlowField);
//! they are public so the programs can be inspected and reused, but nothing here keeps
//! frame state of its own.

#[cfg(feature = "egui")]
pub mod egui_integration;
pub mod field_view;
pub mod lines;
pub mod noise;
pub mod position_textures;
pub mod trace;

use glam::UVec2;
use wgpu::util::DeviceExt;

use crate::error::{FlowFieldError, Result};
use crate::shader_lib::FULLSCREEN_TRIANGLE;

pub use position_textures::{PositionSlot, PositionTextures};

/// Format of the noise field: one encoded angle per pixel.
pub const FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Uint;
/// Format of the position grids: encoded `(x, y)` per texel.
pub const POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Uint;

/// Adapter, device and queue.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Request an adapter (compatible with `surface` when given) and a device on it.
    pub async fn new(
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(FlowFieldError::NoAdapter)?;

        let info = adapter.get_info();
        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            "using GPU adapter"
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Flow Field Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    /// A context with no surface, for off-screen rendering and tests.
    pub async fn headless() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        Self::new(&instance, None).await
    }

    /// Largest 2D texture side the device accepts.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

/// Run `create` inside validation and out-of-memory error scopes.
pub(crate) fn guarded<T>(
    device: &wgpu::Device,
    what: &str,
    create: impl FnOnce() -> T,
) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    match validation.or(out_of_memory) {
        Some(error) => {
            tracing::error!(what, %error, "GPU allocation failed");
            Err(FlowFieldError::ResourceCreation {
                what: what.to_string(),
                reason: error.to_string(),
            })
        }
        None => Ok(value),
    }
}

/// A render-target texture that the passes also read and that can be copied out.
pub fn create_data_texture(
    device: &wgpu::Device,
    label: &str,
    size: UVec2,
    format: wgpu::TextureFormat,
) -> Result<wgpu::Texture> {
    guarded(device, label, || {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        })
    })
}

/// Vertex buffer with [`FULLSCREEN_TRIANGLE`].
pub fn create_fullscreen_triangle(device: &wgpu::Device) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Fullscreen Triangle"),
        contents: bytemuck::cast_slice(&FULLSCREEN_TRIANGLE),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

/// Bytes per row rounded up to the copy alignment.
pub(crate) fn padded_bytes_per_row(width: u32, bytes_per_texel: u32) -> u32 {
    let unpadded = width * bytes_per_texel;
    unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Copy a whole texture to the CPU, blocking until the GPU is done.
///
/// Rows come back tightly packed (`width * bytes_per_texel` bytes each).
pub fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    bytes_per_texel: u32,
) -> Result<Vec<u8>> {
    let width = texture.width();
    let height = texture.height();
    let row_bytes = width * bytes_per_texel;
    let padded_row = padded_bytes_per_row(width, bytes_per_texel);

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size: padded_row as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(FlowFieldError::BufferMapping(e.to_string())),
        Err(e) => return Err(FlowFieldError::BufferMapping(e.to_string())),
    }

    let mut out = Vec::with_capacity((row_bytes * height) as usize);
    {
        let data = slice.get_mapped_range();
        for row in data.chunks(padded_row as usize) {
            out.extend_from_slice(&row[..row_bytes as usize]);
        }
    }
    staging.unmap();
    Ok(out)
}

/// Begin a single-attachment render pass with no depth.
pub(crate) fn begin_color_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_rows() {
        assert_eq!(padded_bytes_per_row(1, 4), 256);
        assert_eq!(padded_bytes_per_row(64, 4), 256);
        assert_eq!(padded_bytes_per_row(65, 4), 512);
        assert_eq!(padded_bytes_per_row(128, 2), 256);
    }
}
