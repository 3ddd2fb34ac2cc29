//! Headless rendering.
//!
//! Creates a GPU context without a window and renders a [`VolumeRenderer`]
//! frame into an offscreen texture. Useful for integration tests, batch
//! processing and automated snapshots.

use pollster::FutureExt;
use volspy_render::buffer::{create_readback_buffer, padded_bytes_per_row, read_buffer};
use volspy_render::{save_image, PixelLayout, ProgramKind, RenderResult, VolumeRenderer};

use crate::error::{FrameError, FrameResult};
use crate::Viewport;

/// Format of headless frames.
pub const FRAME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Requests an adapter and device without a surface, blocking on the futures.
pub fn headless_context() -> RenderResult<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..wgpu::InstanceDescriptor::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .block_on()?;

    let info = adapter.get_info();
    log::info!("headless adapter: {} ({:?})", info.name, info.backend);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("volspy device (headless)"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
        })
        .block_on()?;

    Ok((device, queue))
}

/// Creates an offscreen frame texture the renderer can draw into and copy from.
pub fn create_frame_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Headless Frame"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FRAME_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

/// Copies an RGBA8 texture back to the CPU as tightly packed rows.
pub fn read_frame(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> RenderResult<Vec<u8>> {
    let (width, height) = (texture.width(), texture.height());
    let padded_row = padded_bytes_per_row(width, 4);
    let buffer = create_readback_buffer(
        device,
        u64::from(padded_row) * u64::from(height),
        Some("Headless Frame Readback"),
    );

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Headless Frame Copy"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let padded = read_buffer(device, &buffer)?;
    let row = (width * 4) as usize;
    Ok(padded
        .chunks_exact(padded_row as usize)
        .flat_map(|r| &r[..row])
        .copied()
        .collect())
}

/// Renders one full-frame ray-cast or slice into a fresh `width`x`height`
/// texture and returns its RGBA pixels, row by row from the top-left.
pub fn render_volume_to_image(
    renderer: &mut VolumeRenderer,
    kind: ProgramKind,
    width: u32,
    height: u32,
) -> FrameResult<Vec<u8>> {
    let limit = renderer.device().limits().max_texture_dimension_2d;
    if width == 0 || height == 0 || width > limit || height > limit {
        return Err(FrameError::InvalidSize { width, height });
    }

    let texture = create_frame_texture(renderer.device(), width, height);
    let viewport = Viewport::full(width, height);
    match kind {
        ProgramKind::RayCast => {
            renderer.draw_volume(&texture, viewport, wgpu::ColorWrites::ALL, None, None)?;
        }
        ProgramKind::Slice => {
            renderer.draw_slice(&texture, viewport, wgpu::ColorWrites::ALL, None, None)?;
        }
    }

    let pixels = read_frame(renderer.device(), renderer.queue(), &texture)?;
    log::debug!("rendered {} frame {width}x{height}", kind.label());
    Ok(pixels)
}

/// Renders one frame like [`render_volume_to_image`] and saves it as PNG or JPEG.
pub fn render_volume_to_file(
    renderer: &mut VolumeRenderer,
    kind: ProgramKind,
    filename: impl AsRef<std::path::Path>,
    width: u32,
    height: u32,
) -> FrameResult<()> {
    let pixels = render_volume_to_image(renderer, kind, width, height)?;
    save_image(filename, &pixels, width, height, PixelLayout::Rgba)?;
    Ok(())
}
