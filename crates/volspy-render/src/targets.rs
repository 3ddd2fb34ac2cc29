//! Offscreen render targets: the entry/exit ray bound maps and the pick texel.

use volspy_core::pick::PickReadback;

use crate::buffer::{create_readback_buffer, read_buffer};
use crate::error::RenderResult;

/// Format of the entry and exit maps (texture coordinates need more than 8 bits).
pub const RAY_MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Format of the single-texel pick target.
pub const PICK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// A texture with its default view.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    fn new(
        device: &wgpu::Device,
        label: &str,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Fixed-size offscreen targets owned by the renderer.
pub struct RayTargets {
    pub entry: RenderTarget,
    pub exit: RenderTarget,
    pub pick: RenderTarget,
    /// Nearest-neighbour sampler for reading the ray maps.
    pub map_sampler: wgpu::Sampler,
    pick_staging_buffer: wgpu::Buffer,
    size: (u32, u32),
}

impl RayTargets {
    /// Creates entry/exit maps of `size` and a 1x1 pick target.
    pub fn new(device: &wgpu::Device, size: (u32, u32)) -> Self {
        let map_usage =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let entry = RenderTarget::new(device, "Ray Entry Map", size, RAY_MAP_FORMAT, map_usage);
        let exit = RenderTarget::new(device, "Ray Exit Map", size, RAY_MAP_FORMAT, map_usage);
        let pick = RenderTarget::new(
            device,
            "Pick Texture",
            (1, 1),
            PICK_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        );

        let map_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Ray Map Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // Buffer size must be aligned to COPY_BYTES_PER_ROW_ALIGNMENT (256)
        let pick_staging_buffer = create_readback_buffer(
            device,
            wgpu::COPY_BYTES_PER_ROW_ALIGNMENT.into(),
            Some("Pick Staging Buffer"),
        );

        Self {
            entry,
            exit,
            pick,
            map_sampler,
            pick_staging_buffer,
            size,
        }
    }

    /// Size of the entry/exit maps.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Records a copy of the pick texel into the staging buffer.
    pub fn copy_pick_texel(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.pick.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.pick_staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Blocks until the copied pick texel is available and returns it.
    ///
    /// The commands recording [`Self::copy_pick_texel`] must already be submitted.
    pub fn read_pick_texel(&self, device: &wgpu::Device) -> RenderResult<PickReadback> {
        let data = read_buffer(device, &self.pick_staging_buffer)?;
        Ok(PickReadback([data[0], data[1], data[2], data[3]]))
    }
}
