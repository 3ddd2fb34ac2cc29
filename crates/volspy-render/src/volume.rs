//! Volume data and its 3D texture.

use half::f16;
use volspy_core::error::VolspyError;
use volspy_core::options::Interpolation;

use crate::error::{RenderError, RenderResult};

/// Voxel samples, channel-interleaved, x fastest then y then z.
#[derive(Debug, Clone, PartialEq)]
pub enum VolumeSamples {
    /// Normalized 8-bit samples.
    U8(Vec<u8>),
    /// Float samples, uploaded as 16-bit floats.
    F32(Vec<f32>),
}

impl VolumeSamples {
    pub fn len(&self) -> usize {
        match self {
            Self::U8(data) => data.len(),
            Self::F32(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A 3D grid of 1 to 4 channel samples.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeData {
    dims: [u32; 3],
    channels: u32,
    samples: VolumeSamples,
}

impl VolumeData {
    /// Validates the channel count and sample length against `dims`.
    pub fn new(dims: [u32; 3], channels: u32, samples: VolumeSamples) -> RenderResult<Self> {
        if !(1..=4).contains(&channels) {
            return Err(VolspyError::InvalidChannelCount(channels).into());
        }
        if dims.contains(&0) {
            return Err(VolspyError::InvalidVolumeDims(dims).into());
        }
        let expected = dims.iter().map(|&d| d as usize).product::<usize>() * channels as usize;
        if samples.len() != expected {
            return Err(VolspyError::SizeMismatch {
                expected,
                actual: samples.len(),
            }
            .into());
        }
        Ok(Self {
            dims,
            channels,
            samples,
        })
    }

    pub fn from_u8(dims: [u32; 3], channels: u32, data: Vec<u8>) -> RenderResult<Self> {
        Self::new(dims, channels, VolumeSamples::U8(data))
    }

    pub fn from_f32(dims: [u32; 3], channels: u32, data: Vec<f32>) -> RenderResult<Self> {
        Self::new(dims, channels, VolumeSamples::F32(data))
    }

    pub fn dims(&self) -> [u32; 3] {
        self.dims
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn samples(&self) -> &VolumeSamples {
        &self.samples
    }

    /// Channels stored per texel on the GPU; three channels are padded to four.
    pub fn texel_channels(&self) -> u32 {
        if self.channels == 3 {
            4
        } else {
            self.channels
        }
    }

    /// Texture format matching the sample type and channel count.
    pub fn texture_format(&self) -> wgpu::TextureFormat {
        use wgpu::TextureFormat as F;
        match (&self.samples, self.texel_channels()) {
            (VolumeSamples::U8(_), 1) => F::R8Unorm,
            (VolumeSamples::U8(_), 2) => F::Rg8Unorm,
            (VolumeSamples::U8(_), _) => F::Rgba8Unorm,
            (VolumeSamples::F32(_), 1) => F::R16Float,
            (VolumeSamples::F32(_), 2) => F::Rg16Float,
            (VolumeSamples::F32(_), _) => F::Rgba16Float,
        }
    }

    fn bytes_per_texel(&self) -> u32 {
        let component = match self.samples {
            VolumeSamples::U8(_) => 1,
            VolumeSamples::F32(_) => 2,
        };
        component * self.texel_channels()
    }

    /// Texel bytes in upload order.
    fn texel_bytes(&self) -> Vec<u8> {
        let pad = self.channels == 3;
        match &self.samples {
            VolumeSamples::U8(data) if pad => data
                .chunks_exact(3)
                .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], u8::MAX])
                .collect(),
            VolumeSamples::U8(data) => data.clone(),
            VolumeSamples::F32(data) => {
                let halves: Vec<f16> = if pad {
                    data.chunks_exact(3)
                        .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 1.0])
                        .map(f16::from_f32)
                        .collect()
                } else {
                    data.iter().copied().map(f16::from_f32).collect()
                };
                bytemuck::cast_slice(&halves).to_vec()
            }
        }
    }
}

/// A volume uploaded as a sampled 3D texture.
pub struct VolumeTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    dims: [u32; 3],
    channels: u32,
}

impl VolumeTexture {
    /// Uploads `data` into a new 3D texture.
    ///
    /// Fails when a dimension exceeds the device's 3D texture limit.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &VolumeData,
    ) -> RenderResult<Self> {
        check_texture_dims(data.dims(), device.limits().max_texture_dimension_3d)?;
        let [width, height, depth] = data.dims();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: depth,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Volume Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: data.texture_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data.texel_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * data.bytes_per_texel()),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Volume Texture View"),
            dimension: Some(wgpu::TextureViewDimension::D3),
            ..Default::default()
        });

        log::debug!(
            "uploaded {}x{}x{} volume with {} channel(s) as {:?}",
            width,
            height,
            depth,
            data.channels(),
            data.texture_format()
        );

        Ok(Self {
            texture,
            view,
            dims: data.dims(),
            channels: data.channels(),
        })
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn dims(&self) -> [u32; 3] {
        self.dims
    }

    /// Channel count of the source data (before padding).
    pub fn channels(&self) -> u32 {
        self.channels
    }
}

fn check_texture_dims(dims: [u32; 3], limit: u32) -> RenderResult<()> {
    if dims.iter().any(|&d| d > limit) {
        return Err(RenderError::TextureCreationFailed(format!(
            "volume {dims:?} exceeds the 3D texture limit of {limit}"
        )));
    }
    Ok(())
}

/// Clamp-to-edge sampler with the requested filtering.
pub fn create_volume_sampler(device: &wgpu::Device, interpolation: Interpolation) -> wgpu::Sampler {
    let filter = match interpolation {
        Interpolation::Nearest => wgpu::FilterMode::Nearest,
        Interpolation::Linear => wgpu::FilterMode::Linear,
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Volume Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats() {
        let one = VolumeData::from_u8([2, 2, 2], 1, vec![0; 8]).unwrap();
        assert_eq!(one.texture_format(), wgpu::TextureFormat::R8Unorm);
        assert_eq!(one.bytes_per_texel(), 1);

        let three = VolumeData::from_f32([2, 1, 1], 3, vec![0.5; 6]).unwrap();
        assert_eq!(three.texel_channels(), 4);
        assert_eq!(three.texture_format(), wgpu::TextureFormat::Rgba16Float);
        assert_eq!(three.bytes_per_texel(), 8);

        let two = VolumeData::from_f32([1, 1, 1], 2, vec![0.0; 2]).unwrap();
        assert_eq!(two.texture_format(), wgpu::TextureFormat::Rg16Float);
    }

    #[test]
    fn test_three_channels_are_padded() {
        let data = VolumeData::from_u8([2, 1, 1], 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(data.texel_bytes(), vec![1, 2, 3, 255, 4, 5, 6, 255]);

        let floats = VolumeData::from_f32([1, 1, 1], 3, vec![0.25, 0.5, 2.0]).unwrap();
        let halves: Vec<f16> = floats
            .texel_bytes()
            .chunks_exact(2)
            .map(|b| f16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(halves.len(), 4);
        assert_eq!(halves[1].to_f32(), 0.5);
        assert_eq!(halves[3].to_f32(), 1.0);
    }

    #[test]
    fn test_invalid_volume() {
        assert!(matches!(
            VolumeData::from_u8([2, 2, 2], 5, vec![0; 40]),
            Err(RenderError::Core(VolspyError::InvalidChannelCount(5)))
        ));
        assert!(matches!(
            VolumeData::from_u8([2, 2, 2], 1, vec![0; 7]),
            Err(RenderError::Core(VolspyError::SizeMismatch {
                expected: 8,
                actual: 7
            }))
        ));
        assert!(matches!(
            VolumeData::from_u8([4, 0, 4], 1, vec![]),
            Err(RenderError::Core(VolspyError::InvalidVolumeDims([4, 0, 4])))
        ));
    }

    #[test]
    fn test_texture_dims_limit() {
        assert!(check_texture_dims([256, 256, 64], 256).is_ok());
        assert!(matches!(
            check_texture_dims([16, 16, 257], 256),
            Err(RenderError::TextureCreationFailed(msg)) if msg.contains("257")
        ));
    }
}
