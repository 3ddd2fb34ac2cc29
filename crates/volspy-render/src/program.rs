//! Volume programs: a compiled slice or ray-cast shader with its uniforms.
//!
//! Each program owns a uniform buffer mirroring its [`UniformBlock`] and lazily
//! builds one pipeline per (target format, color mask) pair it is drawn with.

use std::collections::HashMap;

use volspy_core::error::Result;
use volspy_core::pick::Viewport;
use volspy_core::shader_parts::ShaderParts;
use volspy_core::uniforms::{UniformBlock, UniformLayout, UniformValue};

use crate::buffer::create_uniform_buffer_bytes;
use crate::error::RenderResult;
use crate::shader::{ProgramKind, ShaderBuilder};
use crate::targets::RayTargets;
use crate::volume::VolumeTexture;

/// Bind group layouts shared by every volume program.
pub struct VolumeBindGroupLayouts {
    /// Group 0: uniforms, volume texture and sampler, ray maps and their sampler.
    pub volume: wgpu::BindGroupLayout,
    /// Group 1: the quad window.
    pub window: wgpu::BindGroupLayout,
}

impl VolumeBindGroupLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let texture_entry = |binding: u32, view_dimension: wgpu::TextureViewDimension| {
            wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension,
                    multisampled: false,
                },
                count: None,
            }
        };
        let sampler_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };
        let uniform_entry = |visibility: wgpu::ShaderStages| wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let volume = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Volume Program Bind Group Layout"),
            entries: &[
                uniform_entry(wgpu::ShaderStages::FRAGMENT),
                texture_entry(1, wgpu::TextureViewDimension::D3),
                sampler_entry(2),
                texture_entry(3, wgpu::TextureViewDimension::D2),
                texture_entry(4, wgpu::TextureViewDimension::D2),
                sampler_entry(5),
            ],
        });

        let window = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Quad Window Bind Group Layout"),
            entries: &[uniform_entry(wgpu::ShaderStages::VERTEX)],
        });

        Self { volume, window }
    }
}

/// Resources every volume program samples.
pub struct ProgramInputs<'a> {
    pub volume: &'a VolumeTexture,
    pub volume_sampler: &'a wgpu::Sampler,
    pub targets: &'a RayTargets,
}

/// How a program pass treats the existing target contents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetLoad {
    /// Clear to opaque black first.
    Clear,
    /// Keep the contents (channels masked out of the pass survive).
    Keep,
}

/// A compiled slice or ray-cast program.
pub struct VolumeProgram {
    kind: ProgramKind,
    uniforms: UniformBlock,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    shader_module: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<(wgpu::TextureFormat, wgpu::ColorWrites), wgpu::RenderPipeline>,
}

impl VolumeProgram {
    /// Assembles, compiles and binds a program for `parts`.
    pub fn new(
        device: &wgpu::Device,
        kind: ProgramKind,
        parts: &ShaderParts,
        max_steps: u32,
        layouts: &VolumeBindGroupLayouts,
        inputs: &ProgramInputs<'_>,
    ) -> RenderResult<Self> {
        let layout = UniformLayout::new(&parts.uniforms)?;
        let shader_module = ShaderBuilder::volume(kind, parts, &layout, max_steps)?.build_module(device)?;

        let uniforms = UniformBlock::new(layout);
        let uniform_buffer = create_uniform_buffer_bytes(
            device,
            uniforms.bytes(),
            Some("Volume Program Uniform Buffer"),
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kind.label()),
            layout: &layouts.volume,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(inputs.volume.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(inputs.volume_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&inputs.targets.entry.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&inputs.targets.exit.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&inputs.targets.map_sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Volume Program Pipeline Layout"),
            bind_group_layouts: &[&layouts.volume, &layouts.window],
            push_constant_ranges: &[],
        });

        Ok(Self {
            kind,
            uniforms,
            uniform_buffer,
            bind_group,
            shader_module,
            pipeline_layout,
            pipelines: HashMap::new(),
        })
    }

    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    pub fn uniforms(&self) -> &UniformBlock {
        &self.uniforms
    }

    /// Whether the program declares the uniform `name`.
    pub fn declares(&self, name: &str) -> bool {
        self.uniforms.contains(name)
    }

    /// Updates the CPU copy of a uniform; uploaded before the next draw.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<()> {
        self.uniforms.set(name, value)
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name)
    }

    /// Uploads the uniform block if it changed.
    pub fn flush(&mut self, queue: &wgpu::Queue) {
        if self.uniforms.take_dirty() {
            queue.write_buffer(&self.uniform_buffer, 0, self.uniforms.bytes());
        }
    }

    /// Number of cached pipelines.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    fn ensure_pipeline(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        color_mask: wgpu::ColorWrites,
    ) {
        let key = (format, color_mask);
        if self.pipelines.contains_key(&key) {
            return;
        }
        log::debug!(
            "creating {} pipeline for {format:?} with mask {color_mask:?}",
            self.kind.label()
        );
        let pipeline = create_volume_pipeline(
            device,
            &self.pipeline_layout,
            &self.shader_module,
            self.kind,
            format,
            color_mask,
        );
        self.pipelines.insert(key, pipeline);
    }

    /// Uploads pending uniforms and records a full-quad pass into `target`.
    ///
    /// `viewport` limits rasterization to a sub-rectangle; `None` covers the
    /// whole target. `window` selects the quad's texture-coordinate window.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        color_mask: wgpu::ColorWrites,
        viewport: Option<Viewport>,
        window: &wgpu::BindGroup,
        load: TargetLoad,
    ) {
        self.ensure_pipeline(device, format, color_mask);
        self.flush(queue);

        let Some(pipeline) = self.pipelines.get(&(format, color_mask)) else {
            return;
        };

        let load = match load {
            TargetLoad::Clear => wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            TargetLoad::Keep => wgpu::LoadOp::Load,
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.kind.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });

        if let Some(vp) = viewport {
            render_pass.set_viewport(
                vp.x as f32,
                vp.y as f32,
                vp.width as f32,
                vp.height as f32,
                0.0,
                1.0,
            );
        }
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_bind_group(1, window, &[]);
        render_pass.draw(0..6, 0..1);
    }
}

fn create_volume_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader_module: &wgpu::ShaderModule,
    kind: ProgramKind,
    format: wgpu::TextureFormat,
    color_mask: wgpu::ColorWrites,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(kind.label()),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader_module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader_module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: color_mask,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
