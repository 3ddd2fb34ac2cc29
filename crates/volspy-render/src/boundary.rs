//! Boundary rasterizer: renders the bounding geometry into the ray bound maps.
//!
//! Front faces (back-face culling) give each pixel's ray entry coordinate and
//! back faces (front-face culling) its exit coordinate. Geometry buffers are
//! allocated at the clipper's maximum size and overwritten in place whenever
//! the clip plane changes.

use glam::Mat4;
use volspy_core::clip::CUBE_MODEL;
use volspy_core::geometry::{
    make_cube_clipped, ClippedCube, CubeVertex, MAX_CAP_INDICES, MAX_CLIPPED_VERTICES,
    MAX_SOLID_INDICES,
};

use crate::buffer::{create_index_buffer, create_uniform_buffer, create_vertex_buffer, update_buffer};
use crate::error::RenderResult;
use crate::shader::ShaderBuilder;
use crate::targets::RAY_MAP_FORMAT;

/// GPU representation of the boundary transform.
/// Matches the shader's `BoundaryUniforms` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BoundaryUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

impl Default for BoundaryUniforms {
    fn default() -> Self {
        Self {
            model: CUBE_MODEL.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            projection: Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

/// Which index list to rasterize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryFaces {
    /// The whole (clipped) solid, for ray casting.
    Solid,
    /// The cap polygon alone, for slicing.
    Cap,
}

/// Which ray bound a pass produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayBound {
    Entry,
    Exit,
}

impl RayBound {
    fn cull_mode(self) -> wgpu::Face {
        match self {
            Self::Entry => wgpu::Face::Back,
            Self::Exit => wgpu::Face::Front,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Entry => "Ray Entry Pass",
            Self::Exit => "Ray Exit Pass",
        }
    }
}

/// Bounding geometry buffers and the entry/exit pipelines.
pub struct BoundaryRasterizer {
    geometry: ClippedCube,
    vertex_buffer: wgpu::Buffer,
    solid_index_buffer: wgpu::Buffer,
    cap_index_buffer: wgpu::Buffer,
    uniforms: BoundaryUniforms,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    entry_pipeline: wgpu::RenderPipeline,
    exit_pipeline: wgpu::RenderPipeline,
}

impl BoundaryRasterizer {
    /// Creates the rasterizer with the unclipped cube.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> RenderResult<Self> {
        let shader_source = include_str!("shaders/boundary.wgsl");
        let shader_module = ShaderBuilder::new()
            .with_label("Boundary Shader")
            .with_vertex(shader_source)
            .with_fragment(shader_source)
            .build_module(device)?;

        let uniforms = BoundaryUniforms::default();
        let uniform_buffer =
            create_uniform_buffer(device, &uniforms, Some("Boundary Uniform Buffer"));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Boundary Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Boundary Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Boundary Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let entry_pipeline =
            create_boundary_pipeline(device, &pipeline_layout, &shader_module, RayBound::Entry);
        let exit_pipeline =
            create_boundary_pipeline(device, &pipeline_layout, &shader_module, RayBound::Exit);

        let mut rasterizer = Self {
            geometry: ClippedCube::default(),
            vertex_buffer: create_vertex_buffer::<CubeVertex>(
                device,
                MAX_CLIPPED_VERTICES,
                Some("Boundary Vertex Buffer"),
            ),
            solid_index_buffer: create_index_buffer(
                device,
                MAX_SOLID_INDICES,
                Some("Boundary Solid Index Buffer"),
            ),
            cap_index_buffer: create_index_buffer(
                device,
                MAX_CAP_INDICES,
                Some("Boundary Cap Index Buffer"),
            ),
            uniforms,
            uniform_buffer,
            bind_group,
            entry_pipeline,
            exit_pipeline,
        };
        rasterizer.set_geometry(queue, make_cube_clipped(None));
        Ok(rasterizer)
    }

    /// Replaces the bounding geometry.
    pub fn set_geometry(&mut self, queue: &wgpu::Queue, geometry: ClippedCube) {
        update_buffer(queue, &self.vertex_buffer, &geometry.vertices);
        update_buffer(queue, &self.solid_index_buffer, &geometry.solid_indices);
        update_buffer(queue, &self.cap_index_buffer, &geometry.cap_indices);
        self.geometry = geometry;
    }

    /// The geometry currently in the GPU buffers.
    pub fn geometry(&self) -> &ClippedCube {
        &self.geometry
    }

    pub fn set_view(&mut self, queue: &wgpu::Queue, view: Mat4) {
        self.uniforms.view = view.to_cols_array_2d();
        update_buffer(queue, &self.uniform_buffer, &[self.uniforms]);
    }

    pub fn set_projection(&mut self, queue: &wgpu::Queue, projection: Mat4) {
        self.uniforms.projection = projection.to_cols_array_2d();
        update_buffer(queue, &self.uniform_buffer, &[self.uniforms]);
    }

    pub fn uniforms(&self) -> &BoundaryUniforms {
        &self.uniforms
    }

    /// Records one bound pass into `target`.
    ///
    /// The target is always cleared to transparent black, so empty geometry
    /// leaves a map without rays.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        bound: RayBound,
        faces: BoundaryFaces,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(bound.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });

        let (index_buffer, count) = match faces {
            BoundaryFaces::Solid => (&self.solid_index_buffer, self.geometry.solid_indices.len()),
            BoundaryFaces::Cap => (&self.cap_index_buffer, self.geometry.cap_indices.len()),
        };
        if count == 0 {
            return;
        }

        let pipeline = match bound {
            RayBound::Entry => &self.entry_pipeline,
            RayBound::Exit => &self.exit_pipeline,
        };
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..count as u32, 0, 0..1);
    }
}

fn create_boundary_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader_module: &wgpu::ShaderModule,
    bound: RayBound,
) -> wgpu::RenderPipeline {
    let vertex_attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(bound.label()),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader_module,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<CubeVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &vertex_attributes,
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader_module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: RAY_MAP_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(bound.cull_mode()),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uniforms_use_axis_correction() {
        let uniforms = BoundaryUniforms::default();
        assert_eq!(Mat4::from_cols_array_2d(&uniforms.model), CUBE_MODEL);
        assert_eq!(Mat4::from_cols_array_2d(&uniforms.view), Mat4::IDENTITY);
        assert_eq!(std::mem::size_of::<BoundaryUniforms>(), 192);
    }

    #[test]
    fn test_cull_modes() {
        assert_eq!(RayBound::Entry.cull_mode(), wgpu::Face::Back);
        assert_eq!(RayBound::Exit.cull_mode(), wgpu::Face::Front);
    }

    #[test]
    fn test_vertex_stride_matches_shader_input() {
        assert_eq!(std::mem::size_of::<CubeVertex>(), 24);
    }
}
