//! GPU side of the quad window used by final and pick passes.

use volspy_core::pick::PickWindow;

use crate::buffer::{create_uniform_buffer, update_buffer};

/// A [`PickWindow`] uniform buffer with its bind group.
pub struct WindowBinding {
    window: PickWindow,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl WindowBinding {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, window: PickWindow) -> Self {
        let buffer = create_uniform_buffer(device, &window, Some("Quad Window Buffer"));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Window Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self {
            window,
            buffer,
            bind_group,
        }
    }

    /// Rewrites the window if it changed.
    pub fn set(&mut self, queue: &wgpu::Queue, window: PickWindow) {
        if window != self.window {
            self.window = window;
            update_buffer(queue, &self.buffer, &[window]);
        }
    }

    pub fn window(&self) -> PickWindow {
        self.window
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_layout_matches_shader() {
        // origin: vec2<f32>, scale: f32, _padding: f32
        assert_eq!(std::mem::size_of::<PickWindow>(), 16);
        let bytes = bytemuck::bytes_of(&PickWindow::FULL);
        let scale: f32 = bytemuck::pod_read_unaligned(&bytes[8..12]);
        assert!((scale - 1.0).abs() < f32::EPSILON);
    }
}
