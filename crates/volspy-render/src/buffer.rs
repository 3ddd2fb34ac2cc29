//! GPU buffer management.

use wgpu::util::DeviceExt;

/// Creates a zeroed vertex buffer able to hold `capacity` elements of `T`.
pub fn create_vertex_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    capacity: usize,
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label,
        size: (capacity * std::mem::size_of::<T>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Creates a zeroed `u32` index buffer able to hold `capacity` indices.
pub fn create_index_buffer(
    device: &wgpu::Device,
    capacity: usize,
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label,
        size: (capacity * std::mem::size_of::<u32>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Creates a uniform buffer from data.
pub fn create_uniform_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    data: &T,
    label: Option<&str>,
) -> wgpu::Buffer {
    create_uniform_buffer_bytes(device, bytemuck::bytes_of(data), label)
}

/// Creates a uniform buffer from already packed bytes.
pub fn create_uniform_buffer_bytes(
    device: &wgpu::Device,
    contents: &[u8],
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Updates a buffer with new data.
pub fn update_buffer<T: bytemuck::Pod>(queue: &wgpu::Queue, buffer: &wgpu::Buffer, data: &[T]) {
    if !data.is_empty() {
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(data));
    }
}

/// Creates a mappable buffer that receives texture copies.
pub fn create_readback_buffer(
    device: &wgpu::Device,
    size: wgpu::BufferAddress,
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label,
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    })
}

/// Row pitch of a texture-to-buffer copy, padded to the copy alignment.
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let unpadded = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Maps `buffer`, blocks until the GPU has written it, and copies out its contents.
pub fn read_buffer(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> Result<Vec<u8>, crate::error::RenderError> {
    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    let _ = device.poll(wgpu::PollType::wait_indefinitely());
    rx.recv().map_err(|_| crate::error::RenderError::Timeout)??;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(data)
}
