//! Rendering error types.

use thiserror::Error;
use volspy_core::error::VolspyError;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter: {0}")]
    AdapterCreationFailed(#[from] wgpu::RequestAdapterError),

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Texture creation failed.
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// The viewport does not fit the render target.
    #[error("viewport {viewport:?} exceeds target size {width}x{height}")]
    InvalidViewport {
        viewport: volspy_core::Viewport,
        width: u32,
        height: u32,
    },

    /// The pick position lies outside the viewport.
    #[error("pick position ({x}, {y}) is outside the viewport")]
    PickOutOfViewport { x: u32, y: u32 },

    /// Mapping a readback buffer failed.
    #[error("GPU buffer mapping failed: {0}")]
    BufferMapFailed(#[from] wgpu::BufferAsyncError),

    /// Timeout waiting for GPU.
    #[error("timeout waiting for GPU")]
    Timeout,

    /// Renderer state or uniform error.
    #[error(transparent)]
    Core(#[from] VolspyError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
