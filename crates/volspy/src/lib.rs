//! volspy-rs: interactive two-pass GPU ray-casting of volumetric image data.
//!
//! A [`VolumeRenderer`] rasterizes the (optionally clipped) bounding cube into
//! entry and exit maps, then marches each pixel's ray through a 3D texture and
//! composites the samples with the active color mode. It can also render the
//! cross-section on the clip plane and pick single pixels, feeding the picked
//! color back into the shaders.
//!
//! # Quick Start
//!
//! ```no_run
//! use volspy::*;
//!
//! fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     init();
//!     let (device, queue) = headless_context()?;
//!
//!     let dims = [32, 32, 32];
//!     let samples = vec![128u8; 32 * 32 * 32];
//!     let data = VolumeData::from_u8(dims, 1, samples)?;
//!     let volume = VolumeTexture::new(&device, &queue, &data)?;
//!
//!     let mut renderer = VolumeRenderer::new(&device, &queue, &volume, RendererOptions::from_env())?;
//!     let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y);
//!     renderer.set_vol_view(view, view.inverse());
//!     renderer.set_vol_projection(Mat4::perspective_rh(0.8, 1.0, 0.1, 10.0));
//!     renderer.set_uniform("u_gain", 2.0f32)?;
//!
//!     render_volume_to_file(&mut renderer, ProgramKind::RayCast, "volume.png", 512, 512)?;
//!     Ok(())
//! }
//! ```
//!
//! # Crates
//!
//! - `volspy-core`: clipping geometry, color modes, uniforms, options
//! - `volspy-render`: wgpu resources and the [`VolumeRenderer`]
//! - `volspy`: this facade, with logging setup and headless helpers

pub mod error;
mod headless;

// Re-export core types
pub use volspy_core::{
    clip::{view_plane_to_model, ClipPlane, CUBE_ANTI_MODEL, CUBE_MODEL},
    color_mode::{ColorMode, ColorModes},
    error::{Result, VolspyError},
    geometry::{make_cube_clipped, ClippedCube, CubeVertex},
    options::{Interpolation, RendererOptions},
    pick::{PickReadback, PickWindow, Viewport},
    recent::{AgedUniform, RecentUniforms},
    shader_parts::ShaderParts,
    uniforms::{UniformDecl, UniformType, UniformValue, GAIN_UNIFORM, PICKED_UNIFORM},
    Mat4, Vec2, Vec3, Vec4,
};

// Re-export render types
pub use volspy_render::{
    PickCallback, ProgramKind, RenderError, RenderResult, ScreenshotError, VolumeData,
    VolumeRenderer, VolumeSamples, VolumeTexture,
};

pub use error::{FrameError, FrameResult};
pub use headless::{
    create_frame_texture, headless_context, read_frame, render_volume_to_file,
    render_volume_to_image, FRAME_FORMAT,
};

/// Sets up `env_logger` logging, filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls leave the logger untouched.
pub fn init() {
    if env_logger::try_init().is_ok() {
        log::info!("volspy-rs initialized");
    }
}
