//! Core abstractions for volspy-rs.
//!
//! This crate holds the GPU-independent parts of the volume ray-caster:
//! - [`make_cube_clipped`] clipping of the bounding cube against a plane
//! - [`ClipPlane`] and the view-to-model plane transform
//! - [`ShaderParts`] code fragments and [`ColorModes`] compositing state
//! - Typed uniforms with their packed layout, and the recent-uniform cache
//! - Renderer options, viewports and pick readbacks

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Index and count conversions are bounded by cube and layout sizes
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub mod clip;
pub mod color_mode;
pub mod error;
pub mod geometry;
pub mod options;
pub mod pick;
pub mod recent;
pub mod shader_parts;
pub mod uniforms;

pub use clip::{view_plane_to_model, ClipPlane, CUBE_ANTI_MODEL, CUBE_MODEL};
pub use color_mode::{ColorMode, ColorModes};
pub use error::{Result, VolspyError};
pub use geometry::{
    make_cube_clipped, ClippedCube, CubeVertex, MAX_CAP_INDICES, MAX_CLIPPED_VERTICES,
    MAX_SOLID_INDICES,
};
pub use options::{Interpolation, RendererOptions};
pub use pick::{PickReadback, PickWindow, Viewport};
pub use recent::{AgedUniform, RecentUniforms};
pub use shader_parts::ShaderParts;
pub use uniforms::{UniformBlock, UniformDecl, UniformLayout, UniformType, UniformValue};

// Re-export glam types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};
