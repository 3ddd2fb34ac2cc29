//! Rendering backend for volspy-rs.
//!
//! This crate provides the wgpu-based two-pass volume ray-caster:
//! - Volume texture upload and the offscreen ray bound maps
//! - The boundary rasterizer producing entry/exit coordinates
//! - Slice and ray-cast programs assembled from WGSL templates
//! - Single-texel picking with synchronous readback
//! - The [`VolumeRenderer`] facade sequencing all passes

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Sizes and viewport coordinates stay far below the lossy ranges
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub mod boundary;
pub mod buffer;
pub mod error;
pub mod pick;
pub mod program;
pub mod renderer;
pub mod screenshot;
pub mod shader;
pub mod targets;
pub mod volume;

pub use boundary::{BoundaryFaces, BoundaryRasterizer, BoundaryUniforms, RayBound};
pub use error::{RenderError, RenderResult};
pub use pick::WindowBinding;
pub use program::{ProgramInputs, TargetLoad, VolumeBindGroupLayouts, VolumeProgram};
pub use renderer::{PickCallback, VolumeRenderer};
pub use screenshot::{save_image, save_to_buffer, PixelLayout, ScreenshotError};
pub use shader::{ProgramKind, ShaderBuilder};
pub use targets::{RayTargets, RenderTarget, PICK_FORMAT, RAY_MAP_FORMAT};
pub use volume::{create_volume_sampler, VolumeData, VolumeSamples, VolumeTexture};
