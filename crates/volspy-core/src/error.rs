//! Error types for volspy-rs.

use thiserror::Error;

use crate::uniforms::UniformType;

/// The main error type for volspy-rs core operations.
#[derive(Error, Debug)]
pub enum VolspyError {
    /// No program declares a uniform with the given name.
    #[error("uniform '{0}' is not declared by any program")]
    UnknownUniform(String),

    /// A uniform was set with a value of the wrong type.
    #[error("uniform '{name}' has type {expected}, got {actual}")]
    UniformTypeMismatch {
        name: String,
        expected: UniformType,
        actual: UniformType,
    },

    /// A uniform declaration is duplicated, reserved, or not a valid identifier.
    #[error("invalid uniform declaration '{0}'")]
    InvalidUniformDeclaration(String),

    /// The clip plane was set before any view matrix was supplied.
    #[error("clip plane requires a view matrix - call set_vol_view() first")]
    MissingViewMatrix,

    /// The clip plane normal has zero length.
    #[error("clip plane normal has zero length")]
    DegeneratePlane,

    /// A renderer needs at least one color mode.
    #[error("color mode list is empty")]
    EmptyModeList,

    /// A dedicated pick mode index points outside the mode list.
    #[error("mode index {index} out of range for {len} modes")]
    ModeIndexOutOfRange { index: usize, len: usize },

    /// Volume data has an unsupported number of channels.
    #[error("unsupported channel count {0} (expected 1 to 4)")]
    InvalidChannelCount(u32),

    /// A volume has a zero-sized dimension.
    #[error("invalid volume dimensions {0:?}: every dimension must be non-zero")]
    InvalidVolumeDims([u32; 3]),

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Options failed validation.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for volspy-rs core operations.
pub type Result<T> = std::result::Result<T, VolspyError>;
