//! Configuration options for the volume renderer.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VolspyError};

/// Environment variable overriding the ray-casting sampling pitch.
pub const MAX_TEXTURE_SIZE_ENV: &str = "MAX_3D_TEXTURE_WIDTH";

/// Default sampling pitch when the environment does not provide one.
pub const DEFAULT_MAX_TEXTURE_SIZE: u32 = 1024;

/// Volume texture filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Interpolation {
    /// Nearest-neighbor sampling (blocky voxels).
    Nearest,
    /// Trilinear sampling.
    #[default]
    Linear,
}

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    /// Largest 3D texture width expected; rays take `2 * max_texture_size` steps at most.
    pub max_texture_size: u32,

    /// Size of the entry/exit ray-bound maps.
    pub fbo_size: (u32, u32),

    /// Volume texture filtering.
    pub interpolation: Interpolation,

    /// Initial value of `u_gain` for ray-cast programs.
    pub initial_gain: f32,

    /// Multiplier applied to `u_gain` for slice programs.
    pub slice_gain_scale: f32,

    /// Maximum number of entries kept by the recent-uniform cache.
    pub uniform_history_limit: usize,

    /// Age after which recent-uniform entries are purged.
    pub uniform_history_age_secs: f64,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            max_texture_size: DEFAULT_MAX_TEXTURE_SIZE,
            fbo_size: (1024, 1024),
            interpolation: Interpolation::Linear,
            initial_gain: 1.0,
            slice_gain_scale: 4.0,
            uniform_history_limit: 5,
            uniform_history_age_secs: 10.0,
        }
    }
}

impl RendererOptions {
    /// Default options with `MAX_3D_TEXTURE_WIDTH` applied from the environment.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(value) = std::env::var(MAX_TEXTURE_SIZE_ENV) {
            match parse_texture_size(&value) {
                Some(size) => options.max_texture_size = size,
                None => log::warn!("ignoring {MAX_TEXTURE_SIZE_ENV}={value:?}: not a positive size"),
            }
        }
        options
    }

    /// Parses options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Serializes the options to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that sizes and ages are usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_texture_size == 0 {
            return Err(VolspyError::InvalidOptions(
                "max_texture_size must be positive".into(),
            ));
        }
        if self.fbo_size.0 == 0 || self.fbo_size.1 == 0 {
            return Err(VolspyError::InvalidOptions(format!(
                "fbo_size {:?} must be non-zero",
                self.fbo_size
            )));
        }
        if self.uniform_history_limit == 0 {
            return Err(VolspyError::InvalidOptions(
                "uniform_history_limit must be positive".into(),
            ));
        }
        if self.uniform_history_age_secs.is_nan() || self.uniform_history_age_secs <= 0.0 {
            return Err(VolspyError::InvalidOptions(
                "uniform_history_age_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Number of loop iterations the ray-cast shader is compiled with.
    pub fn max_ray_steps(&self) -> u32 {
        self.max_texture_size.saturating_mul(2)
    }
}

/// Accepts integers and the float spelling (`"1024.0"`) the variable is often given in.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_texture_size(value: &str) -> Option<u32> {
    let value = value.trim();
    if let Ok(size) = value.parse::<u32>() {
        return (size > 0).then_some(size);
    }
    let size = value.parse::<f64>().ok()?;
    if size >= 1.0 && size <= f64::from(u32::MAX) {
        Some(size as u32)
    } else {
        None
    }
}
