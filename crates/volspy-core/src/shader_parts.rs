//! Interchangeable WGSL code fragments for volume programs.
//!
//! Fragments are statements spliced into the fragment entry point. They may
//! read and write `col_packed_smp` (the raw volume sample), `col_smp` (the
//! working color) and, in ray-cast programs, `col_acc` (the accumulator).
//! Uniforms declared in [`ShaderParts::uniforms`] are visible by bare name.

use crate::uniforms::{UniformDecl, UniformType};

/// Copies the packed sample, replicating red into green and blue for single-channel data.
pub const COLOR_REPACKER: &str = "
    col_smp = col_packed_smp;
    if (u_numchannels == 1) {
        col_smp.g = col_packed_smp.r;
        col_smp.b = col_packed_smp.r;
    }
";

/// Clamped linear amplification with a noise floor.
pub const COLOR_GAIN: &str = "
    col_smp = clamp(u_gain * (col_smp - u_floorlvl), vec4<f32>(0.0), vec4<f32>(1.0));
";

/// Alpha as a clamped linear function of RGB.
pub const LINEAR_ALPHA: &str = "
    col_smp.a = clamp(
        clamp((col_smp.r + col_smp.g + col_smp.b) / 2.0, 0.0, 0.75),
        0.0,
        1.0
    );
";

/// Front-to-back alpha compositing.
pub const TRANSPARENT_BLEND: &str = "
    col_acc += (1.0 - col_acc.a) * col_smp * col_smp.a;
";

/// Plain summation of scaled samples.
pub const ADDITIVE_BLEND: &str = "
    col_acc = clamp(col_acc + col_smp * 0.01, vec4<f32>(0.0), vec4<f32>(1.0));
";

/// Maximum-intensity projection.
pub const MAX_INTENSITY_BLEND: &str = "
    col_acc = max(col_acc, col_smp);
";

/// Uniforms the default fragments rely on.
pub fn color_uniforms() -> Vec<UniformDecl> {
    vec![
        UniformDecl::new("u_numchannels", UniformType::Int),
        UniformDecl::new("u_gain", UniformType::Float),
        UniformDecl::new("u_floorlvl", UniformType::Float),
    ]
}

/// The code fragments making up one volume program.
///
/// Slice programs ignore `blend`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderParts {
    pub uniforms: Vec<UniformDecl>,
    pub unpack: String,
    pub color_xfer: String,
    pub alpha: String,
    pub blend: String,
}

impl Default for ShaderParts {
    fn default() -> Self {
        Self {
            uniforms: color_uniforms(),
            unpack: COLOR_REPACKER.to_string(),
            color_xfer: COLOR_GAIN.to_string(),
            alpha: LINEAR_ALPHA.to_string(),
            blend: TRANSPARENT_BLEND.to_string(),
        }
    }
}

impl ShaderParts {
    /// Default fragments with the given blend statement.
    pub fn with_blend(blend: impl Into<String>) -> Self {
        Self {
            blend: blend.into(),
            ..Self::default()
        }
    }

    /// Replaces the uniform declarations.
    #[must_use]
    pub fn uniforms(mut self, uniforms: Vec<UniformDecl>) -> Self {
        self.uniforms = uniforms;
        self
    }

    /// Adds one uniform declaration.
    #[must_use]
    pub fn uniform(mut self, name: impl Into<String>, ty: UniformType) -> Self {
        self.uniforms.push(UniformDecl::new(name, ty));
        self
    }

    #[must_use]
    pub fn unpack(mut self, code: impl Into<String>) -> Self {
        self.unpack = code.into();
        self
    }

    #[must_use]
    pub fn color_xfer(mut self, code: impl Into<String>) -> Self {
        self.color_xfer = code.into();
        self
    }

    #[must_use]
    pub fn alpha(mut self, code: impl Into<String>) -> Self {
        self.alpha = code.into();
        self
    }

    #[must_use]
    pub fn blend(mut self, code: impl Into<String>) -> Self {
        self.blend = code.into();
        self
    }

    /// Whether the fragments declare `name`.
    pub fn declares(&self, name: &str) -> bool {
        self.uniforms.iter().any(|u| u.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parts() {
        let parts = ShaderParts::default();
        assert!(parts.declares("u_gain"));
        assert!(parts.declares("u_numchannels"));
        assert!(parts.declares("u_floorlvl"));
        assert!(!parts.declares("u_picked"));
        assert_eq!(parts.blend, TRANSPARENT_BLEND);
    }

    #[test]
    fn test_builder_overrides() {
        let parts = ShaderParts::with_blend(MAX_INTENSITY_BLEND)
            .uniform("u_threshold", UniformType::Float)
            .alpha("    col_smp.a = 1.0;\n");
        assert_eq!(parts.blend, MAX_INTENSITY_BLEND);
        assert!(parts.declares("u_threshold"));
        assert_eq!(parts.uniforms.len(), 4);
        assert_eq!(parts.unpack, COLOR_REPACKER);
        assert!(parts.alpha.contains("1.0"));
    }
}
