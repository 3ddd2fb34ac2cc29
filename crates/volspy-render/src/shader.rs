//! Shader management.
//!
//! Volume programs are assembled from fixed WGSL templates whose `{{slot}}`
//! placeholders are filled with the uniform struct, uniform aliases and the
//! code fragments of a [`ShaderParts`].

use volspy_core::shader_parts::ShaderParts;
use volspy_core::uniforms::UniformLayout;

use crate::error::{RenderError, RenderResult};

const VOLUME_COMMON_TEMPLATE: &str = include_str!("shaders/volume_common.wgsl");
const SLICE_TEMPLATE: &str = include_str!("shaders/slice.wgsl");
const RAYCAST_TEMPLATE: &str = include_str!("shaders/raycast.wgsl");

/// Name of the generated uniform struct.
pub const PARAMS_STRUCT: &str = "VolumeParams";

/// Name of the uniform binding holding [`PARAMS_STRUCT`].
pub const PARAMS_VAR: &str = "params";

/// The two volume program families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// One sample per pixel at the entry coordinate.
    Slice,
    /// Full march from entry to exit.
    RayCast,
}

impl ProgramKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Slice => "Volume Slice",
            Self::RayCast => "Volume Ray Cast",
        }
    }
}

/// Builder for creating shader modules.
pub struct ShaderBuilder {
    vertex_source: Option<String>,
    fragment_source: Option<String>,
    label: Option<String>,
}

impl ShaderBuilder {
    /// Creates a new shader builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            vertex_source: None,
            fragment_source: None,
            label: None,
        }
    }

    /// Builder preloaded with the assembled source of a volume program.
    pub fn volume(
        kind: ProgramKind,
        parts: &ShaderParts,
        layout: &UniformLayout,
        max_steps: u32,
    ) -> RenderResult<Self> {
        let (vertex, fragment) = volume_sources(kind, parts, layout, max_steps)?;
        Ok(Self::new()
            .with_label(kind.label())
            .with_vertex(vertex)
            .with_fragment(fragment))
    }

    /// Sets the vertex shader source (WGSL).
    pub fn with_vertex(mut self, source: impl Into<String>) -> Self {
        self.vertex_source = Some(source.into());
        self
    }

    /// Sets the fragment shader source (WGSL).
    pub fn with_fragment(mut self, source: impl Into<String>) -> Self {
        self.fragment_source = Some(source.into());
        self
    }

    /// Sets the shader label for debugging.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The complete WGSL source the module is built from.
    pub fn source(&self) -> RenderResult<String> {
        self.combined_source()
    }

    /// Builds the shader module (does not create pipeline).
    ///
    /// WGSL validation errors are captured and returned instead of reaching
    /// the device's uncaptured-error handler.
    pub fn build_module(self, device: &wgpu::Device) -> RenderResult<wgpu::ShaderModule> {
        let source = self.combined_source()?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: self.label.as_deref(),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderCompilationFailed(format!(
                "{}: {error}",
                self.label.as_deref().unwrap_or("shader")
            )));
        }

        Ok(module)
    }

    fn combined_source(&self) -> RenderResult<String> {
        let vertex = self
            .vertex_source
            .as_ref()
            .ok_or_else(|| RenderError::ShaderCompilationFailed("missing vertex shader".into()))?;

        let fragment = self.fragment_source.as_ref().ok_or_else(|| {
            RenderError::ShaderCompilationFailed("missing fragment shader".into())
        })?;

        // If sources are the same file, just return one
        if vertex == fragment {
            return Ok(vertex.clone());
        }

        Ok(format!("{vertex}\n\n{fragment}"))
    }
}

impl Default for ShaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fills the volume templates, returning `(quad vertex stage, fragment stage)`.
pub fn volume_sources(
    kind: ProgramKind,
    parts: &ShaderParts,
    layout: &UniformLayout,
    max_steps: u32,
) -> RenderResult<(String, String)> {
    let uniforms = layout.wgsl_struct(PARAMS_STRUCT);
    let aliases = layout.wgsl_aliases(PARAMS_VAR);
    let max_steps = max_steps.max(1).to_string();

    let vertex = fill_template(VOLUME_COMMON_TEMPLATE, &[("uniforms", uniforms.as_str())])?;

    let fragment = match kind {
        ProgramKind::Slice => fill_template(
            SLICE_TEMPLATE,
            &[
                ("aliases", aliases.as_str()),
                ("unpack", parts.unpack.as_str()),
                ("color_xfer", parts.color_xfer.as_str()),
                ("alpha", parts.alpha.as_str()),
            ],
        )?,
        ProgramKind::RayCast => fill_template(
            RAYCAST_TEMPLATE,
            &[
                ("aliases", aliases.as_str()),
                ("unpack", parts.unpack.as_str()),
                ("color_xfer", parts.color_xfer.as_str()),
                ("alpha", parts.alpha.as_str()),
                ("blend", parts.blend.as_str()),
                ("max_steps", max_steps.as_str()),
            ],
        )?,
    };

    Ok((vertex, fragment))
}

/// Replaces every `{{slot}}` in `template`; any placeholder left over is an error.
fn fill_template(template: &str, slots: &[(&str, &str)]) -> RenderResult<String> {
    let mut source = template.to_string();
    for (slot, value) in slots {
        source = source.replace(&format!("{{{{{slot}}}}}"), value);
    }
    if let Some(start) = source.find("{{") {
        let end = source[start..]
            .find("}}")
            .map_or(source.len(), |i| start + i + 2);
        return Err(RenderError::ShaderCompilationFailed(format!(
            "unresolved template slot {}",
            &source[start..end]
        )));
    }
    Ok(source)
}
