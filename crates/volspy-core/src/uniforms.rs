//! Typed uniform values and their packed GPU layout.
//!
//! Volume programs expose their tunable parameters through a single uniform
//! buffer. A [`UniformLayout`] places each declared field according to the WGSL
//! uniform address-space rules, and a [`UniformBlock`] keeps the CPU shadow copy
//! that is uploaded before drawing.

use std::fmt;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::error::{Result, VolspyError};

/// Name of the built-in uniform carrying the last pick readback.
pub const PICKED_UNIFORM: &str = "u_picked";

/// Name of the gain uniform that slice programs scale.
pub const GAIN_UNIFORM: &str = "u_gain";

/// Name of the channel-count uniform set at program construction.
pub const NUM_CHANNELS_UNIFORM: &str = "u_numchannels";

/// Identifiers used by the shader templates that uniforms may not shadow.
const RESERVED_NAMES: &[&str] = &[
    "params",
    "quad_window",
    "volume_texture",
    "volume_sampler",
    "entry_texture",
    "exit_texture",
    "map_sampler",
    "rand",
    "glsl_mod",
    "col_acc",
    "col_smp",
    "col_packed_smp",
    "entry",
    "exit",
    "ray_step",
    "texcoord",
    "f_pos",
    "cast_len",
    "ray_len",
    "step_len",
    "in",
    "out",
    "s",
    "corner",
    "corners",
    "uv",
    "VolumeParams",
    "QuadWindow",
    "QuadOutput",
    "vs_main",
    "fs_main",
];

/// WGSL keywords, reserved words the templates could collide with, and the
/// predeclared types and builtins the templates call.
const WGSL_NAMES: &[&str] = &[
    // keywords
    "alias", "break", "case", "const", "const_assert", "continue", "continuing",
    "default", "diagnostic", "discard", "else", "enable", "false", "fn", "for",
    "if", "let", "loop", "override", "requires", "return", "struct", "switch",
    "true", "var", "while",
    // reserved words
    "NULL", "Self", "abstract", "active", "alignas", "alignof", "as", "asm",
    "async", "attribute", "auto", "await", "become", "cast", "catch", "class",
    "const_cast", "constexpr", "crate", "do", "enum", "export", "extern",
    "filter", "final", "finally", "from", "get", "goto", "impl", "import",
    "inline", "interface", "layout", "macro", "match", "meta", "mod",
    "module", "move", "mut", "namespace", "new", "nil", "null", "of",
    "operator", "package", "pass", "precision", "pub", "public", "ref",
    "self", "set", "shared", "sizeof", "static", "super", "target", "this",
    "throw", "trait", "try", "type", "typedef", "union", "unsafe", "use",
    "using", "where", "with", "yield",
    // predeclared types and builtins used by the templates
    "bool", "f16", "f32", "i32", "u32", "vec2", "vec3", "vec4", "mat4x4",
    "array", "sampler", "texture_2d", "texture_3d", "all", "any", "clamp",
    "dot", "floor", "fract", "length", "max", "min", "normalize", "sin",
    "textureSampleLevel",
];

/// Scalar/vector/matrix type of a uniform field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformType {
    /// WGSL spelling of the type.
    pub fn wgsl(self) -> &'static str {
        match self {
            Self::Float => "f32",
            Self::Int => "i32",
            Self::Vec2 => "vec2<f32>",
            Self::Vec3 => "vec3<f32>",
            Self::Vec4 => "vec4<f32>",
            Self::Mat4 => "mat4x4<f32>",
        }
    }

    /// Size in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Float | Self::Int => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 => 16,
            Self::Mat4 => 64,
        }
    }

    /// Alignment in the uniform address space.
    pub fn align(self) -> usize {
        match self {
            Self::Float | Self::Int => 4,
            Self::Vec2 => 8,
            Self::Vec3 | Self::Vec4 | Self::Mat4 => 16,
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wgsl())
    }
}

/// A typed uniform value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major matrix.
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    /// Zero sentinel written to `u_picked` whenever no pick result applies.
    pub const PICK_SENTINEL: Self = Self::Vec4([0.0; 4]);

    /// Type of this value.
    pub fn ty(&self) -> UniformType {
        match self {
            Self::Float(_) => UniformType::Float,
            Self::Int(_) => UniformType::Int,
            Self::Vec2(_) => UniformType::Vec2,
            Self::Vec3(_) => UniformType::Vec3,
            Self::Vec4(_) => UniformType::Vec4,
            Self::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Multiplies every float component by `factor`. Integers are unchanged.
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        match self {
            Self::Float(v) => Self::Float(v * factor),
            Self::Int(v) => Self::Int(v),
            Self::Vec2(v) => Self::Vec2(v.map(|c| c * factor)),
            Self::Vec3(v) => Self::Vec3(v.map(|c| c * factor)),
            Self::Vec4(v) => Self::Vec4(v.map(|c| c * factor)),
            Self::Mat4(m) => Self::Mat4(m.map(|col| col.map(|c| c * factor))),
        }
    }

    fn write_to(&self, out: &mut [u8]) {
        let bytes: &[u8] = match self {
            Self::Float(v) => bytemuck::bytes_of(v),
            Self::Int(v) => bytemuck::bytes_of(v),
            Self::Vec2(v) => bytemuck::cast_slice(v),
            Self::Vec3(v) => bytemuck::cast_slice(v),
            Self::Vec4(v) => bytemuck::cast_slice(v),
            Self::Mat4(m) => bytemuck::cast_slice(m),
        };
        out[..bytes.len()].copy_from_slice(bytes);
    }

    fn read_from(ty: UniformType, bytes: &[u8]) -> Self {
        let floats = |n: usize| -> Vec<f32> {
            (0..n)
                .map(|i| bytemuck::pod_read_unaligned(&bytes[i * 4..i * 4 + 4]))
                .collect()
        };
        match ty {
            UniformType::Float => Self::Float(bytemuck::pod_read_unaligned(&bytes[..4])),
            UniformType::Int => Self::Int(bytemuck::pod_read_unaligned(&bytes[..4])),
            UniformType::Vec2 => {
                let f = floats(2);
                Self::Vec2([f[0], f[1]])
            }
            UniformType::Vec3 => {
                let f = floats(3);
                Self::Vec3([f[0], f[1], f[2]])
            }
            UniformType::Vec4 => {
                let f = floats(4);
                Self::Vec4([f[0], f[1], f[2], f[3]])
            }
            UniformType::Mat4 => {
                let f = floats(16);
                Self::Mat4(Mat4::from_cols_slice(&f).to_cols_array_2d())
            }
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        Self::Vec2(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        Self::Vec3(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        Self::Vec4(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v.to_array())
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v.to_array())
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v.to_array())
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        Self::Mat4(m.to_cols_array_2d())
    }
}

/// A named uniform declared by a shader's uniforms slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: String,
    pub ty: UniformType,
}

impl UniformDecl {
    pub fn new(name: impl Into<String>, ty: UniformType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A declared field with its byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformField {
    pub decl: UniformDecl,
    pub offset: usize,
}

/// Packed layout of the `VolumeParams` uniform struct.
///
/// The first field is always `u_picked: vec4<f32>`, followed by the declared
/// fields in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: usize,
}

impl UniformLayout {
    /// Lays out `u_picked` followed by `decls`.
    pub fn new(decls: &[UniformDecl]) -> Result<Self> {
        let mut fields: Vec<UniformField> = Vec::with_capacity(decls.len() + 1);
        let mut offset = 0;

        let picked = std::iter::once(UniformDecl::new(PICKED_UNIFORM, UniformType::Vec4));
        for (i, decl) in picked.chain(decls.iter().cloned()).enumerate() {
            if i > 0 {
                validate_name(&decl.name)?;
            }
            if fields.iter().any(|f| f.decl.name == decl.name) {
                return Err(VolspyError::InvalidUniformDeclaration(decl.name));
            }
            offset = align_up(offset, decl.ty.align());
            let size = decl.ty.size();
            fields.push(UniformField { decl, offset });
            offset += size;
        }

        Ok(Self {
            fields,
            size: align_up(offset, 16),
        })
    }

    /// Total buffer size in bytes (a multiple of 16).
    pub fn size(&self) -> usize {
        self.size
    }

    /// All fields in declaration order, starting with `u_picked`.
    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.decl.name == name)
    }

    /// WGSL struct declaration for this layout.
    pub fn wgsl_struct(&self, struct_name: &str) -> String {
        let mut out = format!("struct {struct_name} {{\n");
        for field in &self.fields {
            out.push_str(&format!("    {}: {},\n", field.decl.name, field.decl.ty.wgsl()));
        }
        out.push_str("}\n");
        out
    }

    /// `let` bindings exposing every field under its bare name.
    pub fn wgsl_aliases(&self, var_name: &str) -> String {
        self.fields
            .iter()
            .map(|f| format!("    let {0} = {var_name}.{0};\n", f.decl.name))
            .collect()
    }
}

/// CPU copy of a program's uniform buffer.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformLayout,
    data: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    /// Zero-initialized block for `layout`.
    pub fn new(layout: UniformLayout) -> Self {
        let data = vec![0; layout.size()];
        Self {
            layout,
            data,
            dirty: true,
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Whether the block declares `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.layout.field(name).is_some()
    }

    /// Writes `value` into the field `name`.
    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<()> {
        let field = self
            .layout
            .field(name)
            .ok_or_else(|| VolspyError::UnknownUniform(name.to_string()))?;
        if field.decl.ty != value.ty() {
            return Err(VolspyError::UniformTypeMismatch {
                name: name.to_string(),
                expected: field.decl.ty,
                actual: value.ty(),
            });
        }
        let start = field.offset;
        let end = start + field.decl.ty.size();
        value.write_to(&mut self.data[start..end]);
        self.dirty = true;
        Ok(())
    }

    /// Reads the current value of `name`.
    pub fn get(&self, name: &str) -> Option<UniformValue> {
        let field = self.layout.field(name)?;
        let start = field.offset;
        let end = start + field.decl.ty.size();
        Some(UniformValue::read_from(field.decl.ty, &self.data[start..end]))
    }

    /// Raw bytes to upload.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns whether the block changed since the last call, clearing the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

fn align_up(offset: usize, align: usize) -> usize {
    offset.div_ceil(align) * align
}

fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_start
        || !valid_rest
        || name.starts_with("__")
        || RESERVED_NAMES.contains(&name)
        || WGSL_NAMES.contains(&name)
    {
        return Err(VolspyError::InvalidUniformDeclaration(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_decls() -> Vec<UniformDecl> {
        vec![
            UniformDecl::new("u_numchannels", UniformType::Int),
            UniformDecl::new("u_gain", UniformType::Float),
            UniformDecl::new("u_floorlvl", UniformType::Float),
        ]
    }

    #[test]
    fn test_layout_offsets() {
        let layout = UniformLayout::new(&default_decls()).unwrap();
        assert_eq!(layout.field("u_picked").unwrap().offset, 0);
        assert_eq!(layout.field("u_numchannels").unwrap().offset, 16);
        assert_eq!(layout.field("u_gain").unwrap().offset, 20);
        assert_eq!(layout.field("u_floorlvl").unwrap().offset, 24);
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn test_layout_alignment_of_vectors() {
        let layout = UniformLayout::new(&[
            UniformDecl::new("u_a", UniformType::Float),
            UniformDecl::new("u_b", UniformType::Vec3),
            UniformDecl::new("u_c", UniformType::Float),
            UniformDecl::new("u_d", UniformType::Vec2),
            UniformDecl::new("u_m", UniformType::Mat4),
        ])
        .unwrap();
        assert_eq!(layout.field("u_a").unwrap().offset, 16);
        assert_eq!(layout.field("u_b").unwrap().offset, 32);
        // vec3 leaves a 4-byte tail that a scalar may occupy
        assert_eq!(layout.field("u_c").unwrap().offset, 44);
        assert_eq!(layout.field("u_d").unwrap().offset, 48);
        assert_eq!(layout.field("u_m").unwrap().offset, 64);
        assert_eq!(layout.size(), 128);
        assert_eq!(layout.size() % 16, 0);
    }

    #[test]
    fn test_layout_rejects_bad_names() {
        let dup = [
            UniformDecl::new("u_gain", UniformType::Float),
            UniformDecl::new("u_gain", UniformType::Float),
        ];
        assert!(matches!(
            UniformLayout::new(&dup),
            Err(VolspyError::InvalidUniformDeclaration(_))
        ));
        let bad_names = [
            "u_picked", "col_acc", "1abc", "a-b", "", "__x", "loop", "let", "fn", "mod",
            "VolumeParams", "QuadOutput", "QuadWindow", "vs_main", "fs_main", "vec4",
            "clamp",
        ];
        for bad in bad_names {
            let decls = [UniformDecl::new(bad, UniformType::Float)];
            assert!(
                matches!(
                    UniformLayout::new(&decls),
                    Err(VolspyError::InvalidUniformDeclaration(ref name)) if name == bad
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_wgsl_generation() {
        let layout = UniformLayout::new(&default_decls()).unwrap();
        let decl = layout.wgsl_struct("VolumeParams");
        assert!(decl.starts_with("struct VolumeParams {"));
        assert!(decl.contains("u_picked: vec4<f32>,"));
        assert!(decl.contains("u_numchannels: i32,"));
        let aliases = layout.wgsl_aliases("params");
        assert!(aliases.contains("let u_gain = params.u_gain;"));
    }

    #[test]
    fn test_block_set_get() {
        let mut block = UniformBlock::new(UniformLayout::new(&default_decls()).unwrap());
        assert!(block.take_dirty());
        assert!(!block.take_dirty());

        block.set("u_gain", 2.5_f32.into()).unwrap();
        block.set("u_numchannels", 3_i32.into()).unwrap();
        block.set("u_picked", [0.1_f32, 0.2, 0.3, 0.4].into()).unwrap();
        assert!(block.take_dirty());

        assert_eq!(block.get("u_gain"), Some(UniformValue::Float(2.5)));
        assert_eq!(block.get("u_numchannels"), Some(UniformValue::Int(3)));
        assert_eq!(
            block.get("u_picked"),
            Some(UniformValue::Vec4([0.1, 0.2, 0.3, 0.4]))
        );
        assert_eq!(block.get("missing"), None);

        let gain: f32 = bytemuck::pod_read_unaligned(&block.bytes()[20..24]);
        assert!((gain - 2.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_block_type_mismatch() {
        let mut block = UniformBlock::new(UniformLayout::new(&default_decls()).unwrap());
        let err = block.set("u_gain", 1_i32.into()).unwrap_err();
        assert!(matches!(
            err,
            VolspyError::UniformTypeMismatch {
                expected: UniformType::Float,
                actual: UniformType::Int,
                ..
            }
        ));
        assert!(matches!(
            block.set("u_nope", 1.0_f32.into()),
            Err(VolspyError::UnknownUniform(_))
        ));
    }

    #[test]
    fn test_mat4_roundtrip_through_block() {
        let mut block = UniformBlock::new(
            UniformLayout::new(&[UniformDecl::new("u_xform", UniformType::Mat4)]).unwrap(),
        );
        let m = Mat4::from_rotation_x(0.5) * Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        block.set("u_xform", m.into()).unwrap();
        assert_eq!(block.get("u_xform"), Some(UniformValue::from(m)));
    }

    #[test]
    fn test_scaled() {
        assert_eq!(UniformValue::Float(2.0).scaled(4.0), UniformValue::Float(8.0));
        assert_eq!(UniformValue::Int(2).scaled(4.0), UniformValue::Int(2));
        assert_eq!(
            UniformValue::Vec2([1.0, -1.0]).scaled(0.5),
            UniformValue::Vec2([0.5, -0.5])
        );
    }
}
