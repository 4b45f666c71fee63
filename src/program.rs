//! Shader program wrapper.
//!
//! A [`Program`] is a vertex + fragment WGSL module together with its bind group
//! layout. Programs declare their inputs by name:
//!
//! - **Uniforms** are packed into one `Uniforms` struct at `@group(0) @binding(0)`,
//!   laid out with WGSL uniform alignment rules. Texture uniforms get the following
//!   binding slots in declaration order.
//! - **Attributes** become a `VertexInput` struct with sequential `@location`s, read
//!   from a single interleaved vertex buffer.
//!
//! The declarations are generated in front of the pass's own WGSL, so stage sources
//! refer to `uniforms.<name>`, `<texture name>` and `input.<attribute>` directly.
//!
//! [`Program::bind`] is the "set uniforms and activate" step: every value is checked
//! against its declared [`UniformKind`] and a mismatch is reported as
//! [`FlowFieldError::UniformTypeMismatch`] before anything reaches the GPU.

use std::fmt;
use std::fmt::Write as _;

use glam::{IVec2, IVec3, IVec4, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4};

use crate::error::{FlowFieldError, Result};

/// Component type a texture uniform is sampled as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSampleKind {
    Float,
    Sint,
    Uint,
}

impl TextureSampleKind {
    fn sample_type(self) -> wgpu::TextureSampleType {
        match self {
            TextureSampleKind::Float => wgpu::TextureSampleType::Float { filterable: false },
            TextureSampleKind::Sint => wgpu::TextureSampleType::Sint,
            TextureSampleKind::Uint => wgpu::TextureSampleType::Uint,
        }
    }
}

/// Declared type of a uniform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformKind {
    F32,
    I32,
    U32,
    Vec2,
    Vec3,
    Vec4,
    IVec2,
    IVec3,
    IVec4,
    UVec2,
    UVec3,
    UVec4,
    Texture(TextureSampleKind),
}

impl UniformKind {
    /// WGSL type name.
    pub fn wgsl_type(&self) -> &'static str {
        match self {
            UniformKind::F32 => "f32",
            UniformKind::I32 => "i32",
            UniformKind::U32 => "u32",
            UniformKind::Vec2 => "vec2<f32>",
            UniformKind::Vec3 => "vec3<f32>",
            UniformKind::Vec4 => "vec4<f32>",
            UniformKind::IVec2 => "vec2<i32>",
            UniformKind::IVec3 => "vec3<i32>",
            UniformKind::IVec4 => "vec4<i32>",
            UniformKind::UVec2 => "vec2<u32>",
            UniformKind::UVec3 => "vec3<u32>",
            UniformKind::UVec4 => "vec4<u32>",
            UniformKind::Texture(TextureSampleKind::Float) => "texture_2d<f32>",
            UniformKind::Texture(TextureSampleKind::Sint) => "texture_2d<i32>",
            UniformKind::Texture(TextureSampleKind::Uint) => "texture_2d<u32>",
        }
    }

    /// `(size, align)` inside the uniform block, `None` for textures.
    fn block_layout(&self) -> Option<(u32, u32)> {
        match self {
            UniformKind::F32 | UniformKind::I32 | UniformKind::U32 => Some((4, 4)),
            UniformKind::Vec2 | UniformKind::IVec2 | UniformKind::UVec2 => Some((8, 8)),
            UniformKind::Vec3 | UniformKind::IVec3 | UniformKind::UVec3 => Some((12, 16)),
            UniformKind::Vec4 | UniformKind::IVec4 | UniformKind::UVec4 => Some((16, 16)),
            UniformKind::Texture(_) => None,
        }
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wgsl_type())
    }
}

/// A value supplied for a uniform.
#[derive(Clone, Copy, Debug)]
pub enum UniformValue<'a> {
    F32(f32),
    I32(i32),
    U32(u32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    IVec2(IVec2),
    IVec3(IVec3),
    IVec4(IVec4),
    UVec2(UVec2),
    UVec3(UVec3),
    UVec4(UVec4),
    Texture {
        view: &'a wgpu::TextureView,
        sample: TextureSampleKind,
    },
}

impl<'a> UniformValue<'a> {
    pub fn uint_texture(view: &'a wgpu::TextureView) -> Self {
        UniformValue::Texture {
            view,
            sample: TextureSampleKind::Uint,
        }
    }

    pub fn float_texture(view: &'a wgpu::TextureView) -> Self {
        UniformValue::Texture {
            view,
            sample: TextureSampleKind::Float,
        }
    }

    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::F32(_) => UniformKind::F32,
            UniformValue::I32(_) => UniformKind::I32,
            UniformValue::U32(_) => UniformKind::U32,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::IVec2(_) => UniformKind::IVec2,
            UniformValue::IVec3(_) => UniformKind::IVec3,
            UniformValue::IVec4(_) => UniformKind::IVec4,
            UniformValue::UVec2(_) => UniformKind::UVec2,
            UniformValue::UVec3(_) => UniformKind::UVec3,
            UniformValue::UVec4(_) => UniformKind::UVec4,
            UniformValue::Texture { sample, .. } => UniformKind::Texture(*sample),
        }
    }

    /// Little-endian bytes of a block value; empty for textures.
    fn block_bytes(&self) -> &[u8] {
        match self {
            UniformValue::F32(v) => bytemuck::bytes_of(v),
            UniformValue::I32(v) => bytemuck::bytes_of(v),
            UniformValue::U32(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::bytes_of(v),
            UniformValue::Vec3(v) => bytemuck::bytes_of(v),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v),
            UniformValue::IVec2(v) => bytemuck::bytes_of(v),
            UniformValue::IVec3(v) => bytemuck::bytes_of(v),
            UniformValue::IVec4(v) => bytemuck::bytes_of(v),
            UniformValue::UVec2(v) => bytemuck::bytes_of(v),
            UniformValue::UVec3(v) => bytemuck::bytes_of(v),
            UniformValue::UVec4(v) => bytemuck::bytes_of(v),
            UniformValue::Texture { .. } => &[],
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue<'_> {
                fn from(v: $ty) -> Self {
                    UniformValue::$variant(v)
                }
            }
        )*
    };
}

impl_from_value!(
    f32 => F32,
    i32 => I32,
    u32 => U32,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    IVec2 => IVec2,
    IVec3 => IVec3,
    IVec4 => IVec4,
    UVec2 => UVec2,
    UVec3 => UVec3,
    UVec4 => UVec4,
);

/// A named uniform input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: &'static str,
    pub kind: UniformKind,
}

impl UniformDecl {
    pub const fn new(name: &'static str, kind: UniformKind) -> Self {
        Self { name, kind }
    }
}

/// A named per-vertex input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: &'static str,
    pub format: wgpu::VertexFormat,
}

impl AttributeDecl {
    pub const fn new(name: &'static str, format: wgpu::VertexFormat) -> Self {
        Self { name, format }
    }
}

/// Everything needed to build a [`Program`].
#[derive(Clone, Copy, Debug)]
pub struct ProgramDescriptor<'a> {
    pub label: &'a str,
    /// Vertex stage source; must define `vs_main`.
    pub vertex: &'a str,
    /// Fragment stage source; must define `fs_main`.
    pub fragment: &'a str,
    /// Shared snippets pasted before both stages.
    pub includes: &'a [&'a str],
    pub attributes: &'a [AttributeDecl],
    pub uniforms: &'a [UniformDecl],
}

/// Where a uniform lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Placement {
    Block { offset: u32 },
    Texture { binding: u32 },
}

#[derive(Clone, Copy, Debug)]
struct UniformSlot {
    name: &'static str,
    kind: UniformKind,
    placement: Placement,
}

/// Binding and vertex layout derived from a descriptor, independent of any device.
#[derive(Clone, Debug)]
pub struct ProgramLayout {
    label: String,
    slots: Vec<UniformSlot>,
    block_size: u32,
    attributes: Vec<wgpu::VertexAttribute>,
    attribute_names: Vec<&'static str>,
    vertex_stride: u64,
    source: String,
}

fn align_to(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

fn attribute_wgsl_type(format: wgpu::VertexFormat) -> Option<&'static str> {
    use wgpu::VertexFormat as F;
    Some(match format {
        F::Float32 => "f32",
        F::Float32x2 => "vec2<f32>",
        F::Float32x3 => "vec3<f32>",
        F::Float32x4 => "vec4<f32>",
        F::Uint32 => "u32",
        F::Uint32x2 => "vec2<u32>",
        F::Uint32x3 => "vec3<u32>",
        F::Uint32x4 => "vec4<u32>",
        F::Sint32 => "i32",
        F::Sint32x2 => "vec2<i32>",
        F::Sint32x3 => "vec3<i32>",
        F::Sint32x4 => "vec4<i32>",
        _ => return None,
    })
}

impl ProgramLayout {
    /// Assign block offsets, texture bindings and attribute locations, and generate
    /// the full WGSL source.
    pub fn new(desc: &ProgramDescriptor<'_>) -> Result<Self> {
        let mut slots = Vec::with_capacity(desc.uniforms.len());
        let mut offset = 0u32;
        let mut next_binding = 1u32;
        for decl in desc.uniforms {
            let placement = match decl.kind.block_layout() {
                Some((size, align)) => {
                    let start = align_to(offset, align);
                    offset = start + size;
                    Placement::Block { offset: start }
                }
                None => {
                    let binding = next_binding;
                    next_binding += 1;
                    Placement::Texture { binding }
                }
            };
            slots.push(UniformSlot {
                name: decl.name,
                kind: decl.kind,
                placement,
            });
        }
        let block_size = align_to(offset, 16).max(16);

        let mut attributes = Vec::with_capacity(desc.attributes.len());
        let mut attribute_offset = 0u64;
        for (location, attr) in desc.attributes.iter().enumerate() {
            if attribute_wgsl_type(attr.format).is_none() {
                return Err(FlowFieldError::UnsupportedAttribute {
                    program: desc.label.to_string(),
                    name: attr.name.to_string(),
                    format: attr.format,
                });
            }
            attributes.push(wgpu::VertexAttribute {
                format: attr.format,
                offset: attribute_offset,
                shader_location: location as u32,
            });
            attribute_offset += attr.format.size();
        }

        let mut layout = Self {
            label: desc.label.to_string(),
            slots,
            block_size,
            attributes,
            attribute_names: desc.attributes.iter().map(|a| a.name).collect(),
            vertex_stride: attribute_offset,
            source: String::new(),
        };
        layout.source = layout.compose(desc);
        Ok(layout)
    }

    fn compose(&self, desc: &ProgramDescriptor<'_>) -> String {
        let mut src = String::new();
        let _ = writeln!(src, "// {} program", self.label);

        src.push_str("struct Uniforms {\n");
        let mut any_block = false;
        for slot in &self.slots {
            if let Placement::Block { .. } = slot.placement {
                let _ = writeln!(src, "    {}: {},", slot.name, slot.kind.wgsl_type());
                any_block = true;
            }
        }
        if !any_block {
            src.push_str("    _padding: vec4<f32>,\n");
        }
        src.push_str("};\n\n");
        src.push_str("@group(0) @binding(0) var<uniform> uniforms: Uniforms;\n");
        for slot in &self.slots {
            if let Placement::Texture { binding } = slot.placement {
                let _ = writeln!(
                    src,
                    "@group(0) @binding({}) var {}: {};",
                    binding,
                    slot.name,
                    slot.kind.wgsl_type()
                );
            }
        }

        if !desc.attributes.is_empty() {
            src.push_str("\nstruct VertexInput {\n");
            for (attr, decl) in self.attributes.iter().zip(desc.attributes) {
                let ty = attribute_wgsl_type(decl.format).unwrap_or("f32");
                let _ = writeln!(src, "    @location({}) {}: {},", attr.shader_location, decl.name, ty);
            }
            src.push_str("};\n");
        }

        for include in desc.includes {
            src.push_str(include);
            src.push('\n');
        }
        src.push_str(desc.vertex);
        src.push('\n');
        src.push_str(desc.fragment);
        src.push('\n');
        src
    }

    /// Generated WGSL, including declarations and includes.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Size in bytes of the uniform block.
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Byte offset of a block uniform.
    pub fn uniform_offset(&self, name: &str) -> Option<u32> {
        self.slot(name).and_then(|s| match s.placement {
            Placement::Block { offset } => Some(offset),
            Placement::Texture { .. } => None,
        })
    }

    /// Binding slot of a texture uniform.
    pub fn texture_binding(&self, name: &str) -> Option<u32> {
        self.slot(name).and_then(|s| match s.placement {
            Placement::Texture { binding } => Some(binding),
            Placement::Block { .. } => None,
        })
    }

    pub fn uniform_kind(&self, name: &str) -> Option<UniformKind> {
        self.slot(name).map(|s| s.kind)
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attribute_names
            .iter()
            .position(|&n| n == name)
            .map(|i| self.attributes[i].shader_location)
    }

    pub fn vertex_stride(&self) -> u64 {
        self.vertex_stride
    }

    fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    fn slot_index(&self, name: &str) -> Result<usize> {
        self.slots
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| FlowFieldError::UnknownUniform {
                program: self.label.clone(),
                name: name.to_string(),
            })
    }

    fn check(&self, slot: &UniformSlot, value: &UniformValue<'_>) -> Result<()> {
        let found = value.kind();
        if found != slot.kind {
            return Err(FlowFieldError::UniformTypeMismatch {
                program: self.label.clone(),
                name: slot.name.to_string(),
                expected: slot.kind,
                found,
            });
        }
        Ok(())
    }

    /// Validate a full set of values and serialize the uniform block.
    ///
    /// Returns the block bytes and, per texture binding, the index into `values`.
    fn pack(&self, values: &[(&str, UniformValue<'_>)]) -> Result<(Vec<u8>, Vec<(u32, usize)>)> {
        let mut assigned = vec![false; self.slots.len()];
        let mut block = vec![0u8; self.block_size as usize];
        let mut textures = Vec::new();

        for (value_index, (name, value)) in values.iter().enumerate() {
            let index = self.slot_index(name)?;
            let slot = &self.slots[index];
            self.check(slot, value)?;
            match slot.placement {
                Placement::Block { offset } => {
                    let bytes = value.block_bytes();
                    let start = offset as usize;
                    block[start..start + bytes.len()].copy_from_slice(bytes);
                }
                Placement::Texture { binding } => textures.push((binding, value_index)),
            }
            assigned[index] = true;
        }

        if let Some(missing) = self.slots.iter().zip(&assigned).find(|(_, set)| !**set) {
            return Err(FlowFieldError::MissingUniform {
                program: self.label.clone(),
                name: missing.0.name.to_string(),
            });
        }

        textures.sort_by_key(|&(binding, _)| binding);
        Ok((block, textures))
    }

    fn bind_group_layout_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        let visibility = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for slot in &self.slots {
            if let (Placement::Texture { binding }, UniformKind::Texture(sample)) =
                (slot.placement, slot.kind)
            {
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility,
                    ty: wgpu::BindingType::Texture {
                        sample_type: sample.sample_type(),
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                });
            }
        }
        entries
    }
}

/// Color target and blending for [`Program::pipeline`].
#[derive(Clone, Copy, Debug)]
pub struct PipelineTarget {
    pub format: wgpu::TextureFormat,
    pub blend: Option<wgpu::BlendState>,
}

/// A compiled vertex + fragment program.
pub struct Program {
    layout: ProgramLayout,
    module: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_buffer: wgpu::Buffer,
}

impl Program {
    /// Compile the program. WGSL errors come back as [`FlowFieldError::ShaderCompile`]
    /// with the compiler's diagnostic.
    pub fn compile(device: &wgpu::Device, desc: &ProgramDescriptor<'_>) -> Result<Self> {
        let layout = ProgramLayout::new(desc)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.label),
            source: wgpu::ShaderSource::Wgsl(layout.source().into()),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            tracing::error!(program = desc.label, "shader compilation failed");
            return Err(FlowFieldError::ShaderCompile {
                program: desc.label.to_string(),
                diagnostic: error.to_string(),
            });
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(desc.label),
            entries: &layout.bind_group_layout_entries(),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: layout.block_size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        tracing::debug!(
            program = desc.label,
            block_size = layout.block_size(),
            "compiled program"
        );

        Ok(Self {
            layout,
            module,
            bind_group_layout,
            pipeline_layout,
            uniform_buffer,
        })
    }

    pub fn layout(&self) -> &ProgramLayout {
        &self.layout
    }

    pub fn label(&self) -> &str {
        self.layout.label()
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.layout.attribute_location(name)
    }

    pub fn vertex_buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.layout.vertex_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.layout.attributes,
        }
    }

    /// Link the stages into a triangle-list pipeline for `target`.
    pub fn pipeline(
        &self,
        device: &wgpu::Device,
        target: PipelineTarget,
    ) -> Result<wgpu::RenderPipeline> {
        let buffers = if self.layout.attributes.is_empty() {
            Vec::new()
        } else {
            vec![self.vertex_buffer_layout()]
        };

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(self.label()),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.module,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target.format,
                    blend: target.blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            tracing::error!(program = self.label(), "pipeline creation failed");
            return Err(FlowFieldError::PipelineLink {
                program: self.label().to_string(),
                diagnostic: error.to_string(),
            });
        }
        Ok(pipeline)
    }

    /// Set every uniform and produce the bind group that activates them.
    ///
    /// All declared uniforms must be present. The uniform block is written through the
    /// queue, so all bind groups made from this program before a submit see the last
    /// block written.
    pub fn bind(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        values: &[(&str, UniformValue<'_>)],
    ) -> Result<wgpu::BindGroup> {
        let (block, textures) = self.layout.pack(values)?;
        queue.write_buffer(&self.uniform_buffer, 0, &block);

        let mut entries = Vec::with_capacity(textures.len() + 1);
        entries.push(wgpu::BindGroupEntry {
            binding: 0,
            resource: self.uniform_buffer.as_entire_binding(),
        });
        for (binding, value_index) in textures {
            if let UniformValue::Texture { view, .. } = values[value_index].1 {
                entries.push(wgpu::BindGroupEntry {
                    binding,
                    resource: wgpu::BindingResource::TextureView(view),
                });
            }
        }

        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.label()),
            layout: &self.bind_group_layout,
            entries: &entries,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader_lib::validate_wgsl;

    const UNIFORMS: &[UniformDecl] = &[
        UniformDecl::new("time", UniformKind::F32),
        UniformDecl::new("resolution", UniformKind::Vec2),
        UniformDecl::new("source", UniformKind::Texture(TextureSampleKind::Uint)),
        UniformDecl::new("tint", UniformKind::Vec3),
        UniformDecl::new("count", UniformKind::I32),
        UniformDecl::new("extra", UniformKind::Texture(TextureSampleKind::Float)),
    ];

    const ATTRIBUTES: &[AttributeDecl] = &[
        AttributeDecl::new("point", wgpu::VertexFormat::Uint32),
        AttributeDecl::new("side", wgpu::VertexFormat::Sint32),
    ];

    const VERTEX: &str = r#"
@vertex
fn vs_main(input: VertexInput) -> @builtin(position) vec4<f32> {
    let x = f32(input.point) * uniforms.time + f32(input.side);
    return vec4<f32>(x, uniforms.resolution.y, 0.0, 1.0);
}
"#;

    const FRAGMENT: &str = r#"
@fragment
fn fs_main(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    let a = textureLoad(source, vec2<i32>(pos.xy), 0);
    let b = textureLoad(extra, vec2<i32>(pos.xy), 0);
    return vec4<f32>(uniforms.tint * f32(a.x + u32(uniforms.count)), b.x);
}
"#;

    fn descriptor() -> ProgramDescriptor<'static> {
        ProgramDescriptor {
            label: "test",
            vertex: VERTEX,
            fragment: FRAGMENT,
            includes: &[],
            attributes: ATTRIBUTES,
            uniforms: UNIFORMS,
        }
    }

    #[test]
    fn test_block_offsets_follow_wgsl_alignment() {
        let layout = ProgramLayout::new(&descriptor()).unwrap();
        assert_eq!(layout.uniform_offset("time"), Some(0));
        assert_eq!(layout.uniform_offset("resolution"), Some(8));
        assert_eq!(layout.uniform_offset("tint"), Some(16));
        assert_eq!(layout.uniform_offset("count"), Some(28));
        assert_eq!(layout.block_size(), 32);
    }

    #[test]
    fn test_textures_get_sequential_bindings() {
        let layout = ProgramLayout::new(&descriptor()).unwrap();
        assert_eq!(layout.texture_binding("source"), Some(1));
        assert_eq!(layout.texture_binding("extra"), Some(2));
        assert_eq!(layout.texture_binding("time"), None);
        assert_eq!(layout.uniform_offset("source"), None);
    }

    #[test]
    fn test_attribute_locations() {
        let layout = ProgramLayout::new(&descriptor()).unwrap();
        assert_eq!(layout.attribute_location("point"), Some(0));
        assert_eq!(layout.attribute_location("side"), Some(1));
        assert_eq!(layout.attribute_location("missing"), None);
        assert_eq!(layout.vertex_stride(), 8);
    }

    #[test]
    fn test_generated_source_is_valid_wgsl() {
        let layout = ProgramLayout::new(&descriptor()).unwrap();
        if let Err(e) = validate_wgsl(layout.source()) {
            panic!("{}\n\n{}", e, layout.source());
        }
    }

    #[test]
    fn test_pack_rejects_type_mismatch() {
        let layout = ProgramLayout::new(&descriptor()).unwrap();
        let err = layout.pack(&[("time", UniformValue::Vec2(Vec2::ONE))]).unwrap_err();
        match err {
            FlowFieldError::UniformTypeMismatch {
                name,
                expected,
                found,
                ..
            } => {
                assert_eq!(name, "time");
                assert_eq!(expected, UniformKind::F32);
                assert_eq!(found, UniformKind::Vec2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pack_rejects_unknown_and_missing() {
        let layout = ProgramLayout::new(&descriptor()).unwrap();
        assert!(matches!(
            layout.pack(&[("nope", 1.0f32.into())]),
            Err(FlowFieldError::UnknownUniform { .. })
        ));
        assert!(matches!(
            layout.pack(&[("time", 1.0f32.into())]),
            Err(FlowFieldError::MissingUniform { .. })
        ));
    }

    #[test]
    fn test_pack_writes_values_at_offsets() {
        let desc = ProgramDescriptor {
            uniforms: &[
                UniformDecl::new("a", UniformKind::F32),
                UniformDecl::new("b", UniformKind::IVec2),
            ],
            ..descriptor()
        };
        let layout = ProgramLayout::new(&desc).unwrap();
        let (block, textures) = layout
            .pack(&[("b", IVec2::new(-1, 7).into()), ("a", 2.5f32.into())])
            .unwrap();
        assert!(textures.is_empty());
        assert_eq!(block.len(), 16);
        assert_eq!(&block[0..4], &2.5f32.to_le_bytes());
        assert_eq!(&block[8..12], &(-1i32).to_le_bytes());
        assert_eq!(&block[12..16], &7i32.to_le_bytes());
    }

    #[test]
    fn test_unsupported_attribute_format() {
        let desc = ProgramDescriptor {
            attributes: &[AttributeDecl::new("packed", wgpu::VertexFormat::Unorm8x4)],
            ..descriptor()
        };
        assert!(matches!(
            ProgramLayout::new(&desc),
            Err(FlowFieldError::UnsupportedAttribute { .. })
        ));
    }
}
