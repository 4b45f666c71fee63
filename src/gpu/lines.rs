//! Instanced ribbon rendering of the traced lines.
//!
//! One instance per line, drawn over the shared [`LineGeometry`]. The vertex stage
//! fetches its point from the primary position grid, offsets it along the line normal,
//! and the fragment stage feathers the ribbon edge.

use glam::Vec2;
use wgpu::util::DeviceExt;

use crate::error::Result;
use crate::geometry::{LineGeometry, LineVertex};
use crate::program::{
    AttributeDecl, PipelineTarget, Program, ProgramDescriptor, TextureSampleKind, UniformDecl,
    UniformKind, UniformValue,
};
use crate::shader_lib::ENCODING_WGSL;

use super::begin_color_pass;

/// Width of the antialiased fade at each ribbon edge, in CSS pixels.
pub const LINE_FEATHER_WIDTH: f32 = 2.0;

const VERTEX: &str = r#"
struct LineOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) edge: f32,
    @location(1) fade: f32,
};

fn load_point(line_index: u32, point_index: i32) -> vec2<f32> {
    let encoded = textureLoad(positions_texture, vec2<i32>(i32(line_index), point_index), 0).xy;
    return decode_position(encoded, uniforms.resolution);
}

@vertex
fn vs_main(input: VertexInput, @builtin(instance_index) line_index: u32) -> LineOutput {
    let point_index = i32(input.line_point);
    let last = uniforms.num_line_points - 1;
    let here = load_point(line_index, point_index);

    var tangent = vec2<f32>(0.0);
    if point_index < last {
        tangent = load_point(line_index, point_index + 1) - here;
    } else if point_index > 0 {
        tangent = here - load_point(line_index, point_index - 1);
    }
    let segment = length(tangent);
    var direction = vec2<f32>(1.0, 0.0);
    if segment > 1e-4 {
        direction = tangent / segment;
    }
    let normal = vec2<f32>(-direction.y, direction.x);

    let half_extent = (uniforms.line_width * 0.5 + uniforms.line_feather_width) * uniforms.screen_dpr;
    let side = f32(input.side);
    let shifted = here + normal * side * half_extent;
    let ndc = shifted / uniforms.resolution * 2.0 - 1.0;

    var out: LineOutput;
    out.clip_position = vec4<f32>(ndc.x, -ndc.y, 0.0, 1.0);
    out.edge = side * half_extent;
    // Segments pinned against the viewport edge shrink and fade out.
    let expected = max(uniforms.step_size * uniforms.screen_dpr, 1e-4);
    out.fade = clamp(segment / expected, 0.0, 1.0);
    return out;
}
"#;

const FRAGMENT: &str = r#"
@fragment
fn fs_main(in: LineOutput) -> @location(0) vec4<f32> {
    let half_width = uniforms.line_width * 0.5 * uniforms.screen_dpr;
    let feather = max(uniforms.line_feather_width * uniforms.screen_dpr, 1e-4);
    let coverage = clamp((half_width + feather - abs(in.edge)) / feather, 0.0, 1.0);
    let alpha = uniforms.line_alpha * coverage * in.fade;
    return vec4<f32>(alpha, alpha, alpha, alpha);
}
"#;

const ATTRIBUTES: &[AttributeDecl] = &[
    AttributeDecl::new("line_point", wgpu::VertexFormat::Uint32),
    AttributeDecl::new("side", wgpu::VertexFormat::Sint32),
];

const UNIFORMS: &[UniformDecl] = &[
    UniformDecl::new(
        "positions_texture",
        UniformKind::Texture(TextureSampleKind::Uint),
    ),
    UniformDecl::new("resolution", UniformKind::Vec2),
    UniformDecl::new("screen_dpr", UniformKind::F32),
    UniformDecl::new("line_width", UniformKind::F32),
    UniformDecl::new("line_feather_width", UniformKind::F32),
    UniformDecl::new("line_alpha", UniformKind::F32),
    UniformDecl::new("num_line_points", UniformKind::I32),
    UniformDecl::new("step_size", UniformKind::F32),
];

const INCLUDES: &[&str] = &[ENCODING_WGSL];

pub(crate) fn descriptor() -> ProgramDescriptor<'static> {
    ProgramDescriptor {
        label: "lines",
        vertex: VERTEX,
        fragment: FRAGMENT,
        includes: INCLUDES,
        attributes: ATTRIBUTES,
        uniforms: UNIFORMS,
    }
}

/// Per-frame inputs to the line renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineStyle {
    pub resolution: Vec2,
    pub screen_dpr: f32,
    pub line_width: f32,
    pub line_alpha: f32,
    pub step_size: f32,
}

/// Uploaded [`LineGeometry`].
struct LineMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    num_line_points: u32,
}

impl LineMesh {
    fn new(device: &wgpu::Device, num_line_points: u32) -> Self {
        let geometry = LineGeometry::new(num_line_points);
        // Zero-sized buffers are not allowed; fewer than two points still get valid buffers.
        let vertices: &[LineVertex] = if geometry.vertices.is_empty() {
            &[LineVertex { line_point: 0, side: -1 }]
        } else {
            &geometry.vertices
        };
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Line Vertex Buffer"),
            contents: bytemuck::cast_slice::<LineVertex, u8>(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices: &[u32] = if geometry.indices.is_empty() {
            &[0]
        } else {
            &geometry.indices
        };
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Line Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: geometry.index_count(),
            num_line_points,
        }
    }

    fn byte_size(&self) -> u64 {
        self.vertex_buffer.size() + self.index_buffer.size()
    }
}

pub struct LinesPass {
    program: Program,
    pipeline: wgpu::RenderPipeline,
    mesh: LineMesh,
}

impl LinesPass {
    pub fn new(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        num_line_points: u32,
    ) -> Result<Self> {
        let program = Program::compile(device, &descriptor())?;
        let pipeline = program.pipeline(
            device,
            PipelineTarget {
                format: target_format,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            },
        )?;
        Ok(Self {
            program,
            pipeline,
            mesh: LineMesh::new(device, num_line_points),
        })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Rebuild the ribbon geometry for a new point count.
    pub fn set_num_line_points(&mut self, device: &wgpu::Device, num_line_points: u32) {
        if self.mesh.num_line_points != num_line_points {
            self.mesh = LineMesh::new(device, num_line_points);
            tracing::debug!(num_line_points, "rebuilt line geometry");
        }
    }

    pub fn index_count(&self) -> u32 {
        self.mesh.index_count
    }

    pub fn geometry_byte_size(&self) -> u64 {
        self.mesh.byte_size()
    }

    /// Draw `num_lines` ribbons. `clear` clears the target first.
    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        positions: &wgpu::TextureView,
        num_lines: u32,
        style: &LineStyle,
        clear: Option<wgpu::Color>,
    ) -> Result<()> {
        let load = match clear {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };

        if self.mesh.index_count == 0 || num_lines == 0 {
            // Still honor the clear.
            if clear.is_some() {
                let _pass = begin_color_pass(encoder, "Lines Pass", target, load);
            }
            return Ok(());
        }

        let num_line_points = i32::try_from(self.mesh.num_line_points).unwrap_or(i32::MAX);
        let bind_group = self.program.bind(
            device,
            queue,
            &[
                ("positions_texture", UniformValue::uint_texture(positions)),
                ("resolution", style.resolution.into()),
                ("screen_dpr", style.screen_dpr.into()),
                ("line_width", style.line_width.into()),
                ("line_feather_width", LINE_FEATHER_WIDTH.into()),
                ("line_alpha", style.line_alpha.into()),
                ("num_line_points", num_line_points.into()),
                ("step_size", style.step_size.into()),
            ],
        )?;

        let mut pass = begin_color_pass(encoder, "Lines Pass", target, load);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.mesh.index_count, 0, 0..num_lines);
        Ok(())
    }
}
