//! Line tracing through the noise field.
//!
//! Each step is its own render pass over the temp position grid, restricted to rows
//! `step` and `step + 1`. Row `step` is copied from the primary grid and row `step + 1`
//! is that row advanced one step along the field. After the pass the roles swap, so
//! the freshly written grid becomes the source of the next step.
//!
//! Because every step rewrites the row it reads from, a grid that was primary after
//! step `k` holds valid rows `0..=k+1`, and both grids agree on row 0. After
//! `num_line_points - 1` steps every row of the primary grid is defined.

use glam::Vec2;

use crate::error::Result;
use crate::program::{
    AttributeDecl, PipelineTarget, Program, ProgramDescriptor, TextureSampleKind, UniformDecl,
    UniformKind, UniformValue,
};
use crate::shader_lib::{ENCODING_WGSL, FULLSCREEN_VERTEX_WGSL};

use super::{begin_color_pass, PositionSlot, PositionTextures, POSITION_FORMAT};

// The step index arrives through the instance range of the draw.
const FRAGMENT: &str = r#"
@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<u32> {
    let texel = vec2<i32>(floor(in.clip_position.xy));
    let step_row = i32(in.instance);
    let source = textureLoad(positions_texture, vec2<i32>(texel.x, step_row), 0).xy;

    if texel.y <= step_row {
        return vec4<u32>(source, 0u, 0u);
    }

    let position = decode_position(source, uniforms.resolution);
    let field_size = vec2<i32>(textureDimensions(field_texture));
    let sample_at = clamp(vec2<i32>(floor(position)), vec2<i32>(0), field_size - vec2<i32>(1));
    let encoded = textureLoad(field_texture, sample_at, 0).x;

    let angle = direction_angle(encoded, uniforms.field_amplitude);
    let next = position + vec2<f32>(cos(angle), sin(angle)) * uniforms.step_size * uniforms.screen_dpr;
    return vec4<u32>(encode_position(next, uniforms.resolution), 0u, 0u);
}
"#;

const ATTRIBUTES: &[AttributeDecl] = &[AttributeDecl::new(
    "position",
    wgpu::VertexFormat::Float32x2,
)];

const UNIFORMS: &[UniformDecl] = &[
    UniformDecl::new(
        "positions_texture",
        UniformKind::Texture(TextureSampleKind::Uint),
    ),
    UniformDecl::new("field_texture", UniformKind::Texture(TextureSampleKind::Uint)),
    UniformDecl::new("field_amplitude", UniformKind::F32),
    UniformDecl::new("step_size", UniformKind::F32),
    UniformDecl::new("screen_dpr", UniformKind::F32),
    UniformDecl::new("resolution", UniformKind::Vec2),
];

const INCLUDES: &[&str] = &[ENCODING_WGSL];

pub(crate) fn descriptor() -> ProgramDescriptor<'static> {
    ProgramDescriptor {
        label: "line trace",
        vertex: FULLSCREEN_VERTEX_WGSL,
        fragment: FRAGMENT,
        includes: INCLUDES,
        attributes: ATTRIBUTES,
        uniforms: UNIFORMS,
    }
}

/// Per-frame inputs to the tracer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceSettings {
    /// Viewport size in device pixels.
    pub resolution: Vec2,
    pub screen_dpr: f32,
    /// Step length in CSS pixels.
    pub step_size: f32,
    /// Largest magnitude the noise can reach this frame.
    pub field_amplitude: f32,
}

pub struct TracePass {
    program: Program,
    pipeline: wgpu::RenderPipeline,
}

impl TracePass {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let program = Program::compile(device, &descriptor())?;
        let pipeline = program.pipeline(
            device,
            PipelineTarget {
                format: POSITION_FORMAT,
                blend: None,
            },
        )?;
        Ok(Self { program, pipeline })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Record the full trace loop. Returns the number of step passes issued.
    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        fullscreen: &wgpu::Buffer,
        positions: &mut PositionTextures,
        field: &wgpu::TextureView,
        settings: &TraceSettings,
    ) -> Result<u32> {
        let steps = positions.num_line_points().saturating_sub(1);
        if steps == 0 {
            return Ok(0);
        }

        // One bind group per possible source grid.
        let bind_groups = [PositionSlot::A, PositionSlot::B].map(|slot| {
            self.program.bind(
                device,
                queue,
                &[
                    ("positions_texture", UniformValue::uint_texture(positions.view(slot))),
                    ("field_texture", UniformValue::uint_texture(field)),
                    ("field_amplitude", settings.field_amplitude.into()),
                    ("step_size", settings.step_size.into()),
                    ("screen_dpr", settings.screen_dpr.into()),
                    ("resolution", settings.resolution.into()),
                ],
            )
        });
        let [bind_a, bind_b] = bind_groups;
        let bind_groups = [bind_a?, bind_b?];

        let num_lines = positions.num_lines();
        for step in 0..steps {
            let source = positions.primary();
            {
                let mut pass = begin_color_pass(
                    encoder,
                    "Line Trace Pass",
                    positions.view(source.other()),
                    wgpu::LoadOp::Load,
                );
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &bind_groups[source.index()], &[]);
                pass.set_vertex_buffer(0, fullscreen.slice(..));
                pass.set_viewport(0.0, step as f32, num_lines as f32, 2.0, 0.0, 1.0);
                pass.set_scissor_rect(0, step, num_lines, 2);
                pass.draw(0..3, step..step + 1);
            }
            positions.swap();
        }

        Ok(steps)
    }
}
