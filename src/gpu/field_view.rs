//! Debug view of the direction field.
//!
//! Draws the current noise field fullscreen, one hue per encoded angle. Useful for
//! checking the noise parameters independently of the traced lines.

use crate::error::Result;
use crate::program::{
    AttributeDecl, PipelineTarget, Program, ProgramDescriptor, TextureSampleKind, UniformDecl,
    UniformKind, UniformValue,
};
use crate::shader_lib::{COLOR_WGSL, ENCODING_WGSL, FULLSCREEN_VERTEX_WGSL};

use super::begin_color_pass;

const FRAGMENT: &str = r#"
@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let size = vec2<i32>(textureDimensions(field_texture));
    let texel = clamp(vec2<i32>(floor(in.clip_position.xy)), vec2<i32>(0), size - vec2<i32>(1));
    let encoded = textureLoad(field_texture, texel, 0).x;
    let turns = f32(encoded) / FIXED_POINT_MAX;
    let rgb = hsv_to_rgb(turns, 0.6, 0.9) * uniforms.opacity;
    return vec4<f32>(rgb, uniforms.opacity);
}
"#;

const ATTRIBUTES: &[AttributeDecl] = &[AttributeDecl::new(
    "position",
    wgpu::VertexFormat::Float32x2,
)];

const UNIFORMS: &[UniformDecl] = &[
    UniformDecl::new("field_texture", UniformKind::Texture(TextureSampleKind::Uint)),
    UniformDecl::new("opacity", UniformKind::F32),
];

const INCLUDES: &[&str] = &[ENCODING_WGSL, COLOR_WGSL];

pub(crate) fn descriptor() -> ProgramDescriptor<'static> {
    ProgramDescriptor {
        label: "field view",
        vertex: FULLSCREEN_VERTEX_WGSL,
        fragment: FRAGMENT,
        includes: INCLUDES,
        attributes: ATTRIBUTES,
        uniforms: UNIFORMS,
    }
}

pub struct FieldViewPass {
    program: Program,
    pipeline: wgpu::RenderPipeline,
}

impl FieldViewPass {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Result<Self> {
        let program = Program::compile(device, &descriptor())?;
        let pipeline = program.pipeline(
            device,
            PipelineTarget {
                format: target_format,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            },
        )?;
        Ok(Self { program, pipeline })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        fullscreen: &wgpu::Buffer,
        target: &wgpu::TextureView,
        field: &wgpu::TextureView,
        opacity: f32,
        clear: Option<wgpu::Color>,
    ) -> Result<()> {
        let bind_group = self.program.bind(
            device,
            queue,
            &[
                ("field_texture", UniformValue::uint_texture(field)),
                ("opacity", opacity.clamp(0.0, 1.0).into()),
            ],
        )?;

        let load = clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear);
        let mut pass = begin_color_pass(encoder, "Field View Pass", target, load);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_vertex_buffer(0, fullscreen.slice(..));
        pass.draw(0..3, 0..1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ProgramLayout;
    use crate::shader_lib::validate_wgsl;

    #[test]
    fn test_field_view_program_is_valid_wgsl() {
        let layout = ProgramLayout::new(&descriptor()).unwrap();
        if let Err(e) = validate_wgsl(layout.source()) {
            panic!("{}\n\n{}", e, layout.source());
        }
    }
}
