//! Noise field generation.
//!
//! A fullscreen pass that sums `harmonics` octaves of simplex noise per pixel and
//! writes the result, read as an angle, into the `R16Uint` field texture.

use crate::error::Result;
use crate::frame::FrameContext;
use crate::params::NoiseParams;
use crate::program::{
    AttributeDecl, PipelineTarget, Program, ProgramDescriptor, UniformDecl, UniformKind,
};
use crate::shader_lib::{ENCODING_WGSL, FULLSCREEN_VERTEX_WGSL, NOISE_WGSL};

use super::{begin_color_pass, FIELD_FORMAT};

/// CSS pixels spanned by one unit of noise input at frequency 1.
pub const NOISE_CELL_SIZE: f32 = 512.0;

const FRAGMENT: &str = r#"
@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<u32> {
    let base = in.clip_position.xy / uniforms.screen_dpr / NOISE_CELL_SIZE;
    let drift = vec2<f32>(uniforms.time * uniforms.speed);

    var sum = 0.0;
    var frequency = uniforms.frequency;
    var amplitude = uniforms.amplitude;
    for (var i = 0; i < uniforms.harmonics; i++) {
        let p = base * frequency + uniforms.harmonic_travel * f32(i) + drift;
        sum += simplex2(p) * amplitude;
        frequency *= uniforms.harmonic_spread;
        amplitude *= uniforms.harmonic_gain;
    }

    return vec4<u32>(encode_angle(sum), 0u, 0u, 0u);
}
"#;

const ATTRIBUTES: &[AttributeDecl] = &[AttributeDecl::new(
    "position",
    wgpu::VertexFormat::Float32x2,
)];

const UNIFORMS: &[UniformDecl] = &[
    UniformDecl::new("time", UniformKind::F32),
    UniformDecl::new("screen_dpr", UniformKind::F32),
    UniformDecl::new("resolution", UniformKind::Vec2),
    UniformDecl::new("frequency", UniformKind::F32),
    UniformDecl::new("amplitude", UniformKind::F32),
    UniformDecl::new("harmonics", UniformKind::I32),
    UniformDecl::new("harmonic_spread", UniformKind::F32),
    UniformDecl::new("harmonic_gain", UniformKind::F32),
    UniformDecl::new("speed", UniformKind::F32),
    UniformDecl::new("harmonic_travel", UniformKind::Vec2),
];

fn cell_size_wgsl() -> String {
    format!("const NOISE_CELL_SIZE: f32 = {:.1};\n", NOISE_CELL_SIZE)
}

pub(crate) fn descriptor<'a>(includes: &'a [&'a str]) -> ProgramDescriptor<'a> {
    ProgramDescriptor {
        label: "noise field",
        vertex: FULLSCREEN_VERTEX_WGSL,
        fragment: FRAGMENT,
        includes,
        attributes: ATTRIBUTES,
        uniforms: UNIFORMS,
    }
}

/// Fullscreen noise pass.
pub struct NoisePass {
    program: Program,
    pipeline: wgpu::RenderPipeline,
}

impl NoisePass {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let cell_size = cell_size_wgsl();
        let includes = [ENCODING_WGSL, NOISE_WGSL, cell_size.as_str()];
        let program = Program::compile(device, &descriptor(&includes))?;
        let pipeline = program.pipeline(
            device,
            PipelineTarget {
                format: FIELD_FORMAT,
                blend: None,
            },
        )?;
        Ok(Self { program, pipeline })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Overwrite every pixel of `field` for the current frame.
    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        fullscreen: &wgpu::Buffer,
        field: &wgpu::TextureView,
        frame: &FrameContext,
        noise: &NoiseParams,
    ) -> Result<()> {
        let harmonics = i32::try_from(noise.harmonics).unwrap_or(i32::MAX);
        let bind_group = self.program.bind(
            device,
            queue,
            &[
                ("time", frame.time_secs().into()),
                ("screen_dpr", frame.device_pixel_ratio.into()),
                ("resolution", frame.resolution().into()),
                ("frequency", noise.frequency.into()),
                ("amplitude", noise.amplitude.into()),
                ("harmonics", harmonics.into()),
                ("harmonic_spread", noise.harmonic_spread.into()),
                ("harmonic_gain", noise.harmonic_gain.into()),
                ("speed", noise.speed.into()),
                ("harmonic_travel", noise.harmonic_travel.into()),
            ],
        )?;

        let mut pass = begin_color_pass(
            encoder,
            "Noise Field Pass",
            field,
            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
        );
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_vertex_buffer(0, fullscreen.slice(..));
        pass.draw(0..3, 0..1);
        Ok(())
    }
}
