//! WGSL snippets shared by the render passes.
//!
//! Passes list the snippets they need in [`ProgramDescriptor::includes`](crate::program::ProgramDescriptor);
//! the program wrapper pastes them between the generated declarations and the stage
//! sources.
//!
//! ## Encoding
//! - `encode_angle(angle: f32) -> u32`, `decode_angle(value: u32) -> f32`
//! - `direction_angle(value: u32, field_amplitude: f32) -> f32`
//! - `encode_position(px: vec2<f32>, resolution: vec2<f32>) -> vec2<u32>`
//! - `decode_position(value: vec2<u32>, resolution: vec2<f32>) -> vec2<f32>`
//!
//! ## Noise
//! - `simplex2(v: vec2<f32>) -> f32` - 2D simplex noise in roughly [-1, 1]
//!
//! ## Color
//! - `hsv_to_rgb(h: f32, s: f32, v: f32) -> vec3<f32>`
//!
//! ## Fullscreen
//! - `vs_main` for a single oversized triangle, forwarding the instance index as a
//!   flat varying.

/// Fixed-point angle and position codecs. Mirrors [`crate::encoding`].
pub const ENCODING_WGSL: &str = r#"
const PI: f32 = 3.14159265358979;
const TAU: f32 = 6.28318530717959;
const FIXED_POINT_MAX: f32 = 65535.0;

fn encode_angle(angle: f32) -> u32 {
    return u32(round(fract(angle / TAU) * FIXED_POINT_MAX));
}

fn decode_angle(value: u32) -> f32 {
    return f32(value) / FIXED_POINT_MAX * TAU;
}

// Re-centered on zero; the noise's largest magnitude maps to half a turn.
fn direction_angle(value: u32, field_amplitude: f32) -> f32 {
    var angle = decode_angle(value);
    if angle > PI {
        angle -= TAU;
    }
    if field_amplitude > 0.0 {
        angle = angle / field_amplitude * PI;
    }
    return angle;
}

fn encode_position(px: vec2<f32>, resolution: vec2<f32>) -> vec2<u32> {
    let normalized = clamp(px / resolution, vec2<f32>(0.0), vec2<f32>(1.0));
    return vec2<u32>(round(normalized * FIXED_POINT_MAX));
}

fn decode_position(value: vec2<u32>, resolution: vec2<f32>) -> vec2<f32> {
    return vec2<f32>(value) / FIXED_POINT_MAX * resolution;
}
"#;

/// 2D simplex noise.
pub const NOISE_WGSL: &str = r#"
fn mod289_2(x: vec2<f32>) -> vec2<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn mod289_3(x: vec3<f32>) -> vec3<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn permute3(x: vec3<f32>) -> vec3<f32> {
    return mod289_3(((x * 34.0) + 1.0) * x);
}

fn simplex2(v: vec2<f32>) -> f32 {
    let C = vec4<f32>(0.211324865405187, 0.366025403784439, -0.577350269189626, 0.024390243902439);

    // First corner
    var i = floor(v + dot(v, C.yy));
    let x0 = v - i + dot(i, C.xx);

    // Other corners
    var i1 = vec2<f32>(0.0, 1.0);
    if x0.x > x0.y {
        i1 = vec2<f32>(1.0, 0.0);
    }
    var x12 = x0.xyxy + C.xxzz;
    x12 = vec4<f32>(x12.xy - i1, x12.zw);

    // Permutations
    i = mod289_2(i);
    let p = permute3(permute3(i.y + vec3<f32>(0.0, i1.y, 1.0)) + i.x + vec3<f32>(0.0, i1.x, 1.0));

    var m = max(0.5 - vec3<f32>(dot(x0, x0), dot(x12.xy, x12.xy), dot(x12.zw, x12.zw)), vec3<f32>(0.0));
    m = m * m;
    m = m * m;

    // Gradients: 41 points uniformly over a line, mapped onto a diamond
    let x = 2.0 * fract(p * C.www) - 1.0;
    let h = abs(x) - 0.5;
    let ox = floor(x + 0.5);
    let a0 = x - ox;

    // Normalise gradients implicitly by scaling m
    m = m * (1.79284291400159 - 0.85373472095314 * (a0 * a0 + h * h));

    let g = vec3<f32>(a0.x * x0.x + h.x * x0.y, a0.yz * x12.xz + h.yz * x12.yw);
    return 130.0 * dot(m, g);
}
"#;

/// Color helpers.
pub const COLOR_WGSL: &str = r#"
// h: hue [0, 1], s: saturation [0, 1], v: value [0, 1]
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> vec3<f32> {
    let c = v * s;
    let hp = fract(h) * 6.0;
    let x = c * (1.0 - abs(hp % 2.0 - 1.0));
    let m = v - c;

    var rgb: vec3<f32>;
    if hp < 1.0 {
        rgb = vec3<f32>(c, x, 0.0);
    } else if hp < 2.0 {
        rgb = vec3<f32>(x, c, 0.0);
    } else if hp < 3.0 {
        rgb = vec3<f32>(0.0, c, x);
    } else if hp < 4.0 {
        rgb = vec3<f32>(0.0, x, c);
    } else if hp < 5.0 {
        rgb = vec3<f32>(x, 0.0, c);
    } else {
        rgb = vec3<f32>(c, 0.0, x);
    }

    return rgb + vec3<f32>(m, m, m);
}
"#;

/// Vertex stage for the fullscreen passes. Expects a `VertexInput` with a
/// `position: vec2<f32>` attribute.
pub const FULLSCREEN_VERTEX_WGSL: &str = r#"
struct FullscreenOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) @interpolate(flat) instance: u32,
};

@vertex
fn vs_main(input: VertexInput, @builtin(instance_index) instance: u32) -> FullscreenOutput {
    var out: FullscreenOutput;
    out.clip_position = vec4<f32>(input.position, 0.0, 1.0);
    out.instance = instance;
    return out;
}
"#;

/// Corners of a triangle that covers all of clip space.
pub const FULLSCREEN_TRIANGLE: [f32; 6] = [-1.0, 3.0, -1.0, -1.0, 3.0, -1.0];

/// Parse and validate a WGSL module with naga.
#[cfg(test)]
pub(crate) fn validate_wgsl(code: &str) -> Result<(), String> {
    let module = naga::front::wgsl::parse_str(code)
        .map_err(|e| format!("WGSL parse error: {}", e.emit_to_string(code)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("WGSL validation error: {:?}", e))?;

    Ok(())
}
