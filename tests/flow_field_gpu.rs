//! GPU integration tests for the flow field engine.
//!
//! These need an adapter. On machines without one every test prints a note and
//! returns early instead of failing.

use flowfield::encoding::{advance, decode_position};
use flowfield::gpu::read_texture;
use flowfield::positions::starting_positions;
use flowfield::program::{
    AttributeDecl, Program, ProgramDescriptor, UniformDecl, UniformKind, UniformValue,
};
use flowfield::{
    FlowField, FlowFieldError, FrameContext, GpuContext, NoiseParams, PositionSlot,
    SimulationParams, UVec2, Vec2,
};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const VIEWPORT: UVec2 = UVec2::new(64, 64);

fn gpu() -> Option<GpuContext> {
    match pollster::block_on(GpuContext::headless()) {
        Ok(gpu) => Some(gpu),
        Err(e) => {
            eprintln!("skipping GPU test: {}", e);
            None
        }
    }
}

fn frame() -> FrameContext {
    FrameContext::new(VIEWPORT, 1.0, 0.0)
}

fn flow_field(gpu: &GpuContext, params: SimulationParams) -> FlowField {
    FlowField::new(&gpu.device, &gpu.queue, TARGET_FORMAT, VIEWPORT, params).unwrap()
}

fn run_update(gpu: &GpuContext, flow_field: &mut FlowField) {
    run_update_with(gpu, flow_field, &frame());
}

fn run_update_with(gpu: &GpuContext, flow_field: &mut FlowField, ctx: &FrameContext) {
    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    flow_field
        .update(&gpu.device, &gpu.queue, &mut encoder, ctx)
        .unwrap();
    gpu.queue.submit(std::iter::once(encoder.finish()));
}

/// A readable color target.
fn render_target(gpu: &GpuContext, size: UVec2) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Test Target"),
        size: wgpu::Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

/// RGBA8 pixels of `texture`, row-major.
fn read_pixels(gpu: &GpuContext, texture: &wgpu::Texture) -> Vec<[u8; 4]> {
    read_texture(&gpu.device, &gpu.queue, texture, 4)
        .unwrap()
        .chunks_exact(4)
        .map(|p| [p[0], p[1], p[2], p[3]])
        .collect()
}

/// Draw the current lines into `view`, cleared to black first.
fn draw_lines(gpu: &GpuContext, ff: &mut FlowField, view: &wgpu::TextureView, ctx: &FrameContext) {
    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    ff.draw(&gpu.device, &gpu.queue, &mut encoder, view, ctx, Some(wgpu::Color::BLACK))
        .unwrap();
    gpu.queue.submit(std::iter::once(encoder.finish()));
}

/// Distance from `p` to the segment `a..b`.
fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let t = if ab.length_squared() > 0.0 {
        ((p - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0)
    } else {
        0.0
    };
    p.distance(a + ab * t)
}

fn straight_params() -> SimulationParams {
    SimulationParams::default()
        .with_seed("test")
        .with_num_lines(4)
        .with_num_line_points(3)
        .with_step_size(1.0)
        .with_noise(NoiseParams::default().with_amplitude(0.0))
}

// ============================================================================
// Trace sequencing
// ============================================================================

#[test]
fn test_update_records_one_pass_per_step() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, SimulationParams::default().with_num_lines(16).with_num_line_points(9));
    run_update(&gpu, &mut ff);
    assert_eq!(ff.trace_passes(), 8);
}

#[test]
fn test_primary_alternates_with_odd_step_count() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, SimulationParams::default().with_num_lines(8).with_num_line_points(2));
    assert_eq!(ff.primary_slot(), PositionSlot::A);

    run_update(&gpu, &mut ff);
    assert_eq!(ff.primary_slot(), PositionSlot::B);
    run_update(&gpu, &mut ff);
    assert_eq!(ff.primary_slot(), PositionSlot::A);
}

#[test]
fn test_single_point_lines_skip_tracing() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, SimulationParams::default().with_num_lines(8).with_num_line_points(1));
    run_update(&gpu, &mut ff);
    assert_eq!(ff.trace_passes(), 0);
    assert_eq!(ff.primary_slot(), PositionSlot::A);
}

#[test]
fn test_zero_point_lines_are_accepted_and_draw_nothing() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, SimulationParams::default().with_num_lines(8).with_num_line_points(0));
    assert_eq!(ff.num_line_points(), 0);
    run_update(&gpu, &mut ff);
    assert_eq!(ff.trace_passes(), 0);

    let mut ff = flow_field(&gpu, straight_params());
    ff.set_num_line_points(&gpu.device, &gpu.queue, 0).unwrap();
    assert_eq!(ff.num_line_points(), 0);
    assert_eq!(ff.position_grid_size(), UVec2::new(4, 0));
    run_update(&gpu, &mut ff);
    assert_eq!(ff.trace_passes(), 0);
    assert!(ff.read_positions(&gpu.device, &gpu.queue).unwrap().data.is_empty());

    let (texture, view) = render_target(&gpu, VIEWPORT);
    draw_lines(&gpu, &mut ff, &view, &frame());
    assert!(read_pixels(&gpu, &texture)
        .iter()
        .all(|&p| p == [0, 0, 0, 255]));
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn test_flat_field_moves_lines_right() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, straight_params());
    run_update(&gpu, &mut ff);

    let grid = ff.read_positions(&gpu.device, &gpu.queue).unwrap();
    assert_eq!(grid.num_lines, 4);
    assert_eq!(grid.num_line_points, 3);
    assert_eq!(grid.row(0), starting_positions("test", 4).as_slice());

    let resolution = VIEWPORT.as_vec2();
    for line in 0..4 {
        for point in 1..3 {
            let prev = grid.get(line, point - 1);
            let got = grid.get(line, point);
            let expected = advance(prev, 0, 0.0, 1.0, resolution);
            assert!(
                (got[0] as i32 - expected[0] as i32).abs() <= 1,
                "line {line} point {point}: x {} vs {}",
                got[0],
                expected[0]
            );
            assert!(
                (got[1] as i32 - prev[1] as i32).abs() <= 1,
                "line {line} point {point}: y moved from {} to {}",
                prev[1],
                got[1]
            );
        }
    }
}

#[test]
fn test_trace_follows_the_generated_field() {
    let Some(gpu) = gpu() else { return };
    let params = SimulationParams::default()
        .with_seed("field")
        .with_num_lines(64)
        .with_num_line_points(6);
    let mut ff = flow_field(&gpu, params);
    let ctx = FrameContext::new(VIEWPORT, 1.5, 0.0);
    run_update_with(&gpu, &mut ff, &ctx);

    let field = ff.read_field(&gpu.device, &gpu.queue).unwrap();
    let grid = ff.read_positions(&gpu.device, &gpu.queue).unwrap();
    let distinct: std::collections::HashSet<u16> = field.iter().copied().collect();
    assert!(distinct.len() > 16, "field is nearly constant");

    let resolution = VIEWPORT.as_vec2();
    let amplitude = ff.noise_max_amplitude();
    let step_px = ff.step_size() * ctx.device_pixel_ratio;
    let width = VIEWPORT.x as i32;
    let height = VIEWPORT.y as i32;

    // Texels a GPU could have picked when the position sits on a texel edge.
    let candidates = |v: f32, size: i32| -> Vec<i32> {
        let base = v.floor() as i32;
        let frac = v - v.floor();
        let mut out = vec![base];
        if frac < 1e-3 {
            out.push(base - 1);
        }
        if frac > 1.0 - 1e-3 {
            out.push(base + 1);
        }
        out.into_iter().map(|t| t.clamp(0, size - 1)).collect()
    };

    for line in 0..grid.num_lines {
        for point in 1..grid.num_line_points {
            let prev = grid.get(line, point - 1);
            let got = grid.get(line, point);
            let here = decode_position(prev, resolution);

            let matched = candidates(here.x, width).into_iter().any(|tx| {
                candidates(here.y, height).into_iter().any(|ty| {
                    let value = field[(ty * width + tx) as usize];
                    let expected = advance(prev, value, amplitude, step_px, resolution);
                    (got[0] as i32 - expected[0] as i32).abs() <= 1
                        && (got[1] as i32 - expected[1] as i32).abs() <= 1
                })
            });
            assert!(matched, "line {line} point {point}: {:?} -> {:?}", prev, got);
        }
    }
}

#[test]
fn test_flat_field_reads_back_zero_angles() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, straight_params());
    run_update(&gpu, &mut ff);

    let field = ff.read_field(&gpu.device, &gpu.queue).unwrap();
    assert_eq!(field.len(), (VIEWPORT.x * VIEWPORT.y) as usize);
    assert!(field.iter().all(|&v| v == 0 || v == u16::MAX));
}

#[test]
fn test_reseeding_with_same_seed_is_deterministic() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, straight_params());
    run_update(&gpu, &mut ff);
    let first = ff.read_positions(&gpu.device, &gpu.queue).unwrap();

    ff.set_seed(&gpu.device, &gpu.queue, "test").unwrap();
    assert_eq!(ff.primary_slot(), PositionSlot::A);
    run_update(&gpu, &mut ff);
    let second = ff.read_positions(&gpu.device, &gpu.queue).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_draw_after_update() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, SimulationParams::default().with_num_lines(32).with_num_line_points(16));
    let (_texture, target) = render_target(&gpu, VIEWPORT);

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    ff.update(&gpu.device, &gpu.queue, &mut encoder, &frame()).unwrap();
    ff.draw(&gpu.device, &gpu.queue, &mut encoder, &target, &frame(), Some(wgpu::Color::BLACK))
        .unwrap();
    ff.draw_field(&gpu.device, &gpu.queue, &mut encoder, &target, 0.5, None)
        .unwrap();
    gpu.queue.submit(std::iter::once(encoder.finish()));
    gpu.device.poll(wgpu::Maintain::Wait);

    assert_eq!(ff.trace_timer().len(), 1);
    assert_eq!(ff.draw_timer().len(), 1);
}

#[test]
fn test_noise_generation_is_timed_apart_from_tracing() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, straight_params());
    assert!(ff.noise_timer().is_empty());

    run_update(&gpu, &mut ff);
    run_update(&gpu, &mut ff);
    assert_eq!(ff.noise_timer().len(), 2);
    assert_eq!(ff.trace_timer().len(), 2);
    assert!(ff.draw_timer().is_empty());
}

#[test]
fn test_lines_render_where_traced() {
    let Some(gpu) = gpu() else { return };
    let size = UVec2::new(256, 256);
    let params = SimulationParams::default()
        .with_seed("ribbons")
        .with_num_lines(8)
        .with_num_line_points(8)
        .with_step_size(4.0)
        .with_line_width(8.0)
        .with_line_alpha(1.0)
        .with_noise(NoiseParams::default().with_amplitude(0.0));
    let mut ff = FlowField::new(&gpu.device, &gpu.queue, TARGET_FORMAT, size, params).unwrap();
    let ctx = FrameContext::new(size, 1.0, 0.0);
    let (texture, view) = render_target(&gpu, size);

    run_update_with(&gpu, &mut ff, &ctx);
    draw_lines(&gpu, &mut ff, &view, &ctx);

    let grid = ff.read_positions(&gpu.device, &gpu.queue).unwrap();
    let pixels = read_pixels(&gpu, &texture);
    let resolution = size.as_vec2();
    let pixel = |p: Vec2| pixels[(p.y as u32 * size.x + p.x as u32) as usize];

    let polylines: Vec<Vec<Vec2>> = (0..grid.num_lines)
        .map(|line| {
            grid.line(line)
                .into_iter()
                .map(|p| decode_position(p, resolution))
                .collect()
        })
        .collect();

    // A line well inside the viewport, so no segment is pinned at the border.
    let inside = polylines
        .iter()
        .find(|points| {
            points
                .iter()
                .all(|p| p.x > 16.0 && p.x < 240.0 && p.y > 16.0 && p.y < 240.0)
        })
        .expect("no line away from the border");
    let on_line = (inside[2] + inside[3]) * 0.5;
    let lit = pixel(on_line);
    assert!(lit[0] > 128, "pixel at {on_line} is {:?}", lit);

    // A pixel far from every segment keeps the clear color.
    let far = (8..248)
        .step_by(8)
        .flat_map(|y| (8..248).step_by(8).map(move |x| Vec2::new(x as f32, y as f32) + 0.5))
        .find(|&p| {
            polylines.iter().all(|points| {
                points
                    .windows(2)
                    .all(|w| segment_distance(p, w[0], w[1]) > 24.0)
            })
        })
        .expect("no pixel away from the lines");
    assert_eq!(pixel(far), [0, 0, 0, 255]);
}

#[test]
fn test_draw_before_update_only_clears() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, SimulationParams::default().with_num_lines(32).with_line_alpha(1.0));
    assert!(!ff.is_traced());
    let (texture, view) = render_target(&gpu, VIEWPORT);

    draw_lines(&gpu, &mut ff, &view, &frame());

    assert!(read_pixels(&gpu, &texture)
        .iter()
        .all(|&p| p == [0, 0, 0, 255]));
    assert!(ff.draw_timer().is_empty());

    run_update(&gpu, &mut ff);
    assert!(ff.is_traced());
    ff.set_seed(&gpu.device, &gpu.queue, "again").unwrap();
    assert!(!ff.is_traced());
}

// ============================================================================
// Resizing and parameters
// ============================================================================

#[test]
fn test_resize_keeps_position_grid() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, straight_params());
    run_update(&gpu, &mut ff);

    ff.on_resize(&gpu.device, UVec2::new(100, 50)).unwrap();
    assert_eq!(ff.field_size(), UVec2::new(100, 50));
    assert_eq!(ff.position_grid_size(), UVec2::new(4, 3));
}

#[test]
fn test_structural_setters_reallocate() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, straight_params());

    ff.set_num_lines(&gpu.device, &gpu.queue, 10).unwrap();
    ff.set_num_line_points(&gpu.device, &gpu.queue, 5).unwrap();
    assert_eq!(ff.position_grid_size(), UVec2::new(10, 5));

    run_update(&gpu, &mut ff);
    assert_eq!(ff.trace_passes(), 4);
}

#[test]
fn test_zero_lines_is_rejected() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, straight_params());

    let err = ff.set_num_lines(&gpu.device, &gpu.queue, 0).unwrap_err();
    assert!(matches!(err, FlowFieldError::ParameterOutOfRange { value: 0, .. }));
    assert_eq!(ff.num_lines(), 4);
}

#[test]
fn test_oversized_grid_is_rejected() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, straight_params());

    let too_many = gpu.max_texture_dimension() + 1;
    let err = ff
        .set_num_line_points(&gpu.device, &gpu.queue, too_many)
        .unwrap_err();
    assert!(matches!(err, FlowFieldError::ParameterOutOfRange { .. }));
    assert_eq!(ff.num_line_points(), 3);
}

#[test]
fn test_cosmetic_setters_do_not_reallocate() {
    let Some(gpu) = gpu() else { return };
    let mut ff = flow_field(&gpu, straight_params());
    let before = ff.gpu_memory_bytes();

    ff.set_step_size(3.0);
    ff.set_line_width(6.0);
    ff.set_line_alpha(0.1);
    ff.set_noise(NoiseParams::default().with_harmonics(2));

    assert_eq!(ff.gpu_memory_bytes(), before);
    assert_eq!(ff.step_size(), 3.0);
    assert_eq!(ff.noise().harmonics, 2);
}

// ============================================================================
// Programs
// ============================================================================

const TEST_VERTEX: &str = r#"
@vertex
fn vs_main(input: VertexInput) -> @builtin(position) vec4<f32> {
    return vec4<f32>(input.position * uniforms.scale, 0.0, 1.0);
}
"#;

const TEST_FRAGMENT: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;

const TEST_ATTRIBUTES: &[AttributeDecl] =
    &[AttributeDecl::new("position", wgpu::VertexFormat::Float32x2)];
const TEST_UNIFORMS: &[UniformDecl] = &[UniformDecl::new("scale", UniformKind::F32)];

fn test_descriptor(fragment: &'static str) -> ProgramDescriptor<'static> {
    ProgramDescriptor {
        label: "test",
        vertex: TEST_VERTEX,
        fragment,
        includes: &[],
        attributes: TEST_ATTRIBUTES,
        uniforms: TEST_UNIFORMS,
    }
}

#[test]
fn test_bind_rejects_wrong_uniform_type() {
    let Some(gpu) = gpu() else { return };
    let program = Program::compile(&gpu.device, &test_descriptor(TEST_FRAGMENT)).unwrap();

    let err = program
        .bind(&gpu.device, &gpu.queue, &[("scale", UniformValue::from(Vec2::ONE))])
        .unwrap_err();
    assert!(matches!(
        err,
        FlowFieldError::UniformTypeMismatch {
            expected: UniformKind::F32,
            found: UniformKind::Vec2,
            ..
        }
    ));

    assert!(program
        .bind(&gpu.device, &gpu.queue, &[("scale", 2.0f32.into())])
        .is_ok());
}

#[test]
fn test_invalid_wgsl_reports_compile_error() {
    let Some(gpu) = gpu() else { return };
    let broken = "@fragment fn fs_main() -> @location(0) vec4<f32> { return nope; }";

    match Program::compile(&gpu.device, &test_descriptor(broken)) {
        Err(FlowFieldError::ShaderCompile { program, diagnostic }) => {
            assert_eq!(program, "test");
            assert!(!diagnostic.is_empty());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("broken shader compiled"),
    }
}
