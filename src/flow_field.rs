//! The flow field engine.
//!
//! [`FlowField`] owns every GPU resource of the visualization and sequences the passes:
//!
//! 1. [`update`](FlowField::update) regenerates the noise field and traces every line
//!    through it, `num_line_points - 1` steps, ping-ponging between the two position
//!    grids.
//! 2. [`draw`](FlowField::draw) renders the primary grid as ribbons.
//!
//! Both record into a caller-provided command encoder; `update` must be recorded before
//! `draw` in the same frame.
//!
//! # Example
//!
//! ```ignore
//! let mut flow_field = FlowField::new(&device, &queue, surface_format, size, SimulationParams::default())?;
//!
//! // Every frame:
//! let ctx = clock.tick(size, dpr);
//! flow_field.update(&device, &queue, &mut encoder, &ctx)?;
//! flow_field.draw(&device, &queue, &mut encoder, &view, &ctx, Some(wgpu::Color::TRANSPARENT))?;
//! queue.submit(std::iter::once(encoder.finish()));
//! ```

use glam::UVec2;

use crate::error::Result;
use crate::frame::FrameContext;
use crate::gpu::field_view::FieldViewPass;
use crate::gpu::lines::{LineStyle, LinesPass};
use crate::gpu::noise::NoisePass;
use crate::gpu::trace::{TracePass, TraceSettings};
use crate::gpu::{
    begin_color_pass, create_data_texture, create_fullscreen_triangle, read_texture, PositionSlot,
    PositionTextures, FIELD_FORMAT,
};
use crate::params::{
    check_grid_dimension, check_line_points, NoiseParams, ParamChange, SimulationParams,
};
use crate::positions::PositionGrid;
use crate::timer::PerformanceTimer;

/// The noise field texture and its size.
struct FieldTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: UVec2,
}

impl FieldTexture {
    fn new(device: &wgpu::Device, size: UVec2) -> Result<Self> {
        let size = size.max(UVec2::ONE);
        let texture = create_data_texture(device, "Noise Field", size, FIELD_FORMAT)?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            texture,
            view,
            size,
        })
    }
}

/// Snapshot of the engine's counters, for logs and UI.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowFieldStats {
    pub primary_slot: PositionSlot,
    pub trace_passes: u32,
    pub trace_summary: String,
    pub draw_summary: String,
    pub gpu_memory_bytes: u64,
}

/// GPU flow field: noise generation, line tracing and ribbon rendering.
pub struct FlowField {
    params: SimulationParams,
    max_texture_dimension: u32,
    noise: NoisePass,
    trace: TracePass,
    lines: LinesPass,
    field_view: FieldViewPass,
    fullscreen: wgpu::Buffer,
    field: FieldTexture,
    positions: PositionTextures,
    noise_timer: PerformanceTimer,
    trace_timer: PerformanceTimer,
    draw_timer: PerformanceTimer,
    trace_passes: u32,
    /// False from (re)allocation until the first completed trace.
    traced: bool,
}

impl FlowField {
    /// Compile the programs and allocate all textures.
    ///
    /// `target_format` is the format `draw` renders into; `viewport` is the initial
    /// size of the noise field in device pixels.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target_format: wgpu::TextureFormat,
        viewport: UVec2,
        params: SimulationParams,
    ) -> Result<Self> {
        let max_texture_dimension = device.limits().max_texture_dimension_2d;
        params.validate(max_texture_dimension)?;

        let noise = NoisePass::new(device)?;
        let trace = TracePass::new(device)?;
        let lines = LinesPass::new(device, target_format, params.num_line_points)?;
        let field_view = FieldViewPass::new(device, target_format)?;

        let field = FieldTexture::new(device, viewport)?;
        let positions = PositionTextures::new(
            device,
            queue,
            &params.seed,
            params.num_lines,
            params.num_line_points,
        )?;

        tracing::info!(
            num_lines = params.num_lines,
            num_line_points = params.num_line_points,
            seed = %params.seed,
            width = field.size.x,
            height = field.size.y,
            "flow field initialized"
        );

        Ok(Self {
            params,
            max_texture_dimension,
            noise,
            trace,
            lines,
            field_view,
            fullscreen: create_fullscreen_triangle(device),
            field,
            positions,
            noise_timer: PerformanceTimer::default(),
            trace_timer: PerformanceTimer::default(),
            draw_timer: PerformanceTimer::default(),
            trace_passes: 0,
            traced: false,
        })
    }

    /// Regenerate the noise field and trace every line through it.
    pub fn update(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameContext,
    ) -> Result<()> {
        self.noise_timer.start();
        self.noise.encode(
            device,
            queue,
            encoder,
            &self.fullscreen,
            &self.field.view,
            frame,
            &self.params.noise,
        )?;
        self.noise_timer.stop();

        self.trace_timer.start();

        let settings = TraceSettings {
            resolution: frame.resolution(),
            screen_dpr: frame.device_pixel_ratio,
            step_size: self.params.step_size,
            field_amplitude: self.noise_max_amplitude(),
        };
        self.trace_passes = self.trace.encode(
            device,
            queue,
            encoder,
            &self.fullscreen,
            &mut self.positions,
            &self.field.view,
            &settings,
        )?;
        self.traced = true;

        self.trace_timer.stop();
        Ok(())
    }

    /// Render the lines from the primary position grid into `target`.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        frame: &FrameContext,
        clear: Option<wgpu::Color>,
    ) -> Result<()> {
        if !self.traced {
            // Rows past the start are undefined until the first trace.
            tracing::debug!("draw before the first update, only clearing");
            if let Some(color) = clear {
                let load = wgpu::LoadOp::Clear(color);
                let _pass = begin_color_pass(encoder, "Lines Pass", target, load);
            }
            return Ok(());
        }

        self.draw_timer.start();
        let style = LineStyle {
            resolution: frame.resolution(),
            screen_dpr: frame.device_pixel_ratio,
            line_width: self.params.line_width,
            line_alpha: self.params.line_alpha,
            step_size: self.params.step_size,
        };
        self.lines.encode(
            device,
            queue,
            encoder,
            target,
            self.positions.primary_view(),
            self.params.num_lines,
            &style,
            clear,
        )?;
        self.draw_timer.stop();
        Ok(())
    }

    /// Render the noise field itself as hues into `target`.
    pub fn draw_field(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        opacity: f32,
        clear: Option<wgpu::Color>,
    ) -> Result<()> {
        self.field_view.encode(
            device,
            queue,
            encoder,
            &self.fullscreen,
            target,
            &self.field.view,
            opacity,
            clear,
        )
    }

    /// Reallocate the noise field at the new viewport size. Position grids are kept.
    pub fn on_resize(&mut self, device: &wgpu::Device, size: UVec2) -> Result<()> {
        let size = size.max(UVec2::ONE);
        if size == self.field.size {
            return Ok(());
        }
        self.field = FieldTexture::new(device, size)?;
        tracing::debug!(width = size.x, height = size.y, "resized noise field");
        Ok(())
    }

    fn rebuild_positions(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<()> {
        self.positions = PositionTextures::new(
            device,
            queue,
            &self.params.seed,
            self.params.num_lines,
            self.params.num_line_points,
        )?;
        self.traced = false;
        Ok(())
    }

    /// Change the line count, regenerating both position grids.
    pub fn set_num_lines(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        num_lines: u32,
    ) -> Result<()> {
        check_grid_dimension("numLines", num_lines, self.max_texture_dimension)?;
        if num_lines == self.params.num_lines {
            return Ok(());
        }
        self.params.num_lines = num_lines;
        self.rebuild_positions(device, queue)
    }

    /// Change the points per line, regenerating both position grids and the geometry.
    pub fn set_num_line_points(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        num_line_points: u32,
    ) -> Result<()> {
        check_line_points(num_line_points, self.max_texture_dimension)?;
        if num_line_points == self.params.num_line_points {
            return Ok(());
        }
        self.params.num_line_points = num_line_points;
        self.lines.set_num_line_points(device, num_line_points);
        self.rebuild_positions(device, queue)
    }

    /// Reseed the starting positions, regenerating both position grids.
    ///
    /// Always regenerates, even for the current seed.
    pub fn set_seed(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        seed: impl Into<String>,
    ) -> Result<()> {
        self.params.seed = seed.into();
        self.rebuild_positions(device, queue)
    }

    pub fn set_step_size(&mut self, step_size: f32) {
        self.params.step_size = step_size;
    }

    pub fn set_line_width(&mut self, line_width: f32) {
        self.params.line_width = line_width;
    }

    pub fn set_line_alpha(&mut self, line_alpha: f32) {
        self.params.line_alpha = line_alpha;
    }

    pub fn set_noise(&mut self, noise: NoiseParams) {
        self.params.noise = noise;
    }

    /// Apply one parameter edit.
    pub fn apply(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        change: ParamChange,
    ) -> Result<()> {
        match change {
            ParamChange::Seed(seed) => self.set_seed(device, queue, seed),
            ParamChange::NumLines(n) => self.set_num_lines(device, queue, n),
            ParamChange::NumLinePoints(n) => self.set_num_line_points(device, queue, n),
            ParamChange::StepSize(v) => {
                self.set_step_size(v);
                Ok(())
            }
            ParamChange::LineWidth(v) => {
                self.set_line_width(v);
                Ok(())
            }
            ParamChange::LineAlpha(v) => {
                self.set_line_alpha(v);
                Ok(())
            }
            ParamChange::Noise(noise) => {
                self.set_noise(noise);
                Ok(())
            }
        }
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn seed(&self) -> &str {
        &self.params.seed
    }

    pub fn num_lines(&self) -> u32 {
        self.params.num_lines
    }

    pub fn num_line_points(&self) -> u32 {
        self.params.num_line_points
    }

    pub fn step_size(&self) -> f32 {
        self.params.step_size
    }

    pub fn line_width(&self) -> f32 {
        self.params.line_width
    }

    pub fn line_alpha(&self) -> f32 {
        self.params.line_alpha
    }

    pub fn noise(&self) -> &NoiseParams {
        &self.params.noise
    }

    /// Recomputed from the current noise parameters on every call.
    pub fn noise_max_amplitude(&self) -> f32 {
        self.params.noise.max_amplitude()
    }

    /// False until the first `update` after construction or a grid reallocation.
    pub fn is_traced(&self) -> bool {
        self.traced
    }

    pub fn primary_slot(&self) -> PositionSlot {
        self.positions.primary()
    }

    /// Trace passes recorded by the last `update`.
    pub fn trace_passes(&self) -> u32 {
        self.trace_passes
    }

    pub fn field_size(&self) -> UVec2 {
        self.field.size
    }

    /// `(num_lines, num_line_points)` of the allocated position grids.
    pub fn position_grid_size(&self) -> UVec2 {
        UVec2::new(self.positions.num_lines(), self.positions.num_line_points())
    }

    /// Noise field generation only; not part of [`trace_timer`](Self::trace_timer).
    pub fn noise_timer(&self) -> &PerformanceTimer {
        &self.noise_timer
    }

    pub fn trace_timer(&self) -> &PerformanceTimer {
        &self.trace_timer
    }

    pub fn draw_timer(&self) -> &PerformanceTimer {
        &self.draw_timer
    }

    /// Estimated bytes held in GPU textures and buffers.
    pub fn gpu_memory_bytes(&self) -> u64 {
        let field = self.field.size.x as u64 * self.field.size.y as u64 * 2;
        field + self.positions.byte_size() + self.lines.geometry_byte_size()
    }

    pub fn stats(&self) -> FlowFieldStats {
        FlowFieldStats {
            primary_slot: self.primary_slot(),
            trace_passes: self.trace_passes,
            trace_summary: self.trace_timer.summary(),
            draw_summary: self.draw_timer.summary(),
            gpu_memory_bytes: self.gpu_memory_bytes(),
        }
    }

    /// Read the primary position grid. Submit pending work first.
    pub fn read_positions(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<PositionGrid> {
        self.positions.read(device, queue, self.positions.primary())
    }

    /// Read one of the two position grids.
    pub fn read_position_slot(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        slot: PositionSlot,
    ) -> Result<PositionGrid> {
        self.positions.read(device, queue, slot)
    }

    /// Read the encoded noise field, row-major.
    pub fn read_field(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<u16>> {
        let bytes = read_texture(device, queue, &self.field.texture, 2)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect())
    }
}

/// Format a byte count the way the stats panel shows it.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 + 512 * 1024), "3.5 MiB");
    }
}
