//! Windowed viewer.
//!
//! [`FlowFieldApp`] opens a window, creates a surface and a [`FlowField`], and drives
//! `update` then `draw` on every redraw.
//!
//! Keys: `Space` pause, `R` reseed, `F` field view, `Up`/`Down` points per line,
//! `Escape` quit.

use std::sync::Arc;

use glam::UVec2;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::error::{FlowFieldError, Result};
use crate::flow_field::FlowField;
use crate::frame::FrameClock;
use crate::gpu::GpuContext;
use crate::params::{ParamChange, SimulationParams};

/// Frames between timing log lines and title refreshes.
const STATS_INTERVAL: u64 = 120;
/// Points added or removed by the arrow keys.
const LINE_POINTS_STEP: u32 = 8;

/// Builder and entry point for the viewer.
///
/// # Example
///
/// ```ignore
/// FlowFieldApp::new()
///     .with_seed("tidal")
///     .with_num_lines(4096)
///     .run()?;
/// ```
#[derive(Clone, Debug)]
pub struct FlowFieldApp {
    params: SimulationParams,
    title: String,
    window_size: (u32, u32),
    clear_color: wgpu::Color,
}

impl Default for FlowFieldApp {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowFieldApp {
    pub fn new() -> Self {
        Self {
            params: SimulationParams::default(),
            title: "Flow Field".to_string(),
            window_size: (1280, 720),
            clear_color: wgpu::Color::TRANSPARENT,
        }
    }

    pub fn with_params(mut self, params: SimulationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.params.seed = seed.into();
        self
    }

    pub fn with_num_lines(mut self, num_lines: u32) -> Self {
        self.params.num_lines = num_lines;
        self
    }

    pub fn with_num_line_points(mut self, num_line_points: u32) -> Self {
        self.params.num_line_points = num_line_points;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Initial window size in logical pixels.
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    pub fn with_clear_color(mut self, color: wgpu::Color) -> Self {
        self.clear_color = color;
        self
    }

    /// Open the window and run until it closes.
    pub fn run(self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut runner = Runner::new(self);
        event_loop.run_app(&mut runner)?;

        match runner.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Surface, device and engine, created once the window exists.
struct ViewerState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    gpu: GpuContext,
    config: wgpu::SurfaceConfiguration,
    flow_field: FlowField,
    #[cfg(feature = "egui")]
    egui: crate::gpu::egui_integration::EguiIntegration,
    #[cfg(feature = "egui")]
    seed_input: String,
}

impl ViewerState {
    async fn new(window: Arc<Window>, params: SimulationParams) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let gpu = GpuContext::new(&instance, Some(&surface)).await?;

        let surface_caps = surface.get_capabilities(&gpu.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(FlowFieldError::NoSurfaceFormat)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &config);

        let flow_field = FlowField::new(
            &gpu.device,
            &gpu.queue,
            surface_format,
            UVec2::new(config.width, config.height),
            params,
        )?;

        #[cfg(feature = "egui")]
        let egui = crate::gpu::egui_integration::EguiIntegration::new(
            &gpu.device,
            surface_format,
            &window,
        );
        #[cfg(feature = "egui")]
        let seed_input = flow_field.seed().to_string();

        Ok(Self {
            window,
            surface,
            gpu,
            config,
            flow_field,
            #[cfg(feature = "egui")]
            egui,
            #[cfg(feature = "egui")]
            seed_input,
        })
    }

    fn viewport(&self) -> UVec2 {
        UVec2::new(self.config.width, self.config.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.gpu.device, &self.config);
        self.flow_field.on_resize(&self.gpu.device, self.viewport())
    }

    fn reconfigure(&mut self) -> Result<()> {
        let (width, height) = (self.config.width, self.config.height);
        self.resize(width, height)
    }

    fn apply(&mut self, change: ParamChange) -> Result<()> {
        let change = change.clamped(self.gpu.max_texture_dimension());
        tracing::debug!(?change, "applying parameter change");
        self.flow_field.apply(&self.gpu.device, &self.gpu.queue, change)
    }

    fn render(&mut self, clock: &mut FrameClock, show_field: bool, clear: wgpu::Color) -> Result<()> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let frame = clock.tick(self.viewport(), self.window.scale_factor() as f32);
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let device = &self.gpu.device;
        let queue = &self.gpu.queue;
        self.flow_field.update(device, queue, &mut encoder, &frame)?;
        if show_field {
            self.flow_field
                .draw_field(device, queue, &mut encoder, &view, 1.0, Some(clear))?;
            self.flow_field
                .draw(device, queue, &mut encoder, &view, &frame, None)?;
        } else {
            self.flow_field
                .draw(device, queue, &mut encoder, &view, &frame, Some(clear))?;
        }

        #[cfg(feature = "egui")]
        let changes = {
            let params = self.flow_field.params().clone();
            let stats = self.flow_field.stats();
            let fps = clock.fps();
            let max_dimension = self.gpu.max_texture_dimension();
            let seed_input = &mut self.seed_input;
            let mut changes = Vec::new();
            self.egui.paint(
                &self.window,
                device,
                queue,
                &mut encoder,
                &view,
                [self.config.width, self.config.height],
                |ctx| {
                    changes = crate::ui::parameter_panel(
                        ctx,
                        &params,
                        &stats,
                        fps,
                        max_dimension,
                        seed_input,
                    );
                },
            );
            changes
        };

        queue.submit(std::iter::once(encoder.finish()));
        output.present();

        #[cfg(feature = "egui")]
        for change in changes {
            self.apply(change)?;
        }

        Ok(())
    }
}

struct Runner {
    config: FlowFieldApp,
    state: Option<ViewerState>,
    clock: FrameClock,
    show_field: bool,
    reseeds: u32,
    error: Option<FlowFieldError>,
}

impl Runner {
    fn new(config: FlowFieldApp) -> Self {
        Self {
            config,
            state: None,
            clock: FrameClock::new(),
            show_field: false,
            reseeds: 0,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: FlowFieldError) {
        tracing::error!(%error, "viewer stopped");
        self.error = Some(error);
        event_loop.exit();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode) -> Result<()> {
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => {
                self.clock.toggle_pause();
                tracing::info!(paused = self.clock.is_paused(), "toggled pause");
            }
            KeyCode::KeyF => {
                self.show_field = !self.show_field;
            }
            KeyCode::KeyR => {
                self.reseeds += 1;
                let seed = format!("{}-{}", self.config.params.seed, self.reseeds);
                tracing::info!(%seed, "reseeding");
                state.apply(ParamChange::Seed(seed))?;
            }
            KeyCode::ArrowUp => {
                let points = state.flow_field.num_line_points() + LINE_POINTS_STEP;
                state.apply(ParamChange::NumLinePoints(points))?;
            }
            KeyCode::ArrowDown => {
                let points = state
                    .flow_field
                    .num_line_points()
                    .saturating_sub(LINE_POINTS_STEP)
                    .max(1);
                state.apply(ParamChange::NumLinePoints(points))?;
            }
            _ => {}
        }
        Ok(())
    }

    fn report_stats(&self) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        if self.clock.frame() % STATS_INTERVAL != 0 {
            return;
        }
        let stats = state.flow_field.stats();
        tracing::debug!(
            fps = self.clock.fps(),
            trace = %stats.trace_summary,
            draw = %stats.draw_summary,
            passes = stats.trace_passes,
            "frame timings"
        );
        state.window.set_title(&format!(
            "{} - {:.0} fps - trace {} - draw {}",
            self.config.title,
            self.clock.fps(),
            stats.trace_summary,
            stats.draw_summary
        ));
    }
}

impl ApplicationHandler for Runner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let (width, height) = self.config.window_size;
        let window_attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match pollster::block_on(ViewerState::new(window, self.config.params.clone())) {
            Ok(state) => {
                state.window.request_redraw();
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        #[cfg(feature = "egui")]
        if let Some(state) = self.state.as_mut() {
            if state.egui.on_window_event(&state.window, &event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(state) = self.state.as_mut() {
                    if let Err(e) = state.resize(size.width, size.height) {
                        self.fail(event_loop, e);
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Err(e) = self.handle_key(event_loop, code) {
                    self.fail(event_loop, e);
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(state) = self.state.as_mut() else {
                    return;
                };
                match state.render(&mut self.clock, self.show_field, self.config.clear_color) {
                    Ok(()) => {}
                    Err(FlowFieldError::Surface(
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
                    )) => {
                        if let Err(e) = state.reconfigure() {
                            return self.fail(event_loop, e);
                        }
                    }
                    Err(FlowFieldError::Surface(wgpu::SurfaceError::Timeout)) => {
                        tracing::warn!("surface timeout, skipping frame");
                    }
                    Err(e) => return self.fail(event_loop, e),
                }
                state.window.request_redraw();
                self.report_stats();
            }
            _ => {}
        }
    }
}
