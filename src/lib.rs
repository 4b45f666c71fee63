//! # flowfield - GPU flow field line visualizer
//!
//! Thousands of lines traced through an animated noise field, entirely on the GPU.
//!
//! Every frame the engine:
//!
//! 1. renders a fractal simplex noise field into a texture, one encoded angle per pixel
//! 2. traces each line through the field, one point per render pass, ping-ponging
//!    between two position grids
//! 3. draws every line as an instanced, anti-aliased ribbon
//!
//! ## Quick Start
//!
//! ```ignore
//! use flowfield::prelude::*;
//!
//! fn main() -> flowfield::Result<()> {
//!     FlowFieldApp::new()
//!         .with_seed("tidal")
//!         .with_num_lines(4096)
//!         .with_num_line_points(64)
//!         .run()
//! }
//! ```
//!
//! ## Embedding
//!
//! [`FlowField`] only needs a device, a queue and a command encoder, so it can render
//! into any surface or texture:
//!
//! ```ignore
//! let mut flow_field = FlowField::new(&device, &queue, format, size, SimulationParams::default())?;
//! let ctx = clock.tick(size, dpr);
//! flow_field.update(&device, &queue, &mut encoder, &ctx)?;
//! flow_field.draw(&device, &queue, &mut encoder, &view, &ctx, Some(wgpu::Color::BLACK))?;
//! ```
//!
//! ## Parameters
//!
//! | Parameter | Effect |
//! |-----------|--------|
//! | `num_lines` | number of lines (position grid width) |
//! | `num_line_points` | points per line (position grid height) |
//! | `step_size` | CSS pixels advanced per point |
//! | `line_width`, `line_alpha` | ribbon appearance |
//! | [`NoiseParams`] | frequency, amplitude and harmonics of the field |
//!
//! Changing `num_lines`, `num_line_points` or `seed` reallocates the position grids;
//! everything else takes effect on the next frame.

pub mod encoding;
pub mod error;
pub mod flow_field;
pub mod frame;
pub mod geometry;
pub mod gpu;
pub mod params;
pub mod positions;
pub mod program;
pub mod shader_lib;
pub mod timer;
#[cfg(feature = "egui")]
pub mod ui;
mod window;

pub use bytemuck;
pub use glam::{UVec2, Vec2};
pub use wgpu;

pub use error::{FlowFieldError, Result};
pub use flow_field::{FlowField, FlowFieldStats};
pub use frame::{FrameClock, FrameContext};
pub use geometry::{LineGeometry, LineVertex};
pub use gpu::{GpuContext, PositionSlot};
pub use params::{noise_max_amplitude, NoiseParams, ParamChange, SimulationParams};
pub use positions::PositionGrid;
pub use timer::PerformanceTimer;
pub use window::FlowFieldApp;

/// Convenient imports for building a visualization.
///
/// ```ignore
/// use flowfield::prelude::*;
/// ```
pub mod prelude {
    pub use crate::flow_field::{FlowField, FlowFieldStats};
    pub use crate::frame::{FrameClock, FrameContext};
    pub use crate::gpu::GpuContext;
    pub use crate::params::{NoiseParams, ParamChange, SimulationParams};
    pub use crate::window::FlowFieldApp;
    pub use crate::{UVec2, Vec2};

    #[cfg(feature = "egui")]
    pub use egui;
}
