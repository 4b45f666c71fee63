//! Simulation parameters.
//!
//! [`SimulationParams`] holds everything that shapes the visualization. Three of its
//! fields (`seed`, `num_lines`, `num_line_points`) are structural: changing them means
//! reallocating the position grid, so on a live engine they go through the explicit
//! setters on [`FlowField`](crate::FlowField). The rest are read every frame.
//!
//! # Example
//!
//! ```
//! use flowfield::{NoiseParams, SimulationParams};
//!
//! let params = SimulationParams::default()
//!     .with_seed("tidal")
//!     .with_num_lines(4096)
//!     .with_line_alpha(0.15)
//!     .with_noise(NoiseParams::default().with_harmonics(6));
//!
//! assert_eq!(params.num_lines, 4096);
//! ```

use glam::Vec2;

use crate::error::{FlowFieldError, Result};

/// Parameters of the multi-octave noise that defines the direction field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseParams {
    /// Base frequency of the first octave.
    pub frequency: f32,
    /// Amplitude of the first octave, in radians.
    pub amplitude: f32,
    /// Number of octaves summed.
    pub harmonics: u32,
    /// Frequency multiplier between consecutive octaves.
    pub harmonic_spread: f32,
    /// Amplitude multiplier between consecutive octaves.
    pub harmonic_gain: f32,
    /// Coordinate offset applied per octave index.
    pub harmonic_travel: Vec2,
    /// Animation speed; noise coordinates advance by `time * speed`.
    pub speed: f32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            amplitude: 0.5,
            harmonics: 4,
            harmonic_spread: 1.5,
            harmonic_gain: 0.7,
            harmonic_travel: Vec2::new(13.0, 11.0),
            speed: 0.05,
        }
    }
}

impl NoiseParams {
    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn with_harmonics(mut self, harmonics: u32) -> Self {
        self.harmonics = harmonics;
        self
    }

    pub fn with_harmonic_spread(mut self, spread: f32) -> Self {
        self.harmonic_spread = spread;
        self
    }

    pub fn with_harmonic_gain(mut self, gain: f32) -> Self {
        self.harmonic_gain = gain;
        self
    }

    pub fn with_harmonic_travel(mut self, travel: Vec2) -> Self {
        self.harmonic_travel = travel;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Largest magnitude the summed noise can reach.
    ///
    /// The tracer divides field angles by this to normalize them.
    pub fn max_amplitude(&self) -> f32 {
        noise_max_amplitude(self.amplitude, self.harmonic_gain, self.harmonics)
    }
}

/// Closed-form sum of the geometric series `amplitude * gain^i` for `i in 0..harmonics`.
pub fn noise_max_amplitude(amplitude: f32, gain: f32, harmonics: u32) -> f32 {
    if harmonics == 0 {
        return 0.0;
    }
    if (1.0 - gain).abs() < 1e-6 {
        return amplitude * harmonics as f32;
    }
    let n = harmonics.min(i32::MAX as u32) as i32;
    amplitude * (1.0 - gain.powi(n)) / (1.0 - gain)
}

/// Everything that shapes the visualization.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationParams {
    /// Seed string for the starting positions.
    pub seed: String,
    /// Number of lines (position grid width).
    pub num_lines: u32,
    /// Points per line (position grid height).
    pub num_line_points: u32,
    /// Distance advanced per trace step, in CSS pixels.
    pub step_size: f32,
    /// Ribbon width, in CSS pixels.
    pub line_width: f32,
    /// Peak opacity of each line.
    pub line_alpha: f32,
    pub noise: NoiseParams,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            seed: "hello world".to_string(),
            num_lines: 2048,
            num_line_points: 40,
            step_size: 2.0,
            line_width: 6.0,
            line_alpha: 0.25,
            noise: NoiseParams::default(),
        }
    }
}

impl SimulationParams {
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }

    pub fn with_num_lines(mut self, num_lines: u32) -> Self {
        self.num_lines = num_lines;
        self
    }

    pub fn with_num_line_points(mut self, num_line_points: u32) -> Self {
        self.num_line_points = num_line_points;
        self
    }

    pub fn with_step_size(mut self, step_size: f32) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_line_width(mut self, line_width: f32) -> Self {
        self.line_width = line_width;
        self
    }

    pub fn with_line_alpha(mut self, line_alpha: f32) -> Self {
        self.line_alpha = line_alpha;
        self
    }

    pub fn with_noise(mut self, noise: NoiseParams) -> Self {
        self.noise = noise;
        self
    }

    /// Check the structural parameters against the device's texture size limit.
    pub fn validate(&self, max_texture_dimension: u32) -> Result<()> {
        check_grid_dimension("numLines", self.num_lines, max_texture_dimension)?;
        check_line_points(self.num_line_points, max_texture_dimension)
    }
}

pub(crate) fn check_grid_dimension(name: &'static str, value: u32, max: u32) -> Result<()> {
    if value == 0 || value > max {
        return Err(FlowFieldError::ParameterOutOfRange {
            name,
            value,
            min: 1,
            max,
        });
    }
    Ok(())
}

/// Zero points per line is allowed: such lines are never traced or drawn.
pub(crate) fn check_line_points(value: u32, max: u32) -> Result<()> {
    if value > max {
        return Err(FlowFieldError::ParameterOutOfRange {
            name: "numLinePoints",
            value,
            min: 0,
            max,
        });
    }
    Ok(())
}

/// A single parameter edit, as produced by keyboard shortcuts or the UI panel.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamChange {
    Seed(String),
    NumLines(u32),
    NumLinePoints(u32),
    StepSize(f32),
    LineWidth(f32),
    LineAlpha(f32),
    Noise(NoiseParams),
}

impl ParamChange {
    /// True when applying the change reallocates the position grid.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ParamChange::Seed(_) | ParamChange::NumLines(_) | ParamChange::NumLinePoints(_)
        )
    }

    /// Bring grid sizes into the range the device accepts.
    ///
    /// The engine rejects out-of-range sizes; interactive callers clamp first.
    pub fn clamped(self, max_texture_dimension: u32) -> Self {
        let max = max_texture_dimension.max(1);
        match self {
            ParamChange::NumLines(n) => ParamChange::NumLines(n.clamp(1, max)),
            ParamChange::NumLinePoints(n) => ParamChange::NumLinePoints(n.min(max)),
            other => other,
        }
    }
}
