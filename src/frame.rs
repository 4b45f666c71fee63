//! Per-frame context handed to the engine, and the clock that produces it.
//!
//! # Example
//!
//! ```
//! use flowfield::{FrameClock, FrameContext};
//! use glam::UVec2;
//!
//! let mut clock = FrameClock::new();
//! let ctx: FrameContext = clock.tick(UVec2::new(1280, 720), 2.0);
//! assert_eq!(ctx.viewport_size, UVec2::new(1280, 720));
//! assert_eq!(clock.frame(), 1);
//! ```

use std::time::{Duration, Instant};

use glam::{UVec2, Vec2};

/// What the engine needs to know about the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameContext {
    /// Render target size in device pixels.
    pub viewport_size: UVec2,
    /// Device pixels per CSS pixel.
    pub device_pixel_ratio: f32,
    /// Animation time in milliseconds, excluding paused spans.
    pub elapsed_ms: f64,
}

impl FrameContext {
    pub fn new(viewport_size: UVec2, device_pixel_ratio: f32, elapsed_ms: f64) -> Self {
        Self {
            viewport_size,
            device_pixel_ratio,
            elapsed_ms,
        }
    }

    /// Viewport size as floats, for shader uniforms.
    pub fn resolution(&self) -> Vec2 {
        self.viewport_size.as_vec2()
    }

    /// Animation time in seconds.
    pub fn time_secs(&self) -> f32 {
        (self.elapsed_ms / 1000.0) as f32
    }
}

/// Wall clock for the render loop, with pause support and a periodic FPS estimate.
#[derive(Debug)]
pub struct FrameClock {
    start: Instant,
    /// Accumulated time spent paused.
    paused_total: Duration,
    /// Set while paused.
    paused_at: Option<Instant>,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    const FPS_INTERVAL: Duration = Duration::from_millis(500);

    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            paused_total: Duration::ZERO,
            paused_at: None,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
        }
    }

    /// Advance one frame and build its context.
    pub fn tick(&mut self, viewport_size: UVec2, device_pixel_ratio: f32) -> FrameContext {
        let now = Instant::now();
        self.frame_count += 1;

        let since = now.duration_since(self.fps_update_time);
        if since >= Self::FPS_INTERVAL {
            let frames = self.frame_count - self.fps_frame_count;
            self.fps = frames as f32 / since.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        FrameContext::new(viewport_size, device_pixel_ratio, self.elapsed_ms_at(now))
    }

    fn elapsed_ms_at(&self, now: Instant) -> f64 {
        let frozen = self.paused_at.unwrap_or(now);
        let running = frozen.duration_since(self.start).saturating_sub(self.paused_total);
        running.as_secs_f64() * 1000.0
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms_at(Instant::now())
    }

    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn pause(&mut self) {
        if self.paused_at.is_none() {
            self.paused_at = Some(Instant::now());
        }
    }

    pub fn resume(&mut self) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += paused_at.elapsed();
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_context_conversions() {
        let ctx = FrameContext::new(UVec2::new(640, 480), 1.5, 2500.0);
        assert_eq!(ctx.resolution(), Vec2::new(640.0, 480.0));
        assert_eq!(ctx.time_secs(), 2.5);
    }

    #[test]
    fn test_clock_counts_frames() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(5));
        let ctx = clock.tick(UVec2::new(10, 10), 1.0);
        assert!(ctx.elapsed_ms > 0.0);
        clock.tick(UVec2::new(10, 10), 1.0);
        assert_eq!(clock.frame(), 2);
    }

    #[test]
    fn test_pause_freezes_time() {
        let mut clock = FrameClock::new();
        clock.pause();
        assert!(clock.is_paused());

        let before = clock.tick(UVec2::ONE, 1.0).elapsed_ms;
        thread::sleep(Duration::from_millis(10));
        let after = clock.tick(UVec2::ONE, 1.0).elapsed_ms;
        assert_eq!(before, after);

        clock.toggle_pause();
        assert!(!clock.is_paused());
        thread::sleep(Duration::from_millis(5));
        assert!(clock.elapsed_ms() > after);
    }
}
