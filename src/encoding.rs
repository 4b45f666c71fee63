//! Fixed-point encodings shared by the GPU passes.
//!
//! Angles and positions travel between passes in 16-bit unsigned texture channels.
//! The functions here are the CPU mirror of [`ENCODING_WGSL`](crate::shader_lib::ENCODING_WGSL):
//! the engine never calls them on the frame path, but tests and read-back tooling use
//! them to interpret texture contents.
//!
//! - angle: `round(fract(angle / TAU) * 65535)`
//! - position: fraction of the viewport resolution, `round(clamp(px / res, 0, 1) * 65535)`

use std::f32::consts::{PI, TAU};

use glam::Vec2;

/// Largest value of a 16-bit fixed-point channel.
pub const FIXED_POINT_MAX: f32 = 65535.0;

/// Encode an angle in radians into one full turn of 16-bit range.
pub fn encode_angle(angle: f32) -> u16 {
    let turns = angle / TAU;
    let frac = turns - turns.floor();
    (frac * FIXED_POINT_MAX).round() as u16
}

/// Decode into `[0, TAU]`.
pub fn decode_angle(value: u16) -> f32 {
    value as f32 / FIXED_POINT_MAX * TAU
}

/// Direction a line takes for an encoded field value.
///
/// The decoded angle is re-centered on zero and scaled so that the largest value the
/// noise can reach maps to half a turn. A zero (or negative) amplitude leaves the
/// re-centered angle unscaled.
pub fn direction_angle(value: u16, field_amplitude: f32) -> f32 {
    let mut angle = decode_angle(value);
    if angle > PI {
        angle -= TAU;
    }
    if field_amplitude > 0.0 {
        angle = angle / field_amplitude * PI;
    }
    angle
}

/// Encode a device-pixel position as fractions of `resolution`, clamping to the edges.
pub fn encode_position(position: Vec2, resolution: Vec2) -> [u16; 2] {
    let normalized = (position / resolution).clamp(Vec2::ZERO, Vec2::ONE);
    let scaled = (normalized * FIXED_POINT_MAX).round();
    [scaled.x as u16, scaled.y as u16]
}

/// Decode into device pixels.
pub fn decode_position(value: [u16; 2], resolution: Vec2) -> Vec2 {
    Vec2::new(value[0] as f32, value[1] as f32) / FIXED_POINT_MAX * resolution
}

/// One trace step: move `step_px` device pixels along the field direction.
pub fn advance(
    position: [u16; 2],
    field_value: u16,
    field_amplitude: f32,
    step_px: f32,
    resolution: Vec2,
) -> [u16; 2] {
    let here = decode_position(position, resolution);
    let angle = direction_angle(field_value, field_amplitude);
    let next = here + Vec2::new(angle.cos(), angle.sin()) * step_px;
    encode_position(next, resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_wraps_full_turns() {
        assert_eq!(encode_angle(0.0), 0);
        assert_eq!(encode_angle(TAU * 2.0), 0);
        assert_eq!(encode_angle(PI), 32768);
        assert_eq!(encode_angle(-PI), 32768);
        assert_eq!(encode_angle(-0.5 * PI), encode_angle(1.5 * PI));
    }

    #[test]
    fn test_angle_precision() {
        let angle = 1.234_f32;
        let back = decode_angle(encode_angle(angle));
        assert!((back - angle).abs() < TAU / FIXED_POINT_MAX);
    }

    #[test]
    fn test_direction_is_recentered_and_scaled() {
        // Three quarters of a turn reads as a quarter turn clockwise.
        let value = encode_angle(1.5 * PI);
        assert!((direction_angle(value, 0.0) + 0.5 * PI).abs() < 1e-3);

        // An angle equal to the amplitude maps to half a turn.
        let value = encode_angle(0.8);
        assert!((direction_angle(value, 0.8) - PI).abs() < 1e-3);

        assert_eq!(direction_angle(0, 1.2665), 0.0);
    }

    #[test]
    fn test_position_clamps_at_edges() {
        let res = Vec2::new(800.0, 600.0);
        assert_eq!(encode_position(Vec2::new(-10.0, 700.0), res), [0, 65535]);
        assert_eq!(encode_position(Vec2::new(800.0, 0.0), res), [65535, 0]);
    }

    #[test]
    fn test_advance_along_zero_angle() {
        let res = Vec2::new(1000.0, 500.0);
        let start = encode_position(Vec2::new(100.0, 250.0), res);
        let next = advance(start, 0, 0.0, 2.0, res);
        let moved = decode_position(next, res) - decode_position(start, res);
        assert!((moved.x - 2.0).abs() < 0.02, "moved {moved:?}");
        assert_eq!(next[1], start[1]);
    }

    #[test]
    fn test_advance_pins_at_border() {
        let res = Vec2::new(100.0, 100.0);
        let start = [65535, 30000];
        assert_eq!(advance(start, 0, 0.0, 5.0, res), start);
    }
}
