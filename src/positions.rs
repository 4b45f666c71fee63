//! Seeded starting positions and the CPU view of the position grid.
//!
//! The position grid is `num_lines` texels wide and `num_line_points` texels tall.
//! Row 0 holds each line's starting point; row `k` holds the point after `k` trace
//! steps. Starting points come from a [`StdRng`] seeded by hashing the seed string, so
//! the same seed and line count always reproduce the same grid.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// FNV-1a over the seed bytes.
fn hash_seed(seed: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    seed.bytes()
        .fold(OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(PRIME))
}

/// Starting `[x, y]` of every line, in fixed-point viewport fractions.
pub fn starting_positions(seed: &str, num_lines: u32) -> Vec<[u16; 2]> {
    let mut rng = StdRng::seed_from_u64(hash_seed(seed));
    (0..num_lines)
        .map(|_| {
            let x = rng.gen_range(0..=u16::MAX);
            let y = rng.gen_range(0..=u16::MAX);
            [x, y]
        })
        .collect()
}

/// Interleaved `RG` texel data for a fresh grid: row 0 seeded, everything else zero.
pub fn initial_grid_data(seed: &str, num_lines: u32, num_line_points: u32) -> Vec<u16> {
    let mut data = vec![0u16; num_lines as usize * num_line_points as usize * 2];
    for (i, [x, y]) in starting_positions(seed, num_lines).into_iter().enumerate() {
        data[i * 2] = x;
        data[i * 2 + 1] = y;
    }
    data
}

/// A position grid read back from the GPU.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionGrid {
    pub num_lines: u32,
    pub num_line_points: u32,
    /// Row-major: `data[point * num_lines + line]`.
    pub data: Vec<[u16; 2]>,
}

impl PositionGrid {
    pub fn get(&self, line: u32, point: u32) -> [u16; 2] {
        self.data[(point * self.num_lines + line) as usize]
    }

    /// All lines at one point index.
    pub fn row(&self, point: u32) -> &[[u16; 2]] {
        let start = (point * self.num_lines) as usize;
        &self.data[start..start + self.num_lines as usize]
    }

    /// One line's full polyline.
    pub fn line(&self, line: u32) -> Vec<[u16; 2]> {
        (0..self.num_line_points).map(|p| self.get(line, p)).collect()
    }
}
